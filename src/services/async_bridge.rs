//! Bridge between tokio tasks and the synchronous UI loop
//!
//! Dialog tasks run on the tokio runtime; when one resolves, the event it
//! produced is sent back over a std channel and drained by the UI thread once
//! per frame, so dialogs are only ever touched from one thread.

use std::sync::mpsc;

use crate::view::dialogs::{DialogEvent, DialogId};

/// Messages delivered from async tasks to the UI loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsyncMessage {
    /// A dialog task resolved with an event for that dialog
    Dialog { id: DialogId, event: DialogEvent },
}

pub struct AsyncBridge {
    sender: mpsc::Sender<AsyncMessage>,
    receiver: mpsc::Receiver<AsyncMessage>,
}

impl AsyncBridge {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver }
    }

    /// Sender handle for tasks
    pub fn sender(&self) -> mpsc::Sender<AsyncMessage> {
        self.sender.clone()
    }

    /// Drain all pending messages without blocking
    pub fn try_recv_all(&self) -> Vec<AsyncMessage> {
        self.receiver.try_iter().collect()
    }
}

impl Default for AsyncBridge {
    fn default() -> Self {
        Self::new()
    }
}
