//! View and UI layer
//!
//! This module contains all presentation and rendering components.

pub mod dialogs;
pub mod theme;
