// termdialog library - embedded terminal dialogs for terminal UIs

pub mod app;
pub mod config;
pub mod services;
pub mod view;
