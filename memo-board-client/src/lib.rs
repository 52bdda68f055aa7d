//! Memo board client: the remote store and the board view built on top of it.

pub mod client;
pub mod command;
pub mod view;

pub use client::MemoBoardClient;
pub use view::{BoardView, ReconcilePolicy};
