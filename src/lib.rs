// Public API for integration tests and potential library usage

pub mod api;
pub mod board;
pub mod commentary;
pub mod config;
pub mod error;
pub mod protocol;
pub mod questions;
pub mod sabotage;
pub mod state;
pub mod store;
pub mod turn;
pub mod types;
pub mod ws;

// Re-export broadcast for testing
pub mod broadcast;
