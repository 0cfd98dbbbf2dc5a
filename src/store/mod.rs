//! Document store seam
//!
//! A room is one JSON document that is always read and written whole. The
//! realtime store behind it decides who wins concurrent writes (the last
//! writer). `MirroredStore` layers a local in-memory copy over an optional
//! remote store so play continues when the remote is unreachable.

mod memory;
mod mirror;
mod rest;

use async_trait::async_trait;
use std::error::Error;
use tokio::sync::broadcast;

use crate::types::RoomDocument;

pub use memory::MemoryStore;
pub use mirror::MirroredStore;
pub use rest::RestStore;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by store backends
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    #[error("unexpected store response status {status} for `{path}`")]
    Status { path: String, status: u16 },

    #[error("failed to decode document `{path}`")]
    Decode {
        path: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StoreError {
    /// Construct an unavailable error from any backend failure
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StoreError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// A realtime document store holding one document per room
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the whole room document
    async fn load(&self, room_code: &str) -> StoreResult<Option<RoomDocument>>;

    /// Overwrite the whole room document
    async fn save(&self, doc: &RoomDocument) -> StoreResult<()>;

    /// Receive every new version of the room document
    async fn subscribe(&self, room_code: &str) -> StoreResult<broadcast::Receiver<RoomDocument>>;

    /// Check that the backend is reachable
    async fn health_check(&self) -> StoreResult<()>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
