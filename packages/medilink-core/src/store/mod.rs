//! Remote message store seam
//!
//! The store is the only shared mutable resource between clients. Everything
//! above this module talks to it through [`MessageStore`].

pub mod client;
pub mod memory;

#[cfg(test)]
pub(crate) mod testing;

pub use client::StoreClient;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::types::{CreateMessageRequest, Message};
use crate::Result;

/// Authoritative, append-only message log.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Full history in insertion order
    async fn list_messages(&self) -> Result<Vec<Message>>;

    /// Append a message; the store assigns `id` and `timestamp`
    async fn create_message(&self, request: &CreateMessageRequest) -> Result<Message>;

    /// Remove every message at once
    async fn clear_messages(&self) -> Result<()>;

    /// Synthesized summary of the whole conversation
    async fn generate_summary(&self) -> Result<String>;
}
