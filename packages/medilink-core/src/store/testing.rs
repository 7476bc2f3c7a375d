//! Test doubles shared by the unit tests.

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{MemoryStore, MessageStore};
use crate::types::{CreateMessageRequest, Message};
use crate::{Operation, Result};

/// Holds every call of one operation until released.
pub(crate) struct GatedStore {
    pub inner: MemoryStore,
    gated: Operation,
    pub started: Notify,
    pub release: Notify,
}

impl GatedStore {
    pub fn new(inner: MemoryStore, gated: Operation) -> Self {
        Self {
            inner,
            gated,
            started: Notify::new(),
            release: Notify::new(),
        }
    }

    async fn gate(&self, operation: Operation) {
        if operation == self.gated {
            self.started.notify_one();
            self.release.notified().await;
        }
    }
}

#[async_trait]
impl MessageStore for GatedStore {
    async fn list_messages(&self) -> Result<Vec<Message>> {
        self.gate(Operation::ListMessages).await;
        self.inner.list_messages().await
    }

    async fn create_message(&self, request: &CreateMessageRequest) -> Result<Message> {
        self.gate(Operation::SendMessage).await;
        self.inner.create_message(request).await
    }

    async fn clear_messages(&self) -> Result<()> {
        self.gate(Operation::ClearMessages).await;
        self.inner.clear_messages().await
    }

    async fn generate_summary(&self) -> Result<String> {
        self.gate(Operation::GenerateSummary).await;
        self.inner.generate_summary().await
    }
}
