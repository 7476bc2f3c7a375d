//! Writes to the shared log: send and clear.
//!
//! Both write through the store and, on acknowledgment, invalidate the
//! synchronizer so the next snapshot reflects the change without waiting for a
//! tick. No optimistic local copy is made; the sent message's final form
//! (id, timestamp, translation) arrives with the refetch.

use std::sync::Arc;

use crate::guard::{Outcome, SingleFlight, SkipReason};
use crate::session::SessionContext;
use crate::store::MessageStore;
use crate::sync::Invalidator;
use crate::types::{CreateMessageRequest, Message};
use crate::Result;

/// Composed-but-unsent text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    text: String,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Nothing but whitespace
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}

impl From<&str> for Draft {
    fn from(text: &str) -> Self {
        Self { text: text.to_string() }
    }
}

impl From<String> for Draft {
    fn from(text: String) -> Self {
        Self { text }
    }
}

/// Sends and clears against the store, one of each in flight at a time.
#[derive(Clone)]
pub struct Mutator {
    store: Arc<dyn MessageStore>,
    invalidator: Invalidator,
    sending: SingleFlight,
    clearing: SingleFlight,
}

impl Mutator {
    pub fn new(store: Arc<dyn MessageStore>, invalidator: Invalidator) -> Self {
        Self {
            store,
            invalidator,
            sending: SingleFlight::new(),
            clearing: SingleFlight::new(),
        }
    }

    pub fn is_sending(&self) -> bool {
        self.sending.is_busy()
    }

    pub fn is_clearing(&self) -> bool {
        self.clearing.is_busy()
    }

    /// Submit a message.
    ///
    /// Blank content, or a send already pending, is skipped without a network
    /// call. Content is trimmed before it goes out. Failures are returned as-is
    /// and never retried.
    pub async fn send(&self, request: CreateMessageRequest) -> Result<Outcome<Message>> {
        let content = request.content.trim();
        if content.is_empty() {
            return Ok(Outcome::Skipped(SkipReason::EmptyContent));
        }

        let Some(_flight) = self.sending.try_begin() else {
            tracing::debug!("Send skipped, previous send still pending");
            return Ok(Outcome::Skipped(SkipReason::InFlight));
        };

        let request = CreateMessageRequest {
            content: content.to_string(),
            ..request
        };

        match self.store.create_message(&request).await {
            Ok(message) => {
                tracing::info!("Sent message {} as {}", message.id, message.role);
                self.invalidator.invalidate();
                Ok(Outcome::Done(message))
            }
            Err(e) => {
                tracing::warn!("Send failed: {}", e);
                Err(e)
            }
        }
    }

    /// Send the draft under the session's current role and languages.
    ///
    /// The draft is cleared only when the store acknowledged the message.
    pub async fn send_draft(
        &self,
        draft: &mut Draft,
        session: &SessionContext,
    ) -> Result<Outcome<Message>> {
        let outcome = self.send(session.outgoing_request(draft.text())).await?;
        if outcome.is_done() {
            draft.clear();
        }
        Ok(outcome)
    }

    /// Remove every message from the shared log.
    pub async fn clear(&self) -> Result<Outcome<()>> {
        let Some(_flight) = self.clearing.try_begin() else {
            tracing::debug!("Clear skipped, previous clear still pending");
            return Ok(Outcome::Skipped(SkipReason::InFlight));
        };

        match self.store.clear_messages().await {
            Ok(()) => {
                tracing::info!("Conversation cleared");
                self.invalidator.invalidate();
                Ok(Outcome::Done(()))
            }
            Err(e) => {
                tracing::warn!("Clear failed: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::GatedStore;
    use crate::store::MemoryStore;
    use crate::sync::Synchronizer;
    use crate::types::Role;
    use crate::Operation;
    use std::time::Duration;
    use tokio::time::Instant;

    const INTERVAL: Duration = Duration::from_secs(3);

    async fn started(store: Arc<MemoryStore>) -> (Synchronizer, Mutator) {
        let sync = Synchronizer::spawn(store.clone(), INTERVAL);
        sync.subscribe().wait_for(|s| !s.loading).await.unwrap();
        let mutator = Mutator::new(store, sync.invalidator());
        (sync, mutator)
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_content_issues_no_request() {
        let store = Arc::new(MemoryStore::new());
        let (sync, mutator) = started(store.clone()).await;
        let before = sync.snapshot();
        let session = SessionContext::default();

        for text in ["", "   ", "\n\t "] {
            let mut draft = Draft::from(text);
            let outcome = mutator.send_draft(&mut draft, &session).await.unwrap();
            assert_eq!(outcome, Outcome::Skipped(SkipReason::EmptyContent));
            assert_eq!(draft.text(), text);
        }

        assert_eq!(store.calls(Operation::SendMessage), 0);
        assert_eq!(sync.invalidator().current(), 0);
        assert_eq!(sync.snapshot().messages, before.messages);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_refreshes_snapshot_before_next_tick() {
        let store = Arc::new(MemoryStore::new());
        let (sync, mutator) = started(store.clone()).await;
        let session = SessionContext::new(Role::Doctor, "English", "Spanish");
        let start = Instant::now();

        let mut draft = Draft::from("  Hello  ");
        let sent = mutator
            .send_draft(&mut draft, &session)
            .await
            .unwrap()
            .done()
            .expect("message sent");
        assert!(draft.is_blank());
        assert_eq!(sent.content, "Hello");
        assert_eq!(sent.original_language, "English");
        assert_eq!(sent.target_language, "Spanish");

        let snapshot = sync.wait_for_epoch(sync.invalidator().current()).await;
        assert_eq!(snapshot.messages.as_slice(), &[sent]);
        assert!(start.elapsed() < INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_send_keeps_draft() {
        let store = Arc::new(MemoryStore::new());
        let (sync, mutator) = started(store.clone()).await;
        store.fail_next(Operation::SendMessage, 1);

        let mut draft = Draft::from("Take two tablets");
        let err = mutator
            .send_draft(&mut draft, &SessionContext::default())
            .await
            .unwrap_err();

        assert_eq!(err.operation(), Some(Operation::SendMessage));
        assert_eq!(err.user_message(), "Failed to send message");
        assert_eq!(draft.text(), "Take two tablets");
        assert_eq!(sync.invalidator().current(), 0);

        // No automatic retry; the caller retries with the same draft
        assert_eq!(store.calls(Operation::SendMessage), 1);
        let retried = mutator
            .send_draft(&mut draft, &SessionContext::default())
            .await
            .unwrap();
        assert!(retried.is_done());
        assert!(draft.is_blank());
    }

    #[tokio::test]
    async fn test_second_send_while_pending_is_skipped() {
        let store = Arc::new(GatedStore::new(MemoryStore::new(), Operation::SendMessage));
        let mutator = Mutator::new(store.clone(), Invalidator::default());
        let session = SessionContext::default();

        let first = {
            let mutator = mutator.clone();
            let request = session.outgoing_request("first");
            tokio::spawn(async move { mutator.send(request).await })
        };
        store.started.notified().await;
        assert!(mutator.is_sending());

        let second = mutator.send(session.outgoing_request("second")).await.unwrap();
        assert_eq!(second, Outcome::Skipped(SkipReason::InFlight));

        store.release.notify_one();
        let first = first.await.unwrap().unwrap();
        assert!(first.is_done());
        assert!(!mutator.is_sending());
        assert_eq!(store.inner.calls(Operation::SendMessage), 1);
    }

    #[tokio::test]
    async fn test_second_clear_while_pending_is_skipped() {
        let store = Arc::new(GatedStore::new(MemoryStore::new(), Operation::ClearMessages));
        let mutator = Mutator::new(store.clone(), Invalidator::default());

        let first = {
            let mutator = mutator.clone();
            tokio::spawn(async move { mutator.clear().await })
        };
        store.started.notified().await;
        assert!(mutator.is_clearing());

        let second = mutator.clear().await.unwrap();
        assert_eq!(second, Outcome::Skipped(SkipReason::InFlight));

        store.release.notify_one();
        assert!(first.await.unwrap().unwrap().is_done());
        assert!(!mutator.is_clearing());
        assert_eq!(store.inner.calls(Operation::ClearMessages), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_empties_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let (sync, mutator) = started(store.clone()).await;
        let session = SessionContext::default();

        let sent = mutator.send(session.outgoing_request("Hello")).await.unwrap();
        assert!(sent.is_done());
        let snapshot = sync.wait_for_epoch(sync.invalidator().current()).await;
        assert_eq!(snapshot.len(), 1);

        assert!(mutator.clear().await.unwrap().is_done());
        let snapshot = sync.wait_for_epoch(sync.invalidator().current()).await;
        assert!(snapshot.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_clear_leaves_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let (sync, mutator) = started(store.clone()).await;
        let sent = mutator
            .send(SessionContext::default().outgoing_request("Hello"))
            .await
            .unwrap();
        assert!(sent.is_done());
        sync.wait_for_epoch(1).await;

        store.fail_next(Operation::ClearMessages, 1);
        let err = mutator.clear().await.unwrap_err();
        assert_eq!(err.user_message(), "Failed to clear messages");
        assert_eq!(sync.snapshot().len(), 1);
        assert_eq!(store.messages().len(), 1);
    }
}
