//! One client's view of the shared conversation.
//!
//! Wires the synchronizer, mutator and summary orchestrator to a single store
//! and owns the session context they are read through.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::config::ClientConfig;
use crate::guard::Outcome;
use crate::mutator::{Draft, Mutator};
use crate::session::SessionContext;
use crate::store::MessageStore;
use crate::summary::{Summary, SummaryOrchestrator};
use crate::sync::{Snapshot, Synchronizer};
use crate::types::Message;
use crate::Result;

pub struct Conversation {
    session: SessionContext,
    sync: Synchronizer,
    mutator: Mutator,
    summaries: SummaryOrchestrator,
}

impl Conversation {
    /// Start polling `store` with the configured cadence and session defaults.
    pub fn start(store: Arc<dyn MessageStore>, config: &ClientConfig) -> Self {
        Self::with_session(store, config.poll_interval(), SessionContext::from_config(config))
    }

    pub fn with_session(
        store: Arc<dyn MessageStore>,
        poll_interval: Duration,
        session: SessionContext,
    ) -> Self {
        let sync = Synchronizer::spawn(store.clone(), poll_interval);
        let mutator = Mutator::new(store.clone(), sync.invalidator());
        let summaries = SummaryOrchestrator::new(store);

        Self {
            session,
            sync,
            mutator,
            summaries,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionContext {
        &mut self.session
    }

    pub fn snapshot(&self) -> Snapshot {
        self.sync.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.sync.subscribe()
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.sync
    }

    pub fn mutator(&self) -> &Mutator {
        &self.mutator
    }

    pub fn summaries(&self) -> &SummaryOrchestrator {
        &self.summaries
    }

    /// Send the draft as the current role; cleared only on success.
    pub async fn send_draft(&self, draft: &mut Draft) -> Result<Outcome<Message>> {
        self.mutator.send_draft(draft, &self.session).await
    }

    pub async fn clear(&self) -> Result<Outcome<()>> {
        self.mutator.clear().await
    }

    pub async fn summarize(&self) -> Result<Outcome<Summary>> {
        self.summaries.request().await
    }

    /// Stop polling and wait for the loop to exit.
    pub async fn shutdown(self) {
        self.sync.shutdown().await;
    }
}
