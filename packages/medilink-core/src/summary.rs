//! On-demand conversation summary.
//!
//! Independent of the poll loop: asking for a summary neither waits for nor
//! triggers a snapshot refresh.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::guard::{Outcome, SingleFlight, SkipReason};
use crate::store::MessageStore;
use crate::Result;

/// Synthesized summary as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
    pub generated_at: DateTime<Utc>,
}

impl Summary {
    /// One entry per line of the summary text.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }
}

/// Issues summary requests, one at a time.
#[derive(Clone)]
pub struct SummaryOrchestrator {
    store: Arc<dyn MessageStore>,
    flight: SingleFlight,
}

impl SummaryOrchestrator {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self {
            store,
            flight: SingleFlight::new(),
        }
    }

    pub fn is_generating(&self) -> bool {
        self.flight.is_busy()
    }

    /// Summarize the full current conversation.
    pub async fn request(&self) -> Result<Outcome<Summary>> {
        let Some(_flight) = self.flight.try_begin() else {
            tracing::debug!("Summary skipped, previous request still pending");
            return Ok(Outcome::Skipped(SkipReason::InFlight));
        };

        let text = self.store.generate_summary().await.map_err(|e| {
            tracing::warn!("Summary failed: {}", e);
            e
        })?;
        tracing::info!("Summary generated ({} chars)", text.len());

        Ok(Outcome::Done(Summary {
            text,
            generated_at: Utc::now(),
        }))
    }
}
