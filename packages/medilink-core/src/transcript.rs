//! What the conversation pane shows for a snapshot.

use crate::perspective::Alignment;
use crate::search;
use crate::sync::Snapshot;
use crate::types::{Message, Role};

/// One rendered message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranscriptEntry<'a> {
    pub message: &'a Message,
    pub alignment: Alignment,
}

/// Transcript state derived from a snapshot, a role and a search query.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptView<'a> {
    /// First fetch has not completed
    Loading,
    /// The log itself is empty
    NoMessages,
    /// Messages exist but the search filtered all of them out
    NoMatches { total: usize },
    Entries(Vec<TranscriptEntry<'a>>),
}

impl<'a> TranscriptView<'a> {
    pub fn build(snapshot: &'a Snapshot, current_role: Role, query: &str) -> Self {
        if snapshot.loading {
            return TranscriptView::Loading;
        }
        // Distinguished on the pre-filter length
        if snapshot.messages.is_empty() {
            return TranscriptView::NoMessages;
        }

        let entries: Vec<_> = search::filter(snapshot.messages.iter(), query)
            .into_iter()
            .map(|message| TranscriptEntry {
                message,
                alignment: Alignment::of(message, current_role),
            })
            .collect();

        if entries.is_empty() {
            TranscriptView::NoMatches {
                total: snapshot.messages.len(),
            }
        } else {
            TranscriptView::Entries(entries)
        }
    }

    pub fn entries(&self) -> &[TranscriptEntry<'a>] {
        match self {
            TranscriptView::Entries(entries) => entries,
            _ => &[],
        }
    }
}
