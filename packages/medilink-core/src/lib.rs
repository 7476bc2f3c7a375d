//! MediLink Core - conversation sync and perspective layer.
//!
//! This crate provides everything a MediLink client needs below the visual layer:
//!
//! - **Synchronization**: periodic full refetch of the shared message log
//! - **Sending**: one-at-a-time message submission with snapshot invalidation
//! - **Perspective**: role-relative alignment and outgoing language pairing
//! - **Search**: case-insensitive filtering over original and translated text
//! - **Summary**: on-demand conversation summary requests
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use medilink_core::{ClientConfig, Conversation, Draft, Outcome, StoreClient};
//!
//! # async fn run() -> medilink_core::Result<()> {
//! let config = ClientConfig::load()?;
//! let store = Arc::new(StoreClient::from_config(&config)?);
//! let conversation = Conversation::start(store, &config);
//!
//! let mut draft = Draft::from("Where does it hurt?");
//! if let Outcome::Done(message) = conversation.send_draft(&mut draft).await? {
//!     println!("sent #{}", message.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod conversation;
pub mod guard;
pub mod mutator;
pub mod perspective;
pub mod search;
pub mod session;
pub mod store;
pub mod summary;
pub mod sync;
pub mod transcript;
pub mod types;

use std::fmt;
use std::time::Duration;

// Re-export commonly used types
pub use config::{ClientConfig, RequestPolicy};
pub use conversation::Conversation;
pub use guard::{Outcome, SkipReason};
pub use mutator::{Draft, Mutator};
pub use perspective::{Alignment, LanguagePair};
pub use session::SessionContext;
pub use store::{MemoryStore, MessageStore, StoreClient};
pub use summary::{Summary, SummaryOrchestrator};
pub use sync::{Invalidator, Snapshot, Synchronizer};
pub use transcript::{TranscriptEntry, TranscriptView};
pub use types::{CreateMessageRequest, Message, Role, SUPPORTED_LANGUAGES};

/// Remote operations a request error can originate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListMessages,
    SendMessage,
    ClearMessages,
    GenerateSummary,
}

impl Operation {
    /// Text shown when the server does not explain a failure.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Operation::ListMessages => "Failed to fetch messages",
            Operation::SendMessage => "Failed to send message",
            Operation::ClearMessages => "Failed to clear messages",
            Operation::GenerateSummary => "Failed to generate summary",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::ListMessages => "list messages",
            Operation::SendMessage => "send message",
            Operation::ClearMessages => "clear messages",
            Operation::GenerateSummary => "generate summary",
        };
        f.write_str(name)
    }
}

/// Error types for medilink-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{operation} failed with status {status}: {message}")]
    Status {
        operation: Operation,
        status: u16,
        message: String,
    },

    #[error("{operation} failed: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: Operation,
        timeout: Duration,
    },

    #[error("{operation} returned an invalid response: {detail}")]
    InvalidResponse {
        operation: Operation,
        detail: String,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// The remote operation that failed, if this is a request error.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Error::Status { operation, .. }
            | Error::Transport { operation, .. }
            | Error::Timeout { operation, .. }
            | Error::InvalidResponse { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    /// Message to surface to the user.
    ///
    /// Server-provided text wins; every other request failure collapses to the
    /// operation's generic message.
    pub fn user_message(&self) -> String {
        match self {
            Error::Status { message, .. } => message.clone(),
            Error::Config(detail) => format!("Invalid configuration: {}", detail),
            other => match other.operation() {
                Some(operation) => operation.fallback_message().to_string(),
                None => other.to_string(),
            },
        }
    }
}

/// Result type for medilink-core operations.
pub type Result<T> = std::result::Result<T, Error>;
