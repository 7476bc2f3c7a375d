//! In-process message store.
//!
//! Same contract as the remote store: ids start at 1 and are never reused,
//! timestamps never go backwards, clear is atomic. Failures can be injected
//! per operation and every call is counted, which is what the sync and send
//! tests lean on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::MessageStore;
use crate::types::{CreateMessageRequest, Message};
use crate::{Error, Operation, Result};

type Translator = Box<dyn Fn(&CreateMessageRequest) -> Option<String> + Send + Sync>;

/// In-memory message store.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    translator: Option<Translator>,
}

#[derive(Default)]
struct Inner {
    messages: Vec<Message>,
    next_id: i64,
    last_timestamp: Option<DateTime<Utc>>,
    summary: Option<String>,
    failures: HashMap<Operation, u32>,
    calls: HashMap<Operation, u32>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                ..Default::default()
            }),
            translator: None,
        }
    }

    /// Fill `translatedContent` synchronously with the given function.
    pub fn with_translator<F>(mut self, translator: F) -> Self
    where
        F: Fn(&CreateMessageRequest) -> Option<String> + Send + Sync + 'static,
    {
        self.translator = Some(Box::new(translator));
        self
    }

    /// Text returned by `generate_summary`.
    pub fn with_summary(self, summary: impl Into<String>) -> Self {
        self.lock().summary = Some(summary.into());
        self
    }

    /// Make the next `count` calls of `operation` fail with a 500.
    pub fn fail_next(&self, operation: Operation, count: u32) {
        *self.lock().failures.entry(operation).or_insert(0) += count;
    }

    /// Number of times `operation` has been called, failed calls included.
    pub fn calls(&self, operation: Operation) -> u32 {
        self.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Current log contents.
    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    /// Fill in a translation after the fact, as the remote store does asynchronously.
    pub fn complete_translation(&self, id: i64, translated: impl Into<String>) -> bool {
        let mut inner = self.lock();
        match inner.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.translated_content = Some(translated.into());
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Poisoned state is still plain data
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count the call and consume one injected failure, if any.
    fn begin(&self, operation: Operation) -> Result<MutexGuard<'_, Inner>> {
        let mut inner = self.lock();
        *inner.calls.entry(operation).or_insert(0) += 1;

        if let Some(remaining) = inner.failures.get_mut(&operation) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::Status {
                    operation,
                    status: 500,
                    message: operation.fallback_message().to_string(),
                });
            }
        }
        Ok(inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("MemoryStore")
            .field("messages", &inner.messages.len())
            .field("next_id", &inner.next_id)
            .finish()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn list_messages(&self) -> Result<Vec<Message>> {
        let inner = self.begin(Operation::ListMessages)?;
        Ok(inner.messages.clone())
    }

    async fn create_message(&self, request: &CreateMessageRequest) -> Result<Message> {
        let translated = self.translator.as_ref().and_then(|t| t(request));
        let mut inner = self.begin(Operation::SendMessage)?;

        let now = Utc::now();
        let timestamp = match inner.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };

        let message = Message {
            id: inner.next_id,
            role: request.role,
            content: request.content.clone(),
            translated_content: translated,
            original_language: request.original_language.clone(),
            target_language: request.target_language.clone(),
            timestamp,
        };

        inner.next_id += 1;
        inner.last_timestamp = Some(timestamp);
        inner.messages.push(message.clone());
        Ok(message)
    }

    async fn clear_messages(&self) -> Result<()> {
        let mut inner = self.begin(Operation::ClearMessages)?;
        inner.messages.clear();
        Ok(())
    }

    async fn generate_summary(&self) -> Result<String> {
        let inner = self.begin(Operation::GenerateSummary)?;
        inner.summary.clone().ok_or_else(|| Error::Status {
            operation: Operation::GenerateSummary,
            status: 503,
            message: "Summary service is not configured".to_string(),
        })
    }
}
