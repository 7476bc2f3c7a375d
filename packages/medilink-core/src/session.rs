//! Per-client session view state
//!
//! Role, languages and search query live here rather than in globals. Each
//! client (and each test) owns its own context; nothing is shared or persisted.

use crate::config::ClientConfig;
use crate::perspective::{self, Alignment, LanguagePair};
use crate::sync::Snapshot;
use crate::transcript::TranscriptView;
use crate::types::{CreateMessageRequest, Message, Role};

/// Session view state for one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    current_role: Role,
    doctor_language: String,
    patient_language: String,
    search_query: String,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            current_role: Role::Doctor,
            doctor_language: "English".to_string(),
            patient_language: "Spanish".to_string(),
            search_query: String::new(),
        }
    }
}

impl SessionContext {
    pub fn new(current_role: Role, doctor_language: &str, patient_language: &str) -> Self {
        Self {
            current_role,
            doctor_language: doctor_language.to_string(),
            patient_language: patient_language.to_string(),
            search_query: String::new(),
        }
    }

    /// Fresh session seeded from the configured defaults.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.default_role,
            &config.languages.doctor,
            &config.languages.patient,
        )
    }

    // ========================================================================
    // Role
    // ========================================================================

    pub fn current_role(&self) -> Role {
        self.current_role
    }

    pub fn set_role(&mut self, role: Role) {
        self.current_role = role;
    }

    /// Switch to the other role and return it
    pub fn toggle_role(&mut self) -> Role {
        self.current_role = self.current_role.other();
        self.current_role
    }

    // ========================================================================
    // Languages
    // ========================================================================

    pub fn language_for(&self, role: Role) -> &str {
        match role {
            Role::Doctor => &self.doctor_language,
            Role::Patient => &self.patient_language,
        }
    }

    /// Set a role's language. Blank names are ignored.
    pub fn set_language(&mut self, role: Role, language: &str) -> bool {
        let language = language.trim();
        if language.is_empty() {
            return false;
        }
        match role {
            Role::Doctor => self.doctor_language = language.to_string(),
            Role::Patient => self.patient_language = language.to_string(),
        }
        true
    }

    /// Language pair for the next message composed under the current role
    pub fn outgoing_pair(&self) -> LanguagePair {
        perspective::outgoing_pair(self.current_role, &self.doctor_language, &self.patient_language)
    }

    /// Build the create request for composed text, trimmed.
    pub fn outgoing_request(&self, content: &str) -> CreateMessageRequest {
        let pair = self.outgoing_pair();
        CreateMessageRequest {
            role: self.current_role,
            content: content.trim().to_string(),
            original_language: pair.original,
            target_language: pair.target,
        }
    }

    // ========================================================================
    // Search
    // ========================================================================

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn clear_search(&mut self) {
        self.search_query.clear();
    }

    // ========================================================================
    // Derived views
    // ========================================================================

    pub fn alignment(&self, message: &Message) -> Alignment {
        Alignment::of(message, self.current_role)
    }

    /// Filtered, aligned transcript of `snapshot` from this session's point of view.
    pub fn transcript<'a>(&self, snapshot: &'a Snapshot) -> TranscriptView<'a> {
        TranscriptView::build(snapshot, self.current_role, &self.search_query)
    }
}
