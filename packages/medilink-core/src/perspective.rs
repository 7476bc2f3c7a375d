//! Viewer-relative interpretation of the conversation.
//!
//! Nothing here is stored: alignment and language pairing are recomputed from
//! the current role every time, so switching roles needs no network call.

use crate::types::{Message, Role};

/// Which side of the transcript a message renders on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// Authored under the viewer's current role
    Mine,
    Theirs,
}

impl Alignment {
    pub fn of(message: &Message, current_role: Role) -> Self {
        if is_authored_by_viewer(message, current_role) {
            Alignment::Mine
        } else {
            Alignment::Theirs
        }
    }
}

/// Language pair stamped on an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePair {
    pub original: String,
    pub target: String,
}

/// True iff the message was written under the viewer's current role.
pub fn is_authored_by_viewer(message: &Message, current_role: Role) -> bool {
    message.role == current_role
}

/// The active role speaks its own language; the other role's language is the target.
pub fn outgoing_pair(current_role: Role, doctor_language: &str, patient_language: &str) -> LanguagePair {
    let language_of = |role: Role| match role {
        Role::Doctor => doctor_language,
        Role::Patient => patient_language,
    };

    LanguagePair {
        original: language_of(current_role).to_string(),
        target: language_of(current_role.other()).to_string(),
    }
}
