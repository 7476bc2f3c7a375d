//! Plain-text rendering of transcripts and summaries.

use medilink_core::{Alignment, Message, SessionContext, Summary, TranscriptEntry, TranscriptView};

const THEIRS_INDENT: &str = "";
const MINE_INDENT: &str = "                ";

/// Render the transcript the way the session sees it.
pub fn transcript(view: &TranscriptView<'_>, session: &SessionContext) -> String {
    match view {
        TranscriptView::Loading => "Loading secure history...".to_string(),
        TranscriptView::NoMessages => {
            format!(
                "No messages yet. You are the {}; type a message to start the consultation.",
                session.current_role().label()
            )
        }
        TranscriptView::NoMatches { total } => {
            format!(
                "No messages match \"{}\" ({} in conversation).",
                session.search_query(),
                total
            )
        }
        TranscriptView::Entries(entries) => entries
            .iter()
            .map(entry)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// One message: header line, original text, then the translation if any.
pub fn entry(entry: &TranscriptEntry<'_>) -> String {
    let indent = match entry.alignment {
        Alignment::Mine => MINE_INDENT,
        Alignment::Theirs => THEIRS_INDENT,
    };
    message(entry.message, indent, entry.alignment == Alignment::Mine)
}

fn message(message: &Message, indent: &str, mine: bool) -> String {
    let who = if mine {
        format!("{} (you)", message.role.label())
    } else {
        message.role.label().to_string()
    };

    let mut lines = vec![
        format!("{}{} · {}", indent, who, message.display_time()),
        format!("{}  {}", indent, message.content),
    ];
    match &message.translated_content {
        Some(translated) => lines.push(format!(
            "{}  [{}] {}",
            indent, message.target_language, translated
        )),
        None => lines.push(format!("{}  [{}] translating...", indent, message.target_language)),
    }
    lines.join("\n")
}

/// Summary text framed for the terminal.
pub fn summary(summary: &Summary) -> String {
    let mut out = format!(
        "── Consultation summary ({}) ──\n",
        summary.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    for paragraph in summary.paragraphs() {
        out.push_str(paragraph);
        out.push('\n');
    }
    out.push_str("──");
    out
}

/// One-line status for the prompt.
pub fn status_line(session: &SessionContext) -> String {
    let pair = session.outgoing_pair();
    let mut line = format!(
        "{} · {} → {}",
        session.current_role().label(),
        pair.original,
        pair.target
    );
    if !session.search_query().is_empty() {
        line.push_str(&format!(" · search: \"{}\"", session.search_query()));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use medilink_core::Role;

    fn sample(id: i64, role: Role, content: &str, translated: Option<&str>) -> Message {
        Message {
            id,
            role,
            content: content.to_string(),
            translated_content: translated.map(str::to_string),
            original_language: "English".to_string(),
            target_language: "Spanish".to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 2, 14, 5, 0).unwrap(),
        }
    }

    #[test]
    fn test_entry_marks_own_messages() {
        let msg = sample(1, Role::Doctor, "Hello", Some("Hola"));
        let mine = entry(&TranscriptEntry {
            message: &msg,
            alignment: Alignment::Mine,
        });
        let theirs = entry(&TranscriptEntry {
            message: &msg,
            alignment: Alignment::Theirs,
        });

        assert!(mine.starts_with(MINE_INDENT));
        assert!(mine.contains("Doctor (you)"));
        assert!(mine.contains("[Spanish] Hola"));
        assert!(theirs.starts_with("Doctor · "));
        assert!(theirs.contains(&msg.display_time()));
    }

    #[test]
    fn test_pending_translation() {
        let msg = sample(1, Role::Patient, "Me duele", None);
        let text = entry(&TranscriptEntry {
            message: &msg,
            alignment: Alignment::Theirs,
        });
        assert!(text.ends_with("[Spanish] translating..."));
    }

    #[test]
    fn test_empty_states() {
        let mut session = SessionContext::default();
        assert_eq!(
            transcript(&TranscriptView::Loading, &session),
            "Loading secure history..."
        );
        assert!(transcript(&TranscriptView::NoMessages, &session).contains("You are the Doctor"));

        session.set_search_query("fever");
        assert_eq!(
            transcript(&TranscriptView::NoMatches { total: 4 }, &session),
            "No messages match \"fever\" (4 in conversation)."
        );
    }

    #[test]
    fn test_summary_keeps_paragraphs() {
        let summary = Summary {
            text: "Symptoms: fever\n\nPlan: rest".to_string(),
            generated_at: Utc.with_ymd_and_hms(2026, 3, 2, 14, 5, 0).unwrap(),
        };
        let text = super::summary(&summary);

        assert!(text.starts_with("── Consultation summary (2026-03-02 14:05 UTC) ──\n"));
        assert!(text.contains("Symptoms: fever\n\nPlan: rest\n"));
    }

    #[test]
    fn test_status_line_follows_role() {
        let mut session = SessionContext::new(Role::Doctor, "English", "French");
        assert_eq!(status_line(&session), "Doctor · English → French");

        session.toggle_role();
        session.set_search_query("rash");
        assert_eq!(status_line(&session), "Patient · French → English · search: \"rash\"");
    }
}
