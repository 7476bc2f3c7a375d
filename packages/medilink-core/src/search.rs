//! Transcript search.

use crate::types::Message;

/// Case-insensitive substring match against the original text and, when
/// present, the translation. An empty query matches everything.
pub fn matches(message: &Message, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let query = query.to_lowercase();
    matches_lowered(message, &query)
}

fn matches_lowered(message: &Message, query: &str) -> bool {
    message.content.to_lowercase().contains(query)
        || message
            .translated_content
            .as_ref()
            .map(|t| t.to_lowercase().contains(query))
            .unwrap_or(false)
}

/// Narrow `messages` to those matching `query`, keeping their order.
///
/// Borrows only; the input is never modified. Accepts its own output, so
/// filtering twice with the same query is the same as filtering once.
pub fn filter<'a, I>(messages: I, query: &str) -> Vec<&'a Message>
where
    I: IntoIterator<Item = &'a Message>,
{
    if query.is_empty() {
        return messages.into_iter().collect();
    }
    let query = query.to_lowercase();
    messages
        .into_iter()
        .filter(|m| matches_lowered(m, &query))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use chrono::Utc;

    fn message(id: i64, content: &str, translated: Option<&str>) -> Message {
        Message {
            id,
            role: if id % 2 == 0 { Role::Patient } else { Role::Doctor },
            content: content.into(),
            translated_content: translated.map(String::from),
            original_language: "English".into(),
            target_language: "Spanish".into(),
            timestamp: Utc::now(),
        }
    }

    fn sample() -> Vec<Message> {
        vec![
            message(1, "Do you have a Fever?", Some("¿Tiene fiebre?")),
            message(2, "Sí, desde ayer", Some("Yes, since yesterday")),
            message(3, "Any headache?", None),
            message(4, "Un poco de fiebre y dolor", Some("A little fever and pain")),
        ]
    }

    fn ids(messages: &[&Message]) -> Vec<i64> {
        messages.iter().map(|m| m.id).collect()
    }

    #[test]
    fn test_empty_query_keeps_everything() {
        let snapshot = sample();
        assert_eq!(ids(&filter(&snapshot, "")), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_case_insensitive_on_content_and_translation() {
        let snapshot = sample();
        assert_eq!(ids(&filter(&snapshot, "FEVER")), vec![1, 4]);
        assert_eq!(ids(&filter(&snapshot, "fiebre")), vec![1, 4]);
        assert_eq!(ids(&filter(&snapshot, "yesterday")), vec![2]);
    }

    #[test]
    fn test_missing_translation_only_checks_content() {
        let snapshot = sample();
        assert_eq!(ids(&filter(&snapshot, "headache")), vec![3]);
        assert!(filter(&snapshot, "dolor de cabeza").is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let snapshot = sample();
        for query in ["", "fever", "e", "zzz", "SÍ"] {
            let once = filter(&snapshot, query);
            let twice = filter(once.clone(), query);
            assert_eq!(ids(&once), ids(&twice), "query {:?}", query);
        }
    }

    #[test]
    fn test_result_is_ordered_subsequence() {
        let snapshot = sample();
        for query in ["", "a", "e", "fiebre", "?"] {
            let result = ids(&filter(&snapshot, query));
            let mut source = snapshot.iter().map(|m| m.id);
            assert!(
                result.iter().all(|id| source.any(|s| s == *id)),
                "query {:?} broke order: {:?}",
                query,
                result
            );
        }
    }

    #[test]
    fn test_snapshot_untouched() {
        let snapshot = sample();
        let before = snapshot.clone();
        let _ = filter(&snapshot, "fever");
        assert_eq!(snapshot, before);
    }

    #[test]
    fn test_whitespace_query_is_literal() {
        let snapshot = vec![message(1, "ok", None), message(2, "all good", None)];
        assert_eq!(ids(&filter(&snapshot, " ")), vec![2]);
        assert!(matches(&snapshot[1], " "));
    }
}
