//! Ordered, deduplicated message timeline

use std::collections::HashSet;

use crate::models::Message;

/// Messages sorted ascending by `created_at`, unique by `id`.
///
/// The first [`Timeline::replace_all`] seeds the timeline from history.
/// Every later update is incremental: a second `replace_all` is merged
/// through [`Timeline::insert`] instead of discarding what is already there.
#[derive(Debug, Default)]
pub struct Timeline {
    messages: Vec<Message>,
    ids: HashSet<String>,
    seeded: bool,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message, keeping the order. Returns `false` if the id was
    /// already present (the timeline is left untouched).
    pub fn insert(&mut self, message: Message) -> bool {
        if self.ids.contains(&message.id) {
            return false;
        }
        // Entries with an equal timestamp stay ahead of the new one.
        let at = self
            .messages
            .partition_point(|m| m.created_at <= message.created_at);
        self.ids.insert(message.id.clone());
        self.messages.insert(at, message);
        true
    }

    /// Adopt a history batch as the backing sequence.
    ///
    /// Duplicate ids keep their first occurrence; the sort is stable. Returns
    /// the number of messages that became visible.
    pub fn replace_all(&mut self, messages: Vec<Message>) -> usize {
        if self.seeded {
            tracing::debug!("Timeline already seeded; merging {} messages", messages.len());
            let mut added = 0;
            for message in messages {
                added += usize::from(self.insert(message));
            }
            return added;
        }

        let mut ids = HashSet::with_capacity(messages.len());
        let mut deduped: Vec<Message> = messages
            .into_iter()
            .filter(|m| ids.insert(m.id.clone()))
            .collect();
        deduped.sort_by_key(|m| m.created_at);

        // Anything inserted before the seed (early realtime events) survives.
        for early in std::mem::take(&mut self.messages) {
            if ids.insert(early.id.clone()) {
                let at = deduped.partition_point(|m| m.created_at <= early.created_at);
                deduped.insert(at, early);
            }
        }

        let count = deduped.len();
        self.messages = deduped;
        self.ids = ids;
        self.seeded = true;
        count
    }

    /// Point-in-time copy of the timeline.
    pub fn all(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }
}

/// Sort and dedup a standalone batch without touching any timeline.
pub fn normalize(messages: Vec<Message>) -> Vec<Message> {
    let mut scratch = Timeline::new();
    scratch.replace_all(messages);
    scratch.messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn msg(id: &str, created_at: &str, content: &str) -> Message {
        Message::from_event(json!({
            "id": id,
            "chat_id": "c1",
            "content": content,
            "role": "user",
            "created_at": created_at,
        }))
        .unwrap()
    }

    fn ids(timeline: &Timeline) -> Vec<String> {
        timeline.all().into_iter().map(|m| m.id).collect()
    }

    fn assert_invariants(timeline: &Timeline) {
        let all = timeline.all();
        for pair in all.windows(2) {
            assert!(pair[0].created_at <= pair[1].created_at);
        }
        let unique: HashSet<_> = all.iter().map(|m| m.id.clone()).collect();
        assert_eq!(unique.len(), all.len());
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut timeline = Timeline::new();
        assert!(timeline.insert(msg("b", "2024-01-01T10:00:02Z", "")));
        assert!(timeline.insert(msg("a", "2024-01-01T10:00:01Z", "")));
        assert!(timeline.insert(msg("c", "2024-01-01T10:00:03Z", "")));
        assert_eq!(ids(&timeline), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_equal_timestamps_append_after() {
        let mut timeline = Timeline::new();
        timeline.insert(msg("first", "2024-01-01T10:00:00Z", ""));
        timeline.insert(msg("later", "2024-01-01T10:00:05Z", ""));
        timeline.insert(msg("second", "2024-01-01T10:00:00Z", ""));
        assert_eq!(ids(&timeline), vec!["first", "second", "later"]);
    }

    #[test]
    fn test_duplicate_insert_is_noop() {
        let mut timeline = Timeline::new();
        assert!(timeline.insert(msg("x", "2024-01-01T10:00:00Z", "original")));
        assert!(!timeline.insert(msg("x", "2024-01-01T09:00:00Z", "changed")));

        let all = timeline.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].content, "original");
    }

    #[test]
    fn test_mixed_sequence_invariants() {
        let stamps = [
            "2024-01-01T10:00:05Z",
            "2024-01-01 10:00:01",
            "2024-01-01T10:00:03.500+00:00",
            "2024-01-01",
            "2024-01-01T10:00:05Z",
            "2024-01-01T11:00Z",
        ];
        let mut timeline = Timeline::new();
        for round in 0..3 {
            for (i, stamp) in stamps.iter().enumerate() {
                timeline.insert(msg(&format!("m{}", (i + round) % 4), stamp, ""));
                assert_invariants(&timeline);
            }
        }
        assert_eq!(timeline.len(), 4);
    }

    #[test]
    fn test_replace_all_sorts_and_dedups() {
        let mut timeline = Timeline::new();
        let count = timeline.replace_all(vec![
            msg("c", "2024-01-01T10:00:03Z", ""),
            msg("a", "2024-01-01T10:00:01Z", "first"),
            msg("b", "2024-01-01T10:00:02Z", ""),
            msg("a", "2024-01-01T10:00:09Z", "dup"),
        ]);

        assert_eq!(count, 3);
        assert_eq!(ids(&timeline), vec!["a", "b", "c"]);
        assert_eq!(timeline.all()[0].content, "first");
        assert!(timeline.is_seeded());
    }

    #[test]
    fn test_replace_all_then_present_inserts_is_unchanged() {
        let history = vec![
            msg("a", "2024-01-01T10:00:01Z", ""),
            msg("b", "2024-01-01T10:00:02Z", ""),
        ];
        let mut reference = Timeline::new();
        reference.replace_all(history.clone());

        let mut timeline = Timeline::new();
        timeline.replace_all(history);
        timeline.insert(msg("b", "2024-01-01T12:00:00Z", "echo"));
        timeline.insert(msg("a", "2024-01-01T00:00:00Z", "echo"));

        assert_eq!(ids(&timeline), ids(&reference));
        assert!(timeline.all().iter().all(|m| m.content.is_empty()));
    }

    #[test]
    fn test_second_replace_all_merges() {
        let mut timeline = Timeline::new();
        timeline.replace_all(vec![msg("a", "2024-01-01T10:00:01Z", "")]);
        timeline.insert(msg("live", "2024-01-01T10:00:05Z", ""));

        let added = timeline.replace_all(vec![
            msg("a", "2024-01-01T10:00:01Z", ""),
            msg("b", "2024-01-01T10:00:02Z", ""),
        ]);

        assert_eq!(added, 1);
        assert_eq!(ids(&timeline), vec!["a", "b", "live"]);
    }

    #[test]
    fn test_early_inserts_survive_seed() {
        let mut timeline = Timeline::new();
        timeline.insert(msg("live", "2024-01-01T10:00:02Z", ""));
        timeline.replace_all(vec![
            msg("a", "2024-01-01T10:00:01Z", ""),
            msg("live", "2024-01-01T10:00:02Z", ""),
            msg("c", "2024-01-01T10:00:03Z", ""),
        ]);
        assert_eq!(ids(&timeline), vec!["a", "live", "c"]);
        assert_invariants(&timeline);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut timeline = Timeline::new();
        timeline.insert(msg("a", "2024-01-01T10:00:01Z", ""));
        let snapshot = timeline.all();
        timeline.insert(msg("b", "2024-01-01T10:00:02Z", ""));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(timeline.len(), 2);
    }

    #[test]
    fn test_normalize() {
        let out = normalize(vec![
            msg("b", "2024-01-01T10:00:02Z", ""),
            msg("a", "2024-01-01T10:00:01Z", ""),
            msg("b", "2024-01-01T10:00:02Z", ""),
        ]);
        let ids: Vec<_> = out.into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
