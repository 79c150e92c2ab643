//! Conversation memory scoped per session.
//!
//! Each session holds a bounded deque of turns behind its own mutex. The lock
//! is only held to snapshot history or record a finished turn, never across
//! the model call, so concurrent requests on one session overlap. Turns are
//! recorded in completion order.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info};

/// Session used when a request does not name one.
pub const DEFAULT_SESSION: &str = "default";

/// Longest session identifier accepted from clients.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// One prompt/response exchange.
#[derive(Debug, Clone)]
pub struct Turn {
    pub input: String,
    pub output: String,
}

#[derive(Debug)]
pub struct Conversation {
    turns: VecDeque<Turn>,
    max_turns: usize,
    last_active: DateTime<Utc>,
    in_flight: usize,
    cleared: bool,
}

impl Conversation {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns,
            last_active: Utc::now(),
            in_flight: 0,
            cleared: false,
        }
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Records a turn, dropping the oldest ones past the limit.
    pub fn push(&mut self, input: String, output: String) {
        self.turns.push_back(Turn { input, output });
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
        self.last_active = Utc::now();
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    /// Renders prior turns as `Human:` / `AI:` lines. Empty when there is no history.
    pub fn render(&self) -> String {
        self.turns()
            .map(|t| format!("Human: {}\nAI: {}", t.input, t.output))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn lock(conversation: &Mutex<Conversation>) -> MutexGuard<'_, Conversation> {
    conversation
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A turn that has read its session's history and has not been recorded yet.
///
/// Dropping it without calling [`ConversationStore::record_turn`] abandons the
/// turn and nothing is stored.
#[derive(Debug)]
pub struct PendingTurn {
    session_id: String,
    conversation: Arc<Mutex<Conversation>>,
    history: String,
    finished: bool,
}

impl PendingTurn {
    /// History rendered when the turn began.
    pub fn history(&self) -> &str {
        &self.history
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            let mut conversation = lock(&self.conversation);
            conversation.in_flight = conversation.in_flight.saturating_sub(1);
        }
    }
}

impl Drop for PendingTurn {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Outcome of recording a finished turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// Stored; carries the session's turn count afterwards.
    Stored(usize),
    /// The session was cleared while the turn was in flight, so it was dropped.
    Discarded,
}

/// Process-wide store of conversations keyed by session id.
#[derive(Clone)]
pub struct ConversationStore {
    sessions: Arc<DashMap<String, Arc<Mutex<Conversation>>>>,
    max_turns: usize,
    max_sessions: usize,
}

impl ConversationStore {
    pub fn new(max_turns: usize, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            max_turns,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Returns the conversation for `session_id`, creating it if needed.
    fn session(&self, session_id: &str) -> Arc<Mutex<Conversation>> {
        if let Some(existing) = self.sessions.get(session_id) {
            return Arc::clone(existing.value());
        }

        if self.sessions.len() >= self.max_sessions {
            self.evict_least_recent();
        }

        let max_turns = self.max_turns;
        let entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Conversation::new(max_turns))));
        Arc::clone(entry.value())
    }

    /// Snapshots the session's history and marks a turn as in flight.
    pub fn begin_turn(&self, session_id: &str) -> PendingTurn {
        let conversation = self.session(session_id);
        let history = {
            let mut guard = lock(&conversation);
            if guard.is_empty() {
                debug!("Starting new conversation for session '{session_id}'");
            }
            guard.in_flight += 1;
            guard.touch();
            guard.render()
        };

        PendingTurn {
            session_id: session_id.to_string(),
            conversation,
            history,
            finished: false,
        }
    }

    /// Appends a finished turn to its session.
    ///
    /// A session cleared after the turn began discards it. A session evicted
    /// in the meantime is restored so the turn is not lost.
    pub fn record_turn(
        &self,
        mut pending: PendingTurn,
        input: String,
        output: String,
    ) -> Recorded {
        pending.finish();

        let current = {
            let entry = self
                .sessions
                .entry(pending.session_id.clone())
                .or_insert_with(|| Arc::clone(&pending.conversation));
            Arc::clone(entry.value())
        };

        if !Arc::ptr_eq(&current, &pending.conversation) && lock(&pending.conversation).cleared {
            debug!(
                "Session '{}' was cleared during the turn; not recording it",
                pending.session_id
            );
            return Recorded::Discarded;
        }

        let mut conversation = lock(&current);
        if conversation.cleared {
            drop(conversation);
            self.sessions
                .remove_if(&pending.session_id, |_, c| Arc::ptr_eq(c, &current));
            debug!(
                "Session '{}' was cleared during the turn; not recording it",
                pending.session_id
            );
            return Recorded::Discarded;
        }
        conversation.push(input, output);
        Recorded::Stored(conversation.len())
    }

    /// Drops one session's history. Returns whether it existed.
    pub fn clear_session(&self, session_id: &str) -> bool {
        let removed = match self.sessions.remove(session_id) {
            Some((_, conversation)) => {
                lock(&conversation).cleared = true;
                true
            }
            None => false,
        };
        debug!("Cleared session '{session_id}' (existed: {removed})");
        removed
    }

    /// Drops every session's history. Returns how many sessions were removed.
    pub fn clear_all(&self) -> usize {
        let keys: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        let count = keys
            .iter()
            .filter(|key| self.clear_session(key.as_str()))
            .count();
        info!("Cleared conversation memory for {count} session(s)");
        count
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Removes the idle session that was active longest ago. Sessions with a
    /// turn in flight are skipped.
    fn evict_least_recent(&self) {
        let oldest = self
            .sessions
            .iter()
            .filter_map(|entry| {
                let conversation = entry.value().try_lock().ok()?;
                if conversation.in_flight > 0 {
                    return None;
                }
                Some((entry.key().clone(), conversation.last_active))
            })
            .min_by_key(|(_, last_active)| *last_active)
            .map(|(key, _)| key);

        if let Some(key) = oldest {
            self.sessions.remove(&key);
            debug!("Evicted idle session '{key}'");
        }
    }
}

/// Normalizes a client-supplied session id; blank or absent means the default session.
pub fn normalize_session_id(raw: Option<&str>) -> Result<String, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(DEFAULT_SESSION.to_string()),
        Some(id) if id.len() > MAX_SESSION_ID_LEN => Err(format!(
            "session_id must be at most {MAX_SESSION_ID_LEN} characters"
        )),
        Some(id) => Ok(id.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(store: &ConversationStore, session_id: &str, input: &str, output: &str) {
        let pending = store.begin_turn(session_id);
        store.record_turn(pending, input.into(), output.into());
    }

    fn turn_count(store: &ConversationStore, session_id: &str) -> usize {
        store
            .sessions
            .get(session_id)
            .map(|c| lock(c.value()).len())
            .unwrap_or(0)
    }

    #[test]
    fn test_empty_conversation_renders_empty_history() {
        let conversation = Conversation::new(5);
        assert_eq!(conversation.render(), "");
        assert!(conversation.is_empty());
    }

    #[test]
    fn test_render_lists_turns_oldest_first() {
        let mut conversation = Conversation::new(5);
        conversation.push("first question".into(), "first answer".into());
        conversation.push("second question".into(), "second answer".into());

        assert_eq!(
            conversation.render(),
            "Human: first question\nAI: first answer\nHuman: second question\nAI: second answer"
        );
    }

    #[test]
    fn test_push_drops_oldest_turn_past_limit() {
        let mut conversation = Conversation::new(2);
        conversation.push("q1".into(), "a1".into());
        conversation.push("q2".into(), "a2".into());
        conversation.push("q3".into(), "a3".into());

        let inputs: Vec<_> = conversation.turns().map(|t| t.input.as_str()).collect();
        assert_eq!(inputs, vec!["q2", "q3"]);
        assert_eq!(conversation.len(), 2);
    }

    #[test]
    fn test_begin_turn_snapshots_history() {
        let store = ConversationStore::new(10, 10);
        record(&store, "alice", "q1", "a1");

        let pending = store.begin_turn("alice");
        assert_eq!(pending.history(), "Human: q1\nAI: a1");
        assert_eq!(
            store.record_turn(pending, "q2".into(), "a2".into()),
            Recorded::Stored(2)
        );
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = ConversationStore::new(10, 10);
        record(&store, "alice", "alice resume", "alice result");

        assert_eq!(store.begin_turn("bob").history(), "");
        assert_eq!(turn_count(&store, "alice"), 1);
    }

    #[test]
    fn test_overlapping_turns_on_one_session_are_both_recorded() {
        let store = ConversationStore::new(10, 10);
        let first = store.begin_turn(DEFAULT_SESSION);
        let second = store.begin_turn(DEFAULT_SESSION);

        assert_eq!(
            store.record_turn(second, "q2".into(), "a2".into()),
            Recorded::Stored(1)
        );
        assert_eq!(
            store.record_turn(first, "q1".into(), "a1".into()),
            Recorded::Stored(2)
        );
    }

    #[test]
    fn test_clear_session_leaves_others_intact() {
        let store = ConversationStore::new(10, 10);
        record(&store, "a", "q", "r");
        record(&store, "b", "q", "r");

        assert!(store.clear_session("a"));
        assert!(!store.clear_session("a"));

        assert_eq!(store.begin_turn("a").history(), "");
        assert_eq!(turn_count(&store, "b"), 1);
    }

    #[test]
    fn test_clear_all_removes_every_session() {
        let store = ConversationStore::new(10, 10);
        record(&store, "a", "q", "r");
        record(&store, DEFAULT_SESSION, "q", "r");

        assert_eq!(store.clear_all(), 2);
        assert_eq!(store.session_count(), 0);
        assert_eq!(store.begin_turn(DEFAULT_SESSION).history(), "");
    }

    #[test]
    fn test_turn_in_flight_during_clear_is_discarded() {
        let store = ConversationStore::new(10, 10);
        let pending = store.begin_turn("a");

        store.clear_session("a");

        assert_eq!(
            store.record_turn(pending, "q".into(), "r".into()),
            Recorded::Discarded
        );
        assert_eq!(turn_count(&store, "a"), 0);
        assert_eq!(store.begin_turn("a").history(), "");
    }

    #[test]
    fn test_turn_in_flight_during_clear_all_is_discarded() {
        let store = ConversationStore::new(10, 10);
        let pending = store.begin_turn(DEFAULT_SESSION);

        store.clear_all();
        // A new turn recreates the session before the old one finishes.
        let fresh = store.begin_turn(DEFAULT_SESSION);

        assert_eq!(
            store.record_turn(pending, "stale".into(), "r".into()),
            Recorded::Discarded
        );
        assert_eq!(
            store.record_turn(fresh, "q".into(), "r".into()),
            Recorded::Stored(1)
        );
    }

    #[test]
    fn test_session_cap_evicts_least_recently_active() {
        let store = ConversationStore::new(10, 2);
        record(&store, "old", "q", "r");
        std::thread::sleep(std::time::Duration::from_millis(5));
        record(&store, "new", "q", "r");

        drop(store.begin_turn("newest"));

        assert_eq!(store.session_count(), 2);
        assert!(store.sessions.contains_key("new"));
        assert!(store.sessions.contains_key("newest"));
        assert!(!store.sessions.contains_key("old"));
    }

    #[test]
    fn test_session_with_turn_in_flight_is_not_evicted() {
        let store = ConversationStore::new(10, 1);
        let busy = store.begin_turn("busy");

        drop(store.begin_turn("other"));

        assert!(store.sessions.contains_key("busy"));
        drop(busy);
    }

    #[test]
    fn test_evicted_session_is_restored_when_its_turn_finishes() {
        let store = ConversationStore::new(10, 1);
        record(&store, "a", "q1", "r1");
        let pending = store.begin_turn("a");
        // Force the in-flight session out, as a full store under pressure would.
        store.sessions.remove("a");

        assert_eq!(
            store.record_turn(pending, "q2".into(), "r2".into()),
            Recorded::Stored(2)
        );
        assert_eq!(turn_count(&store, "a"), 2);
    }

    #[test]
    fn test_abandoned_turn_releases_session_for_eviction() {
        let store = ConversationStore::new(10, 1);
        drop(store.begin_turn("a"));

        drop(store.begin_turn("b"));

        assert!(!store.sessions.contains_key("a"));
        assert!(store.sessions.contains_key("b"));
    }

    #[test]
    fn test_normalize_session_id() {
        assert_eq!(normalize_session_id(None).unwrap(), DEFAULT_SESSION);
        assert_eq!(normalize_session_id(Some("   ")).unwrap(), DEFAULT_SESSION);
        assert_eq!(normalize_session_id(Some(" abc ")).unwrap(), "abc");
        assert!(normalize_session_id(Some(&"x".repeat(MAX_SESSION_ID_LEN + 1))).is_err());
    }
}
