//! Bounded per-session conversation history.
//!
//! Each session keeps at most `2 * max_history` turns, oldest dropped first.
//! Sessions are created lazily, purged after `ttl` of inactivity, and the
//! least recently used session is evicted once more than `max_sessions`
//! exist.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

struct Session {
    turns: VecDeque<Turn>,
    last_access: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            turns: VecDeque::new(),
            last_access: Instant::now(),
        }
    }
}

/// In-memory conversation history keyed by session id.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
    max_turns: usize,
    ttl: Duration,
    max_sessions: usize,
}

impl SessionStore {
    /// `max_history` counts exchanges (a user turn plus an assistant turn).
    pub fn new(max_history: usize, ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_turns: max_history * 2,
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Start a new, empty session and return its id.
    pub fn create_session(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        self.entry(&mut sessions, &id);
        id
    }

    /// Append one turn, dropping the oldest turns beyond the cap.
    pub fn append(&self, session_id: &str, turn: Turn) {
        self.append_all(session_id, [turn]);
    }

    /// Append a user question and the assistant answer as one update, so
    /// concurrent readers never see half an exchange.
    pub fn append_exchange(&self, session_id: &str, question: &str, answer: &str) {
        self.append_all(session_id, [Turn::user(question), Turn::assistant(answer)]);
    }

    fn append_all(&self, session_id: &str, turns: impl IntoIterator<Item = Turn>) {
        // The map lock is held until the turns land, so a concurrent clear or
        // eviction cannot leave them in a detached session.
        {
            let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
            if let Some(session) = sessions.get(session_id) {
                self.push(session, turns);
                return;
            }
        }

        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let session = self.entry(&mut sessions, session_id);
        self.push(&session, turns);
    }

    fn push(&self, session: &Mutex<Session>, turns: impl IntoIterator<Item = Turn>) {
        let mut session = session.lock().unwrap_or_else(|e| e.into_inner());
        if session.last_access.elapsed() > self.ttl {
            session.turns.clear();
        }
        session.turns.extend(turns);
        while session.turns.len() > self.max_turns {
            session.turns.pop_front();
        }
        session.last_access = Instant::now();
    }

    /// The retained turns of a session in chronological order. Unknown or
    /// expired sessions have no history.
    pub fn get(&self, session_id: &str) -> Vec<Turn> {
        let session = {
            let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
            sessions.get(session_id).cloned()
        };
        let Some(session) = session else {
            return Vec::new();
        };

        let mut session = session.lock().unwrap_or_else(|e| e.into_inner());
        if session.last_access.elapsed() > self.ttl {
            session.turns.clear();
        }
        session.last_access = Instant::now();
        session.turns.iter().cloned().collect()
    }

    /// History rendered as `Role: text` lines, or `None` when empty.
    pub fn format_history(&self, session_id: &str) -> Option<String> {
        let turns = self.get(session_id);
        if turns.is_empty() {
            return None;
        }
        Some(
            turns
                .iter()
                .map(|t| format!("{}: {}", t.role.label(), t.content))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    /// Forget a session. Returns whether it existed.
    pub fn clear(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.remove(session_id).is_some()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// The session under `session_id`, created if needed.
    fn entry(&self, sessions: &mut HashMap<String, Arc<Mutex<Session>>>, session_id: &str) -> Arc<Mutex<Session>> {
        if let Some(existing) = sessions.get(session_id) {
            return existing.clone();
        }

        self.purge_expired(sessions);
        if sessions.len() >= self.max_sessions {
            Self::evict_least_recent(sessions);
        }

        let session = Arc::new(Mutex::new(Session::new()));
        sessions.insert(session_id.to_string(), session.clone());
        session
    }

    fn purge_expired(&self, sessions: &mut HashMap<String, Arc<Mutex<Session>>>) {
        let before = sessions.len();
        sessions.retain(|_, s| {
            s.lock()
                .map(|s| s.last_access.elapsed() <= self.ttl)
                .unwrap_or(false)
        });
        if sessions.len() < before {
            debug!("Purged {} idle sessions", before - sessions.len());
        }
    }

    fn evict_least_recent(sessions: &mut HashMap<String, Arc<Mutex<Session>>>) {
        let oldest = sessions
            .iter()
            .filter_map(|(id, s)| s.lock().ok().map(|s| (id.clone(), s.last_access)))
            .min_by_key(|(_, at)| *at)
            .map(|(id, _)| id);

        if let Some(id) = oldest {
            debug!("Evicting least recently used session {}", id);
            sessions.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(2, Duration::from_secs(3600), 100)
    }

    #[test]
    fn test_history_keeps_most_recent_turns() {
        let store = store();
        let id = store.create_session();

        for i in 0..5 {
            store.append_exchange(&id, &format!("q{}", i), &format!("a{}", i));
        }

        let turns = store.get(&id);
        assert_eq!(
            turns,
            vec![
                Turn::user("q3"),
                Turn::assistant("a3"),
                Turn::user("q4"),
                Turn::assistant("a4"),
            ]
        );
    }

    #[test]
    fn test_single_appends_are_capped_too() {
        let store = SessionStore::new(1, Duration::from_secs(3600), 100);
        store.append("s", Turn::user("one"));
        store.append("s", Turn::assistant("two"));
        store.append("s", Turn::user("three"));
        assert_eq!(store.get("s"), vec![Turn::assistant("two"), Turn::user("three")]);
    }

    #[test]
    fn test_unknown_session_is_empty() {
        let store = store();
        assert!(store.get("missing").is_empty());
        assert_eq!(store.format_history("missing"), None);
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn test_format_history() {
        let store = store();
        store.append_exchange("s", "What is MCP?", "A protocol.");
        assert_eq!(
            store.format_history("s").unwrap(),
            "User: What is MCP?\nAssistant: A protocol."
        );
    }

    #[test]
    fn test_clear_and_unique_ids() {
        let store = store();
        let a = store.create_session();
        let b = store.create_session();
        assert_ne!(a, b);
        assert_eq!(store.session_count(), 2);

        store.append_exchange(&a, "q", "a");
        assert!(store.clear(&a));
        assert!(!store.clear(&a));
        assert!(store.get(&a).is_empty());
    }

    #[test]
    fn test_idle_sessions_expire() {
        let store = SessionStore::new(2, Duration::from_millis(20), 100);
        store.append_exchange("s", "q", "a");
        std::thread::sleep(Duration::from_millis(50));
        assert!(store.get("s").is_empty());

        store.append_exchange("old", "q", "a");
        std::thread::sleep(Duration::from_millis(50));
        store.create_session();
        assert_eq!(store.session_count(), 1);
    }

    #[test]
    fn test_append_to_idle_session_starts_fresh() {
        let store = SessionStore::new(2, Duration::from_millis(20), 100);
        store.append_exchange("s", "stale question", "stale answer");
        std::thread::sleep(Duration::from_millis(50));

        store.append_exchange("s", "q", "a");
        assert_eq!(store.get("s"), vec![Turn::user("q"), Turn::assistant("a")]);
    }

    #[test]
    fn test_appends_racing_clears_are_never_lost() {
        let store = Arc::new(SessionStore::new(50, Duration::from_secs(3600), 100));
        let writers: Vec<_> = (0..4)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let id = format!("s{}", i);
                    for j in 0..200 {
                        let question = format!("q{}", j);
                        store.append_exchange(&id, &question, "a");
                        // A clear may run between the append and the read.
                        let turns = store.get(&id);
                        if let Some(last) = turns.iter().rev().find(|t| t.role == Role::User) {
                            assert_eq!(last.content, question);
                        }
                    }
                })
            })
            .collect();
        let clearer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..500 {
                    for i in 0..4 {
                        store.clear(&format!("s{}", i));
                    }
                }
            })
        };
        for handle in writers {
            handle.join().unwrap();
        }
        clearer.join().unwrap();

        for i in 0..4 {
            let id = format!("s{}", i);
            store.append_exchange(&id, "final", "done");
            let turns = store.get(&id);
            assert_eq!(turns.len() % 2, 0);
            assert_eq!(turns[turns.len() - 2], Turn::user("final"));
        }
    }

    #[test]
    fn test_least_recently_used_session_is_evicted() {
        let store = SessionStore::new(2, Duration::from_secs(3600), 2);
        store.append_exchange("first", "q", "a");
        std::thread::sleep(Duration::from_millis(5));
        store.append_exchange("second", "q", "a");
        std::thread::sleep(Duration::from_millis(5));
        store.get("first");

        store.append_exchange("third", "q", "a");
        assert_eq!(store.session_count(), 2);
        assert!(store.get("second").is_empty());
        assert_eq!(store.get("first").len(), 2);
    }

    #[test]
    fn test_concurrent_appends_keep_exchanges_whole() {
        let store = Arc::new(SessionStore::new(50, Duration::from_secs(3600), 100));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for j in 0..5 {
                        store.append_exchange("shared", &format!("q{}-{}", i, j), &format!("a{}-{}", i, j));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let turns = store.get("shared");
        assert_eq!(turns.len(), 80);
        for pair in turns.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
            assert_eq!(pair[0].content[1..], pair[1].content[1..]);
        }
    }
}
