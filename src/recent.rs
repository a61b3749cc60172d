//! Duplicate-answer suppression cache (spec.md §3, §4.5, §5).
//!
//! The original hashes the serialized message with MD5 (spec.md §9); this
//! crate uses `std::collections::hash_map::DefaultHasher` instead — spec.md
//! §9 explicitly allows "any strong non-cryptographic hash ... the value is
//! never security-sensitive" — avoiding a dependency the teacher never
//! carried for a value that is discarded after `RECENT_MESSAGE_WINDOW`.

use crate::cfg::RECENT_MESSAGE_WINDOW;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct RecentMessages {
    window: Duration,
    seen: Mutex<HashMap<u64, Instant>>,
}

impl RecentMessages {
    pub fn new(window: Duration) -> RecentMessages {
        RecentMessages {
            window,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if `bytes` was not seen within the window (and
    /// records it as seen now); `false` if it is a duplicate. Entries
    /// older than the window are pruned on every call (spec.md §5).
    pub fn try_add(&self, bytes: &[u8]) -> bool {
        let hash = hash_bytes(bytes);
        let now = Instant::now();

        let mut seen = self.seen.lock().unwrap();
        seen.retain(|_, seen_at| now.duration_since(*seen_at) < self.window);

        if seen.contains_key(&hash) {
            false
        } else {
            seen.insert(hash, now);
            true
        }
    }
}

impl Default for RecentMessages {
    fn default() -> Self {
        RecentMessages::new(RECENT_MESSAGE_WINDOW)
    }
}

fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_send_is_never_a_duplicate() {
        let recent = RecentMessages::new(Duration::from_secs(1));
        assert!(recent.try_add(b"hello"));
    }

    #[test]
    fn repeat_within_window_is_suppressed() {
        let recent = RecentMessages::new(Duration::from_secs(1));
        assert!(recent.try_add(b"hello"));
        assert!(!recent.try_add(b"hello"));
    }

    #[test]
    fn distinct_messages_do_not_collide() {
        let recent = RecentMessages::new(Duration::from_secs(1));
        assert!(recent.try_add(b"hello"));
        assert!(recent.try_add(b"world"));
    }
}
