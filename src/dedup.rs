//! In-process deduplication of observed answer names.

use std::collections::HashSet;

use parking_lot::Mutex;

/// Names already seen during this process's lifetime.
///
/// Grows monotonically and is never pruned or persisted. Names are compared
/// exactly as observed on the wire, so `Example.com` and `example.com` are
/// distinct.
#[derive(Debug, Default)]
pub struct AnswerSet {
    seen: Mutex<HashSet<String>>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name`, returning true only the first time it is seen.
    ///
    /// Check and insert happen under one lock, so concurrent callers can
    /// never both observe a name as new.
    pub fn is_new(&self, name: &str) -> bool {
        let mut seen = self.seen.lock();
        if seen.contains(name) {
            return false;
        }
        seen.insert(name.to_string())
    }

    /// Number of distinct names seen.
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn should_report_name_as_new_exactly_once() {
        let set = AnswerSet::new();

        assert!(set.is_new("example.com"));
        assert!(!set.is_new("example.com"));
        assert!(!set.is_new("example.com"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn should_track_names_independently_of_interleaving() {
        let set = AnswerSet::new();
        let stream = ["a.com", "b.com", "a.com", "c.com", "b.com", "a.com"];

        let fresh: Vec<_> = stream.iter().filter(|name| set.is_new(name)).collect();

        assert_eq!(fresh, vec![&"a.com", &"b.com", &"c.com"]);
    }

    #[test]
    fn should_be_case_sensitive() {
        let set = AnswerSet::new();

        assert!(set.is_new("example.com"));
        assert!(set.is_new("Example.com"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn should_start_empty() {
        let set = AnswerSet::new();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn should_admit_one_winner_under_concurrent_callers() {
        let set = Arc::new(AnswerSet::new());
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let set = Arc::clone(&set);
                let winners = Arc::clone(&winners);
                thread::spawn(move || {
                    for _ in 0..100 {
                        if set.is_new("contended.example.com") {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }
}
