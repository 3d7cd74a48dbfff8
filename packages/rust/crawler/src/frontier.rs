//! Deduplicating FIFO queue of URLs to visit.

use std::collections::{HashSet, VecDeque};

use url::Url;

/// Pending URLs plus every URL ever enqueued.
///
/// A URL enters `pending` at most once for the lifetime of the frontier;
/// `visited` only grows.
#[derive(Debug, Default)]
pub struct Frontier {
    visited: HashSet<String>,
    pending: VecDeque<Url>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `url` unless it has been seen before. Returns `true` if it was added.
    pub fn add(&mut self, url: Url) -> bool {
        if !self.visited.insert(url.as_str().to_owned()) {
            return false;
        }
        self.pending.push_back(url);
        true
    }

    /// Pop the oldest pending URL.
    pub fn next(&mut self) -> Option<Url> {
        self.pending.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of URLs still waiting.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Number of distinct URLs ever enqueued.
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn fifo_order() {
        let mut f = Frontier::new();
        f.add(u("https://a.com/1"));
        f.add(u("https://a.com/2"));
        f.add(u("https://a.com/3"));

        let order: Vec<String> = std::iter::from_fn(|| f.next())
            .map(|u| u.path().to_string())
            .collect();
        assert_eq!(order, ["/1", "/2", "/3"]);
        assert!(f.is_empty());
        assert!(f.next().is_none());
    }

    #[test]
    fn never_yields_a_url_twice() {
        let mut f = Frontier::new();
        assert!(f.add(u("https://a.com/x")));
        assert!(!f.add(u("https://a.com/x")));
        assert_eq!(f.len(), 1);

        assert_eq!(f.next().unwrap().as_str(), "https://a.com/x");
        // re-adding after it was popped is still a no-op
        assert!(!f.add(u("https://a.com/x")));
        assert!(f.next().is_none());
        assert_eq!(f.visited_count(), 1);
    }

    #[test]
    fn interleaved_adds_keep_breadth_first_order() {
        let mut f = Frontier::new();
        f.add(u("https://a.com/"));

        let root = f.next().unwrap();
        f.add(root.join("a").unwrap());
        f.add(root.join("b").unwrap());

        let a = f.next().unwrap();
        f.add(a.join("c").unwrap());
        f.add(a.join("b").unwrap());

        assert_eq!(f.next().unwrap().path(), "/b");
        assert_eq!(f.next().unwrap().path(), "/c");
        assert!(f.is_empty());
        assert_eq!(f.visited_count(), 4);
    }
}
