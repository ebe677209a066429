//! Append-only log buffers for streamed operations.

use std::collections::VecDeque;

use crate::stream::LogEntry;

/// Cap for the long-lived general deployment tail. Per-operation buffers are
/// uncapped because operations are bounded in duration.
pub const GENERAL_LOG_CAP: usize = 1000;

/// Ordered log entries for one operation. Entries are only ever appended or
/// cleared wholesale; duplicates are acceptable.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    cap: Option<usize>,
}

impl LogBuffer {
    /// Uncapped buffer for short-lived per-operation logs.
    pub fn new() -> Self {
        LogBuffer::default()
    }

    /// Capped buffer that drops its oldest entries past `cap`.
    pub fn capped(cap: usize) -> Self {
        LogBuffer {
            entries: VecDeque::new(),
            cap: Some(cap),
        }
    }

    /// Append an entry, returning how many old entries were dropped to stay
    /// under the cap (callers use this to shift pinned scroll offsets).
    pub fn append(&mut self, entry: LogEntry) -> usize {
        self.entries.push_back(entry);
        let mut dropped = 0;
        if let Some(cap) = self.cap {
            while self.entries.len() > cap {
                self.entries.pop_front();
                dropped += 1;
            }
        }
        dropped
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    /// Messages in insertion order.
    pub fn messages(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.message.clone()).collect()
    }

    /// Non-mutating filtered view for presentation; the underlying buffer
    /// keeps every entry.
    pub fn visible<'a, F>(&'a self, predicate: F) -> impl Iterator<Item = &'a LogEntry>
    where
        F: Fn(&LogEntry) -> bool + 'a,
    {
        self.entries.iter().filter(move |e| predicate(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(message: &str) -> LogEntry {
        LogEntry::plain(message)
    }

    #[test]
    fn append_preserves_insertion_order() {
        let mut buffer = LogBuffer::new();
        buffer.append(entry("one"));
        buffer.append(entry("two"));
        buffer.append(entry("one"));
        assert_eq!(buffer.messages(), vec!["one", "two", "one"]);
    }

    #[test]
    fn uncapped_buffer_never_drops() {
        let mut buffer = LogBuffer::new();
        for i in 0..2000 {
            assert_eq!(buffer.append(entry(&format!("line {i}"))), 0);
        }
        assert_eq!(buffer.len(), 2000);
    }

    #[test]
    fn capped_buffer_drops_oldest() {
        let mut buffer = LogBuffer::capped(3);
        buffer.append(entry("a"));
        buffer.append(entry("b"));
        buffer.append(entry("c"));
        let dropped = buffer.append(entry("d"));
        assert_eq!(dropped, 1);
        assert_eq!(buffer.messages(), vec!["b", "c", "d"]);
    }

    #[test]
    fn clear_empties_buffer() {
        let mut buffer = LogBuffer::capped(10);
        buffer.append(entry("a"));
        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn visible_filter_does_not_mutate() {
        let mut buffer = LogBuffer::new();
        buffer.append(entry("keep"));
        buffer.append(entry("noise"));
        buffer.append(entry("keep"));

        let shown: Vec<_> = buffer
            .visible(|e| e.message == "keep")
            .map(|e| e.message.clone())
            .collect();
        assert_eq!(shown, vec!["keep", "keep"]);
        // Storage is untouched by the view.
        assert_eq!(buffer.len(), 3);
    }
}
