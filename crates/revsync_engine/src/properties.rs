//! The pending user-property buffer.

use parking_lot::Mutex;
use revsync_protocol::{KnownProperty, PropertySet};
use tracing::warn;

/// Accumulates pending user-property writes, deduplicated by key.
///
/// Any caller may write (explicit API calls, attribution forwarding,
/// automatic tracking); at most one writer mutates the set at a time and
/// readers see a consistent snapshot. The buffer is drained atomically at
/// flush start: a write that arrives while a flush is in flight lands in
/// the fresh buffer and rides the following tick.
#[derive(Debug, Default)]
pub struct PropertyBuffer {
    pending: Mutex<PropertySet>,
}

impl PropertyBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers a free-form property write. Empty keys are ignored.
    pub fn set(&self, key: &str, value: &str) {
        if key.is_empty() {
            warn!("ignoring property write with empty key");
            return;
        }
        self.pending.lock().insert(key, value);
    }

    /// Buffers a write to a well-known property.
    pub fn set_known(&self, property: KnownProperty, value: &str) {
        self.pending.lock().insert(property.code(), value);
    }

    /// Returns the number of distinct pending keys.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Returns true if no writes are pending.
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Takes the entire pending set, leaving the buffer empty.
    pub fn drain(&self) -> PropertySet {
        std::mem::take(&mut *self.pending.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn dedup_last_write_wins() {
        let buffer = PropertyBuffer::new();
        buffer.set("a", "1");
        buffer.set("a", "2");

        let drained = buffer.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained.get("a"), Some("2"));
    }

    #[test]
    fn drain_leaves_buffer_empty() {
        let buffer = PropertyBuffer::new();
        buffer.set("a", "1");

        let drained = buffer.drain();
        assert_eq!(drained.len(), 1);
        assert!(buffer.is_empty());

        // A write after the drain belongs to the next batch.
        buffer.set("b", "2");
        let next = buffer.drain();
        assert_eq!(next.get("b"), Some("2"));
        assert_eq!(next.get("a"), None);
    }

    #[test]
    fn empty_key_is_ignored() {
        let buffer = PropertyBuffer::new();
        buffer.set("", "x");
        assert!(buffer.is_empty());
    }

    #[test]
    fn known_property_uses_its_code() {
        let buffer = PropertyBuffer::new();
        buffer.set_known(KnownProperty::UserId, "user-7");

        let drained = buffer.drain();
        assert_eq!(drained.get(KnownProperty::UserId.code()), Some("user-7"));
    }

    #[test]
    fn concurrent_distinct_writes_all_present() {
        let buffer = Arc::new(PropertyBuffer::new());
        let mut handles = Vec::new();

        for i in 0..16 {
            let buffer = Arc::clone(&buffer);
            handles.push(std::thread::spawn(move || {
                buffer.set(&format!("key-{i}"), &format!("value-{i}"));
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let drained = buffer.drain();
        assert_eq!(drained.len(), 16);
        for i in 0..16 {
            assert_eq!(
                drained.get(&format!("key-{i}")),
                Some(format!("value-{i}").as_str())
            );
        }
    }
}
