//! Revision-tagged cache cells.
//!
//! One-shot reads and live snapshots mutate the same in-memory state and may
//! arrive in any order. Every cached entry remembers the store revision it was
//! read at, and only strictly newer data replaces it.

use crate::traits::Revision;

/// A cached value plus the store revision it reflects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    revision: Revision,
    value: T,
}

impl<T> Versioned<T> {
    pub fn new(revision: Revision, value: T) -> Self {
        Self { revision, value }
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    /// Whether data read at `revision` would replace this entry.
    pub fn accepts(&self, revision: Revision) -> bool {
        revision > self.revision
    }

    /// Replace the value if `revision` is newer. Returns whether it was applied.
    pub fn offer(&mut self, revision: Revision, value: T) -> bool {
        if !self.accepts(revision) {
            return false;
        }
        self.revision = revision;
        self.value = value;
        true
    }

    /// Local (optimistic) edit that keeps the current revision.
    ///
    /// A later snapshot from the store still replaces it, which is how a failed
    /// write eventually converges to the remote document.
    pub fn edit(&mut self, f: impl FnOnce(&mut T)) {
        f(&mut self.value);
    }

    /// Record that the store acknowledged a write of the current value.
    pub fn acknowledge(&mut self, revision: Revision) {
        if revision > self.revision {
            self.revision = revision;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_reads_do_not_clobber_newer_pushes() {
        let mut cell = Versioned::new(Revision::new(5), "pushed at 5");

        assert!(!cell.offer(Revision::new(3), "read at 3"));
        assert!(!cell.offer(Revision::new(5), "duplicate delivery"));
        assert_eq!(*cell.value(), "pushed at 5");

        assert!(cell.offer(Revision::new(6), "pushed at 6"));
        assert_eq!(*cell.value(), "pushed at 6");
        assert_eq!(cell.revision(), Revision::new(6));
    }

    #[test]
    fn local_edits_keep_revision_until_acknowledged() {
        let mut cell = Versioned::new(Revision::new(2), vec![0u32; 3]);
        cell.edit(|v| v[1] = 9);
        assert_eq!(cell.revision(), Revision::new(2));

        cell.acknowledge(Revision::new(4));
        assert_eq!(cell.revision(), Revision::new(4));
        cell.acknowledge(Revision::new(1));
        assert_eq!(cell.revision(), Revision::new(4));
        assert_eq!(cell.value(), &vec![0, 9, 0]);
    }
}
