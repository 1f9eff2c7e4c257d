//! Document paths (`products/012345/prices/A`).

use core::str::FromStr;

use stripmarket_core::check_key;

use crate::error::StoreError;

/// Validated path into the document tree.
///
/// The empty path addresses the whole tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl DocumentPath {
    /// The whole tree.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a `/`-separated path. Leading/trailing separators are ignored and
    /// each segment is trimmed.
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let mut out = Self::root();
        for raw in path.split('/').filter(|s| !s.trim().is_empty()) {
            out = out.child(raw.trim())?;
        }
        Ok(out)
    }

    /// Path of a direct child. The key is used as given.
    pub fn child(&self, key: impl AsRef<str>) -> Result<Self, StoreError> {
        let key = check_key("path segment", key.as_ref())
            .map_err(|e| StoreError::InvalidPath(e.to_string()))?;
        let mut segments = self.segments.clone();
        segments.push(key.to_string());
        Ok(Self { segments })
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    /// Last segment (the key of this node inside its parent).
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether `self` equals `other` or is one of its ancestors.
    pub fn is_prefix_of(&self, other: &DocumentPath) -> bool {
        other.segments.len() >= self.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    /// Whether a write at `self` can change the subtree at `other` (or vice versa).
    pub fn overlaps(&self, other: &DocumentPath) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }
}

impl core::fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl FromStr for DocumentPath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
