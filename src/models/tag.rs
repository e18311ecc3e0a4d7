//! Tag model and the shared selected-tag set.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

/// A normalized tag label: trimmed, lowercased, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Normalize raw input into a tag. Blank input yields `None`.
    pub fn new(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Tag(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Tag projection used in remote payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub tag_name: String,
}

impl From<&Tag> for TagRef {
    fn from(tag: &Tag) -> Self {
        Self {
            tag_name: tag.0.clone(),
        }
    }
}

/// A tag as returned by the remote lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct TagLabel {
    pub label: String,
}

/// Ordered, duplicate-free tag selection owned by a form.
///
/// Cloning yields another handle onto the same selection, so the form and the
/// tag selector it embeds observe the same tags.
#[derive(Debug, Clone, Default)]
pub struct SelectedTags {
    inner: Arc<RwLock<Vec<Tag>>>,
}

impl SelectedTags {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Tag>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Tag>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current selection in insertion order.
    pub fn snapshot(&self) -> Vec<Tag> {
        self.read().clone()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.read().iter().any(|t| t.as_str() == label)
    }

    /// Append a tag unless already present. Returns true when appended.
    pub fn add(&self, tag: Tag) -> bool {
        let mut tags = self.write();
        if tags.contains(&tag) {
            return false;
        }
        tags.push(tag);
        true
    }

    /// Remove the exact tag. Returns true when something was removed.
    pub fn remove(&self, label: &str) -> bool {
        let mut tags = self.write();
        let before = tags.len();
        tags.retain(|t| t.as_str() != label);
        tags.len() != before
    }

    /// Remove and return the most recently added tag.
    pub fn pop(&self) -> Option<Tag> {
        self.write().pop()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Wire projection of the selection.
    pub fn to_refs(&self) -> Vec<TagRef> {
        self.read().iter().map(TagRef::from).collect()
    }
}
