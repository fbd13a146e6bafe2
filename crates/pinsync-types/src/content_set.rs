use std::collections::hash_set;
use std::collections::HashSet;

use crate::content_id::ContentId;

/// Snapshot of the identifiers a backend reports as retained.
///
/// Built once per `list` call and never mutated afterwards; membership tests
/// are constant time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentSet {
    ids: HashSet<ContentId>,
}

impl ContentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &ContentId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> hash_set::Iter<'_, ContentId> {
        self.ids.iter()
    }

    /// Identifiers in ascending order, for stable display.
    pub fn sorted(&self) -> Vec<ContentId> {
        let mut ids: Vec<ContentId> = self.ids.iter().cloned().collect();
        ids.sort();
        ids
    }
}

impl FromIterator<ContentId> for ContentSet {
    fn from_iter<I: IntoIterator<Item = ContentId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ContentSet {
    type Item = ContentId;
    type IntoIter = hash_set::IntoIter<ContentId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.into_iter()
    }
}

impl<'a> IntoIterator for &'a ContentSet {
    type Item = &'a ContentId;
    type IntoIter = hash_set::Iter<'a, ContentId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}
