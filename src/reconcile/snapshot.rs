use std::collections::HashSet;

use crate::object_store::StorageObject;

/// Keys present in the bucket at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotSet {
    keys: HashSet<String>,
}

impl SnapshotSet {
    pub fn capture(objects: &[StorageObject]) -> Self {
        Self {
            keys: objects.iter().map(|object| object.key.clone()).collect(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SnapshotSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Objects of `after` whose key was not in `before`, each key at most once,
/// in `after` order.
///
/// `after` need not contain `before`: keys deleted in between are simply absent.
pub fn diff(before: &SnapshotSet, after: &[StorageObject]) -> Vec<StorageObject> {
    let mut emitted: HashSet<&str> = HashSet::with_capacity(after.len());
    after
        .iter()
        .filter(|object| !before.contains(&object.key) && emitted.insert(object.key.as_str()))
        .cloned()
        .collect()
}
