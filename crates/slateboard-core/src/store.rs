//! Ordered, id-keyed element collection.
//!
//! A [`Snapshot`] is immutable: every mutation returns a new snapshot that
//! shares unchanged elements with the old one through `Arc`, so history can
//! retain every prior state cheaply.

use crate::shapes::{Element, ElementId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Immutable ordered sequence of elements. Later elements are drawn on top.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    elements: Arc<Vec<Arc<Element>>>,
}

/// Elements that changed between two snapshots.
#[derive(Debug, Clone, Default)]
pub struct SnapshotDiff {
    /// Elements that are new or whose value changed, in z-order.
    pub upserted: Vec<Arc<Element>>,
    /// Ids present before but not after.
    pub removed: Vec<ElementId>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.upserted.is_empty() && self.removed.is_empty()
    }
}

/// Keep the last occurrence of each id, in the order of those last occurrences.
fn dedupe_keep_last(elements: Vec<Arc<Element>>) -> Vec<Arc<Element>> {
    let last: HashMap<ElementId, usize> = elements.iter().enumerate().map(|(i, e)| (e.id(), i)).collect();
    if last.len() == elements.len() {
        return elements;
    }
    log::debug!("Dropping {} duplicate element ids", elements.len() - last.len());
    elements
        .into_iter()
        .enumerate()
        .filter(|(i, e)| last.get(&e.id()) == Some(i))
        .map(|(_, e)| e)
        .collect()
}

impl Snapshot {
    /// The empty document.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from owned elements. Duplicate ids keep their last value.
    pub fn from_elements(elements: impl IntoIterator<Item = Element>) -> Self {
        Self::from_shared(elements.into_iter().map(Arc::new).collect())
    }

    fn from_shared(elements: Vec<Arc<Element>>) -> Self {
        Self {
            elements: Arc::new(dedupe_keep_last(elements)),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements bottom to top.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Element> + ExactSizeIterator {
        self.elements.iter().map(|e| &**e)
    }

    /// Shared handles, bottom to top.
    pub fn shared(&self) -> &[Arc<Element>] {
        &self.elements
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.get_shared(id).map(|e| &**e)
    }

    pub fn get_shared(&self, id: ElementId) -> Option<&Arc<Element>> {
        self.elements.iter().find(|e| e.id() == id)
    }

    /// Z-order index of an element.
    pub fn position(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id() == id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.position(id).is_some()
    }

    pub fn ids(&self) -> Vec<ElementId> {
        self.elements.iter().map(|e| e.id()).collect()
    }

    /// Owned copy of every element, for export.
    pub fn to_elements(&self) -> Vec<Element> {
        self.iter().cloned().collect()
    }

    /// Append an element on top. An element with the same id is replaced and moved to the top.
    pub fn insert(&self, element: Element) -> Snapshot {
        self.insert_shared(Arc::new(element))
    }

    pub fn insert_shared(&self, element: Arc<Element>) -> Snapshot {
        let id = element.id();
        let mut next: Vec<Arc<Element>> = self.elements.iter().filter(|e| e.id() != id).cloned().collect();
        next.push(element);
        Snapshot {
            elements: Arc::new(next),
        }
    }

    /// Insert an element at a z-order index (clamped to the end).
    pub fn insert_at(&self, index: usize, element: Arc<Element>) -> Snapshot {
        let id = element.id();
        let mut next: Vec<Arc<Element>> = self.elements.iter().filter(|e| e.id() != id).cloned().collect();
        next.insert(index.min(next.len()), element);
        Snapshot {
            elements: Arc::new(next),
        }
    }

    /// Transform exactly one element in place in the z-order. No-op if `id` is absent.
    ///
    /// The patch must keep the element's id; a patch that changes it is ignored.
    pub fn patch(&self, id: ElementId, f: impl FnOnce(&Element) -> Element) -> Snapshot {
        let Some(index) = self.position(id) else {
            log::debug!("Patch skipped, element {id} not found");
            return self.clone();
        };
        let patched = f(&self.elements[index]);
        if patched.id() != id {
            log::warn!("Patch tried to change id of element {id}");
            return self.clone();
        }
        let mut next = self.elements.as_ref().clone();
        next[index] = Arc::new(patched);
        Snapshot {
            elements: Arc::new(next),
        }
    }

    /// Replace several elements by id, keeping their z-order positions. Unknown ids are skipped.
    pub fn patch_many(&self, replacements: impl IntoIterator<Item = Element>) -> Snapshot {
        let mut by_id: HashMap<ElementId, Element> = replacements.into_iter().map(|e| (e.id(), e)).collect();
        if by_id.is_empty() {
            return self.clone();
        }
        let next = self
            .elements
            .iter()
            .map(|e| match by_id.remove(&e.id()) {
                Some(replacement) => Arc::new(replacement),
                None => Arc::clone(e),
            })
            .collect();
        Snapshot {
            elements: Arc::new(next),
        }
    }

    /// Remove every element whose id is in `ids`. Unknown ids are ignored.
    pub fn remove(&self, ids: &[ElementId]) -> Snapshot {
        let ids: HashSet<ElementId> = ids.iter().copied().collect();
        if !self.elements.iter().any(|e| ids.contains(&e.id())) {
            return self.clone();
        }
        Snapshot {
            elements: Arc::new(self.elements.iter().filter(|e| !ids.contains(&e.id())).cloned().collect()),
        }
    }

    /// Swap in a whole new sequence.
    ///
    /// Incoming elements equal to a current one reuse the current handle, so
    /// later diffs only report real changes.
    pub fn replace_all(&self, elements: impl IntoIterator<Item = Element>) -> Snapshot {
        let next = elements
            .into_iter()
            .map(|incoming| match self.get_shared(incoming.id()) {
                Some(existing) if **existing == incoming => Arc::clone(existing),
                _ => Arc::new(incoming),
            })
            .collect();
        Self::from_shared(next)
    }

    /// Move `ids` to the top (or bottom), keeping their relative order.
    pub fn restack(&self, ids: &[ElementId], to_front: bool) -> Snapshot {
        let ids: HashSet<ElementId> = ids.iter().copied().collect();
        let (moved, rest): (Vec<Arc<Element>>, Vec<Arc<Element>>) =
            self.elements.iter().cloned().partition(|e| ids.contains(&e.id()));
        if moved.is_empty() {
            return self.clone();
        }
        let next = if to_front {
            rest.into_iter().chain(moved).collect()
        } else {
            moved.into_iter().chain(rest).collect()
        };
        Snapshot {
            elements: Arc::new(next),
        }
    }

    /// Check if two snapshots share the same underlying sequence.
    pub fn ptr_eq(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.elements, &other.elements)
    }

    /// Changes needed to turn `self` into `newer`.
    pub fn diff(&self, newer: &Snapshot) -> SnapshotDiff {
        if self.ptr_eq(newer) {
            return SnapshotDiff::default();
        }
        let before: HashMap<ElementId, &Arc<Element>> = self.elements.iter().map(|e| (e.id(), e)).collect();
        let after: HashSet<ElementId> = newer.elements.iter().map(|e| e.id()).collect();
        let upserted = newer
            .elements
            .iter()
            .filter(|e| match before.get(&e.id()) {
                Some(old) => !Arc::ptr_eq(old, e) && **old != **e,
                None => true,
            })
            .cloned()
            .collect();
        let removed = self.elements.iter().map(|e| e.id()).filter(|id| !after.contains(id)).collect();
        SnapshotDiff { upserted, removed }
    }

    /// Serialize as an ordered JSON array of tagged element records.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.len() == other.len()
                && self
                    .elements
                    .iter()
                    .zip(other.elements.iter())
                    .all(|(a, b)| Arc::ptr_eq(a, b) || a == b))
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Element>::deserialize(deserializer).map(Snapshot::from_elements)
    }
}
