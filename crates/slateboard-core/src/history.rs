//! Linear undo/redo over document snapshots.

use crate::store::Snapshot;

/// One point in the history log.
#[derive(Debug, Clone)]
struct Entry {
    /// Document after the step.
    snapshot: Snapshot,
    /// Live document the step was committed on top of.
    ///
    /// Equal to the previous entry's snapshot unless remote edits arrived in between.
    base: Snapshot,
}

/// Snapshot log with a cursor. Starts at a single empty snapshot.
///
/// Committing past the cursor discards the redo branch. The log is unbounded;
/// only [`History::window`] trims it, for persistence.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Entry>,
    cursor: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self {
            entries: vec![Entry {
                snapshot: Snapshot::empty(),
                base: Snapshot::empty(),
            }],
            cursor: 0,
        }
    }

    /// Rebuild a log from stored snapshots. An empty list yields a fresh log;
    /// an out-of-range cursor is clamped to the last snapshot.
    pub fn from_snapshots(snapshots: Vec<Snapshot>, cursor: usize) -> Self {
        if snapshots.is_empty() {
            return Self::new();
        }
        let mut entries = Vec::with_capacity(snapshots.len());
        let mut previous = Snapshot::empty();
        for snapshot in snapshots {
            entries.push(Entry {
                snapshot: snapshot.clone(),
                base: previous,
            });
            previous = snapshot;
        }
        let last = entries.len() - 1;
        if cursor > last {
            log::warn!("History cursor {cursor} out of range, clamping to {last}");
        }
        Self {
            entries,
            cursor: cursor.min(last),
        }
    }

    /// Snapshot at the cursor.
    pub fn current(&self) -> &Snapshot {
        &self.entries[self.cursor].snapshot
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Record `snapshot` as the next step after the current one.
    pub fn commit(&mut self, snapshot: Snapshot) {
        let base = self.current().clone();
        self.commit_from(base, snapshot);
    }

    /// Record a step that turned the live document `base` into `snapshot`.
    pub fn commit_from(&mut self, base: Snapshot, snapshot: Snapshot) {
        let discarded = self.entries.len() - (self.cursor + 1);
        if discarded > 0 {
            log::debug!("Discarding {discarded} redo snapshots");
        }
        self.entries.truncate(self.cursor + 1);
        self.entries.push(Entry { snapshot, base });
        self.cursor = self.entries.len() - 1;
    }

    /// Step back and return the document to show, or `None` at the start of the log.
    ///
    /// If `live` still matches the current snapshot the previous state is
    /// restored exactly. Otherwise only the undone step's changes are
    /// reverted on top of `live`.
    pub fn undo(&mut self, live: &Snapshot) -> Option<Snapshot> {
        if self.cursor == 0 {
            log::debug!("Nothing to undo");
            return None;
        }
        let entry = &self.entries[self.cursor];
        let next = if *live == entry.snapshot {
            entry.base.clone()
        } else {
            log::debug!("Undoing onto diverged document");
            rebase(live, &entry.snapshot, &entry.base)
        };
        self.cursor -= 1;
        Some(next)
    }

    /// Step forward and return the document to show, or `None` at the tail.
    pub fn redo(&mut self, live: &Snapshot) -> Option<Snapshot> {
        if !self.can_redo() {
            log::debug!("Nothing to redo");
            return None;
        }
        let entry = &self.entries[self.cursor + 1];
        let next = if *live == entry.base {
            entry.snapshot.clone()
        } else {
            log::debug!("Redoing onto diverged document");
            rebase(live, &entry.base, &entry.snapshot)
        };
        self.cursor += 1;
        Some(next)
    }

    /// Up to `size` consecutive snapshots ending at the tail, always
    /// including the cursor, plus the cursor re-based into that window.
    pub fn window(&self, size: usize) -> (Vec<Snapshot>, usize) {
        let size = size.max(1);
        let start = self.entries.len().saturating_sub(size).min(self.cursor);
        let end = (start + size).min(self.entries.len());
        let snapshots = self.entries[start..end].iter().map(|e| e.snapshot.clone()).collect();
        (snapshots, self.cursor - start)
    }
}

/// Apply the change `from` → `to` onto `live`, leaving untouched elements as they are in `live`.
fn rebase(live: &Snapshot, from: &Snapshot, to: &Snapshot) -> Snapshot {
    let delta = from.diff(to);
    let mut next = live.remove(&delta.removed);
    let order = to.ids();
    for element in delta.upserted {
        let id = element.id();
        let index = match next.position(id) {
            Some(index) => index,
            None => {
                let own = order.iter().position(|&o| o == id).unwrap_or(order.len());
                order[..own]
                    .iter()
                    .rev()
                    .find_map(|&prev| next.position(prev))
                    .map_or(0, |p| p + 1)
            }
        };
        next = next.insert_at(index, element);
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Element, Shape, ShapeKind, StickyNote};
    use kurbo::{Point, Vec2};

    fn rect() -> Element {
        Element::Shape(Shape::new(ShapeKind::Rectangle, Point::new(10.0, 10.0), Point::new(60.0, 40.0)))
    }

    fn note() -> Element {
        Element::StickyNote(StickyNote::new(Point::new(0.0, 0.0), 20.0, 20.0))
    }

    #[test]
    fn test_starts_empty() {
        let history = History::new();
        assert!(history.current().is_empty());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_n_commits_n_undos_is_empty() {
        let mut history = History::new();
        let mut live = Snapshot::empty();
        for _ in 0..5 {
            live = live.insert(rect());
            history.commit(live.clone());
        }
        for _ in 0..5 {
            live = history.undo(&live).unwrap();
        }
        assert!(live.is_empty());
        assert!(history.undo(&live).is_none());
    }

    #[test]
    fn test_undo_redo_roundtrip() {
        let mut history = History::new();
        let one = Snapshot::empty().insert(rect());
        history.commit(one.clone());
        let two = one.insert(note());
        history.commit(two.clone());

        let undone = history.undo(&two).unwrap();
        assert_eq!(undone, one);
        let redone = history.redo(&undone).unwrap();
        assert_eq!(redone, two);
        assert!(history.redo(&redone).is_none());
    }

    #[test]
    fn test_commit_truncates_redo_branch() {
        let mut history = History::new();
        let one = Snapshot::empty().insert(rect());
        history.commit(one.clone());
        let live = history.undo(&one).unwrap();
        assert!(history.can_redo());

        let other = live.insert(note());
        history.commit(other.clone());
        assert!(!history.can_redo());
        assert!(history.redo(&other).is_none());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_undo_keeps_remote_edit_to_untouched_element() {
        let a = rect();
        let b = note();
        let mut history = History::new();
        let one = Snapshot::empty().insert(a.clone());
        history.commit(one.clone());
        let two = one.insert(b.clone());
        history.commit(two.clone());

        // A remote participant moves `a` after our second commit.
        let live = two.patch(a.id(), |e| e.translated(Vec2::new(100.0, 0.0)));
        let undone = history.undo(&live).unwrap();
        assert!(!undone.contains(b.id()));
        assert_eq!(undone.get(a.id()), live.get(a.id()));
    }

    #[test]
    fn test_undo_after_remote_addition_keeps_it() {
        let mut history = History::new();
        let remote = note();
        let live = Snapshot::empty().insert(remote.clone());
        let mine = live.insert(rect());
        history.commit_from(live, mine.clone());

        let undone = history.undo(&mine).unwrap();
        assert_eq!(undone.ids(), vec![remote.id()]);
    }

    #[test]
    fn test_undo_delete_restores_position() {
        let a = rect();
        let b = note();
        let c = rect();
        let mut history = History::new();
        let all = Snapshot::from_elements(vec![a.clone(), b.clone(), c.clone()]);
        history.commit(all.clone());
        let deleted = all.remove(&[b.id()]);
        history.commit(deleted.clone());

        // Diverge so the delta path is used.
        let extra = note();
        let live = deleted.insert(extra.clone());
        let undone = history.undo(&live).unwrap();
        assert_eq!(undone.ids(), vec![a.id(), b.id(), c.id(), extra.id()]);
    }

    #[test]
    fn test_from_snapshots_clamps_cursor() {
        let one = Snapshot::empty().insert(rect());
        let history = History::from_snapshots(vec![Snapshot::empty(), one.clone()], 7);
        assert_eq!(history.cursor(), 1);
        assert_eq!(history.current(), &one);
        assert!(History::from_snapshots(Vec::new(), 3).current().is_empty());
    }

    #[test]
    fn test_window() {
        let mut history = History::new();
        let mut live = Snapshot::empty();
        for _ in 0..10 {
            live = live.insert(rect());
            history.commit(live.clone());
        }
        let (snapshots, cursor) = history.window(3);
        assert_eq!(snapshots.len(), 3);
        assert_eq!(cursor, 2);
        assert_eq!(snapshots[2], live);

        for _ in 0..9 {
            live = history.undo(&live).unwrap();
        }
        let (snapshots, cursor) = history.window(3);
        assert_eq!(cursor, 0);
        assert_eq!(snapshots[0], live);
    }
}
