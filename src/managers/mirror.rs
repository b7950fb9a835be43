//! Local, eventually-consistent copy of one table's rows for the current user.

use crate::database::Subscription;
use crate::types::bookmark::Bookmark;
use crate::types::change::ChangeEvent;
use crate::types::folder::Folder;
use crate::types::tag::{BookmarkTag, Tag};

/// A row that can live in a [`LocalMirror`].
pub trait MirrorRow: Clone + PartialEq {
    /// Identity used to merge change events.
    fn row_id(&self) -> String;

    /// Restores the table's display order; must match the store's ORDER BY.
    fn sort_rows(rows: &mut [Self]);
}

impl MirrorRow for Bookmark {
    fn row_id(&self) -> String {
        self.id.clone()
    }

    fn sort_rows(rows: &mut [Self]) {
        rows.sort_by(|a, b| (b.created_at, &b.id).cmp(&(a.created_at, &a.id)));
    }
}

impl MirrorRow for Folder {
    fn row_id(&self) -> String {
        self.id.clone()
    }

    fn sort_rows(rows: &mut [Self]) {
        rows.sort_by(|a, b| {
            (a.name.to_ascii_lowercase(), &a.name, &a.id).cmp(&(b.name.to_ascii_lowercase(), &b.name, &b.id))
        });
    }
}

impl MirrorRow for Tag {
    fn row_id(&self) -> String {
        self.id.clone()
    }

    fn sort_rows(rows: &mut [Self]) {
        rows.sort_by(|a, b| {
            (a.name.to_ascii_lowercase(), &a.name, &a.id).cmp(&(b.name.to_ascii_lowercase(), &b.name, &b.id))
        });
    }
}

impl MirrorRow for BookmarkTag {
    fn row_id(&self) -> String {
        self.key()
    }

    fn sort_rows(rows: &mut [Self]) {
        rows.sort_by(|a, b| {
            (a.created_at, &a.bookmark_id, &a.tag_id).cmp(&(b.created_at, &b.bookmark_id, &b.tag_id))
        });
    }
}

/// Ordered rows plus a revision counter that moves whenever the rows change.
#[derive(Debug, Clone)]
pub struct LocalMirror<T> {
    rows: Vec<T>,
    revision: u64,
}

impl<T: MirrorRow> Default for LocalMirror<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: MirrorRow> LocalMirror<T> {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            revision: 0,
        }
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.rows.iter().find(|r| r.row_id() == id)
    }

    /// Installs a fresh snapshot, keeping the order the store returned it in.
    pub fn replace_all(&mut self, rows: Vec<T>) {
        self.rows = rows;
        self.revision += 1;
    }

    pub fn clear(&mut self) {
        if !self.rows.is_empty() {
            self.rows.clear();
            self.revision += 1;
        }
    }

    /// Applies one change event. Returns true if the rows changed.
    ///
    /// Inserts and updates both upsert by id, so a duplicate or reordered
    /// delivery converges to the same state.
    pub fn apply(&mut self, event: ChangeEvent<T>) -> bool {
        let changed = match event {
            ChangeEvent::Inserted(row) | ChangeEvent::Updated(row) => self.upsert(row),
            ChangeEvent::Deleted(row) => {
                let id = row.row_id();
                let before = self.rows.len();
                self.rows.retain(|r| r.row_id() != id);
                self.rows.len() != before
            }
        };
        if changed {
            self.revision += 1;
        }
        changed
    }

    fn upsert(&mut self, row: T) -> bool {
        let id = row.row_id();
        match self.rows.iter_mut().find(|r| r.row_id() == id) {
            Some(existing) if *existing == row => false,
            Some(existing) => {
                *existing = row;
                T::sort_rows(&mut self.rows);
                true
            }
            None => {
                self.rows.push(row);
                T::sort_rows(&mut self.rows);
                true
            }
        }
    }
}

/// A mirror kept current by a change-feed subscription.
///
/// Dropping the table (or calling [`SyncedTable::release`]) releases the
/// subscription.
pub struct SyncedTable<T> {
    mirror: LocalMirror<T>,
    subscription: Option<Subscription<T>>,
}

impl<T: MirrorRow> Default for SyncedTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: MirrorRow> SyncedTable<T> {
    pub fn new() -> Self {
        Self {
            mirror: LocalMirror::new(),
            subscription: None,
        }
    }

    /// Installs a snapshot taken after `subscription` was opened.
    pub fn install(&mut self, subscription: Subscription<T>, snapshot: Vec<T>) {
        self.subscription = Some(subscription);
        self.mirror.replace_all(snapshot);
    }

    pub fn release(&mut self) {
        self.subscription = None;
        self.mirror.clear();
    }

    /// Applies every queued event. Returns the number of events drained.
    pub fn sync(&mut self) -> usize {
        let events = match self.subscription.as_mut() {
            Some(subscription) => subscription.drain(),
            None => return 0,
        };
        let count = events.len();
        for event in events {
            self.mirror.apply(event);
        }
        count
    }

    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn mirror(&self) -> &LocalMirror<T> {
        &self.mirror
    }
}
