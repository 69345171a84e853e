//! Archive of completed and skipped workouts.
//!
//! The archive is a most-recent-first list persisted as one JSON array under
//! [`ARCHIVE_KEY`]. Storage failures are never fatal: the in-memory list stays
//! authoritative and the write is retried on the next mutation.

use crate::storage::{JsonList, KeyValueStore, ARCHIVE_KEY};
use crate::WorkoutRecord;

pub struct ArchiveStore<S: KeyValueStore> {
    list: JsonList<WorkoutRecord, S>,
}

impl<S: KeyValueStore> ArchiveStore<S> {
    /// Load the persisted archive. Unreadable or corrupt data yields an
    /// empty archive.
    pub fn open(store: S) -> Self {
        Self {
            list: JsonList::open(store, ARCHIVE_KEY),
        }
    }

    /// Most recent first
    pub fn list(&self) -> &[WorkoutRecord] {
        self.list.items()
    }

    pub fn get(&self, id: &str) -> Option<&WorkoutRecord> {
        self.list().iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.list().is_empty()
    }

    /// True while the last write failed and has not been retried successfully
    pub fn has_pending_write(&self) -> bool {
        self.list.has_pending_write()
    }

    pub fn into_inner(self) -> S {
        self.list.into_inner()
    }

    /// Add a record at the front and persist the whole list
    pub fn append(&mut self, record: WorkoutRecord) {
        tracing::info!("Archiving workout {} ({})", record.id, record.exercise_name);
        self.list.mutate(move |records| {
            records.insert(0, record.clone());
            ((), true)
        })
    }

    /// Delete a record by id. Returns whether a record was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let target = id.to_string();
        let removed = self.list.mutate(move |records| {
            match records.iter().position(|r| r.id == target) {
                Some(index) => {
                    records.remove(index);
                    (true, true)
                }
                None => (false, false),
            }
        });
        if removed {
            tracing::info!("Removed archived workout {}", id);
        }
        removed
    }
}
