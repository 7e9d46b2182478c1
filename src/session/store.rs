//! Thread-safe store of per-model test entries
//!
//! Membership is fixed when the store is built; only the mutable fields of an
//! entry change afterwards. Every entry sits behind its own mutex, so a
//! transition replaces status, latency and error together and concurrent
//! writers to the same entry resolve as last-writer-wins.

use crate::{
    error::{AppError, Result},
    models::ModelTestEntry,
    session::queue::WorkItem,
    types::TestStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Authoritative mapping from display name to entry, in provider order
#[derive(Debug)]
pub struct TestEntryStore {
    order: Vec<String>,
    index: HashMap<String, usize>,
    slots: Vec<Mutex<ModelTestEntry>>,
}

/// Entry counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub testing: usize,
    pub success: usize,
    pub error: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.testing + self.success + self.error
    }

    /// Count of entries that resolved (success or error)
    pub fn finished(&self) -> usize {
        self.success + self.error
    }
}

impl TestEntryStore {
    /// Build a store from `(display_name, upstream_name)` pairs.
    ///
    /// Display names must be unique; a repeated name is ignored and the first
    /// registration is kept.
    pub fn new<I, D, U>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (D, U)>,
        D: Into<String>,
        U: Into<String>,
    {
        let mut order = Vec::new();
        let mut index = HashMap::new();
        let mut slots = Vec::new();

        for (display, upstream) in pairs {
            let display = display.into();
            if index.contains_key(&display) {
                continue;
            }
            index.insert(display.clone(), slots.len());
            slots.push(Mutex::new(ModelTestEntry::new(display.clone(), upstream)));
            order.push(display);
        }

        Self { order, index, slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, display_name: &str) -> bool {
        self.index.contains_key(display_name)
    }

    /// Display names in insertion order
    pub fn display_names(&self) -> &[String] {
        &self.order
    }

    /// Copy of the named entry
    pub fn get(&self, display_name: &str) -> Result<ModelTestEntry> {
        let slot = self.slot(display_name)?;
        Ok(lock(slot).clone())
    }

    /// Overwrite the mutable fields of one entry atomically
    pub fn set(
        &self,
        display_name: &str,
        status: TestStatus,
        latency_ms: Option<u64>,
        error_message: Option<String>,
    ) -> Result<()> {
        let slot = self.slot(display_name)?;
        lock(slot).apply(status, latency_ms, error_message);
        Ok(())
    }

    /// Reset every entry to `Pending` with no latency and no error
    pub fn reset_all(&self) {
        for slot in &self.slots {
            lock(slot).reset();
        }
    }

    /// Queue items for every entry, in insertion order
    pub fn work_items(&self) -> Vec<WorkItem> {
        self.slots
            .iter()
            .map(|slot| {
                let entry = lock(slot);
                WorkItem::new(entry.display_name.clone(), entry.upstream_name.clone())
            })
            .collect()
    }

    /// Lazy view over the entries, optionally filtered by a case-insensitive
    /// substring of the display name. Entries are read as the view is iterated.
    pub fn snapshot(&self, filter: Option<&str>) -> Snapshot<'_> {
        let filter = filter
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty());
        Snapshot { store: self, filter }
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for slot in &self.slots {
            match lock(slot).status {
                TestStatus::Pending => counts.pending += 1,
                TestStatus::Testing => counts.testing += 1,
                TestStatus::Success => counts.success += 1,
                TestStatus::Error => counts.error += 1,
            }
        }
        counts
    }

    fn slot(&self, display_name: &str) -> Result<&Mutex<ModelTestEntry>> {
        self.index
            .get(display_name)
            .map(|&i| &self.slots[i])
            .ok_or_else(|| AppError::not_found(format!("model '{}' is not registered in this session", display_name)))
    }
}

// A panic while holding an entry lock leaves a complete entry behind, since
// every write is a single `apply`, so a poisoned lock is still usable.
fn lock(slot: &Mutex<ModelTestEntry>) -> MutexGuard<'_, ModelTestEntry> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Restartable, filtered view over a [`TestEntryStore`]
#[derive(Debug)]
pub struct Snapshot<'a> {
    store: &'a TestEntryStore,
    filter: Option<String>,
}

impl<'a> Snapshot<'a> {
    /// Start a fresh pass over the entries
    pub fn iter(&self) -> SnapshotIter<'_> {
        SnapshotIter {
            store: self.store,
            filter: self.filter.as_deref(),
            position: 0,
        }
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }
}

impl<'s, 'a> IntoIterator for &'s Snapshot<'a> {
    type Item = ModelTestEntry;
    type IntoIter = SnapshotIter<'s>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One pass of a [`Snapshot`]
#[derive(Debug)]
pub struct SnapshotIter<'s> {
    store: &'s TestEntryStore,
    filter: Option<&'s str>,
    position: usize,
}

impl Iterator for SnapshotIter<'_> {
    type Item = ModelTestEntry;

    fn next(&mut self) -> Option<Self::Item> {
        while self.position < self.store.order.len() {
            let i = self.position;
            self.position += 1;

            let matches = match self.filter {
                Some(needle) => self.store.order[i].to_lowercase().contains(needle),
                None => true,
            };
            if matches {
                return Some(lock(&self.store.slots[i]).clone());
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.store.order.len() - self.position))
    }
}
