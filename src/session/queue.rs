//! FIFO queue of models awaiting a probe

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One pending probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub display_name: String,
    pub upstream_name: String,
}

impl WorkItem {
    pub fn new(display_name: impl Into<String>, upstream_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            upstream_name: upstream_name.into(),
        }
    }
}

/// Non-blocking FIFO shared by the workers of a bulk run
#[derive(Debug, Default)]
pub struct WorkQueue {
    items: Mutex<VecDeque<WorkItem>>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue contents with `items`, preserving their order
    pub fn fill<I>(&self, items: I)
    where
        I: IntoIterator<Item = WorkItem>,
    {
        let mut queue = self.lock();
        queue.clear();
        queue.extend(items);
    }

    /// Pop the next item, or `None` once the queue is drained
    pub fn try_dequeue(&self) -> Option<WorkItem> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<WorkItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
