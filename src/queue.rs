use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use crate::task::{TaskIndex, WorkItem};

/// Ordered collection of pending work items.
///
/// Insertion order is submission order. Indices are assigned from a
/// monotonically increasing counter so they stay unique within an epoch even
/// after a selective [`remove`](TaskQueue::remove); the counter resets only
/// on a full drain ([`clear`](TaskQueue::clear) or a scheduler run).
#[derive(Debug)]
pub struct TaskQueue<T> {
    entries: VecDeque<WorkItem<T>>,
    next_index: TaskIndex,
}

impl<T> TaskQueue<T>
where
    T: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            next_index: 0,
        }
    }

    /// Append one work item per argument value, binding each to `f`.
    ///
    /// The callable is never invoked or validated here; it only runs once the
    /// scheduler dispatches the item. Multi-argument callables take a tuple
    /// and destructure it in the closure.
    pub fn enqueue<F, A, I>(&mut self, f: F, args: I)
    where
        F: Fn(A) -> T + Send + Sync + 'static,
        A: Send + 'static,
        I: IntoIterator<Item = A>,
    {
        let f = Arc::new(f);
        let mut appended = 0usize;
        for arg in args {
            let f = Arc::clone(&f);
            let index = self.next_index;
            self.next_index += 1;
            self.entries
                .push_back(WorkItem::new(index, move || Ok(f(arg))));
            appended += 1;
        }
        tracing::debug!(appended, pending = self.entries.len(), "enqueued work items");
    }

    /// Like [`enqueue`](TaskQueue::enqueue) for callables that can fail
    /// without panicking; an `Err` return becomes the item's failure marker
    /// in the result map.
    pub fn enqueue_fallible<F, A, I>(&mut self, f: F, args: I)
    where
        F: Fn(A) -> anyhow::Result<T> + Send + Sync + 'static,
        A: Send + 'static,
        I: IntoIterator<Item = A>,
    {
        let f = Arc::new(f);
        let mut appended = 0usize;
        for arg in args {
            let f = Arc::clone(&f);
            let index = self.next_index;
            self.next_index += 1;
            self.entries.push_back(WorkItem::new(index, move || f(arg)));
            appended += 1;
        }
        tracing::debug!(appended, pending = self.entries.len(), "enqueued fallible work items");
    }

    /// Number of pending work items.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every pending item without running it and start a new epoch.
    pub fn clear(&mut self) {
        tracing::debug!(dropped = self.entries.len(), "clearing task queue");
        self.entries.clear();
        self.next_index = 0;
    }

    /// Drop the items with the given indices without running them.
    ///
    /// Index-stable: the remaining items keep their assigned indices. Indices
    /// not present in the queue are ignored. The epoch counter is not reset,
    /// so later enqueues cannot collide with the survivors.
    pub fn remove<I>(&mut self, indices: I)
    where
        I: IntoIterator<Item = TaskIndex>,
    {
        let indices: BTreeSet<TaskIndex> = indices.into_iter().collect();
        let before = self.entries.len();
        self.entries.retain(|item| !indices.contains(&item.index()));
        tracing::debug!(
            removed = before - self.entries.len(),
            pending = self.entries.len(),
            "removed work items"
        );
    }

    /// Take every pending item out of the queue and start a new epoch.
    pub(crate) fn drain(&mut self) -> Vec<WorkItem<T>> {
        self.next_index = 0;
        self.entries.drain(..).collect()
    }
}

impl<T> Default for TaskQueue<T>
where
    T: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
