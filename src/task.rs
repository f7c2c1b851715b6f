use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use thiserror::Error;

/// Index of a work item within the queue's current epoch.
pub type TaskIndex = u64;

/// Failure marker recorded in the result map for a single work item.
///
/// A work item fails in isolation: its slot carries this marker while the
/// rest of the batch completes normally. The two sources are a fallible
/// callable returning `Err`, and a callable that panicked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("work item {index} failed: {reason}")]
pub struct TaskError {
    /// Submission index of the failed item.
    pub index: TaskIndex,
    /// Human-readable failure cause.
    pub reason: String,
}

/// Outcome of a single work item.
pub type TaskResult<T> = Result<T, TaskError>;

/// One schedulable unit of work: a callable with its arguments already bound,
/// plus the index it was assigned at enqueue time.
///
/// The queue owns a `WorkItem` until it is dispatched; dropping it releases
/// the captured callable and arguments without running them.
pub struct WorkItem<T> {
    index: TaskIndex,
    call: Box<dyn FnOnce() -> anyhow::Result<T> + Send + 'static>,
}

impl<T> WorkItem<T> {
    pub(crate) fn new<F>(index: TaskIndex, call: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        Self {
            index,
            call: Box::new(call),
        }
    }

    /// Index assigned at enqueue time.
    pub fn index(&self) -> TaskIndex {
        self.index
    }

    /// Run the callable to completion, converting an `Err` return or a panic
    /// into a [`TaskError`] marker attributed to this item's index.
    pub(crate) fn invoke(self) -> (TaskIndex, TaskResult<T>) {
        let index = self.index;
        let outcome = match catch_unwind(AssertUnwindSafe(self.call)) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(TaskError {
                index,
                reason: err.to_string(),
            }),
            Err(payload) => Err(TaskError {
                index,
                reason: panic_reason(payload.as_ref()),
            }),
        };
        (index, outcome)
    }
}

impl<T> fmt::Debug for WorkItem<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem").field("index", &self.index).finish()
    }
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panicked with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoke_success() {
        let item = WorkItem::new(3, || Ok(21 * 2));
        assert_eq!(item.invoke(), (3, Ok(42)));
    }

    #[test]
    fn test_invoke_fallible_err() {
        let item: WorkItem<i64> = WorkItem::new(7, || Err(anyhow::anyhow!("bad input")));
        let (index, result) = item.invoke();
        assert_eq!(index, 7);
        let err = result.unwrap_err();
        assert_eq!(err.index, 7);
        assert_eq!(err.reason, "bad input");
    }

    #[test]
    fn test_invoke_panic_is_caught() {
        let item: WorkItem<i64> = WorkItem::new(0, || panic!("boom"));
        let (index, result) = item.invoke();
        assert_eq!(index, 0);
        let err = result.unwrap_err();
        assert_eq!(err.reason, "boom");
    }

    #[test]
    fn test_task_error_display() {
        let err = TaskError {
            index: 5,
            reason: "division by zero".to_string(),
        };
        assert_eq!(err.to_string(), "work item 5 failed: division by zero");
    }
}
