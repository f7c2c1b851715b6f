//! # `batchrs`
//!
//! `batchrs` runs batches of blocking, synchronous callables concurrently on
//! tokio, bounded by a concurrency limit, with an optional deadline over the
//! whole batch. Results come back keyed by submission index, or as a sequence
//! in submission order.
//!
//! ## Example
//!
//! ```rust
//! use batchrs::Scheduler;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut scheduler = Scheduler::new();
//!
//! // One work item per argument value.
//! scheduler.enqueue(|x: i64| x * x, [2, 3, 4]);
//!
//! let results = scheduler.run_sorted().await.unwrap();
//! assert_eq!(results, vec![Ok(4), Ok(9), Ok(16)]);
//! # }
//! ```
//!
//! Multi-argument callables take a tuple and destructure it:
//!
//! ```rust
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut scheduler = batchrs::Scheduler::new();
//! scheduler.enqueue(|(a, b): (i64, i64)| a + b, [(1, 2), (30, 40)]);
//!
//! let results = scheduler.run().await.unwrap();
//! assert_eq!(results[&0], Ok(3));
//! assert_eq!(results[&1], Ok(70));
//! # }
//! ```

pub mod error;
pub mod queue;
pub mod scheduler;
pub mod task;

pub use error::{Error, Result};
pub use queue::TaskQueue;
pub use scheduler::{ResultMap, Scheduler, SchedulerConfig, DEFAULT_CONCURRENCY_LIMIT};
pub use task::{TaskError, TaskIndex, TaskResult, WorkItem};
