//! Ports - 抽象化レイヤー
//!
//! 外部システム（object storage, lease-based task queue）へのインターフェース。
//! 実装は `impls` または別クレートに置く。

pub mod queue;
pub mod storage;

pub use self::queue::{QueueCounts, QueueError, QueuedTask, TaskLease, TaskQueue};
pub use self::storage::{PutOptions, StorageAdapter, StorageError};
