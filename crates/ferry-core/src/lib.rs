//! ferry-core
//!
//! Idempotent export tasks for a lease-based, at-least-once task queue.
//!
//! # モジュール構成
//! - **domain**: pointers, task payloads, results, errors, failure escalation
//! - **ports**: StorageAdapter, TaskQueue
//! - **ops**: copy / delete / touch
//! - **marker**: success-marker matcher
//! - **plan**: changes -> copy/delete tasks + marker touches
//! - **handler**: `(action, body, failures)` -> `TaskResult`
//! - **config**: ExportConfig
//! - **impls**: in-memory / local implementations of the ports
//! - **worker**: worker group driving the handler from a queue

pub mod config;
pub mod domain;
pub mod handler;
pub mod impls;
pub mod marker;
pub mod ops;
pub mod plan;
pub mod ports;
pub mod worker;

pub use config::{ConfigError, ExportConfig};
pub use domain::{
    Escalation, EscalationPolicy, ExportError, ExportTask, MaxFailures, ObjectPointer, TaskAction,
    TaskResult, TaskStatus,
};
pub use handler::ExportHandler;
pub use marker::{MarkerError, SuccessMatcher};
pub use plan::{ChangeKind, ExportEntry, ExportPlan, ExportPlanner, PlanError};
pub use worker::WorkerGroup;
