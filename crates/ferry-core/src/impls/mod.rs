//! Impls - ports の実装（開発用・テスト用・ローカル実行用）
//!
//! - **InMemoryStore**: namespace を問わないメモリ上の object store
//! - **LocalStore**: `local://` をローカルディレクトリに対応付ける object store
//! - **InMemoryTaskQueue**: at-least-once 配送を再現する開発用キュー
//!
//! ネットワーク越しの object store や本番のキューは別クレートに置く。

pub mod local_store;
pub mod memory_queue;
pub mod memory_store;

pub use self::local_store::LocalStore;
pub use self::memory_queue::{InMemoryTaskQueue, TaskState, TaskView};
pub use self::memory_store::InMemoryStore;
