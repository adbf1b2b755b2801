//! Actor-based storage access
//!
//! The telemetry store is owned by a single actor running as its own
//! Tokio task. Everything else talks to it through a `StorageHandle`.
//!
//! ```text
//!   HTTP handlers ──┐
//!   HTTP handlers ──┼──► mpsc (StorageCommand) ──► StorageActor ──► StorageBackend
//!   main (events) ──┘                                   │
//!                  ◄──────── oneshot replies ───────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: one mpsc command channel per actor
//! 2. **Request/Response**: oneshot channels for every reply

pub mod messages;
pub mod storage;

pub use messages::{StorageCommand, StorageStats};
pub use storage::{RetentionPolicy, StorageActor, StorageHandle};
