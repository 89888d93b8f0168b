//! Connection registry
//!
//! Maps each connection's identity (its remote address) to the live
//! [`Connection`](crate::server::Connection). The server inserts every
//! accepted connection; handlers look connections up to deliver messages to
//! other clients.
//!
//! # Architecture
//!
//! ```text
//!                 Arc<Registry>
//!          ┌──────────────────────────┐
//!          │ connections: RwLock<     │
//!          │   HashMap<id, Arc<Conn>> │
//!          │ >                        │
//!          └────────────┬─────────────┘
//!                       │
//!      ┌────────────────┼──────────────────┐
//!      ▼                ▼                  ▼
//!  accept loop       handlers            reaper
//!  put(id, conn)     get(id)             reap() every interval
//! ```
//!
//! Lookups take the read lock; inserts, deletes and reaping take the write
//! lock. [`Registry::snapshot`] copies the map so callers can iterate
//! without holding the lock.

pub mod store;

pub use store::Registry;
