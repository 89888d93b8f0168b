//! In-process publish/subscribe broker
//!
//! Topic state is owned by a single task. Every operation is a request on
//! that task's mailbox, so all subscribe, publish and unsubscribe calls are
//! processed in one total order no matter how many callers race.
//!
//! ```text
//!   Broker (clone) ──┐
//!   Broker (clone) ──┼──► mailbox ──► actor task ──► Topics
//!   Broker (clone) ──┘                    │
//!          ▲                              │
//!          └───────── oneshot reply ──────┘
//! ```
//!
//! Publishing returns the subscriber ids instead of delivering anything.
//! The caller fans the message out, so the actor never waits on a socket.

pub mod actor;
pub mod error;
pub mod topic;

pub use actor::Broker;
pub use error::BrokerError;
pub use topic::{SubscriberId, Topics};
