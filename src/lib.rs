//! # lossgate
//!
//! Fault injection for layered group-communication stacks.
//!
//! A [`DiscardLayer`](discard::DiscardLayer) sits between two layers of a
//! [`ProtocolStack`](stack::ProtocolStack) and drops traffic on demand, so
//! that membership, ordering and retransmission layers can be exercised under
//! message loss without an unreliable network.
//!
//! ```text
//!            application
//!                 │ ▲
//!          down   ▼ │   up
//!  ┌──────────────────────────────┐
//!  │          DISCARD             │  rates, drop budgets, ignore-list,
//!  │                              │  kill switch + loopback
//!  └──────────────────────────────┘
//!                 │ ▲
//!                 ▼ │
//!             transport
//! ```

pub mod discard;
pub mod metrics;
pub mod sim;
pub mod stack;

pub use discard::{DiscardConfig, DiscardLayer};
pub use stack::{Address, Event, Layer, Message, MessageBatch, ProtocolStack, View};
