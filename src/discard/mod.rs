//! Fault injection layer
//!
//! Sits between two layers of a protocol stack and selectively suppresses
//! traffic so that the layers above can be tested under message loss.
//!
//! Key features:
//! - Probabilistic drops in either direction
//! - Exact drop budgets for outgoing unicasts and multicasts
//! - Per-member ignore-list for incoming traffic
//! - Kill switch with loopback of self-addressed traffic

pub mod config;
pub mod error;
pub mod events;
pub mod layer;
mod loopback;
pub mod membership;
pub mod stats;

pub use config::{DiscardConfig, Settings};
pub use error::{DiscardError, DiscardResult};
pub use events::{DiscardEvent, DropReason};
pub use layer::{DiscardLayer, DiscardLayerBuilder, LAYER_NAME};
pub use membership::{IgnoreList, MembershipSnapshot};
pub use stats::{DiscardStats, StatsSnapshot};
