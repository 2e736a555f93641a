//! Protocol stack plumbing
//!
//! A stack is a chain of [`Layer`]s. Events travel down from the application
//! toward the network and up from the network toward the application; each
//! layer decides what to forward to its neighbors.

pub mod error;
pub mod layer;
pub mod protocol_stack;
pub mod types;

pub use error::{StackError, StackResult};
pub use layer::{Layer, Neighbors};
pub use protocol_stack::{ProtocolStack, ProtocolStackBuilder};
pub use types::{Address, DiscoveryData, Direction, Event, Message, MessageBatch, Reply, View};
