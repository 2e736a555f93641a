use crate::stack::{Address, Direction};
use serde::{Deserialize, Serialize};

/// Why a message was not delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DropReason {
    /// Kill switch is on
    DiscardAll,
    /// Sender is on the ignore-list
    Ignored,
    /// Random draw fell under the configured rate
    Rate,
    /// Unicast drop budget consumed
    UnicastBudget,
    /// Multicast drop budget consumed
    MulticastBudget,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::DiscardAll => "discard_all",
            DropReason::Ignored => "ignored",
            DropReason::Rate => "rate",
            DropReason::UnicastBudget => "unicast_budget",
            DropReason::MulticastBudget => "multicast_budget",
        }
    }

    /// Whether drops for this reason show up in the layer's stats
    pub fn is_counted(&self) -> bool {
        matches!(self, DropReason::Ignored | DropReason::Rate)
    }
}

/// Events emitted by a discard layer
#[derive(Debug, Clone)]
pub enum DiscardEvent {
    /// A message was suppressed
    MessageDropped {
        direction: Direction,
        reason: DropReason,
        /// Sender for upward drops, destination for downward drops
        peer: Option<Address>,
    },

    /// A looped-back copy reached the layer above
    LoopbackDelivered { src: Option<Address> },

    /// A looped-back copy could not be delivered
    LoopbackFailed { error: String },
}
