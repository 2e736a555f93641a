//! The layer abstraction and the links between neighboring layers

use crate::stack::error::{StackError, StackResult};
use crate::stack::types::{Direction, Event, MessageBatch, Reply};
use parking_lot::RwLock;
use std::sync::{Arc, Weak};

/// One stage of a protocol stack.
///
/// `up` carries events from the network toward the application, `down` carries
/// events from the application toward the network. Implementations forward to
/// their neighbors through [`Neighbors`].
pub trait Layer: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Handle an event travelling up
    fn up(&self, event: Event) -> StackResult<Option<Reply>>;

    /// Handle a batch of messages travelling up.
    ///
    /// The default delivers every message as a single `Event::Message`.
    fn up_batch(&self, batch: MessageBatch) -> StackResult<()> {
        for msg in batch.messages {
            self.up(Event::Message(msg))?;
        }
        Ok(())
    }

    /// Handle an event travelling down
    fn down(&self, event: Event) -> StackResult<Option<Reply>>;

    /// Links to the layers above and below
    fn neighbors(&self) -> &Neighbors;
}

/// Weak links from a layer to its neighbors.
///
/// The owning [`ProtocolStack`](crate::stack::ProtocolStack) holds the strong
/// references, so wiring never creates reference cycles.
pub struct Neighbors {
    layer: String,
    above: RwLock<Option<Weak<dyn Layer>>>,
    below: RwLock<Option<Weak<dyn Layer>>>,
}

impl Neighbors {
    pub fn new(layer: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            above: RwLock::new(None),
            below: RwLock::new(None),
        }
    }

    pub fn set_above(&self, layer: &Arc<dyn Layer>) {
        *self.above.write() = Some(Arc::downgrade(layer));
    }

    pub fn set_below(&self, layer: &Arc<dyn Layer>) {
        *self.below.write() = Some(Arc::downgrade(layer));
    }

    pub fn has_above(&self) -> bool {
        self.above.read().is_some()
    }

    pub fn has_below(&self) -> bool {
        self.below.read().is_some()
    }

    /// Resolve the layer above
    pub fn above(&self) -> StackResult<Arc<dyn Layer>> {
        let link = self.above.read().clone();
        self.resolve(link, Direction::Up)
    }

    /// Resolve the layer below
    pub fn below(&self) -> StackResult<Arc<dyn Layer>> {
        let link = self.below.read().clone();
        self.resolve(link, Direction::Down)
    }

    pub fn pass_up(&self, event: Event) -> StackResult<Option<Reply>> {
        self.above()?.up(event)
    }

    pub fn pass_up_batch(&self, batch: MessageBatch) -> StackResult<()> {
        self.above()?.up_batch(batch)
    }

    pub fn pass_down(&self, event: Event) -> StackResult<Option<Reply>> {
        self.below()?.down(event)
    }

    fn resolve(
        &self,
        link: Option<Weak<dyn Layer>>,
        direction: Direction,
    ) -> StackResult<Arc<dyn Layer>> {
        match link {
            Some(weak) => weak.upgrade().ok_or_else(|| StackError::NeighborGone {
                layer: self.layer.clone(),
                direction,
            }),
            None => Err(StackError::MissingNeighbor {
                layer: self.layer.clone(),
                direction,
            }),
        }
    }
}

impl std::fmt::Debug for Neighbors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neighbors")
            .field("layer", &self.layer)
            .field("above", &self.has_above())
            .field("below", &self.has_below())
            .finish()
    }
}
