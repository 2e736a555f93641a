//! Ownership and wiring of a chain of layers

use crate::stack::error::{StackError, StackResult};
use crate::stack::layer::Layer;
use crate::stack::types::{Address, Direction, Event, MessageBatch, Reply};
use std::sync::Arc;

/// A chain of layers, ordered from the top (application side) to the bottom
/// (network side).
pub struct ProtocolStack {
    layers: Vec<Arc<dyn Layer>>,
}

impl ProtocolStack {
    pub fn builder() -> ProtocolStackBuilder {
        ProtocolStackBuilder::new()
    }

    /// Layers from top to bottom
    pub fn layers(&self) -> &[Arc<dyn Layer>] {
        &self.layers
    }

    /// Find a layer by name
    pub fn find(&self, name: &str) -> Option<&Arc<dyn Layer>> {
        self.layers.iter().find(|l| l.name() == name)
    }

    pub fn top(&self) -> &Arc<dyn Layer> {
        &self.layers[0]
    }

    pub fn bottom(&self) -> &Arc<dyn Layer> {
        &self.layers[self.layers.len() - 1]
    }

    /// Send an event down from the top of the stack
    pub fn down(&self, event: Event) -> StackResult<Option<Reply>> {
        self.top().down(event)
    }

    /// Inject an event arriving from the network at the bottom of the stack
    pub fn receive(&self, event: Event) -> StackResult<Option<Reply>> {
        self.bottom().up(event)
    }

    /// Inject a batch arriving from the network at the bottom of the stack
    pub fn receive_batch(&self, batch: MessageBatch) -> StackResult<()> {
        self.bottom().up_batch(batch)
    }

    /// Announce the local address to every layer
    pub fn set_local_address(&self, addr: Address) -> StackResult<()> {
        self.down(Event::SetLocalAddress(addr))?;
        Ok(())
    }
}

impl std::fmt::Debug for ProtocolStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.layers.iter().map(|l| l.name()).collect();
        f.debug_struct("ProtocolStack")
            .field("layers", &names)
            .finish()
    }
}

/// Builder for protocol stacks; layers are pushed top first
pub struct ProtocolStackBuilder {
    layers: Vec<Arc<dyn Layer>>,
}

impl ProtocolStackBuilder {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Add a layer below the ones already added
    pub fn push(mut self, layer: Arc<dyn Layer>) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn build(self) -> StackResult<ProtocolStack> {
        if self.layers.is_empty() {
            return Err(StackError::MissingNeighbor {
                layer: "<empty stack>".into(),
                direction: Direction::Down,
            });
        }

        for pair in self.layers.windows(2) {
            let (upper, lower) = (&pair[0], &pair[1]);
            upper.neighbors().set_below(lower);
            lower.neighbors().set_above(upper);
        }

        Ok(ProtocolStack {
            layers: self.layers,
        })
    }
}

impl Default for ProtocolStackBuilder {
    fn default() -> Self {
        Self::new()
    }
}
