//! Bottom layer of a simulated stack

use crate::sim::network::SimNetwork;
use crate::stack::{
    Address, Event, Layer, Message, MessageBatch, Neighbors, Reply, StackResult,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const TRANSPORT_NAME: &str = "SIM_TRANSPORT";

/// Transport layer that hands messages to a [`SimNetwork`]
pub struct SimTransport {
    neighbors: Neighbors,
    local: Address,
    network: Arc<SimNetwork>,
    /// Messages this transport handed to the network
    sent: Mutex<Vec<Message>>,
    address_lookups: AtomicU64,
}

impl SimTransport {
    /// Create a transport and attach it to `network`
    pub fn new(local: Address, network: &Arc<SimNetwork>) -> Arc<Self> {
        let transport = Arc::new(Self {
            neighbors: Neighbors::new(TRANSPORT_NAME),
            local: local.clone(),
            network: network.clone(),
            sent: Mutex::new(Vec::new()),
            address_lookups: AtomicU64::new(0),
        });
        network.attach(local, &transport);
        transport
    }

    pub fn local_address(&self) -> &Address {
        &self.local
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// How often a layer above asked for the local address
    pub fn address_lookups(&self) -> u64 {
        self.address_lookups.load(Ordering::Relaxed)
    }

    /// Push a message arriving from the network up the stack
    pub fn receive(&self, msg: Message) -> StackResult<()> {
        self.neighbors.pass_up(Event::Message(msg))?;
        Ok(())
    }

    /// Push a batch arriving from the network up the stack
    pub fn receive_batch(&self, batch: MessageBatch) -> StackResult<()> {
        self.neighbors.pass_up_batch(batch)
    }
}

impl Layer for SimTransport {
    fn name(&self) -> &str {
        TRANSPORT_NAME
    }

    fn up(&self, event: Event) -> StackResult<Option<Reply>> {
        self.neighbors.pass_up(event)
    }

    fn up_batch(&self, batch: MessageBatch) -> StackResult<()> {
        self.neighbors.pass_up_batch(batch)
    }

    fn down(&self, event: Event) -> StackResult<Option<Reply>> {
        match event {
            Event::Message(mut msg) => {
                if msg.src.is_none() {
                    msg.src = Some(self.local.clone());
                }
                self.sent.lock().push(msg.clone());
                self.network.send(msg);
                Ok(None)
            }
            Event::GetLocalAddress => {
                self.address_lookups.fetch_add(1, Ordering::Relaxed);
                Ok(Some(Reply::LocalAddress(self.local.clone())))
            }
            Event::DiscoveryRequest => Ok(Some(Reply::DiscoveryData(self.network.discovery()))),
            Event::ViewChange(_) | Event::SetLocalAddress(_) | Event::Other(_) => Ok(None),
        }
    }

    fn neighbors(&self) -> &Neighbors {
        &self.neighbors
    }
}

impl std::fmt::Debug for SimTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimTransport")
            .field("local", &self.local)
            .field("sent", &self.sent_count())
            .finish()
    }
}
