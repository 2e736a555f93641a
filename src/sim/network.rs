//! In-memory network connecting simulated transports

use crate::sim::transport::SimTransport;
use crate::stack::{Address, DiscoveryData, Message, MessageBatch};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Counters kept by a simulated network
#[derive(Debug, Default)]
pub struct NetworkStats {
    pub unicasts_sent: AtomicU64,
    pub multicasts_sent: AtomicU64,
    pub batches_sent: AtomicU64,
    pub delivered: AtomicU64,
    pub undeliverable: AtomicU64,
}

impl NetworkStats {
    /// Messages handed to the network, whatever their fate
    pub fn total_sent(&self) -> u64 {
        self.unicasts_sent.load(Ordering::Relaxed)
            + self.multicasts_sent.load(Ordering::Relaxed)
            + self.batches_sent.load(Ordering::Relaxed)
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn undeliverable(&self) -> u64 {
        self.undeliverable.load(Ordering::Relaxed)
    }
}

/// A lossless, synchronous network between transports of one process.
///
/// Unicasts reach their destination only; multicasts reach every attached
/// transport, the sender included.
#[derive(Debug, Default)]
pub struct SimNetwork {
    endpoints: DashMap<Address, Weak<SimTransport>>,
    /// Attach order, used for discovery and coordinator election
    order: parking_lot::Mutex<Vec<Address>>,
    stats: NetworkStats,
}

impl SimNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn attach(&self, addr: Address, transport: &Arc<SimTransport>) {
        self.endpoints.insert(addr.clone(), Arc::downgrade(transport));
        let mut order = self.order.lock();
        if !order.contains(&addr) {
            order.push(addr);
        }
    }

    /// Remove an endpoint; later sends to it are undeliverable
    pub fn detach(&self, addr: &Address) {
        self.endpoints.remove(addr);
        self.order.lock().retain(|a| a != addr);
    }

    /// Attached endpoints in attach order
    pub fn endpoints(&self) -> Vec<Address> {
        self.order.lock().clone()
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    /// Discovery data for every endpoint; the first attached is coordinator
    pub fn discovery(&self) -> Vec<DiscoveryData> {
        self.endpoints()
            .into_iter()
            .enumerate()
            .map(|(i, address)| DiscoveryData {
                logical_name: address.to_string(),
                coordinator: i == 0,
                address,
            })
            .collect()
    }

    /// Deliver a message to its destination, or to everyone for a multicast
    pub fn send(&self, msg: Message) {
        match msg.dest.clone() {
            Some(dest) => {
                self.stats.unicasts_sent.fetch_add(1, Ordering::Relaxed);
                match self.lookup(&dest) {
                    Some(target) => self.deliver(&target, msg),
                    None => {
                        tracing::debug!(dest = %dest, "Dropping message to unknown endpoint");
                        self.stats.undeliverable.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
            None => {
                self.stats.multicasts_sent.fetch_add(1, Ordering::Relaxed);
                // Collect first: delivery may re-enter the network
                let targets: Vec<Arc<SimTransport>> = self
                    .endpoints()
                    .iter()
                    .filter_map(|addr| self.lookup(addr))
                    .collect();
                for target in targets {
                    self.deliver(&target, msg.clone());
                }
            }
        }
    }

    /// Deliver several messages to `dest` as one batch
    pub fn send_batch(&self, dest: &Address, batch: MessageBatch) {
        self.stats.batches_sent.fetch_add(1, Ordering::Relaxed);
        let Some(target) = self.lookup(dest) else {
            self.stats.undeliverable.fetch_add(1, Ordering::Relaxed);
            return;
        };

        let count = batch.len() as u64;
        match target.receive_batch(batch) {
            Ok(()) => {
                self.stats.delivered.fetch_add(count, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::warn!(dest = %dest, "Batch delivery failed: {}", e);
                self.stats.undeliverable.fetch_add(count, Ordering::Relaxed);
            }
        }
    }

    fn lookup(&self, addr: &Address) -> Option<Arc<SimTransport>> {
        let weak = self.endpoints.get(addr).map(|e| e.value().clone())?;
        weak.upgrade()
    }

    fn deliver(&self, target: &Arc<SimTransport>, msg: Message) {
        match target.receive(msg) {
            Ok(()) => {
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::warn!(dest = %target.local_address(), "Delivery failed: {}", e);
                self.stats.undeliverable.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
