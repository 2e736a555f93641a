//! The discard layer
//!
//! Drops messages travelling up or down the stack, either by probability, by
//! exact count, or because the sender is ignored. With the kill switch on,
//! nothing leaves the stack and self-addressed traffic is looped back.

use crate::discard::config::{DiscardConfig, Settings};
use crate::discard::error::DiscardResult;
use crate::discard::events::{DiscardEvent, DropReason};
use crate::discard::loopback::{emit, spawn_loopback};
use crate::discard::membership::{IgnoreList, MembershipSnapshot};
use crate::discard::stats::{DiscardStats, StatsSnapshot};
use crate::metrics;
use crate::stack::{
    Address, Direction, Event, Layer, Message, MessageBatch, Neighbors, Reply, StackResult,
};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

pub const LAYER_NAME: &str = "DISCARD";

/// Fault-injecting protocol layer
pub struct DiscardLayer {
    neighbors: Neighbors,

    /// Live configuration
    settings: Settings,

    /// Seed the random source was created with
    seed: Option<u64>,

    local_address: RwLock<Option<Address>>,

    /// Last installed view, for the control surface only
    members: MembershipSnapshot,

    ignored: IgnoreList,

    stats: Arc<DiscardStats>,

    rng: Mutex<StdRng>,

    /// Event sender for monitoring
    event_tx: Option<mpsc::Sender<DiscardEvent>>,
}

impl DiscardLayer {
    /// Create a new discard layer
    pub fn new(config: DiscardConfig) -> DiscardResult<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            neighbors: Neighbors::new(LAYER_NAME),
            settings: Settings::from_config(&config),
            seed: config.seed,
            local_address: RwLock::new(None),
            members: MembershipSnapshot::new(),
            ignored: IgnoreList::new(),
            stats: Arc::new(DiscardStats::new()),
            rng: Mutex::new(rng),
            event_tx: None,
        })
    }

    pub fn builder() -> DiscardLayerBuilder {
        DiscardLayerBuilder::new()
    }

    /// Create with an event channel for monitoring
    pub fn with_events(mut self, tx: mpsc::Sender<DiscardEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn with_local_address(self, addr: Address) -> Self {
        *self.local_address.write() = Some(addr);
        self
    }

    // ============== Local address ==============

    /// The local address, asking the layer below when none is known yet
    pub fn local_address(&self) -> Option<Address> {
        if let Some(addr) = self.local_address.read().clone() {
            return Some(addr);
        }

        match self.neighbors.pass_down(Event::GetLocalAddress) {
            Ok(Some(Reply::LocalAddress(addr))) => {
                debug!(layer = LAYER_NAME, local = %addr, "Learned local address from below");
                *self.local_address.write() = Some(addr.clone());
                Some(addr)
            }
            Ok(_) => None,
            Err(e) => {
                trace!(layer = LAYER_NAME, "Local address lookup failed: {}", e);
                None
            }
        }
    }

    pub fn set_local_address(&self, addr: Address) -> &Self {
        debug!(layer = LAYER_NAME, local = %addr, "Local address set");
        *self.local_address.write() = Some(addr);
        self
    }

    /// True only if both addresses are known and equal
    fn is_local(&self, addr: Option<&Address>) -> bool {
        match addr {
            Some(addr) => self.local_address().as_ref() == Some(addr),
            None => false,
        }
    }

    // ============== Configuration surface ==============

    pub fn up_rate(&self) -> f64 {
        self.settings.up_rate()
    }

    pub fn set_up_rate(&self, rate: f64) -> &Self {
        self.settings.set_up_rate(rate);
        self
    }

    pub fn down_rate(&self) -> f64 {
        self.settings.down_rate()
    }

    pub fn set_down_rate(&self, rate: f64) -> &Self {
        self.settings.set_down_rate(rate);
        self
    }

    pub fn exclude_self(&self) -> bool {
        self.settings.exclude_self()
    }

    pub fn set_exclude_self(&self, exclude: bool) -> &Self {
        self.settings.set_exclude_self(exclude);
        self
    }

    pub fn discard_all(&self) -> bool {
        self.settings.discard_all()
    }

    pub fn set_discard_all(&self, discard_all: bool) -> &Self {
        self.settings.set_discard_all(discard_all);
        self
    }

    pub fn drop_down_unicasts(&self) -> u32 {
        self.settings.drop_down_unicasts()
    }

    /// Drop the next `count` unicasts sent down the stack
    pub fn set_drop_down_unicasts(&self, count: u32) -> &Self {
        self.settings.set_drop_down_unicasts(count);
        self
    }

    pub fn drop_down_multicasts(&self) -> u32 {
        self.settings.drop_down_multicasts()
    }

    /// Drop the next `count` multicasts sent down the stack
    pub fn set_drop_down_multicasts(&self, count: u32) -> &Self {
        self.settings.set_drop_down_multicasts(count);
        self
    }

    /// Current settings as a configuration
    pub fn config(&self) -> DiscardConfig {
        self.settings.snapshot(self.seed)
    }

    // ============== Membership & ignore-list ==============

    /// Messages from this member will get dropped
    pub fn add_ignored(&self, addr: Address) -> &Self {
        debug!(layer = LAYER_NAME, member = %addr, "Ignoring member");
        self.ignored.add(addr);
        self
    }

    pub fn remove_ignored(&self, addr: &Address) -> &Self {
        debug!(layer = LAYER_NAME, member = %addr, "No longer ignoring member");
        self.ignored.remove(addr);
        self
    }

    pub fn reset_ignored(&self) -> &Self {
        self.ignored.clear();
        self
    }

    pub fn is_ignored(&self, addr: &Address) -> bool {
        self.ignored.contains(addr)
    }

    pub fn ignored(&self) -> Vec<Address> {
        self.ignored.to_vec()
    }

    /// Members of the last view seen
    pub fn members(&self) -> Vec<Address> {
        self.members.members()
    }

    pub fn view_id(&self) -> Option<u64> {
        self.members.view_id()
    }

    // ============== Statistics ==============

    pub fn dropped_up(&self) -> u64 {
        self.stats.dropped_up()
    }

    pub fn dropped_down(&self) -> u64 {
        self.stats.dropped_down()
    }

    pub fn stats(&self) -> Arc<DiscardStats> {
        self.stats.clone()
    }

    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Zero all counters; configuration is left alone
    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    // ============== Decisions ==============

    fn draw(&self) -> f64 {
        self.rng.lock().gen::<f64>()
    }

    /// Decide whether a message from `sender` must not be passed up
    fn check_up(&self, sender: Option<&Address>) -> Option<DropReason> {
        if self.settings.discard_all() && !self.is_local(sender) {
            return Some(DropReason::DiscardAll);
        }

        if sender.map_or(false, |s| self.ignored.contains(s)) {
            return Some(DropReason::Ignored);
        }

        let up_rate = self.settings.up_rate();
        if up_rate > 0.0 && self.draw() < up_rate {
            if self.settings.exclude_self() && self.is_local(sender) {
                trace!(layer = LAYER_NAME, "Excluding myself");
            } else {
                return Some(DropReason::Rate);
            }
        }

        None
    }

    /// Returns true if the message was dropped
    fn filter_up(&self, msg: &Message, sender: Option<&Address>) -> bool {
        match self.check_up(sender) {
            Some(reason) => {
                self.record_drop(Direction::Up, reason, sender, msg);
                true
            }
            None => false,
        }
    }

    fn down_message(&self, mut msg: Message) -> StackResult<Option<Reply>> {
        let local = self.local_address();
        if msg.src.is_none() {
            msg.src = local.clone();
        }

        let multicast = msg.is_multicast();
        let to_self = match (&msg.dest, &local) {
            (Some(dest), Some(local)) => dest == local,
            _ => false,
        };

        if self.settings.discard_all() {
            if multicast || to_self {
                self.loopback(&msg);
            } else {
                self.record_drop(Direction::Down, DropReason::DiscardAll, msg.dest.as_ref(), &msg);
            }
            return Ok(None);
        }

        if !multicast && self.settings.take_unicast() {
            self.record_drop(Direction::Down, DropReason::UnicastBudget, msg.dest.as_ref(), &msg);
            return Ok(None);
        }

        if multicast && self.settings.take_multicast() {
            self.record_drop(
                Direction::Down,
                DropReason::MulticastBudget,
                msg.dest.as_ref(),
                &msg,
            );
            return Ok(None);
        }

        let down_rate = self.settings.down_rate();
        if down_rate > 0.0 && self.draw() < down_rate {
            if self.settings.exclude_self() && to_self {
                trace!(layer = LAYER_NAME, "Excluding itself");
            } else {
                self.record_drop(Direction::Down, DropReason::Rate, msg.dest.as_ref(), &msg);
                return Ok(None);
            }
        }

        self.neighbors.pass_down(Event::Message(msg))
    }

    /// Hand a copy of `msg` to the layer above, off the calling thread
    fn loopback(&self, msg: &Message) {
        let mut copy = msg.copy();
        if copy.src.is_none() {
            copy.src = self.local_address();
        }

        trace!(
            layer = LAYER_NAME,
            src = ?copy.src,
            size = copy.payload.len(),
            "Looping back message"
        );

        spawn_loopback(
            self.neighbors.above(),
            copy,
            self.stats.clone(),
            self.event_tx.clone(),
        );
    }

    fn record_drop(
        &self,
        direction: Direction,
        reason: DropReason,
        peer: Option<&Address>,
        msg: &Message,
    ) {
        if reason.is_counted() {
            let counter = match direction {
                Direction::Up => &self.stats.dropped_up,
                Direction::Down => &self.stats.dropped_down,
            };
            counter.fetch_add(1, Ordering::Relaxed);
        }

        trace!(
            layer = LAYER_NAME,
            local = ?self.local_address.read().as_ref().map(|a| a.to_string()),
            %direction,
            reason = reason.as_str(),
            peer = ?peer.map(|a| a.to_string()),
            size = msg.payload.len(),
            "Dropping message"
        );

        metrics::record_message_dropped(direction, reason);
        emit(
            &self.event_tx,
            DiscardEvent::MessageDropped {
                direction,
                reason,
                peer: peer.cloned(),
            },
        );
    }
}

impl Layer for DiscardLayer {
    fn name(&self) -> &str {
        LAYER_NAME
    }

    fn up(&self, event: Event) -> StackResult<Option<Reply>> {
        match event {
            Event::SetLocalAddress(addr) => {
                self.set_local_address(addr.clone());
                self.neighbors.pass_up(Event::SetLocalAddress(addr))
            }
            Event::Message(msg) => {
                let sender = msg.src.clone();
                if self.filter_up(&msg, sender.as_ref()) {
                    return Ok(None);
                }
                self.neighbors.pass_up(Event::Message(msg))
            }
            other => self.neighbors.pass_up(other),
        }
    }

    fn up_batch(&self, mut batch: MessageBatch) -> StackResult<()> {
        let senders: Vec<Option<Address>> = batch
            .messages
            .iter()
            .map(|msg| batch.sender_of(msg).cloned())
            .collect();
        let mut senders = senders.into_iter();
        batch.messages.retain(|msg| {
            let sender = senders.next().flatten();
            !self.filter_up(msg, sender.as_ref())
        });

        if batch.is_empty() {
            return Ok(());
        }
        self.neighbors.pass_up_batch(batch)
    }

    fn down(&self, event: Event) -> StackResult<Option<Reply>> {
        match event {
            Event::Message(msg) => self.down_message(msg),
            Event::ViewChange(view) => {
                debug!(
                    layer = LAYER_NAME,
                    view_id = view.view_id,
                    members = view.members.len(),
                    "Installing view"
                );
                self.members.install(&view);
                self.neighbors.pass_down(Event::ViewChange(view))
            }
            Event::SetLocalAddress(addr) => {
                self.set_local_address(addr.clone());
                self.neighbors.pass_down(Event::SetLocalAddress(addr))
            }
            Event::DiscoveryRequest if self.settings.discard_all() => {
                trace!(layer = LAYER_NAME, "Suppressing discovery request");
                Ok(None)
            }
            other => self.neighbors.pass_down(other),
        }
    }

    fn neighbors(&self) -> &Neighbors {
        &self.neighbors
    }
}

impl std::fmt::Debug for DiscardLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscardLayer")
            .field("config", &self.config())
            .field("local_address", &*self.local_address.read())
            .field("ignored", &self.ignored.len())
            .field("stats", &self.stats.summary())
            .finish()
    }
}

/// Builder for discard layers
pub struct DiscardLayerBuilder {
    config: DiscardConfig,
    local_address: Option<Address>,
    ignored: Vec<Address>,
    event_tx: Option<mpsc::Sender<DiscardEvent>>,
}

impl DiscardLayerBuilder {
    pub fn new() -> Self {
        Self {
            config: DiscardConfig::default(),
            local_address: None,
            ignored: Vec::new(),
            event_tx: None,
        }
    }

    pub fn config(mut self, config: DiscardConfig) -> Self {
        self.config = config;
        self
    }

    pub fn up_rate(mut self, rate: f64) -> Self {
        self.config.up_rate = rate;
        self
    }

    pub fn down_rate(mut self, rate: f64) -> Self {
        self.config.down_rate = rate;
        self
    }

    pub fn exclude_self(mut self, exclude: bool) -> Self {
        self.config.exclude_self = exclude;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn local_address(mut self, addr: Address) -> Self {
        self.local_address = Some(addr);
        self
    }

    pub fn ignore(mut self, addr: Address) -> Self {
        self.ignored.push(addr);
        self
    }

    pub fn events(mut self, tx: mpsc::Sender<DiscardEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn build(self) -> DiscardResult<DiscardLayer> {
        let mut layer = DiscardLayer::new(self.config)?;
        if let Some(addr) = self.local_address {
            layer = layer.with_local_address(addr);
        }
        if let Some(tx) = self.event_tx {
            layer = layer.with_events(tx);
        }
        for addr in self.ignored {
            layer.add_ignored(addr);
        }
        Ok(layer)
    }
}

impl Default for DiscardLayerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
