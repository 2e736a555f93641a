//! Membership snapshot and ignore-list

use crate::metrics;
use crate::stack::{Address, View};
use dashmap::DashSet;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Members whose upward traffic is always dropped.
///
/// Not reconciled with the current view: a member stays ignored after it
/// leaves the group. Mutations are serialized with the size published to
/// the `lossgate_ignored_members` gauge, so the gauge always ends at the
/// final size.
#[derive(Debug, Default)]
pub struct IgnoreList {
    members: DashSet<Address>,
    writer: Mutex<()>,
    /// Size last published to the gauge
    reported: AtomicUsize,
}

impl IgnoreList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the member was not ignored before
    pub fn add(&self, addr: Address) -> bool {
        let _guard = self.writer.lock();
        let added = self.members.insert(addr);
        self.publish();
        added
    }

    /// Returns true if the member was ignored
    pub fn remove(&self, addr: &Address) -> bool {
        let _guard = self.writer.lock();
        let removed = self.members.remove(addr).is_some();
        self.publish();
        removed
    }

    pub fn clear(&self) {
        let _guard = self.writer.lock();
        self.members.clear();
        self.publish();
    }

    /// Size last published to the gauge
    pub fn reported_len(&self) -> usize {
        self.reported.load(Ordering::Acquire)
    }

    // Caller holds `writer`
    fn publish(&self) {
        let len = self.members.len();
        self.reported.store(len, Ordering::Release);
        metrics::set_ignored_members(len);
    }

    pub fn contains(&self, addr: &Address) -> bool {
        self.members.contains(addr)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Address> {
        self.members.iter().map(|a| a.key().clone()).collect()
    }
}

/// Last view seen travelling down the stack
#[derive(Debug, Default)]
pub struct MembershipSnapshot {
    view: RwLock<Option<View>>,
}

impl MembershipSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot with `view`
    pub fn install(&self, view: &View) {
        *self.view.write() = Some(view.clone());
    }

    pub fn members(&self) -> Vec<Address> {
        self.view
            .read()
            .as_ref()
            .map(|v| v.members.clone())
            .unwrap_or_default()
    }

    pub fn view_id(&self) -> Option<u64> {
        self.view.read().as_ref().map(|v| v.view_id)
    }
}
