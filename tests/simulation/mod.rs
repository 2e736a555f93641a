//! Shared helpers for driving simulated groups in tests

#![allow(dead_code)]

use lossgate::discard::DiscardConfig;
use lossgate::sim::{start_group, RecordingApp, SimNetwork, SimNode};
use lossgate::stack::{Address, Event, Message};
use std::sync::Arc;

/// Start a group of `count` nodes sharing the same discard configuration
pub fn group(count: usize, config: DiscardConfig) -> (Arc<SimNetwork>, Vec<SimNode>) {
    start_group(count, config).expect("group should start")
}

/// Send `count` multicasts numbered from zero
pub fn multicast_n(node: &SimNode, count: usize) {
    for i in 0..count {
        node.send(Message::multicast(format!("m{}", i))).unwrap();
    }
}

/// Send `count` unicasts to `dest` numbered from zero
pub fn unicast_n(node: &SimNode, dest: &Address, count: usize) {
    for i in 0..count {
        node.send(Message::unicast(dest.clone(), format!("u{}", i)))
            .unwrap();
    }
}

/// Inject `count` messages from `sender` at the bottom of `node`'s stack
pub fn inject_from(node: &SimNode, sender: &Address, count: usize) {
    for i in 0..count {
        let msg = Message::multicast(format!("in{}", i)).with_src(sender.clone());
        node.stack.receive(Event::Message(msg)).unwrap();
    }
}

/// Payloads delivered to an application, as strings
pub fn payloads(app: &RecordingApp) -> Vec<String> {
    app.delivered()
        .iter()
        .map(|m| String::from_utf8_lossy(&m.payload).into_owned())
        .collect()
}

/// Number of delivered messages whose source is `sender`
pub fn delivered_from(app: &RecordingApp, sender: &Address) -> usize {
    app.delivered()
        .iter()
        .filter(|m| m.src.as_ref() == Some(sender))
        .count()
}
