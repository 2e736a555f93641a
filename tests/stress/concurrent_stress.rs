//! Concurrent filtering stress tests
//!
//! Many threads sending through the same layer while its settings change

use crate::simulation::{delivered_from, group, inject_from};
use futures::future::join_all;
use lossgate::discard::DiscardConfig;
use lossgate::stack::{Message, View};
use std::time::{Duration, Instant};

const THREADS: usize = 8;

/// Budget decrements from many threads never overshoot or undershoot
#[test]
fn test_concurrent_unicast_budget() {
    println!("\n=== Concurrent Unicast Budget ===\n");

    let per_thread = 100;
    let budget = 250u32;
    let (_network, nodes) = group(2, DiscardConfig::default().with_drop_down_unicasts(budget));
    let (sender, receiver) = (&nodes[0], &nodes[1]);

    let start = Instant::now();
    std::thread::scope(|s| {
        for t in 0..THREADS {
            s.spawn(move || {
                for i in 0..per_thread {
                    sender
                        .send(Message::unicast(
                            receiver.address.clone(),
                            format!("t{}-{}", t, i),
                        ))
                        .unwrap();
                }
            });
        }
    });

    let total = THREADS * per_thread;
    let delivered = receiver.app.delivered_count();
    println!(
        "  sent: {}  delivered: {}  budget: {}  ({:?})",
        total,
        delivered,
        budget,
        start.elapsed()
    );

    assert_eq!(delivered, total - budget as usize);
    assert_eq!(sender.discard.drop_down_unicasts(), 0);
    assert_eq!(sender.discard.dropped_down(), 0);
    println!("✓ Exactly {} unicasts dropped", budget);
}

#[test]
fn test_concurrent_multicast_budget() {
    let per_thread = 50;
    let budget = 120u32;
    let (_network, nodes) = group(3, DiscardConfig::default().with_drop_down_multicasts(budget));
    let sender = &nodes[0];

    std::thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(move || {
                for i in 0..per_thread {
                    sender.send(Message::multicast(format!("m{}", i))).unwrap();
                }
            });
        }
    });

    let expected = THREADS * per_thread - budget as usize;
    for node in &nodes {
        assert_eq!(delivered_from(&node.app, &sender.address), expected);
    }
    assert_eq!(sender.discard.drop_down_multicasts(), 0);
}

/// Every message is either delivered or counted as dropped while the
/// ignore-list changes underneath the filter
#[test]
fn test_ignore_list_churn() {
    println!("\n=== Ignore-List Churn ===\n");

    let per_thread = 500;
    let (_network, nodes) = group(2, DiscardConfig::none());
    let (peer, receiver) = (&nodes[0], &nodes[1]);

    std::thread::scope(|s| {
        let senders: Vec<_> = (0..4)
            .map(|_| s.spawn(move || inject_from(receiver, &peer.address, per_thread)))
            .collect();

        s.spawn(move || {
            for _ in 0..1000 {
                receiver.discard.add_ignored(peer.address.clone());
                std::thread::yield_now();
                receiver.discard.remove_ignored(&peer.address);
            }
        });

        for handle in senders {
            handle.join().unwrap();
        }
    });

    let total = 4 * per_thread;
    let delivered = receiver.app.delivered_count() as u64;
    let dropped = receiver.discard.dropped_up();
    println!("  delivered: {}  dropped: {}", delivered, dropped);

    assert_eq!(delivered + dropped, total as u64);
    assert!(!receiver.discard.is_ignored(&peer.address));
    println!("✓ No message lost or double counted");
}

/// Readers always see one whole installed view while views keep changing
#[test]
fn test_view_churn() {
    println!("\n=== View Churn ===\n");

    let (_network, nodes) = group(4, DiscardConfig::none());
    let node = &nodes[0];
    let all: Vec<_> = nodes.iter().map(|n| n.address.clone()).collect();
    let views = 2000u64;

    std::thread::scope(|s| {
        let all = &all;
        s.spawn(move || {
            for id in 2..views {
                let size = (id % all.len() as u64) as usize + 1;
                node.install_view(View::new(id, all[..size].to_vec()))
                    .unwrap();
            }
        });

        for _ in 0..4 {
            s.spawn(move || {
                let mut last_id = 0;
                for _ in 0..5000 {
                    let members = node.discard.members();
                    assert!(!members.is_empty());
                    assert_eq!(members, all[..members.len()].to_vec());

                    let id = node.discard.view_id().unwrap();
                    assert!(id >= last_id, "view id went back: {} < {}", id, last_id);
                    last_id = id;
                }
            });
        }
    });

    let final_size = ((views - 1) % all.len() as u64) as usize + 1;
    assert_eq!(node.discard.view_id(), Some(views - 1));
    assert_eq!(node.discard.members(), all[..final_size].to_vec());
    println!("✓ {} views installed, readers saw only whole views", views - 2);
}

/// Loopbacks issued from many tasks all reach the application exactly once
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_loopbacks() {
    println!("\n=== Concurrent Loopbacks ===\n");

    let tasks = 16;
    let per_task = 25;
    let (network, nodes) = group(3, DiscardConfig::partitioned());
    let node = &nodes[0];
    let sent_before = network.stats().total_sent();

    let start = Instant::now();
    let sends = (0..tasks).map(|t| async move {
        for i in 0..per_task {
            node.send(Message::multicast(format!("t{}-{}", t, i))).unwrap();
            tokio::task::yield_now().await;
        }
    });
    join_all(sends).await;

    let total = tasks * per_task;
    assert!(node.app.wait_for(total, Duration::from_secs(10)).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("  {} loopbacks delivered in {:?}", total, start.elapsed());

    assert_eq!(node.app.delivered_count(), total);
    assert_eq!(node.discard.stats().loopbacks_delivered(), total as u64);
    assert_eq!(network.stats().total_sent(), sent_before);
    assert_eq!(nodes[1].app.delivered_count(), 0);
    println!("✓ Every loopback delivered once, nothing sent");
}
