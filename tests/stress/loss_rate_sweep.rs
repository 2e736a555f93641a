//! Observed loss against configured rates

use crate::simulation::{group, inject_from, unicast_n};
use lossgate::discard::DiscardConfig;
use lossgate::stack::Address;

const SAMPLES: usize = 4000;
const TOLERANCE: f64 = 0.04;

#[test]
fn test_up_rate_sweep() {
    println!("\n=== Upward Loss Sweep ===\n");
    println!("  {:>6}  {:>8}  {:>8}", "rate", "dropped", "observed");

    let peer = Address::named("peer");
    for (i, rate) in [0.05, 0.1, 0.25, 0.5, 0.75, 0.9].into_iter().enumerate() {
        let (_network, nodes) = group(1, DiscardConfig::lossy(rate).with_seed(1000 + i as u64));
        let node = &nodes[0];

        inject_from(node, &peer, SAMPLES);

        let dropped = node.discard.dropped_up();
        let observed = dropped as f64 / SAMPLES as f64;
        println!("  {:>6.2}  {:>8}  {:>8.3}", rate, dropped, observed);

        assert_eq!(dropped + node.app.delivered_count() as u64, SAMPLES as u64);
        assert!(
            (observed - rate).abs() < TOLERANCE,
            "rate {} observed {}",
            rate,
            observed
        );
    }
}

#[test]
fn test_down_rate_sweep() {
    for (i, rate) in [0.1, 0.5, 0.9].into_iter().enumerate() {
        let (network, nodes) = group(2, DiscardConfig::default().with_seed(7 + i as u64));
        let (sender, receiver) = (&nodes[0], &nodes[1]);
        sender.discard.set_down_rate(rate);

        unicast_n(sender, &receiver.address, SAMPLES);

        let dropped = sender.discard.dropped_down();
        let observed = dropped as f64 / SAMPLES as f64;
        assert_eq!(
            dropped + network.stats().total_sent(),
            SAMPLES as u64
        );
        assert!((observed - rate).abs() < TOLERANCE);
    }
}
