//! Metrics recorder for fault injection
//!
//! Records what the discard layers drop and loop back.

use crate::discard::DropReason;
use crate::stack::Direction;
use ::metrics::{counter, describe_counter, describe_gauge, gauge};
use std::sync::atomic::{AtomicBool, Ordering};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize metric descriptions (call once at startup)
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return; // Already initialized
    }

    describe_counter!(
        "lossgate_messages_dropped_total",
        "Total number of messages suppressed by discard layers"
    );
    describe_counter!(
        "lossgate_loopback_total",
        "Total number of self-addressed messages looped back"
    );
    describe_counter!(
        "lossgate_loopback_failures_total",
        "Total number of looped-back messages that could not be delivered"
    );

    describe_gauge!(
        "lossgate_ignored_members",
        "Current number of members on the ignore-list"
    );
}

/// Record a message being dropped
pub fn record_message_dropped(direction: Direction, reason: DropReason) {
    counter!(
        "lossgate_messages_dropped_total",
        "direction" => direction.as_str(),
        "reason" => reason.as_str()
    )
    .increment(1);
}

/// Record a loopback copy being delivered
pub fn record_loopback() {
    counter!("lossgate_loopback_total").increment(1);
}

/// Record a loopback copy failing
pub fn record_loopback_failure() {
    counter!("lossgate_loopback_failures_total").increment(1);
}

/// Update the ignore-list size gauge
pub fn set_ignored_members(count: usize) {
    gauge!("lossgate_ignored_members").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics() {
        // Should not panic when called multiple times
        init_metrics();
        init_metrics();
    }

    #[test]
    fn test_record_without_recorder() {
        // No recorder installed: calls are no-ops
        record_message_dropped(Direction::Up, DropReason::Rate);
        record_loopback();
        record_loopback_failure();
        set_ignored_members(3);
    }
}
