//! Asynchronous delivery of self-addressed messages
//!
//! Each looped-back message gets its own unit of work so the downward caller
//! never waits on the upward path.

use crate::discard::events::DiscardEvent;
use crate::discard::stats::DiscardStats;
use crate::metrics;
use crate::stack::{Event, Layer, Message, StackResult};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Deliver `msg` to `above` without blocking the caller.
///
/// Runs on the current tokio runtime's blocking pool when there is one, and on
/// a fresh OS thread otherwise.
pub(crate) fn spawn_loopback(
    above: StackResult<Arc<dyn Layer>>,
    msg: Message,
    stats: Arc<DiscardStats>,
    events: Option<mpsc::Sender<DiscardEvent>>,
) {
    let src = msg.src.clone();
    let spawn_stats = stats.clone();
    let task = move || {
        let result = above.and_then(|layer| layer.up(Event::Message(msg)));
        match result {
            Ok(_) => {
                stats.loopbacks_delivered.fetch_add(1, Ordering::Relaxed);
                metrics::record_loopback();
                emit(&events, DiscardEvent::LoopbackDelivered { src });
            }
            Err(e) => {
                tracing::warn!("Loopback delivery failed: {}", e);
                stats.loopback_failures.fetch_add(1, Ordering::Relaxed);
                metrics::record_loopback_failure();
                emit(
                    &events,
                    DiscardEvent::LoopbackFailed {
                        error: e.to_string(),
                    },
                );
            }
        }
    };

    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn_blocking(task);
        }
        Err(_) => {
            let spawned = std::thread::Builder::new()
                .name("lossgate-loopback".into())
                .spawn(task);
            if let Err(e) = spawned {
                tracing::warn!("Failed to spawn loopback thread: {}", e);
                spawn_stats.loopback_failures.fetch_add(1, Ordering::Relaxed);
                metrics::record_loopback_failure();
            }
        }
    }
}

/// Send an event to the listener, if any, without waiting
pub(crate) fn emit(events: &Option<mpsc::Sender<DiscardEvent>>, event: DiscardEvent) {
    if let Some(tx) = events {
        let _ = tx.try_send(event);
    }
}
