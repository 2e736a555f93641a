//! Top layer of a simulated stack that records what reaches the application

use crate::stack::{
    Event, Layer, Message, MessageBatch, Neighbors, Reply, StackError, StackResult, View,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const APP_NAME: &str = "APP";

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Application layer that keeps every message delivered to it
pub struct RecordingApp {
    neighbors: Neighbors,
    delivered: Mutex<Vec<Message>>,
    batches: Mutex<Vec<MessageBatch>>,
    /// Non-message events that reached the top
    events: Mutex<Vec<Event>>,
    rejecting: AtomicBool,
}

impl RecordingApp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            neighbors: Neighbors::new(APP_NAME),
            delivered: Mutex::new(Vec::new()),
            batches: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            rejecting: AtomicBool::new(false),
        })
    }

    /// Send a message down the stack
    pub fn send(&self, msg: Message) -> StackResult<()> {
        self.neighbors.pass_down(Event::Message(msg))?;
        Ok(())
    }

    pub fn install_view(&self, view: View) -> StackResult<()> {
        self.neighbors.pass_down(Event::ViewChange(view))?;
        Ok(())
    }

    /// Refuse every delivery from now on
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::Release);
    }

    pub fn delivered(&self) -> Vec<Message> {
        self.delivered.lock().clone()
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.lock().len()
    }

    pub fn batches(&self) -> Vec<MessageBatch> {
        self.batches.lock().clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.delivered.lock().clear();
        self.batches.lock().clear();
        self.events.lock().clear();
    }

    /// Wait until at least `count` messages were delivered
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.delivered_count() >= count {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Blocking variant of [`wait_for`](Self::wait_for) for plain threads
    pub fn wait_for_blocking(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.delivered_count() >= count {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn check_accepting(&self) -> StackResult<()> {
        if self.rejecting.load(Ordering::Acquire) {
            return Err(StackError::Rejected {
                layer: APP_NAME.into(),
                reason: "application is rejecting deliveries".into(),
            });
        }
        Ok(())
    }
}

impl Layer for RecordingApp {
    fn name(&self) -> &str {
        APP_NAME
    }

    fn up(&self, event: Event) -> StackResult<Option<Reply>> {
        self.check_accepting()?;
        match event {
            Event::Message(msg) => self.delivered.lock().push(msg),
            other => self.events.lock().push(other),
        }
        Ok(None)
    }

    fn up_batch(&self, batch: MessageBatch) -> StackResult<()> {
        self.check_accepting()?;
        self.batches.lock().push(batch);
        Ok(())
    }

    fn down(&self, event: Event) -> StackResult<Option<Reply>> {
        self.neighbors.pass_down(event)
    }

    fn neighbors(&self) -> &Neighbors {
        &self.neighbors
    }
}
