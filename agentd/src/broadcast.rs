//! Fan-out of run steps to connected WebSocket observers.
//!
//! The orchestrator's drain task is the single consumer of the step
//! queue; it pushes each step here, and every connected observer gets
//! its own unbounded channel. A slow or dead observer is pruned, never
//! blocked on.

use std::sync::Mutex;

use tokio::sync::mpsc;

use wire_types::Step;

/// One item on a per-observer channel.
#[derive(Debug, Clone)]
pub enum StreamItem {
    Step(Step),
    /// The run's sentinel: close the stream gracefully.
    End,
}

#[derive(Default)]
pub struct StepBroadcaster {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<StreamItem>>>,
}

impl StepBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer and hand back its channel.
    ///
    /// A connector joining mid-run sees steps from this point onward.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<StreamItem> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Push one step to every connected observer, pruning the dead.
    pub fn broadcast(&self, step: &Step) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|tx| tx.send(StreamItem::Step(step.clone())).is_ok());
        }
    }

    /// Terminate all streams gracefully after a completed run.
    pub fn finish(&self) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            for tx in subscribers.drain(..) {
                let _ = tx.send(StreamItem::End);
            }
        }
    }

    /// Drop all observers without a terminal marker. Used when a run
    /// fails: subscribers see an abrupt close, not a fabricated end.
    pub fn abort(&self) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.clear();
        }
    }
}
