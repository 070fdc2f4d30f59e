//! Single-flight step orchestration.
//!
//! One long-lived task runner, exclusively owned. `chat` serializes
//! runs behind the runner lock: a second caller is rejected, never
//! interleaved. Every produced step goes to the local callbacks and
//! onto a bounded per-run queue whose single consumer fans it out to
//! WebSocket observers. The run's sentinel is enqueued after the last
//! real step and before `chat` returns, so subscribers never learn the
//! final answer after the caller does.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use wire_types::Step;

use crate::broadcast::StepBroadcaster;
use crate::callbacks::StepCallback;
use crate::runner::TaskRunner;

/// Capacity of the per-run step queue.
pub const STEP_QUEUE_DEPTH: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// A previous run's sentinel has not been consumed yet.
    #[error("a run is already active")]
    AlreadyActive,
    /// The task runner failed while advancing; fatal for this run.
    #[error("task runner failed: {0}")]
    Runner(String),
}

pub struct StepOrchestrator {
    runner: Mutex<Box<dyn TaskRunner>>,
    callbacks: Vec<Arc<dyn StepCallback>>,
    broadcaster: Arc<StepBroadcaster>,
}

impl StepOrchestrator {
    pub fn new(runner: Box<dyn TaskRunner>) -> Self {
        Self {
            runner: Mutex::new(runner),
            callbacks: Vec::new(),
            broadcaster: Arc::new(StepBroadcaster::new()),
        }
    }

    pub fn with_callback(mut self, callback: Arc<dyn StepCallback>) -> Self {
        self.callbacks.push(callback);
        self
    }

    pub fn broadcaster(&self) -> Arc<StepBroadcaster> {
        self.broadcaster.clone()
    }

    /// Run one full agent turn and return the finalized result.
    pub async fn chat(&self, message: &str) -> Result<String, RunError> {
        let mut runner = self
            .runner
            .try_lock()
            .map_err(|_| RunError::AlreadyActive)?;

        let (tx, rx) = mpsc::channel::<Option<Step>>(STEP_QUEUE_DEPTH);
        let drain = tokio::spawn(drain_queue(rx, self.broadcaster.clone()));

        let result = self.drive(runner.as_mut(), message, &tx).await;

        if result.is_ok() {
            // Sentinel: always the last item enqueued for the run.
            let _ = tx.send(None).await;
        }
        // On failure the sender drops without a sentinel and observers
        // see an abrupt close; steps already enqueued still deliver.
        drop(tx);
        if let Err(e) = drain.await {
            tracing::error!(error = %e, "Step drain task panicked");
        }

        match &result {
            Ok(_) => tracing::info!("Run completed"),
            Err(e) => tracing::error!(error = %e, "Run failed"),
        }
        result
    }

    async fn drive(
        &self,
        runner: &mut dyn TaskRunner,
        message: &str,
        tx: &mpsc::Sender<Option<Step>>,
    ) -> Result<String, RunError> {
        runner
            .create_task(message)
            .await
            .map_err(|e| RunError::Runner(e.to_string()))?;

        let mut cursor = 0usize;
        loop {
            let advanced = runner.advance().await;
            // Flush whatever the runner produced, even on a failed
            // advance: partial steps remain valid and are delivered.
            self.flush_new_steps(runner, &mut cursor, tx).await;
            match advanced {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => return Err(RunError::Runner(e.to_string())),
            }
        }

        runner
            .finalize()
            .await
            .map_err(|e| RunError::Runner(e.to_string()))
    }

    async fn flush_new_steps(
        &self,
        runner: &dyn TaskRunner,
        cursor: &mut usize,
        tx: &mpsc::Sender<Option<Step>>,
    ) {
        let new_steps: Vec<Step> = runner.produced_steps()[*cursor..].to_vec();
        *cursor += new_steps.len();

        for step in new_steps {
            // Callbacks run synchronously, in registration order,
            // before the step is queued for streaming.
            for callback in &self.callbacks {
                callback.on_step(&step);
            }
            if tx.send(Some(step)).await.is_err() {
                tracing::warn!("Step queue consumer gone; dropping remaining steps");
                return;
            }
        }
    }

    /// Discard all task-runner state.
    ///
    /// Blocks until any in-flight run has finished rather than racing
    /// it. Idempotent from idle.
    pub async fn reset(&self) {
        let mut runner = self.runner.lock().await;
        runner.reset();
        tracing::info!("Task runner reset");
    }
}

/// Single consumer of one run's step queue.
async fn drain_queue(
    mut rx: mpsc::Receiver<Option<Step>>,
    broadcaster: Arc<StepBroadcaster>,
) {
    while let Some(item) = rx.recv().await {
        match item {
            Some(step) => broadcaster.broadcast(&step),
            None => {
                broadcaster.finish();
                return;
            }
        }
    }
    // Sender dropped without a sentinel: the run failed.
    broadcaster.abort();
}
