use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use domain::output::{ManipulateOutcome, ManipulateRequest, OutputId, RunMode};
use domain::DomainError;

use crate::output::OutputRuntime;
use crate::recorder::RecorderWorkers;

/// Owns every output runtime of the daemon.
///
/// Each runtime sits behind its own async mutex so commands for one output
/// are serialized while different outputs proceed in parallel.
pub struct OutputManager {
    runtimes: DashMap<OutputId, Arc<Mutex<OutputRuntime>>>,
    recorder_workers: Mutex<Option<RecorderWorkers>>,
    watcher: Mutex<Option<JoinHandle<()>>>,
    cancel_token: CancellationToken,
}

impl OutputManager {
    pub fn new(recorder_workers: RecorderWorkers) -> Self {
        Self {
            runtimes: DashMap::new(),
            recorder_workers: Mutex::new(Some(recorder_workers)),
            watcher: Mutex::new(None),
            cancel_token: CancellationToken::new(),
        }
    }

    /// Set up the runtime and start serving commands for it
    pub async fn register(&self, mut runtime: OutputRuntime) -> Result<(), DomainError> {
        let output_id = runtime.output().id.clone();
        if self.runtimes.contains_key(&output_id) {
            return Err(DomainError::InvalidConfiguration(format!(
                "Output {} registered twice",
                output_id
            )));
        }

        runtime.setup().await?;
        self.runtimes
            .insert(output_id.clone(), Arc::new(Mutex::new(runtime)));
        info!(output_id = %output_id, "🔌 Output registered");
        Ok(())
    }

    pub async fn manipulate(
        &self,
        output_id: &OutputId,
        request: ManipulateRequest,
    ) -> Result<ManipulateOutcome, DomainError> {
        let runtime = self.runtime(output_id)?;
        let mut runtime = runtime.lock().await;
        Ok(runtime.manipulate(request).await)
    }

    pub async fn seconds_currently_on(&self, output_id: &OutputId) -> Result<f64, DomainError> {
        let runtime = self.runtime(output_id)?;
        let runtime = runtime.lock().await;
        Ok(runtime.seconds_currently_on())
    }

    pub async fn run_mode(&self, output_id: &OutputId) -> Result<RunMode, DomainError> {
        let runtime = self.runtime(output_id)?;
        let runtime = runtime.lock().await;
        Ok(runtime.run_mode())
    }

    pub fn output_ids(&self) -> Vec<OutputId> {
        self.runtimes.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Periodically turn off outputs whose timed window has elapsed
    pub async fn start_expiry_watcher(self: &Arc<Self>, period: Duration) {
        let manager = Arc::clone(self);
        let token = self.cancel_token.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => manager.expire_due().await,
                }
            }
            debug!("Expiry watcher stopped");
        });

        *self.watcher.lock().await = Some(handle);
        info!(period_ms = period.as_millis() as u64, "⏱️ Expiry watcher started");
    }

    /// Run one expiry pass over all outputs
    pub async fn expire_due(&self) {
        for runtime in self.snapshot() {
            let mut runtime = runtime.lock().await;
            if let Some(outcome) = runtime.expire_if_due().await {
                if !outcome.is_accepted() {
                    warn!(
                        output_id = %runtime.output().id,
                        message = %outcome.message,
                        "Failed to turn off expired output"
                    );
                }
            }
        }
    }

    /// Stop the watcher, shut every output down, then flush the recorder
    pub async fn shutdown_all(&self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.watcher.lock().await.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "Expiry watcher panicked");
            }
        }

        for runtime in self.snapshot() {
            runtime.lock().await.shutdown().await;
        }

        if let Some(workers) = self.recorder_workers.lock().await.take() {
            workers.shutdown().await;
        }
        info!("🛑 All outputs stopped");
    }

    fn runtime(&self, output_id: &OutputId) -> Result<Arc<Mutex<OutputRuntime>>, DomainError> {
        self.runtimes
            .get(output_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DomainError::OutputNotFound(output_id.to_string()))
    }

    // Clone the handles out so no DashMap guard is held across an await.
    fn snapshot(&self) -> Vec<Arc<Mutex<OutputRuntime>>> {
        self.runtimes
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}
