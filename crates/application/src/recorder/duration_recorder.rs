use domain::measurement::{MeasurementSample, MeasurementStore};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Fire-and-forget writer for measurement samples.
///
/// Cheap to clone; every clone feeds the same bounded queue. `record` never
/// waits: when the queue is full the incoming sample is dropped and logged.
#[derive(Clone)]
pub struct DurationRecorder {
    tx: mpsc::Sender<MeasurementSample>,
}

/// Worker tasks draining the recorder queue into the store
pub struct RecorderWorkers {
    handles: Vec<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl DurationRecorder {
    /// Spawn `workers` tasks writing into `store` from a queue of `capacity` samples
    pub fn start(
        store: Arc<dyn MeasurementStore>,
        capacity: usize,
        workers: usize,
    ) -> (Self, RecorderWorkers) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let cancel_token = CancellationToken::new();

        let handles = (0..workers.max(1))
            .map(|worker| {
                let rx = rx.clone();
                let store = store.clone();
                let token = cancel_token.clone();
                tokio::spawn(async move {
                    debug!(worker, "Recorder worker started");
                    run_worker(rx, store, token).await;
                    debug!(worker, "Recorder worker stopped");
                })
            })
            .collect();

        info!(capacity, workers, "📈 Duration recorder started");

        (
            Self { tx },
            RecorderWorkers {
                handles,
                cancel_token,
            },
        )
    }

    /// Queue a sample for persistence. Returns false if it was dropped.
    pub fn record(&self, sample: MeasurementSample) -> bool {
        match self.tx.try_send(sample) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(sample)) => {
                warn!(
                    output_id = %sample.output_id,
                    measurement = sample.measurement.as_str(),
                    "Recorder queue full; dropping sample"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(sample)) => {
                warn!(
                    output_id = %sample.output_id,
                    measurement = sample.measurement.as_str(),
                    "Recorder stopped; dropping sample"
                );
                false
            }
        }
    }
}

impl RecorderWorkers {
    /// Let the workers drain what is queued, then wait for them to exit
    pub async fn shutdown(self) {
        self.cancel_token.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Recorder worker panicked");
            }
        }
        info!("📈 Duration recorder stopped");
    }
}

async fn run_worker(
    rx: Arc<Mutex<mpsc::Receiver<MeasurementSample>>>,
    store: Arc<dyn MeasurementStore>,
    cancel_token: CancellationToken,
) {
    loop {
        let next = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                sample = rx.recv() => sample,
                _ = cancel_token.cancelled() => rx.try_recv().ok(),
            }
        };

        let Some(sample) = next else {
            break;
        };

        match store.write_sample(&sample).await {
            Ok(()) => debug!(
                output_id = %sample.output_id,
                measurement = sample.measurement.as_str(),
                value = sample.value,
                timestamp = %sample.timestamp,
                "Sample written"
            ),
            Err(e) => error!(
                output_id = %sample.output_id,
                measurement = sample.measurement.as_str(),
                error = %e,
                "Failed to write sample"
            ),
        }
    }
}
