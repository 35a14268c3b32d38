//! Owns everything a report run needs and makes sure only one runs at a time.

use std::path::{Path, PathBuf};
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use popcoords::pipeline::{self, PipelineOptions};
use popcoords::progress::{self, ProgressReceiver};
use popcoords::render::DocumentRenderer;
use popcoords::types::{PopCode, RunReport};
use popcoords::{PipelineError, WebScraper};
use tokio::sync::{Mutex, Notify};

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("A report is already being generated")]
    Busy,
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("Report run aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

/// Hands each run's progress receiver to the next `/logs` reader.
///
/// Only the latest unclaimed run is kept; a newer run replaces it, and a run
/// nobody claimed is dropped once it finishes.
#[derive(Default)]
pub struct LogHub {
    pending: Mutex<Option<(u64, ProgressReceiver)>>,
    next_id: AtomicU64,
    ready: Notify,
}

impl LogHub {
    /// Returns the id to pass to [`LogHub::retire`] when the run is over.
    pub async fn publish(&self, receiver: ProgressReceiver) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *self.pending.lock().await = Some((id, receiver));
        self.ready.notify_waiters();
        id
    }

    /// Drops the run's receiver if no reader has claimed it yet.
    pub async fn retire(&self, id: u64) {
        let mut pending = self.pending.lock().await;
        if pending.as_ref().is_some_and(|(pending_id, _)| *pending_id == id) {
            log::debug!("Discarding unread log of run {}", id);
            *pending = None;
        }
    }

    /// Waits until a run is published and claims its receiver.
    pub async fn next_run(&self) -> ProgressReceiver {
        loop {
            let mut notified = pin!(self.ready.notified());
            notified.as_mut().enable();

            if let Some((_, receiver)) = self.pending.lock().await.take() {
                return receiver;
            }
            notified.await;
        }
    }
}

pub struct Generator {
    scraper: WebScraper,
    renderer: Arc<dyn DocumentRenderer>,
    codes: Vec<PopCode>,
    output_path: PathBuf,
    options: PipelineOptions,
    run_lock: Arc<Mutex<()>>,
    logs: Arc<LogHub>,
}

impl Generator {
    pub fn new(
        scraper: WebScraper,
        renderer: Arc<dyn DocumentRenderer>,
        codes: Vec<PopCode>,
        output_path: PathBuf,
        options: PipelineOptions,
    ) -> Self {
        Self {
            scraper,
            renderer,
            codes,
            output_path,
            options,
            run_lock: Arc::new(Mutex::new(())),
            logs: Arc::new(LogHub::default()),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn content_type(&self) -> &'static str {
        self.renderer.content_type()
    }

    pub fn logs(&self) -> Arc<LogHub> {
        self.logs.clone()
    }

    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    /// Runs the pipeline once. Overlapping calls are rejected rather than queued.
    ///
    /// The run happens on its own task, so it completes even if the caller
    /// stops waiting for it.
    pub async fn generate(self: &Arc<Self>) -> Result<RunReport, GenerateError> {
        let guard = self.run_lock.clone().try_lock_owned().map_err(|_| {
            log::warn!("Rejected generate request: a run is already in progress");
            GenerateError::Busy
        })?;

        let (sender, receiver) = progress::channel();
        let run_id = self.logs.publish(receiver).await;

        let generator = Arc::clone(self);
        let run = tokio::spawn(async move {
            let _guard = guard;
            log::info!("Starting report run for {} PoPs", generator.codes.len());
            let result = pipeline::run(
                &generator.scraper,
                &generator.codes,
                generator.renderer.as_ref(),
                &generator.output_path,
                &generator.options,
                &sender,
            )
            .await;
            drop(sender);
            generator.logs.retire(run_id).await;
            result
        });

        Ok(run.await??)
    }
}
