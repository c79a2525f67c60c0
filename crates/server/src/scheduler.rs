//! The Transcription Scheduler (C6, §4.6) — the heart of the system.
//!
//! A bounded FIFO job queue and a single dedicated consumer thread that
//! owns the currently loaded [`Engine`]. Producers (HTTP handlers) never
//! touch the engine directly; they submit a job and await a one-shot
//! completion signal. No direct teacher analogue for hot-swap — this is
//! the spec's novel core — but the actor shape (typed command enum over
//! an mpsc channel, `tracing` spans per operation) follows the teacher's
//! `tokio`-based async idiom.
//!
//! The consumer runs on a plain OS thread rather than a tokio task: every
//! [`Engine`] method is synchronous and may block for tens of seconds
//! (model load) or the lifetime of an inference call, and must never run
//! on the async I/O runtime (§5).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use stt_gateway_core::{
    Engine, EngineCapabilities, EngineKind, ModelSpec, TranscriptionOptions, TranscriptionRequest,
};
use stt_gateway_core::{JobOutcome, TranscriptionJob};

/// Builds a concrete engine for a resolved [`ModelSpec`] (C4). Boxed so
/// production wiring (real sidecar URL / MLX binary path baked in) and
/// test wiring (produces [`stt_gateway_engines::StubEngine`]s) share one
/// seam without the scheduler knowing which is which.
pub type EngineFactory = Arc<dyn Fn(&ModelSpec) -> Box<dyn Engine> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Running,
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub engine_kind: EngineKind,
    pub model_id: String,
    pub model_alias: Option<String>,
    pub capabilities: EngineCapabilities,
    pub queue_size: usize,
    pub max_queue_size: usize,
    pub state: SchedulerState,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("request queue is full")]
    QueueFull,
    #[error("scheduler has shut down")]
    Stopped,
}

enum Command {
    Submit {
        job: TranscriptionJob,
        respond_to: oneshot::Sender<JobOutcome>,
    },
    QueryStatus {
        respond_to: oneshot::Sender<SchedulerStatus>,
    },
    Shutdown,
}

/// Cheaply `Clone`-able handle shared across Axum handlers. The consumer
/// thread lives for as long as at least one handle exists and hasn't
/// called [`Scheduler::shutdown`].
#[derive(Clone)]
pub struct Scheduler {
    command_tx: mpsc::UnboundedSender<Command>,
    queued: Arc<AtomicUsize>,
    max_queue_size: usize,
}

impl Scheduler {
    /// Constructs the production factory (C4): real [`FunasrEngine`]/
    /// [`MlxEngine`] adapters bound to their process-wide endpoints.
    ///
    /// [`FunasrEngine`]: stt_gateway_engines::FunasrEngine
    /// [`MlxEngine`]: stt_gateway_engines::MlxEngine
    pub fn production_factory(funasr_sidecar_url: String, mlx_binary_path: std::path::PathBuf) -> EngineFactory {
        Arc::new(move |spec| stt_gateway_engines::create(spec, &funasr_sidecar_url, &mlx_binary_path))
    }

    /// Loads `initial_spec` synchronously and spawns the dedicated
    /// consumer thread. Fails only if the startup model can't be loaded —
    /// there is no such thing as an unloaded scheduler.
    pub fn start(
        initial_spec: ModelSpec,
        factory: EngineFactory,
        max_queue_size: usize,
    ) -> anyhow::Result<Self> {
        let mut engine = factory(&initial_spec);
        engine
            .load()
            .context("failed to load the startup model")?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let queued = Arc::new(AtomicUsize::new(0));
        let queued_for_consumer = Arc::clone(&queued);
        let alias = Some(initial_spec.alias.clone());

        std::thread::Builder::new()
            .name("stt-gateway-consumer".to_string())
            .spawn(move || {
                consumer_loop(
                    engine,
                    initial_spec,
                    alias,
                    command_rx,
                    queued_for_consumer,
                    max_queue_size,
                    factory,
                )
            })
            .context("failed to spawn the scheduler consumer thread")?;

        Ok(Self {
            command_tx,
            queued,
            max_queue_size,
        })
    }

    /// Synchronously rejects with [`SubmitError::QueueFull`] if the queue
    /// is already at capacity; never blocks the caller (§4.6, §5).
    pub fn submit(
        &self,
        job: TranscriptionJob,
    ) -> Result<oneshot::Receiver<JobOutcome>, SubmitError> {
        loop {
            let current = self.queued.load(Ordering::SeqCst);
            if current >= self.max_queue_size {
                return Err(SubmitError::QueueFull);
            }
            if self
                .queued
                .compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                break;
            }
        }

        let (respond_to, rx) = oneshot::channel();
        if self
            .command_tx
            .send(Command::Submit { job, respond_to })
            .is_err()
        {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(SubmitError::Stopped);
        }
        Ok(rx)
    }

    /// Query current engine/queue state. Routed through the consumer
    /// thread rather than a shared lock (§5's preferred design).
    pub async fn status(&self) -> Result<SchedulerStatus, SubmitError> {
        let (respond_to, rx) = oneshot::channel();
        self.command_tx
            .send(Command::QueryStatus { respond_to })
            .map_err(|_| SubmitError::Stopped)?;
        rx.await.map_err(|_| SubmitError::Stopped)
    }

    /// Drains the queue and releases the current engine (§4.6 shutdown
    /// sequence). Returns once the sentinel has been enqueued; does not
    /// wait for the consumer thread to actually exit.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(Command::Shutdown);
    }
}

enum SwapFailure {
    /// This job's swap failed, but the scheduler successfully reverted to
    /// the previously loaded model. The service remains `Running`.
    Recovered(String),
    /// This job's swap failed and recovery also failed. The scheduler is
    /// now `Degraded`.
    Degraded(String),
}

fn consumer_loop(
    mut current_engine: Box<dyn Engine>,
    mut current_spec: ModelSpec,
    mut current_alias: Option<String>,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
    queued: Arc<AtomicUsize>,
    max_queue_size: usize,
    factory: EngineFactory,
) {
    let mut state = SchedulerState::Running;

    while let Some(command) = command_rx.blocking_recv() {
        match command {
            Command::Submit { job, respond_to } => {
                let outcome = if state == SchedulerState::Degraded {
                    JobOutcome::ServiceDegraded {
                        message: "service degraded: prior model reload failed".to_string(),
                    }
                } else {
                    process_job(
                        &mut current_engine,
                        &mut current_spec,
                        &mut current_alias,
                        &job.request,
                        factory.as_ref(),
                        &mut state,
                    )
                };
                let _ = std::fs::remove_file(&job.request.temp_audio_path);
                // The job stays counted against `max_queue_size` for its entire
                // time in-flight, not just while it sits in the queue (§4.6 S3):
                // otherwise a blocked worker lets Q+1 jobs be outstanding at once.
                queued.fetch_sub(1, Ordering::SeqCst);
                let _ = respond_to.send(outcome);
            }
            Command::QueryStatus { respond_to } => {
                let _ = respond_to.send(SchedulerStatus {
                    engine_kind: current_engine.engine_kind(),
                    model_id: current_engine.model_id().to_string(),
                    model_alias: current_alias.clone(),
                    capabilities: current_engine.capabilities(),
                    queue_size: queued.load(Ordering::SeqCst),
                    max_queue_size,
                    state,
                });
            }
            Command::Shutdown => break,
        }
    }

    if let Err(e) = current_engine.release() {
        tracing::warn!(error = %e, "engine release failed during shutdown");
    }
}

fn process_job(
    current_engine: &mut Box<dyn Engine>,
    current_spec: &mut ModelSpec,
    current_alias: &mut Option<String>,
    request: &TranscriptionRequest,
    factory: &(dyn Fn(&ModelSpec) -> Box<dyn Engine> + Send + Sync),
    state: &mut SchedulerState,
) -> JobOutcome {
    if let Some(requested) = request.requested_model.as_deref() {
        match swap_if_needed(current_engine, current_spec, current_alias, requested, factory) {
            Ok(()) => {}
            Err(SwapFailure::Recovered(message)) => {
                return JobOutcome::SwapFailed { message };
            }
            Err(SwapFailure::Degraded(message)) => {
                *state = SchedulerState::Degraded;
                return JobOutcome::SwapFailed { message };
            }
        }
    }

    let opts = TranscriptionOptions {
        language: request.language,
        with_timestamp: request.with_timestamp,
    };
    match current_engine.transcribe(&request.temp_audio_path, opts) {
        Ok(result) => JobOutcome::Success(result),
        Err(e) => JobOutcome::Failure(e),
    }
}

/// The hot-swap protocol (§4.6): release the current engine, construct
/// and load the new one. On load failure, attempt to recover the
/// previous model before giving up and degrading.
fn swap_if_needed(
    current_engine: &mut Box<dyn Engine>,
    current_spec: &mut ModelSpec,
    current_alias: &mut Option<String>,
    requested: &str,
    factory: &(dyn Fn(&ModelSpec) -> Box<dyn Engine> + Send + Sync),
) -> Result<(), SwapFailure> {
    let req_spec = match stt_gateway_registry::resolve(requested) {
        Ok(spec) => spec,
        // Admission already validated `requested`; an error here would
        // mean the registry changed between admission and dequeue, which
        // cannot happen against a compile-time table. Treat as a no-op
        // rather than panic.
        Err(_) => return Ok(()),
    };

    if req_spec == *current_spec {
        return Ok(());
    }

    let previous_spec = current_spec.clone();

    if let Err(e) = current_engine.release() {
        tracing::warn!(
            model_id = %previous_spec.model_id,
            error = %e,
            "engine release failed during swap; continuing"
        );
    }

    let mut new_engine = factory(&req_spec);

    match new_engine.load() {
        Ok(()) => {
            *current_alias = registry_alias_for(&req_spec);
            *current_spec = req_spec;
            *current_engine = new_engine;
            Ok(())
        }
        Err(load_err) => {
            tracing::error!(
                model_id = %req_spec.model_id,
                error = %load_err,
                "engine load failed during swap; attempting recovery"
            );
            let mut recovered = factory(&previous_spec);
            match recovered.load() {
                Ok(()) => {
                    *current_alias = registry_alias_for(&previous_spec);
                    *current_spec = previous_spec;
                    *current_engine = recovered;
                    Err(SwapFailure::Recovered(
                        "model load failed; reverted to the previously loaded model".to_string(),
                    ))
                }
                Err(_) => Err(SwapFailure::Degraded(
                    "model load failed and recovery also failed; service degraded".to_string(),
                )),
            }
        }
    }
}

fn registry_alias_for(spec: &ModelSpec) -> Option<String> {
    stt_gateway_registry::all()
        .into_iter()
        .any(|s| s.alias == spec.alias && s.model_id == spec.model_id)
        .then(|| spec.alias.clone())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::Mutex as StdMutex;

    use stt_gateway_core::{EngineError, Language, TranscriptionResult};

    use super::*;

    /// An [`Engine`] that appends `"{event}:{model_id}"` to a shared log
    /// on every call, so a test can assert call order across hot-swaps
    /// without inspecting per-instance state.
    struct RecordingEngine {
        spec: ModelSpec,
        log: Arc<StdMutex<Vec<String>>>,
        failing_models: Arc<StdMutex<HashSet<String>>>,
    }

    impl Engine for RecordingEngine {
        fn load(&mut self) -> Result<(), EngineError> {
            self.log.lock().unwrap().push(format!("load:{}", self.spec.model_id));
            Ok(())
        }

        fn release(&mut self) -> Result<(), EngineError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("release:{}", self.spec.model_id));
            Ok(())
        }

        fn transcribe(
            &mut self,
            _path: &Path,
            _opts: TranscriptionOptions,
        ) -> Result<TranscriptionResult, EngineError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("transcribe:{}", self.spec.model_id));
            if self.failing_models.lock().unwrap().contains(&self.spec.model_id) {
                return Err(EngineError::InferenceFailed {
                    model_id: self.spec.model_id.clone(),
                    reason: "configured to fail for this test".to_string(),
                });
            }
            Ok(TranscriptionResult {
                text: "recorded".to_string(),
                duration: 1.0,
                language: "en".to_string(),
                model_id: self.spec.model_id.clone(),
                segments: None,
            })
        }

        fn model_id(&self) -> &str {
            &self.spec.model_id
        }

        fn engine_kind(&self) -> EngineKind {
            self.spec.engine_kind
        }

        fn capabilities(&self) -> EngineCapabilities {
            self.spec.capabilities
        }
    }

    fn recording_factory(
        log: Arc<StdMutex<Vec<String>>>,
        failing_models: Arc<StdMutex<HashSet<String>>>,
    ) -> EngineFactory {
        Arc::new(move |spec: &ModelSpec| {
            Box::new(RecordingEngine {
                spec: spec.clone(),
                log: Arc::clone(&log),
                failing_models: Arc::clone(&failing_models),
            }) as Box<dyn Engine>
        })
    }

    fn job(requested_model: Option<&str>) -> TranscriptionJob {
        TranscriptionJob::new(TranscriptionRequest {
            request_id: uuid::Uuid::new_v4(),
            temp_audio_path: std::env::temp_dir().join(format!("{}.wav", uuid::Uuid::new_v4())),
            language: Language::Auto,
            output_format: stt_gateway_core::OutputFormat::Json,
            with_timestamp: false,
            requested_model: requested_model.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn hot_swap_releases_before_loading_and_preserves_fifo_order() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let failing = Arc::new(StdMutex::new(HashSet::new()));
        let factory = recording_factory(Arc::clone(&log), Arc::clone(&failing));

        let paraformer = stt_gateway_registry::resolve("paraformer").unwrap();
        let scheduler = Scheduler::start(paraformer, factory, 8).unwrap();

        let rx1 = scheduler.submit(job(Some("qwen3-asr-mini"))).unwrap();
        assert!(matches!(rx1.await.unwrap(), JobOutcome::Success(_)));

        let rx2 = scheduler.submit(job(Some("paraformer"))).unwrap();
        assert!(matches!(rx2.await.unwrap(), JobOutcome::Success(_)));

        let log = log.lock().unwrap().clone();
        assert_eq!(
            log,
            vec![
                "load:iic/paraformer-zh".to_string(),
                "release:iic/paraformer-zh".to_string(),
                "load:mlx-community/Qwen3-ASR-mini".to_string(),
                "transcribe:mlx-community/Qwen3-ASR-mini".to_string(),
                "release:mlx-community/Qwen3-ASR-mini".to_string(),
                "load:iic/paraformer-zh".to_string(),
                "transcribe:iic/paraformer-zh".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn worker_survives_an_inference_failure_and_processes_the_next_job() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let failing = Arc::new(StdMutex::new(HashSet::new()));
        failing.lock().unwrap().insert("iic/paraformer-zh".to_string());
        let factory = recording_factory(Arc::clone(&log), Arc::clone(&failing));

        let paraformer = stt_gateway_registry::resolve("paraformer").unwrap();
        let scheduler = Scheduler::start(paraformer, factory, 8).unwrap();

        let rx1 = scheduler.submit(job(None)).unwrap();
        assert!(matches!(rx1.await.unwrap(), JobOutcome::Failure(_)));

        // Clear the failure flag so the next job (same model, no swap) succeeds.
        failing.lock().unwrap().clear();
        let rx2 = scheduler.submit(job(None)).unwrap();
        assert!(matches!(rx2.await.unwrap(), JobOutcome::Success(_)));
    }

    #[tokio::test]
    async fn passthrough_model_forms_never_trigger_a_swap() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let failing = Arc::new(StdMutex::new(HashSet::new()));
        let factory = recording_factory(Arc::clone(&log), Arc::clone(&failing));

        let paraformer = stt_gateway_registry::resolve("paraformer").unwrap();
        let scheduler = Scheduler::start(paraformer, factory, 8).unwrap();

        for requested in [None, Some(""), Some("whisper-1")] {
            let rx = scheduler.submit(job(requested)).unwrap();
            assert!(matches!(rx.await.unwrap(), JobOutcome::Success(_)));
        }

        // Exactly the startup load, then three transcribes; never a second load.
        let log = log.lock().unwrap();
        assert_eq!(log.iter().filter(|e| e.starts_with("load:")).count(), 1);
        assert_eq!(log.iter().filter(|e| e.starts_with("transcribe:")).count(), 3);
    }

    #[tokio::test]
    async fn submissions_beyond_capacity_are_rejected_synchronously() {
        // A factory whose engine blocks in `transcribe` until released, so the
        // queue backs up behind one in-flight job.
        struct BlockingEngine {
            spec: ModelSpec,
            gate: Arc<std::sync::Barrier>,
        }
        impl Engine for BlockingEngine {
            fn load(&mut self) -> Result<(), EngineError> {
                Ok(())
            }
            fn release(&mut self) -> Result<(), EngineError> {
                Ok(())
            }
            fn transcribe(
                &mut self,
                _path: &Path,
                _opts: TranscriptionOptions,
            ) -> Result<TranscriptionResult, EngineError> {
                self.gate.wait();
                Ok(TranscriptionResult {
                    text: String::new(),
                    duration: 0.0,
                    language: "en".to_string(),
                    model_id: self.spec.model_id.clone(),
                    segments: None,
                })
            }
            fn model_id(&self) -> &str {
                &self.spec.model_id
            }
            fn engine_kind(&self) -> EngineKind {
                self.spec.engine_kind
            }
            fn capabilities(&self) -> EngineCapabilities {
                self.spec.capabilities
            }
        }

        let gate = Arc::new(std::sync::Barrier::new(2));
        let gate_for_factory = Arc::clone(&gate);
        let factory: EngineFactory = Arc::new(move |spec: &ModelSpec| {
            Box::new(BlockingEngine {
                spec: spec.clone(),
                gate: Arc::clone(&gate_for_factory),
            }) as Box<dyn Engine>
        });

        let paraformer = stt_gateway_registry::resolve("paraformer").unwrap();
        let scheduler = Scheduler::start(paraformer, factory, 1).unwrap();

        // First submission is picked up by the consumer and blocks in transcribe.
        let rx1 = scheduler.submit(job(None)).unwrap();
        // Give the consumer thread a moment to dequeue it.
        std::thread::sleep(std::time::Duration::from_millis(50));

        // Queue capacity is 1 and that one slot is held by the in-flight job,
        // not freed just because it has been dequeued, so this is rejected.
        let rejected = scheduler.submit(job(None));
        assert!(matches!(rejected, Err(SubmitError::QueueFull)));

        // Release the in-flight job; its slot is freed only once it completes.
        gate.wait();
        assert!(matches!(rx1.await.unwrap(), JobOutcome::Success(_)));

        let rx2 = scheduler.submit(job(None)).unwrap();
        gate.wait();
        assert!(matches!(rx2.await.unwrap(), JobOutcome::Success(_)));
    }
}
