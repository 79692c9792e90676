use crate::camera::process_frame_for_analysis;
use crate::frame::FrameSample;
use crate::media::{FrameCanvas, VideoSurface};
use async_trait::async_trait;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Delay between cycles when the caller does not pick one
pub const DEFAULT_PROCESSOR_INTERVAL: Duration = Duration::from_millis(200);

/// Receives every frame the processor extracts
#[async_trait]
pub trait FrameHandler: Send + Sync {
    async fn handle_frame(&self, sample: FrameSample) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> FrameHandler for F
where
    F: Fn(FrameSample) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle_frame(&self, sample: FrameSample) -> anyhow::Result<()> {
        (self)(sample).await
    }
}

/// What a single polling cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A frame reached the handler and it returned successfully
    Delivered,
    /// The surface had no current frame data
    NotReady,
    /// Another cycle was still in flight
    Busy,
    /// Extraction failed or the handler returned an error or panicked
    Failed,
}

/// Counters for a polling session
#[derive(Debug, Default)]
pub struct ProcessorStats {
    pub frames_delivered: AtomicU64,
    pub skipped_not_ready: AtomicU64,
    pub skipped_busy: AtomicU64,
    pub failed_cycles: AtomicU64,
}

impl ProcessorStats {
    fn record(&self, outcome: CycleOutcome) {
        let counter = match outcome {
            CycleOutcome::Delivered => &self.frames_delivered,
            CycleOutcome::NotReady => &self.skipped_not_ready,
            CycleOutcome::Busy => &self.skipped_busy,
            CycleOutcome::Failed => &self.failed_cycles,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProcessorStatsSnapshot {
        ProcessorStatsSnapshot {
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            skipped_not_ready: self.skipped_not_ready.load(Ordering::Relaxed),
            skipped_busy: self.skipped_busy.load(Ordering::Relaxed),
            failed_cycles: self.failed_cycles.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessorStatsSnapshot {
    pub frames_delivered: u64,
    pub skipped_not_ready: u64,
    pub skipped_busy: u64,
    pub failed_cycles: u64,
}

impl ProcessorStatsSnapshot {
    /// Cycles that got past the busy check
    pub fn cycles_run(&self) -> u64 {
        self.frames_delivered + self.skipped_not_ready + self.failed_cycles
    }
}

/// Clears the busy flag however the cycle ends
struct BusyGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Re-entrancy and cancellation state of one frame processor
pub struct PollingSession {
    interval: Duration,
    busy: AtomicBool,
    pending: CancellationToken,
    stats: ProcessorStats,
}

impl PollingSession {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            busy: AtomicBool::new(false),
            pending: CancellationToken::new(),
            stats: ProcessorStats::default(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn is_cancelled(&self) -> bool {
        self.pending.is_cancelled()
    }

    /// Prevent any further cycle from being scheduled
    pub fn cancel(&self) {
        self.pending.cancel();
    }

    pub fn stats(&self) -> ProcessorStatsSnapshot {
        self.stats.snapshot()
    }

    fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard { busy: &self.busy })
    }

    /// Extract one frame and hand it to `handler`, unless a cycle is already running
    pub async fn run_cycle<H>(
        &self,
        surface: &dyn VideoSurface,
        canvas: &dyn FrameCanvas,
        handler: &H,
    ) -> CycleOutcome
    where
        H: FrameHandler + ?Sized,
    {
        let outcome = match self.try_acquire() {
            Some(_guard) => Self::deliver(surface, canvas, handler).await,
            None => {
                trace!("Previous frame still in flight, skipping cycle");
                CycleOutcome::Busy
            }
        };

        self.stats.record(outcome);
        outcome
    }

    async fn deliver<H>(surface: &dyn VideoSurface, canvas: &dyn FrameCanvas, handler: &H) -> CycleOutcome
    where
        H: FrameHandler + ?Sized,
    {
        if !surface.ready_state().has_current_data() {
            debug!("Surface not ready ({:?}), skipping frame", surface.ready_state());
            return CycleOutcome::NotReady;
        }

        let sample = match process_frame_for_analysis(Some(surface), Some(canvas)) {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Frame extraction failed: {}", e);
                return CycleOutcome::Failed;
            }
        };

        match AssertUnwindSafe(handler.handle_frame(sample)).catch_unwind().await {
            Ok(Ok(())) => CycleOutcome::Delivered,
            Ok(Err(e)) => {
                error!("Frame handler failed: {:#}", e);
                CycleOutcome::Failed
            }
            Err(_) => {
                error!("Frame handler panicked");
                CycleOutcome::Failed
            }
        }
    }

    /// Run cycles until cancelled, sleeping `interval` after each one completes
    async fn run<H>(
        self: Arc<Self>,
        surface: Arc<dyn VideoSurface>,
        canvas: Arc<dyn FrameCanvas>,
        handler: H,
    ) where
        H: FrameHandler,
    {
        debug!("Frame processor started ({:?} interval)", self.interval);

        while !self.pending.is_cancelled() {
            let outcome = self.run_cycle(&*surface, &*canvas, &handler).await;
            trace!("Frame processor cycle finished: {:?}", outcome);

            tokio::select! {
                biased;
                _ = self.pending.cancelled() => break,
                _ = sleep(self.interval) => {}
            }
        }

        debug!("Frame processor loop exited");
    }
}

/// Handle to a running frame processor. Dropping it stops the processor.
#[must_use = "dropping a FrameProcessor stops it"]
pub struct FrameProcessor {
    session: Arc<PollingSession>,
    task: JoinHandle<()>,
}

impl FrameProcessor {
    /// Stop scheduling cycles. An in-flight cycle is allowed to finish.
    pub fn stop(&self) {
        if !self.session.is_cancelled() {
            info!("Stopping frame processor");
        }
        self.session.cancel();
    }

    /// Stop and wait for the in-flight cycle, if any, to finish
    pub async fn shutdown(mut self) {
        self.stop();
        if let Err(e) = (&mut self.task).await {
            error!("Frame processor task ended abnormally: {}", e);
        }
    }

    pub fn is_running(&self) -> bool {
        !self.session.is_cancelled() && !self.task.is_finished()
    }

    pub fn is_busy(&self) -> bool {
        self.session.is_busy()
    }

    pub fn interval(&self) -> Duration {
        self.session.interval()
    }

    pub fn stats(&self) -> ProcessorStatsSnapshot {
        self.session.stats()
    }

    pub fn session(&self) -> &Arc<PollingSession> {
        &self.session
    }
}

impl Drop for FrameProcessor {
    fn drop(&mut self) {
        self.session.cancel();
    }
}

/// Start polling `surface` for frames, delivering each to `on_frame`.
///
/// The first cycle runs immediately; each later one starts `interval` after the
/// previous cycle, including the handler, has completed.
#[must_use = "dropping the returned FrameProcessor stops it"]
pub fn create_frame_processor<H>(
    surface: Arc<dyn VideoSurface>,
    canvas: Arc<dyn FrameCanvas>,
    on_frame: H,
    interval: Duration,
) -> FrameProcessor
where
    H: FrameHandler + 'static,
{
    let session = Arc::new(PollingSession::new(interval));
    info!("Starting frame processor ({}ms interval)", interval.as_millis());

    let task = tokio::spawn(Arc::clone(&session).run(surface, canvas, on_frame));

    FrameProcessor { session, task }
}
