// Watch-folder dispatch loop: scan, queue, hand off to workers

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::TryRecvError;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::config::{ConversionSettings, SettingsFile};
use crate::engine::core::{
    CancelToken, DeletionScheduler, EventSink, JobRequest, ScanError, ToolPaths,
    TranscodeOutcome, allowed_now, scan_source,
};
use crate::engine::job::TranscodeJob;
use crate::engine::worker::{WorkerMessage, WorkerPool};

/// Pause between scan cycles.
pub const SCAN_INTERVAL: Duration = Duration::from_secs(5);

/// Grace period for in-flight jobs after a stop request.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Conditions that repeat every cycle are logged once when they
/// appear and re-armed when they clear, so an idle service does not
/// fill the log with the same line every five seconds.
#[derive(Debug, Default)]
struct NoticeFlags {
    auto_run_disabled: bool,
    outside_window: bool,
    source_unavailable: bool,
    idle: bool,
}

/// Long-running orchestrator: re-reads settings each cycle, scans the
/// source folder, and feeds discovered files into the worker pool.
/// Failed files are simply picked up again by a later scan.
pub struct Dispatcher {
    config_path: PathBuf,
    tools: ToolPaths,
    pool: WorkerPool,
    scheduler: DeletionScheduler,
    events: EventSink,
    cancel: CancelToken,
    queue: VecDeque<JobRequest>,
    in_flight: HashSet<PathBuf>,
    notices: NoticeFlags,
}

impl Dispatcher {
    pub fn new(
        config_path: PathBuf,
        tools: ToolPaths,
        max_workers: usize,
        events: EventSink,
        cancel: CancelToken,
    ) -> Self {
        Self {
            config_path,
            tools,
            pool: WorkerPool::new(max_workers),
            scheduler: DeletionScheduler::new(),
            events,
            cancel,
            queue: VecDeque::new(),
            in_flight: HashSet::new(),
            notices: NoticeFlags::default(),
        }
    }

    /// Run scan cycles until the cancel token fires, then wait for
    /// in-flight jobs to wind down.
    pub fn run(&mut self) -> Result<()> {
        self.events.emit("Conversion service started.");

        while !self.cancel.is_cancelled() {
            self.cycle();
            self.sleep_interruptibly(SCAN_INTERVAL);
        }

        self.events.emit("Stop requested. Waiting for running conversions...");
        self.drain_until_idle();
        self.events.emit("Conversion service stopped.");
        Ok(())
    }

    /// One scan cycle. Settings are re-read from disk every time so
    /// edits take effect without a restart.
    fn cycle(&mut self) {
        self.drain_messages();

        let settings = Arc::new(SettingsFile::load_or_default(&self.config_path));

        if !settings.auto_run {
            if !self.notices.auto_run_disabled {
                self.events.emit("Automatic conversion is disabled.");
                self.notices.auto_run_disabled = true;
            }
            return;
        }
        self.notices.auto_run_disabled = false;

        if !allowed_now(&settings) {
            if !self.notices.outside_window {
                self.events.emit(format!(
                    "Outside allowed conversion hours ({} - {}). Waiting.",
                    settings.window_start.format("%H:%M"),
                    settings.window_end.format("%H:%M"),
                ));
                self.notices.outside_window = true;
            }
            return;
        }
        self.notices.outside_window = false;

        match scan_source(&settings) {
            Ok(found) => {
                self.notices.source_unavailable = false;
                self.enqueue_new(found);
            }
            Err(ScanError::DirectoryUnavailable(dir)) => {
                if !self.notices.source_unavailable {
                    self.events
                        .emit(format!("Source folder unavailable: {}", dir.display()));
                    self.notices.source_unavailable = true;
                }
                return;
            }
            Err(e) => {
                tracing::warn!("scan failed: {e:#}");
                return;
            }
        }

        if self.queue.is_empty() && self.in_flight.is_empty() {
            if !self.notices.idle {
                self.events.emit("No files to convert. Watching.");
                self.notices.idle = true;
            }
        } else {
            self.notices.idle = false;
        }

        self.dispatch_ready(&settings);
    }

    /// Queue newly discovered files, skipping anything already queued
    /// or being worked on.
    fn enqueue_new(&mut self, found: Vec<JobRequest>) {
        for request in found {
            if self.in_flight.contains(&request.source_path)
                || self
                    .queue
                    .iter()
                    .any(|q| q.source_path == request.source_path)
            {
                continue;
            }
            self.events
                .emit(format!("Found file to convert: {}", request.file_name()));
            self.queue.push_back(request);
        }
    }

    /// Hand queued requests to the pool while capacity remains.
    fn dispatch_ready(&mut self, settings: &Arc<ConversionSettings>) {
        let mut worker_id = self.pool.active_count();
        while self.pool.can_spawn() {
            let Some(request) = self.queue.pop_front() else {
                break;
            };
            self.in_flight.insert(request.source_path.clone());
            let job = TranscodeJob::new(
                request,
                settings.clone(),
                self.tools.clone(),
                self.scheduler.clone(),
                self.events.clone(),
                self.cancel.clone(),
            );
            self.pool.spawn_worker(worker_id, job);
            worker_id += 1;
        }
    }

    /// Process all pending worker messages without blocking.
    fn drain_messages(&mut self) {
        loop {
            match self.pool.receiver().try_recv() {
                Ok(msg) => self.handle_message(msg),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn handle_message(&mut self, msg: WorkerMessage) {
        match msg {
            WorkerMessage::JobStarted { job_id, file_name } => {
                tracing::debug!(job = %job_id, file = %file_name, "job started");
            }
            WorkerMessage::JobFinished {
                job_id,
                source_path,
                outcome,
            } => {
                self.in_flight.remove(&source_path);
                match &outcome {
                    TranscodeOutcome::Success { output } => {
                        tracing::info!(job = %job_id, output = %output.display(), "job finished");
                    }
                    other => {
                        tracing::info!(job = %job_id, outcome = other.label(), "job finished");
                    }
                }
            }
            WorkerMessage::WorkerIdle { worker_id } => {
                tracing::debug!(worker_id, "worker idle");
            }
        }
    }

    /// After a stop request: give running jobs a short grace period
    /// to notice the cancel token and report back.
    fn drain_until_idle(&mut self) {
        let deadline = Instant::now() + SHUTDOWN_GRACE;
        while self.pool.active_count() > 0 && Instant::now() < deadline {
            self.drain_messages();
            thread::sleep(Duration::from_millis(100));
        }
        self.drain_messages();
        if self.pool.active_count() > 0 {
            tracing::warn!(
                active = self.pool.active_count(),
                "workers still running at shutdown"
            );
        }
    }

    fn sleep_interruptibly(&self, total: Duration) {
        let step = Duration::from_millis(250);
        let deadline = Instant::now() + total;
        while Instant::now() < deadline {
            if self.cancel.is_cancelled() {
                return;
            }
            thread::sleep(step.min(deadline.saturating_duration_since(Instant::now())));
        }
    }
}

/// Convert an explicit list of files, bypassing the watch loop. Used
/// for one-shot invocations; the normal gating still applies inside
/// each job except for the time window, which a deliberate manual run
/// overrides.
pub fn convert_files(
    files: &[PathBuf],
    settings: &ConversionSettings,
    tools: &ToolPaths,
    max_workers: usize,
    events: &EventSink,
    cancel: &CancelToken,
) -> Vec<(PathBuf, TranscodeOutcome)> {
    let mut manual = settings.clone();
    manual.no_time_restrictions = true;
    let manual = Arc::new(manual);

    let pool = WorkerPool::new(max_workers);
    let scheduler = DeletionScheduler::new();

    let mut pending: VecDeque<PathBuf> = files.iter().cloned().collect();
    let total = pending.len();
    let mut results = Vec::with_capacity(total);
    let mut worker_id = 0usize;

    while results.len() < total {
        while pool.can_spawn() {
            let Some(path) = pending.pop_front() else {
                break;
            };
            let job = TranscodeJob::new(
                JobRequest::new(path),
                manual.clone(),
                tools.clone(),
                scheduler.clone(),
                events.clone(),
                cancel.clone(),
            );
            pool.spawn_worker(worker_id, job);
            worker_id += 1;
        }

        match pool.receiver().recv() {
            Ok(WorkerMessage::JobFinished {
                source_path,
                outcome,
                ..
            }) => results.push((source_path, outcome)),
            Ok(_) => {}
            Err(_) => break,
        }
    }

    results
}

pub fn default_worker_count() -> usize {
    4
}
