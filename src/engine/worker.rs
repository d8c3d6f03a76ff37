// Worker pool for running conversion jobs in parallel

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use uuid::Uuid;

use super::core::TranscodeOutcome;
use super::job::TranscodeJob;

/// Message from worker to the dispatcher thread
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    /// Job picked up by a worker
    JobStarted { job_id: Uuid, file_name: String },

    /// Job reached a terminal outcome
    JobFinished {
        job_id: Uuid,
        source_path: PathBuf,
        outcome: TranscodeOutcome,
    },

    /// Worker finished and is available again
    WorkerIdle { worker_id: usize },
}

/// Worker pool managing parallel conversion jobs
pub struct WorkerPool {
    max_workers: usize,
    tx: Sender<WorkerMessage>,
    rx: Receiver<WorkerMessage>,
    active_workers: Arc<Mutex<usize>>,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Self {
        let (tx, rx) = mpsc::channel();

        Self {
            max_workers: max_workers.max(1),
            tx,
            rx,
            active_workers: Arc::new(Mutex::new(0)),
        }
    }

    /// Get the receiver for worker messages
    pub fn receiver(&self) -> &Receiver<WorkerMessage> {
        &self.rx
    }

    /// Spawn a worker thread to run one job to completion. The slot
    /// is reserved before the thread starts, so back-to-back spawns
    /// in one dispatch pass see the updated count and `can_spawn`
    /// never admits more than `max_workers` jobs.
    pub fn spawn_worker(&self, worker_id: usize, job: TranscodeJob) {
        let tx = self.tx.clone();
        let active = self.active_workers.clone();
        {
            let mut count = self.active_workers.lock().unwrap();
            *count += 1;
        }

        thread::spawn(move || {
            let job_id = job.request().id;
            let source_path = job.request().source_path.clone();
            let _ = tx.send(WorkerMessage::JobStarted {
                job_id,
                file_name: job.request().file_name(),
            });

            let outcome = job.run();

            let _ = tx.send(WorkerMessage::JobFinished {
                job_id,
                source_path,
                outcome,
            });

            {
                let mut count = active.lock().unwrap();
                *count -= 1;
            }

            let _ = tx.send(WorkerMessage::WorkerIdle { worker_id });
        });
    }

    /// Get the number of active workers
    pub fn active_count(&self) -> usize {
        *self.active_workers.lock().unwrap()
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Check if we can take on another job
    pub fn can_spawn(&self) -> bool {
        self.active_count() < self.max_workers
    }
}
