// Conversion engine - independent of any front end

pub mod core;
pub mod dispatcher;
pub mod hardware;
pub mod job;
pub mod worker;

pub use core::*;
pub use dispatcher::{Dispatcher, SCAN_INTERVAL, convert_files, default_worker_count};
pub use job::TranscodeJob;
pub use worker::{WorkerMessage, WorkerPool};
