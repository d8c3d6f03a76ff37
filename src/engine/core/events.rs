// Line-oriented event stream consumed by the UI collaborator

use chrono::Local;
use std::sync::mpsc::{self, Receiver, Sender};

/// Fire-and-forget sink for human-readable status lines. Each event
/// is one timestamped line; a dropped receiver is silently ignored so
/// workers never block or fail on a slow consumer. Every line is also
/// mirrored into `tracing`.
#[derive(Clone)]
pub struct EventSink {
    tx: Option<Sender<String>>,
}

impl EventSink {
    /// Create a sink together with the receiving end of the stream.
    pub fn channel() -> (Self, Receiver<String>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink with no consumer; events still reach the log.
    pub fn disconnected() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::info!("{message}");
        if let Some(tx) = &self.tx {
            let line = format!("{} - {}", Local::now().format("%Y-%m-%d %H:%M:%S"), message);
            let _ = tx.send(line);
        }
    }
}
