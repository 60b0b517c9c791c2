// src/exec/log_consumer.rs

//! Bounded hand-off between the two stream readers and the poll loop.
//!
//! Readers never wait on the queue: a line that does not fit is dropped and
//! counted per stream, so data loss always shows up in the outcome.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};

use super::request::DroppedLines;

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOrigin {
    Stdout,
    Stderr,
}

/// One line of process output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub origin: StreamOrigin,
    pub text: String,
}

impl LogLine {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            origin: StreamOrigin::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            origin: StreamOrigin::Stderr,
            text: text.into(),
        }
    }

    /// Text as it appears in the full log and the output file.
    pub fn tagged(&self) -> String {
        match self.origin {
            StreamOrigin::Stdout => self.text.clone(),
            StreamOrigin::Stderr => format!("ERROR: {}", self.text),
        }
    }
}

impl AsRef<str> for LogLine {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Default)]
struct DropCounters {
    stdout: AtomicUsize,
    stderr: AtomicUsize,
}

/// Producer side, cloned into each reader task.
#[derive(Debug, Clone)]
pub struct LogConsumer {
    tx: mpsc::Sender<LogLine>,
    dropped: Arc<DropCounters>,
}

impl LogConsumer {
    /// Offer a stdout line. Returns `false` if it was dropped.
    pub fn append(&self, line: impl Into<String>) -> bool {
        self.offer(LogLine::stdout(line))
    }

    /// Offer a stderr line. Returns `false` if it was dropped.
    pub fn append_err(&self, line: impl Into<String>) -> bool {
        self.offer(LogLine::stderr(line))
    }

    pub fn offer(&self, line: LogLine) -> bool {
        let origin = line.origin;
        match self.tx.try_send(line) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                let counter = match origin {
                    StreamOrigin::Stdout => &self.dropped.stdout,
                    StreamOrigin::Stderr => &self.dropped.stderr,
                };
                counter.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Handle that keeps reporting drop counts after the consumer is gone.
    pub fn counter(&self) -> DropCounter {
        DropCounter {
            dropped: Arc::clone(&self.dropped),
        }
    }
}

/// Read-only view of the drop counters.
#[derive(Debug, Clone)]
pub struct DropCounter {
    dropped: Arc<DropCounters>,
}

impl DropCounter {
    pub fn snapshot(&self) -> DroppedLines {
        DroppedLines {
            stdout: self.dropped.stdout.load(Ordering::Relaxed),
            stderr: self.dropped.stderr.load(Ordering::Relaxed),
        }
    }
}

/// Consumer side, owned by the poll loop.
#[derive(Debug)]
pub struct LogDrain {
    rx: mpsc::Receiver<LogLine>,
}

impl LogDrain {
    /// Wait up to `tick` for the first line, then take everything buffered.
    pub async fn poll(&mut self, tick: Duration) -> Vec<LogLine> {
        let mut batch = Vec::new();
        match tokio::time::timeout(tick, self.rx.recv()).await {
            Ok(Some(line)) => batch.push(line),
            // All producers are gone; keep the tick so callers don't spin.
            Ok(None) => tokio::time::sleep(tick).await,
            Err(_) => {}
        }
        self.drain_into(&mut batch);
        batch
    }

    /// Receive into `out` until every producer has gone away.
    ///
    /// Cancel-safe: lines received before the future is dropped stay in `out`.
    pub async fn collect_until_closed(&mut self, out: &mut Vec<LogLine>) {
        while let Some(line) = self.rx.recv().await {
            out.push(line);
        }
    }

    /// Take everything currently buffered without waiting.
    pub fn drain(&mut self) -> Vec<LogLine> {
        let mut batch = Vec::new();
        self.drain_into(&mut batch);
        batch
    }

    fn drain_into(&mut self, batch: &mut Vec<LogLine>) {
        loop {
            match self.rx.try_recv() {
                Ok(line) => batch.push(line),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }
}

/// Create a queue with room for `capacity` lines.
pub fn log_channel(capacity: usize) -> (LogConsumer, LogDrain) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let consumer = LogConsumer {
        tx,
        dropped: Arc::new(DropCounters::default()),
    };
    (consumer, LogDrain { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_queue_drops_and_counts_per_stream() {
        let (consumer, mut drain) = log_channel(2);
        let counter = consumer.counter();

        assert!(consumer.append("one"));
        assert!(consumer.append_err("two"));
        assert!(!consumer.append("three"));
        assert!(!consumer.append_err("four"));
        assert!(!consumer.append_err("five"));

        assert_eq!(counter.snapshot(), DroppedLines { stdout: 1, stderr: 2 });

        let batch = drain.drain();
        assert_eq!(batch, vec![LogLine::stdout("one"), LogLine::stderr("two")]);

        // Space is available again once drained.
        assert!(consumer.append("six"));
        assert_eq!(counter.snapshot().total(), 3);
    }

    #[test]
    fn stderr_lines_are_tagged() {
        assert_eq!(LogLine::stderr("boom").tagged(), "ERROR: boom");
        assert_eq!(LogLine::stdout("fine").tagged(), "fine");
    }

    #[tokio::test]
    async fn poll_returns_empty_batch_after_tick() {
        let (_consumer, mut drain) = log_channel(4);
        let batch = drain.poll(Duration::from_millis(20)).await;
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn collect_until_closed_stops_when_producers_are_gone() {
        let (consumer, mut drain) = log_channel(8);
        let producer = consumer.clone();
        drop(consumer);

        let task = tokio::spawn(async move {
            producer.append("x");
            producer.append_err("y");
        });

        let mut out = Vec::new();
        drain.collect_until_closed(&mut out).await;
        task.await.unwrap();
        assert_eq!(out, vec![LogLine::stdout("x"), LogLine::stderr("y")]);
    }

    #[tokio::test]
    async fn poll_collects_first_line_and_everything_buffered() {
        let (consumer, mut drain) = log_channel(8);
        consumer.append("a");
        consumer.append_err("b");
        consumer.append("c");

        let batch = drain.poll(Duration::from_secs(1)).await;
        let texts: Vec<_> = batch.iter().map(LogLine::tagged).collect();
        assert_eq!(texts, vec!["a", "ERROR: b", "c"]);
    }
}
