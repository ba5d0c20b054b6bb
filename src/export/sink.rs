//! Asynchronous NDJSON output.
//!
//! Request handlers enqueue finished records; a single consumer task owns the
//! destination and writes one JSON line per record, so lines never
//! interleave. Handlers never wait on I/O, only on queue capacity.

use std::io::Write;
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::OverflowPolicy;
use crate::error_handling::{CheckEvent, CheckStats, SinkError};
use crate::models::RequestRecord;

/// Producer handle of the output queue. Cheap to clone.
#[derive(Clone)]
pub struct OutputSink {
    tx: mpsc::Sender<Arc<RequestRecord>>,
    policy: OverflowPolicy,
    closed: CancellationToken,
    stats: Arc<CheckStats>,
}

/// The running consumer task.
pub struct SinkTask {
    closed: CancellationToken,
    handle: JoinHandle<()>,
}

impl OutputSink {
    /// Starts the consumer task writing to `writer`.
    ///
    /// `capacity` must be non-zero.
    pub fn start(
        writer: Box<dyn Write + Send>,
        capacity: usize,
        policy: OverflowPolicy,
        stats: Arc<CheckStats>,
    ) -> (OutputSink, SinkTask) {
        let (tx, rx) = mpsc::channel(capacity);
        let closed = CancellationToken::new();
        let handle = tokio::spawn(consume(rx, writer, closed.clone(), Arc::clone(&stats)));
        let sink = OutputSink {
            tx,
            policy,
            closed: closed.clone(),
            stats,
        };
        (sink, SinkTask { closed, handle })
    }

    /// Hands a record to the writer.
    ///
    /// # Errors
    ///
    /// - `SinkError::Closed` once the sink has been shut down
    /// - `SinkError::Full` if the queue is full and the policy is `drop`
    pub async fn enqueue(&self, record: Arc<RequestRecord>) -> Result<(), SinkError> {
        if self.closed.is_cancelled() {
            return Err(SinkError::Closed);
        }
        match self.policy {
            OverflowPolicy::Block => self.tx.send(record).await.map_err(|_| SinkError::Closed),
            OverflowPolicy::Drop => match self.tx.try_send(record) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(record)) => {
                    self.stats.increment(CheckEvent::RecordDropped);
                    log::warn!(
                        "Output queue full, dropping record for {:?}",
                        record.domain
                    );
                    Err(SinkError::Full)
                }
                Err(TrySendError::Closed(_)) => Err(SinkError::Closed),
            },
        }
    }

    /// Whether `shutdown` has been requested.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled() || self.tx.is_closed()
    }
}

impl SinkTask {
    /// Stops accepting records, writes everything already queued, flushes,
    /// and waits for the consumer to exit.
    pub async fn shutdown(self) {
        self.closed.cancel();
        if let Err(e) = self.handle.await {
            log::error!("Output writer task failed: {e}");
        }
    }
}

async fn consume(
    mut rx: mpsc::Receiver<Arc<RequestRecord>>,
    mut writer: Box<dyn Write + Send>,
    closed: CancellationToken,
    stats: Arc<CheckStats>,
) {
    loop {
        tokio::select! {
            biased;
            record = rx.recv() => match record {
                Some(record) => write_record(&mut writer, &record, &stats),
                // Every producer handle is gone
                None => break,
            },
            _ = closed.cancelled() => {
                rx.close();
                let mut drained = 0usize;
                while let Some(record) = rx.recv().await {
                    write_record(&mut writer, &record, &stats);
                    drained += 1;
                }
                log::debug!("Output writer drained {drained} queued record(s)");
                break;
            }
        }
    }
    if let Err(e) = writer.flush() {
        log::error!("Failed to flush output: {e}");
    }
}

fn write_record(writer: &mut dyn Write, record: &RequestRecord, stats: &CheckStats) {
    match encode_line(writer, record) {
        Ok(()) => stats.increment(CheckEvent::RecordWritten),
        Err(e) => {
            stats.increment(CheckEvent::RecordWriteFailed);
            log::error!("{}", SinkError::Write(e));
        }
    }
}

fn encode_line(writer: &mut dyn Write, record: &RequestRecord) -> std::io::Result<()> {
    serde_json::to_writer(&mut *writer, record)?;
    writer.write_all(b"\n")?;
    writer.flush()
}
