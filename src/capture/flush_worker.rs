use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{FrameWriteFailure, RecorderError, Result};

use super::frame_buffer::FlushBatch;
use super::frame_writer::FrameWriter;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

const NOT_WRITTEN: &str = "flush stopped before this frame was written";

/// What the flush worker did over a whole session.
#[derive(Debug, Clone, Default)]
pub struct FlushSummary {
    /// Size of every batch handled, in submission order.
    pub batch_sizes: Vec<usize>,
    pub frames_written: usize,
    /// Every frame that has no file on disk, whatever the reason.
    pub failures: Vec<FrameWriteFailure>,
    /// Indices the writer got to, written or failed.
    pub attempted: Vec<u64>,
    pub cancelled: bool,
}

impl FlushSummary {
    pub fn flush_count(&self) -> usize {
        self.batch_sizes.len()
    }
}

/// Owns the background task that encodes and writes flushed batches, so the
/// recording path only pays for a buffer swap and a `try_send`.
///
/// At most `queue_depth` batches wait for the writer. A batch that finds the
/// queue full is dropped and its frames are reported as failures, so memory
/// stays bounded when the disk is slower than capture.
pub struct FlushController {
    sender: Option<mpsc::Sender<FlushBatch>>,
    handle: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
    progress: watch::Receiver<FlushSummary>,
    writer: Arc<FrameWriter>,
    /// Indices of every frame accepted for writing.
    submitted: Vec<u64>,
    /// Frames refused before they reached the writer.
    dropped: Vec<FrameWriteFailure>,
}

impl FlushController {
    /// Spawn the worker; must be called inside a tokio runtime.
    pub fn start(writer: FrameWriter, queue_depth: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_depth.max(1));
        let (progress_tx, progress) = watch::channel(FlushSummary::default());
        let cancel_token = CancellationToken::new();
        let writer = Arc::new(writer);
        let handle = tokio::spawn(flush_loop(
            receiver,
            Arc::clone(&writer),
            Arc::new(progress_tx),
            cancel_token.clone(),
        ));

        Self {
            sender: Some(sender),
            handle: Some(handle),
            cancel_token,
            progress,
            writer,
            submitted: Vec::new(),
            dropped: Vec::new(),
        }
    }

    /// Queue a batch for writing. Never waits: when the queue is full the
    /// batch is dropped and recorded as failed frames.
    pub fn submit(&mut self, batch: FlushBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let Some(sender) = self.sender.as_ref() else {
            self.drop_batch(&batch, "flush worker already closed");
            return Err(RecorderError::FlushWorker("flush worker already closed".into()));
        };

        let indices: Vec<u64> = batch.frames.iter().map(|f| f.index).collect();
        let sent = sender.try_send(batch);
        match sent {
            Ok(()) => {
                self.submitted.extend(indices);
                Ok(())
            }
            Err(TrySendError::Full(batch)) => {
                self.drop_batch(&batch, "flush queue full");
                Err(RecorderError::FlushQueueFull {
                    frames: batch.len(),
                })
            }
            Err(TrySendError::Closed(batch)) => {
                self.drop_batch(&batch, "flush worker stopped");
                Err(RecorderError::FlushWorker("flush worker stopped".into()))
            }
        }
    }

    /// Queue `tail`, close the queue and wait for everything to be written.
    ///
    /// The summary is always returned. After `timeout` the remaining work is
    /// cancelled, the error is `FlushTimeout`, and the summary holds what was
    /// done so far plus a failure for every frame that was never attempted.
    pub async fn finish(
        &mut self,
        tail: Option<FlushBatch>,
        timeout: Duration,
    ) -> (FlushSummary, Option<RecorderError>) {
        let sender = self.sender.take();
        let tail = tail.filter(|batch| !batch.is_empty());
        if let Some(batch) = &tail {
            self.submitted.extend(batch.frames.iter().map(|f| f.index));
        }

        let Some(mut handle) = self.handle.take() else {
            return (self.settle(), None);
        };

        let drain = {
            let handle = &mut handle;
            async move {
                if let (Some(sender), Some(batch)) = (sender.as_ref(), tail) {
                    if sender.send(batch).await.is_err() {
                        log_warn!("flush worker gone before the last batch");
                    }
                }
                drop(sender);
                handle.await
            }
        };

        let error = match tokio::time::timeout(timeout, drain).await {
            Ok(Ok(())) => None,
            Ok(Err(join_err)) => Some(RecorderError::FlushWorker(format!(
                "flush task failed to join: {join_err}"
            ))),
            Err(_) => {
                log_warn!("flush still running after {:?}; cancelling", timeout);
                self.cancel_token.cancel();
                handle.abort();
                Some(RecorderError::FlushTimeout {
                    secs: timeout.as_secs(),
                })
            }
        };

        (self.settle(), error)
    }

    /// Drop queued batches and stop after the frame currently being written.
    pub async fn cancel(&mut self) -> FlushSummary {
        self.cancel_token.cancel();
        self.sender.take();

        if let Some(handle) = self.handle.take() {
            if let Err(join_err) = handle.await {
                log_error!("flush task failed to join after cancel: {join_err}");
            }
        }
        self.settle()
    }

    /// Current progress plus a failure for every accepted frame the writer
    /// never reached.
    fn settle(&mut self) -> FlushSummary {
        let mut summary = self.progress.borrow().clone();
        summary.failures.append(&mut self.dropped);

        let attempted: HashSet<u64> = summary.attempted.iter().copied().collect();
        let missed = self
            .submitted
            .iter()
            .filter(|index| !attempted.contains(*index))
            .map(|&index| FrameWriteFailure {
                index,
                path: self.writer.path_for(index),
                reason: NOT_WRITTEN.to_string(),
            });
        summary.failures.extend(missed);
        summary
    }

    fn drop_batch(&mut self, batch: &FlushBatch, reason: &str) {
        log_warn!("dropping {} frame(s): {reason}", batch.len());
        for buffered in &batch.frames {
            self.dropped.push(FrameWriteFailure {
                index: buffered.index,
                path: self.writer.path_for(buffered.index),
                reason: reason.to_string(),
            });
        }
    }
}

impl Drop for FlushController {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel_token.cancel();
        }
    }
}

async fn flush_loop(
    mut receiver: mpsc::Receiver<FlushBatch>,
    writer: Arc<FrameWriter>,
    progress: Arc<watch::Sender<FlushSummary>>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("flush worker cancelled");
                progress.send_modify(|summary| summary.cancelled = true);
                break;
            }
            next = receiver.recv() => {
                let Some(batch) = next else {
                    break;
                };
                let batch_len = batch.len();
                let started = Instant::now();
                progress.send_modify(|summary| summary.batch_sizes.push(batch_len));

                let outcome = tokio::task::spawn_blocking({
                    let writer = Arc::clone(&writer);
                    let token = cancel_token.clone();
                    let progress = Arc::clone(&progress);
                    move || {
                        writer.write_batch_observed(&batch, &token, |index, failure| {
                            progress.send_modify(|summary| {
                                summary.attempted.push(index);
                                match failure {
                                    Some(failure) => summary.failures.push(failure.clone()),
                                    None => summary.frames_written += 1,
                                }
                            });
                        })
                    }
                })
                .await;

                match outcome {
                    Ok(outcome) => {
                        if !outcome.failures.is_empty() {
                            log_warn!(
                                "flush wrote {}/{} frames ({} failed)",
                                outcome.written,
                                batch_len,
                                outcome.failures.len()
                            );
                        }
                        if outcome.cancelled {
                            progress.send_modify(|summary| summary.cancelled = true);
                            break;
                        }
                        log_info!(
                            "flushed {} frames in {}ms",
                            outcome.written,
                            started.elapsed().as_millis()
                        );
                    }
                    Err(join_err) => {
                        log_error!("frame writer worker join failed: {join_err}");
                    }
                }
            }
        }
    }
}
