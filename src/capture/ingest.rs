use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::RecorderError;
use crate::models::{CalibrationSample, FaceObservation, RawFrame, ScreenMetrics};
use crate::recorder::SessionRecorder;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// One processed camera frame on its way to the recorder.
#[derive(Debug, Clone)]
pub struct FrameEvent {
    /// `None` when the detector found no face.
    pub detection: Option<FaceObservation>,
    pub frame: RawFrame,
    pub screen: ScreenMetrics,
    pub calibration: Option<CalibrationSample>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub recorded: u64,
    /// Events that arrived while no session was recording.
    pub rejected: u64,
}

/// Handle to a running ingest loop.
pub struct IngestHandle {
    handle: Option<JoinHandle<IngestStats>>,
    cancel_token: CancellationToken,
}

impl IngestHandle {
    /// Wait for the loop to end. It ends once every sender is dropped and
    /// the queue is drained, or when cancelled.
    pub async fn join(mut self) -> Result<IngestStats> {
        match self.handle.take() {
            Some(handle) => handle.await.context("ingest loop task failed to join"),
            None => Ok(IngestStats::default()),
        }
    }

    /// Stop after the event currently being recorded; queued events are dropped.
    pub async fn cancel(self) -> Result<IngestStats> {
        self.cancel_token.cancel();
        self.join().await
    }
}

/// Start feeding `FrameEvent`s from a bounded channel into `recorder`.
///
/// The channel is the only way frames reach the recorder, so frame order is
/// the order events were sent. Senders wait when `capacity` events are queued.
pub fn spawn_ingest_loop(
    recorder: SessionRecorder,
    capacity: usize,
) -> (mpsc::Sender<FrameEvent>, IngestHandle) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let cancel_token = CancellationToken::new();
    let handle = tokio::spawn(ingest_loop(recorder, receiver, cancel_token.clone()));

    (
        sender,
        IngestHandle {
            handle: Some(handle),
            cancel_token,
        },
    )
}

async fn ingest_loop(
    recorder: SessionRecorder,
    mut receiver: mpsc::Receiver<FrameEvent>,
    cancel_token: CancellationToken,
) -> IngestStats {
    let mut stats = IngestStats::default();

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("ingest loop cancelled after {} frames", stats.recorded);
                break;
            }
            next = receiver.recv() => {
                let Some(event) = next else {
                    break;
                };
                let result = recorder
                    .record_frame(
                        event.detection.as_ref(),
                        event.frame,
                        event.screen,
                        event.calibration,
                    )
                    .await;

                match result {
                    Ok(()) => stats.recorded += 1,
                    Err(RecorderError::NotRecording) => {
                        stats.rejected += 1;
                        if stats.rejected == 1 {
                            log_warn!("frames arriving with no active session are dropped");
                        }
                    }
                    Err(err) => {
                        stats.rejected += 1;
                        log_warn!("frame not recorded: {err}");
                    }
                }
            }
        }
    }

    stats
}
