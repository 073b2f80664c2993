use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::db::AttendanceRecord;
use crate::sink::{RecordSink, StoreOutcome};

use super::cooldown::CooldownGate;
use super::detector::{CodeDetector, DetectedCode};
use super::frame_source::FrameSource;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The user asked to quit.
    Cancelled,
    /// The source had no frame to give.
    SourceExhausted,
    /// Reading or decoding a frame failed.
    SourceFailed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub frames: u64,
    pub detections: u64,
    pub accepted: u64,
    pub suppressed: u64,
    pub stop_reason: Option<StopReason>,
}

/// Drives frame acquisition, detection, cooldown and storage until the source
/// runs dry or the cancel token fires.
pub struct ScanLoop {
    source: Option<Box<dyn FrameSource>>,
    detector: Arc<dyn CodeDetector>,
    gate: CooldownGate,
    sink: RecordSink,
    report: ScanReport,
}

impl ScanLoop {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Arc<dyn CodeDetector>,
        gate: CooldownGate,
        sink: RecordSink,
    ) -> Self {
        Self {
            source: Some(source),
            detector,
            gate,
            sink,
            report: ScanReport::default(),
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) -> ScanReport {
        log_info!(
            "Waiting for QR codes (cooldown {}s)",
            self.gate.cooldown().as_secs_f32()
        );

        let stop_reason = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            let codes = match self.next_detections().await {
                Ok(Some(codes)) => codes,
                Ok(None) => {
                    log_error!("Could not grab frame: camera returned no frame");
                    break StopReason::SourceExhausted;
                }
                Err(err) => {
                    log_error!("Could not grab frame: {err:#}");
                    break StopReason::SourceFailed;
                }
            };

            self.handle_detections(&codes, Instant::now()).await;
        };

        self.shutdown(stop_reason)
    }

    /// Feeds one frame's worth of codes through the gate and stores every
    /// accepted one. Returns the outcomes of the accepted codes in order.
    pub async fn handle_detections(
        &mut self,
        codes: &[DetectedCode],
        now: Instant,
    ) -> Vec<StoreOutcome> {
        let mut outcomes = Vec::new();
        for code in codes {
            self.report.detections += 1;

            if !self.gate.should_accept_at(&code.text, now) {
                self.report.suppressed += 1;
                continue;
            }

            self.report.accepted += 1;
            log_info!("QR code detected: {}", code.text);

            let record = AttendanceRecord::from_scan(&code.text, Utc::now());
            outcomes.push(self.sink.store(record).await);

            log_debug!("Highlight {} at {:?}", code.text, code.polygon);
        }
        outcomes
    }

    pub fn report(&self) -> &ScanReport {
        &self.report
    }

    /// Grabs and decodes the next frame off the async threads. The source is
    /// moved into the blocking task and handed back with the result.
    async fn next_detections(&mut self) -> Result<Option<Vec<DetectedCode>>> {
        let Some(mut source) = self.source.take() else {
            return Ok(None);
        };
        let detector = Arc::clone(&self.detector);

        let (source, result) = tokio::task::spawn_blocking(move || {
            let result = source
                .next_frame()
                .map(|frame| frame.map(|frame| detector.detect(&frame)));
            (source, result)
        })
        .await?;

        self.source = Some(source);
        if matches!(result, Ok(Some(_))) {
            self.report.frames += 1;
        }
        result
    }

    fn shutdown(mut self, stop_reason: StopReason) -> ScanReport {
        match self.source.take() {
            Some(mut source) => source.close(),
            None => log_warn!("Frame source was lost before shutdown"),
        }

        if let Err(err) = self.sink.close() {
            log_error!("Failed to close local store: {err:#}");
        }

        self.report.stop_reason = Some(stop_reason);
        log_info!(
            "Scanner stopped ({:?}): {} frames, {} accepted, {} suppressed",
            stop_reason,
            self.report.frames,
            self.report.accepted,
            self.report.suppressed
        );
        self.report
    }
}
