//! 逐帧处理流水线
//!
//! 单线程、同步、拉取式：一帧完整走完
//! 采集 → EAR → 状态机 → 会话聚合 → 输出，才会请求下一帧。
//! 停止信号只在帧边界检查，不会出现半帧更新。

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use blink_core::landmarks::FACE_BOX_PADDING_PX;
use blink_core::{
    BinocularEar, BlinkConfig, EyeIndexMap, FrameObservation, SessionAggregator, SessionSnapshot,
};
use chrono::{DateTime, Utc};

use crate::annotate::{Annotator, EyeOverlay, FrameReport, ReportError};
use crate::constants::{DEFAULT_MIN_DETECTION_CONFIDENCE, MAX_TRACKED_FACES};
use crate::source::{CaptureError, FrameSource, LandmarkFrame};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub blink: BlinkConfig,
    pub eye_map: EyeIndexMap,
    pub min_detection_confidence: f64,
    pub max_frames: Option<u64>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            blink: BlinkConfig::default(),
            eye_map: EyeIndexMap::default(),
            min_detection_confidence: DEFAULT_MIN_DETECTION_CONFIDENCE,
            max_frames: None,
        }
    }
}

/// 协作式停止信号，可跨线程克隆
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub enum StopReason {
    EndOfStream,
    StopRequested,
    FrameLimit,
    CaptureFailed(CaptureError),
    ReportFailed(ReportError),
}

impl StopReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, StopReason::CaptureFailed(_) | StopReason::ReportFailed(_))
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EndOfStream => f.write_str("end of stream"),
            StopReason::StopRequested => f.write_str("stop requested"),
            StopReason::FrameLimit => f.write_str("frame limit reached"),
            StopReason::CaptureFailed(e) => write!(f, "capture failed: {e}"),
            StopReason::ReportFailed(e) => write!(f, "report failed: {e}"),
        }
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub snapshot: SessionSnapshot,
    pub stop_reason: StopReason,
}

pub struct Pipeline<S, A> {
    source: S,
    annotator: A,
    aggregator: SessionAggregator,
    eye_map: EyeIndexMap,
    min_detection_confidence: f64,
    max_frames: Option<u64>,
}

impl<S: FrameSource, A: Annotator> Pipeline<S, A> {
    pub fn new(settings: PipelineSettings, source: S, annotator: A) -> Self {
        Self {
            source,
            annotator,
            aggregator: SessionAggregator::new(settings.blink),
            eye_map: settings.eye_map,
            min_detection_confidence: settings.min_detection_confidence,
            max_frames: settings.max_frames,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.aggregator.snapshot()
    }

    /// 处理单帧并推进会话，返回交给渲染层的报告
    pub fn process_frame(&mut self, frame: &LandmarkFrame) -> FrameReport {
        if frame.faces.len() > MAX_TRACKED_FACES {
            tracing::debug!(
                faces = frame.faces.len(),
                "Multiple faces reported, tracking only the first"
            );
        }

        let primary = frame.primary_face(self.min_detection_confidence, MAX_TRACKED_FACES);
        let (observation, overlay) = match primary {
            None => (FrameObservation::NoFace, None),
            Some(face) => match self.eye_map.extract(&face.landmarks) {
                Err(e) => {
                    tracing::warn!(error = %e, "Face landmarks unusable, treating frame as no face");
                    (FrameObservation::NoFace, None)
                }
                Ok(eyes) => {
                    let scale = frame.scale();
                    let ear = BinocularEar::measure(&eyes, scale);
                    if let Err(e) = ear.left {
                        tracing::debug!(eye = "left", error = %e, "Eye geometry ignored");
                    }
                    if let Err(e) = ear.right {
                        tracing::debug!(eye = "right", error = %e, "Eye geometry ignored");
                    }
                    let overlay = EyeOverlay {
                        left_eye: eyes.left.to_pixels(scale),
                        right_eye: eyes.right.to_pixels(scale),
                        face_box: face.landmarks.bounding_box(
                            scale,
                            FACE_BOX_PADDING_PX,
                            frame.width,
                            frame.height,
                        ),
                    };
                    (FrameObservation::from_average(ear.average()), Some(overlay))
                }
            },
        };

        let update = self.aggregator.process(observation);
        FrameReport {
            snapshot: update.snapshot,
            overlay,
            blink: update.blink,
        }
    }

    /// 运行到流结束、收到停止信号、达到帧数上限或出现致命错误
    pub fn run(mut self, stop: &StopSignal) -> RunSummary {
        let started_at = Utc::now();
        tracing::info!(
            ear_threshold = self.aggregator.config().ear_threshold(),
            debounce_frames = self.aggregator.config().debounce_frames(),
            no_face_policy = ?self.aggregator.config().no_face_policy(),
            "Blink pipeline started"
        );

        let stop_reason = loop {
            if stop.is_stop_requested() {
                break StopReason::StopRequested;
            }
            if let Some(max) = self.max_frames {
                if self.aggregator.snapshot().frame_count >= max {
                    break StopReason::FrameLimit;
                }
            }

            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break StopReason::EndOfStream,
                Err(e) => {
                    tracing::error!(error = %e, "Frame source failed, shutting down");
                    break StopReason::CaptureFailed(e);
                }
            };

            let report = self.process_frame(&frame);
            if let Err(e) = self.annotator.render(&report) {
                tracing::error!(error = %e, "Annotator failed, shutting down");
                break StopReason::ReportFailed(e);
            }
        };

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            snapshot: self.aggregator.snapshot(),
            stop_reason,
        };
        tracing::info!(
            frames = summary.snapshot.frame_count,
            blinks = summary.snapshot.blink_count,
            reason = %summary.stop_reason,
            elapsed_ms = (summary.finished_at - summary.started_at).num_milliseconds(),
            "Blink pipeline stopped"
        );
        summary
    }
}
