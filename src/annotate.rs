//! 帧报告输出
//!
//! 渲染层是外部协作者；这里给出两种进程内消费方式：tracing 日志和 JSON Lines。

use std::io::{self, Write};

use blink_core::{BlinkEvent, BoundingBox, PixelPoint, SessionSnapshot};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report io error: {0}")]
    Io(#[from] io::Error),
    #[error("report encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// 叠加绘制所需的像素坐标
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EyeOverlay {
    pub left_eye: [PixelPoint; 6],
    pub right_eye: [PixelPoint; 6],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_box: Option<BoundingBox>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameReport {
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay: Option<EyeOverlay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blink: Option<BlinkEvent>,
}

pub trait Annotator {
    fn render(&mut self, report: &FrameReport) -> Result<(), ReportError>;
}

impl<A: Annotator + ?Sized> Annotator for &mut A {
    fn render(&mut self, report: &FrameReport) -> Result<(), ReportError> {
        (**self).render(report)
    }
}

#[derive(Debug, Default)]
pub struct LogAnnotator;

impl Annotator for LogAnnotator {
    fn render(&mut self, report: &FrameReport) -> Result<(), ReportError> {
        let snapshot = &report.snapshot;
        if let Some(blink) = report.blink {
            tracing::info!(
                frame_index = blink.frame_index,
                blink_count = blink.blink_number,
                "Blink confirmed"
            );
        }
        tracing::debug!(
            frame = snapshot.frame_count,
            status = %snapshot.last_status,
            ear = ?snapshot.last_ear,
            blinks = snapshot.blink_count,
            "Frame processed"
        );
        Ok(())
    }
}

/// 每帧一行 JSON
pub struct JsonLinesAnnotator<W> {
    writer: W,
}

impl<W: Write> JsonLinesAnnotator<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Annotator for JsonLinesAnnotator<W> {
    fn render(&mut self, report: &FrameReport) -> Result<(), ReportError> {
        serde_json::to_writer(&mut self.writer, report)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// 收集全部报告，供嵌入调用方和测试使用
#[derive(Debug, Default)]
pub struct CollectingAnnotator {
    pub reports: Vec<FrameReport>,
}

impl Annotator for CollectingAnnotator {
    fn render(&mut self, report: &FrameReport) -> Result<(), ReportError> {
        self.reports.push(*report);
        Ok(())
    }
}
