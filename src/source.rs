//! 帧来源适配
//!
//! 关键点检测模型是外部协作者；这里只定义它每帧交付的数据形状和拉取接口。
//! `ReplaySource` 读取 JSON Lines 录制（每行一帧），`VecSource` 用于内存帧序列。

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};

use blink_core::{FaceLandmarks, ImageScale};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::STDIN_SOURCE;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("frame source io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid frame at line {line}: {source}")]
    Decode {
        line: u64,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSpace {
    /// [0, 1] 归一化坐标，需按帧宽高缩放
    #[default]
    Normalized,
    Pixel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedFace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub landmarks: FaceLandmarks,
}

/// 一帧检测结果；`faces` 为空即未检测到人脸
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandmarkFrame {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub coordinates: CoordinateSpace,
    #[serde(default)]
    pub faces: Vec<DetectedFace>,
}

impl LandmarkFrame {
    pub fn no_face(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            coordinates: CoordinateSpace::Normalized,
            faces: Vec::new(),
        }
    }

    pub fn with_face(width: u32, height: u32, landmarks: FaceLandmarks) -> Self {
        Self {
            width,
            height,
            coordinates: CoordinateSpace::Normalized,
            faces: vec![DetectedFace {
                confidence: None,
                landmarks,
            }],
        }
    }

    pub fn scale(&self) -> ImageScale {
        match self.coordinates {
            CoordinateSpace::Normalized => ImageScale::frame(self.width, self.height),
            CoordinateSpace::Pixel => ImageScale::IDENTITY,
        }
    }

    /// 按检测顺序取前 `max_faces` 张人脸中第一张达到置信度下限的
    ///
    /// 未携带置信度的人脸视为已由检测模型过滤。
    pub fn primary_face(&self, min_confidence: f64, max_faces: usize) -> Option<&DetectedFace> {
        self.faces
            .iter()
            .take(max_faces)
            .find(|face| match face.confidence {
                Some(c) => c >= min_confidence,
                None => true,
            })
    }
}

/// 拉取式帧来源。`Ok(None)` 表示流结束；错误对流水线是致命的。
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, CaptureError>;
}

pub struct ReplaySource<R> {
    reader: R,
    line: u64,
    buf: String,
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }

    /// 已读取的行数
    pub fn lines_read(&self) -> u64 {
        self.line
    }
}

impl ReplaySource<Box<dyn BufRead + Send>> {
    /// 打开文件回放；`-` 表示标准输入
    pub fn open(location: &str) -> Result<Self, CaptureError> {
        let reader: Box<dyn BufRead + Send> = if location == STDIN_SOURCE {
            Box::new(BufReader::new(io::stdin()))
        } else {
            Box::new(BufReader::new(File::open(location)?))
        };
        Ok(Self::new(reader))
    }
}

impl<R: BufRead> FrameSource for ReplaySource<R> {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, CaptureError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;

            let trimmed = self.buf.trim();
            if trimmed.is_empty() {
                continue;
            }
            return serde_json::from_str(trimmed)
                .map(Some)
                .map_err(|source| CaptureError::Decode {
                    line: self.line,
                    source,
                });
        }
    }
}

#[derive(Debug, Default)]
pub struct VecSource {
    frames: VecDeque<LandmarkFrame>,
}

impl VecSource {
    pub fn new(frames: impl IntoIterator<Item = LandmarkFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl FrameSource for VecSource {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, CaptureError> {
        Ok(self.frames.pop_front())
    }
}
