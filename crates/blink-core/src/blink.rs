//! 眨眼检测状态机
//!
//! 两状态去抖：`Open` → `ClosedCounting(streak)`。
//! 连续 `debounce_frames` 帧 EAR 低于阈值时确认一次眨眼，且每个闭眼
//! 区间最多确认一次；EAR 回到阈值以上立即回到 `Open`。
//!
//! 瞬时状态（`Closed`）与确认计数是两个不同信号：前者只反映阈值穿越，
//! 后者是去抖后的事件。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_EAR_THRESHOLD: f64 = 0.25;
pub const DEFAULT_DEBOUNCE_FRAMES: u32 = 3;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("ear_threshold must be a positive finite number, got {0}")]
    InvalidThreshold(f64),
    #[error("debounce_frames must be at least 1")]
    ZeroDebounce,
    #[error("unknown no-face policy '{0}', expected 'reset' or 'hold'")]
    UnknownNoFacePolicy(String),
}

/// 未检测到人脸的帧如何影响闭眼计数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoFacePolicy {
    /// 丢失跟踪视为睁眼帧，计数清零
    #[default]
    Reset,
    /// 保持计数不变，闭眼区间可以跨越丢失帧
    Hold,
}

impl FromStr for NoFacePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reset" => Ok(Self::Reset),
            "hold" => Ok(Self::Hold),
            other => Err(ConfigError::UnknownNoFacePolicy(other.to_string())),
        }
    }
}

/// 状态机参数，构造时校验
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlinkConfig {
    ear_threshold: f64,
    debounce_frames: u32,
    no_face_policy: NoFacePolicy,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            ear_threshold: DEFAULT_EAR_THRESHOLD,
            debounce_frames: DEFAULT_DEBOUNCE_FRAMES,
            no_face_policy: NoFacePolicy::Reset,
        }
    }
}

impl BlinkConfig {
    pub fn new(
        ear_threshold: f64,
        debounce_frames: u32,
        no_face_policy: NoFacePolicy,
    ) -> Result<Self, ConfigError> {
        if !ear_threshold.is_finite() || ear_threshold <= 0.0 {
            return Err(ConfigError::InvalidThreshold(ear_threshold));
        }
        if debounce_frames == 0 {
            return Err(ConfigError::ZeroDebounce);
        }
        Ok(Self {
            ear_threshold,
            debounce_frames,
            no_face_policy,
        })
    }

    pub fn ear_threshold(&self) -> f64 {
        self.ear_threshold
    }

    pub fn debounce_frames(&self) -> u32 {
        self.debounce_frames
    }

    pub fn no_face_policy(&self) -> NoFacePolicy {
        self.no_face_policy
    }
}

/// 每帧上报的眼睛状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EyeStatus {
    #[default]
    Open,
    Closed,
    NoFaceDetected,
}

impl fmt::Display for EyeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EyeStatus::Open => "OPEN",
            EyeStatus::Closed => "CLOSED",
            EyeStatus::NoFaceDetected => "NO FACE",
        };
        f.write_str(label)
    }
}

/// 状态机单帧输入
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameObservation {
    /// 双眼平均 EAR
    Ear(f64),
    /// 有人脸但双眼几何都退化，EAR 无定义，按睁眼处理
    Undefined,
    /// 未检测到人脸
    NoFace,
}

impl FrameObservation {
    pub fn from_average(ear: Option<f64>) -> Self {
        ear.map_or(Self::Undefined, Self::Ear)
    }

    pub fn ear(&self) -> Option<f64> {
        match self {
            Self::Ear(e) => Some(*e),
            Self::Undefined | Self::NoFace => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum BlinkState {
    #[default]
    Open,
    ClosedCounting { streak: u32 },
}

/// 一次状态转移的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: BlinkState,
    /// 本帧恰好达到去抖帧数
    pub blink_confirmed: bool,
}

impl BlinkState {
    /// 根据本帧平均 EAR 推进状态
    pub fn step(self, ear: f64, config: &BlinkConfig) -> Transition {
        if ear.is_nan() || ear >= config.ear_threshold {
            return Transition {
                next: BlinkState::Open,
                blink_confirmed: false,
            };
        }

        let streak = match self {
            BlinkState::Open => 1,
            BlinkState::ClosedCounting { streak } => streak.saturating_add(1),
        };
        Transition {
            next: BlinkState::ClosedCounting { streak },
            blink_confirmed: streak == config.debounce_frames,
        }
    }

    /// 处理任意一种帧观测；无人脸帧的处理取决于 [`NoFacePolicy`]
    pub fn observe(self, observation: FrameObservation, config: &BlinkConfig) -> Transition {
        match observation {
            FrameObservation::Ear(ear) => self.step(ear, config),
            FrameObservation::Undefined => Transition {
                next: BlinkState::Open,
                blink_confirmed: false,
            },
            FrameObservation::NoFace => Transition {
                next: match config.no_face_policy {
                    NoFacePolicy::Reset => BlinkState::Open,
                    NoFacePolicy::Hold => self,
                },
                blink_confirmed: false,
            },
        }
    }

    pub fn status(&self) -> EyeStatus {
        match self {
            BlinkState::Open => EyeStatus::Open,
            BlinkState::ClosedCounting { .. } => EyeStatus::Closed,
        }
    }

    pub fn streak(&self) -> u32 {
        match self {
            BlinkState::Open => 0,
            BlinkState::ClosedCounting { streak } => *streak,
        }
    }
}
