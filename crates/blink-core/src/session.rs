//! 会话聚合
//!
//! `Session` 是一次视频流的全部可变状态：帧计数、眨眼计数、最近状态、
//! 最近 EAR 以及去抖状态机。每帧恰好推进一次，严格按帧序。

use serde::{Deserialize, Serialize};

use crate::blink::{BlinkConfig, BlinkState, EyeStatus, FrameObservation};

/// 一次确认的眨眼
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlinkEvent {
    /// 确认帧的序号（从 0 开始）
    pub frame_index: u64,
    /// 确认后的累计眨眼数
    pub blink_number: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Session {
    frame_count: u64,
    blink_count: u64,
    last_status: EyeStatus,
    last_ear: Option<f64>,
    state: BlinkState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// 纯函数推进：返回新会话和可能的眨眼事件，`self` 不变
    pub fn advance(
        &self,
        observation: FrameObservation,
        config: &BlinkConfig,
    ) -> (Session, Option<BlinkEvent>) {
        let transition = self.state.observe(observation, config);
        let frame_index = self.frame_count;

        let blink_count = if transition.blink_confirmed {
            self.blink_count + 1
        } else {
            self.blink_count
        };
        let last_status = match observation {
            FrameObservation::NoFace => EyeStatus::NoFaceDetected,
            FrameObservation::Ear(_) | FrameObservation::Undefined => transition.next.status(),
        };

        let next = Session {
            frame_count: self.frame_count + 1,
            blink_count,
            last_status,
            last_ear: observation.ear(),
            state: transition.next,
        };
        let event = transition.blink_confirmed.then_some(BlinkEvent {
            frame_index,
            blink_number: blink_count,
        });
        (next, event)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn blink_count(&self) -> u64 {
        self.blink_count
    }

    pub fn last_status(&self) -> EyeStatus {
        self.last_status
    }

    pub fn last_ear(&self) -> Option<f64> {
        self.last_ear
    }

    pub fn state(&self) -> BlinkState {
        self.state
    }
}

/// 对外只读的会话快照
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub frame_count: u64,
    pub blink_count: u64,
    pub last_status: EyeStatus,
    pub last_ear: Option<f64>,
    pub ear_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUpdate {
    pub snapshot: SessionSnapshot,
    pub blink: Option<BlinkEvent>,
}

/// 会话的唯一写入者
#[derive(Debug, Clone)]
pub struct SessionAggregator {
    config: BlinkConfig,
    session: Session,
}

impl SessionAggregator {
    pub fn new(config: BlinkConfig) -> Self {
        Self {
            config,
            session: Session::new(),
        }
    }

    pub fn process(&mut self, observation: FrameObservation) -> FrameUpdate {
        let (next, blink) = self.session.advance(observation, &self.config);
        self.session = next;
        FrameUpdate {
            snapshot: self.snapshot(),
            blink,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            frame_count: self.session.frame_count,
            blink_count: self.session.blink_count,
            last_status: self.session.last_status,
            last_ear: self.session.last_ear,
            ear_threshold: self.config.ear_threshold(),
        }
    }

    pub fn config(&self) -> &BlinkConfig {
        &self.config
    }

    pub fn state(&self) -> BlinkState {
        self.session.state
    }
}
