//! 眨眼检测核心库
//!
//! 把逐帧的面部关键点转换为去抖后的眨眼事件，不依赖任何采集或渲染。
//!
//! ## 模块
//! - `landmarks`: 关键点数据模型与眼部索引映射
//! - `ear`: EAR (Eye Aspect Ratio) 眼部纵横比计算
//! - `blink`: 眨眼去抖状态机
//! - `session`: 会话计数聚合

pub mod blink;
pub mod ear;
pub mod landmarks;
pub mod session;

// 重新导出核心类型，方便外部使用
pub use blink::{BlinkConfig, BlinkState, ConfigError, EyeStatus, FrameObservation, NoFacePolicy};
pub use ear::{average_ear, eye_aspect_ratio, BinocularEar, EarError};
pub use landmarks::{
    BoundingBox, EyeIndexMap, EyeLandmarkSet, EyePair, FaceLandmarks, ImageScale, LandmarkError,
    LandmarkPoint, PixelPoint,
};
pub use session::{BlinkEvent, FrameUpdate, Session, SessionAggregator, SessionSnapshot};
