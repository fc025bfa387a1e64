//! 面部关键点数据模型与眼部索引适配
//!
//! 外部检测模型按自身编号方案输出整张脸的关键点；本模块把它们
//! 映射成 EAR 计算所需的规范 6 点顺序：
//! `[外眼角, 上眼睑1, 上眼睑2, 内眼角, 下眼睑1, 下眼睑2]`。
//! 顺序是不变量，左右眼必须一致，否则比值会被静默破坏。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// MediaPipe FaceMesh 左眼 6 点索引（规范顺序）
pub const MEDIAPIPE_LEFT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];

/// MediaPipe FaceMesh 右眼 6 点索引（规范顺序）
pub const MEDIAPIPE_RIGHT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];

/// 人脸框相对关键点外接矩形的外扩像素
pub const FACE_BOX_PADDING_PX: i32 = 20;

#[derive(Debug, Error, PartialEq)]
pub enum LandmarkError {
    #[error("landmark index {index} out of range: face has {available} points")]
    MissingIndex { index: usize, available: usize },
}

/// 单个关键点。`z` 仅为兼容 3D 输出而保留，计算中忽略。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl LandmarkPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    /// 缩放到像素空间后的坐标
    pub fn scaled(&self, scale: ImageScale) -> (f64, f64) {
        (self.x * scale.width, self.y * scale.height)
    }

    /// 缩放后的欧氏距离
    pub fn distance(&self, other: &LandmarkPoint, scale: ImageScale) -> f64 {
        let (ax, ay) = self.scaled(scale);
        let (bx, by) = other.scaled(scale);
        ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
    }

    /// 截断为整数像素，用于叠加绘制
    pub fn to_pixel(&self, scale: ImageScale) -> PixelPoint {
        let (x, y) = self.scaled(scale);
        PixelPoint {
            x: x as i32,
            y: y as i32,
        }
    }
}

/// 坐标缩放系数。归一化坐标使用帧宽高，像素坐标使用 [`ImageScale::IDENTITY`]。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageScale {
    pub width: f64,
    pub height: f64,
}

impl ImageScale {
    pub const IDENTITY: ImageScale = ImageScale {
        width: 1.0,
        height: 1.0,
    };

    pub fn frame(width: u32, height: u32) -> Self {
        Self {
            width: f64::from(width),
            height: f64::from(height),
        }
    }
}

impl Default for ImageScale {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

/// 规范顺序的单眼 6 点集合
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeLandmarkSet(pub [LandmarkPoint; 6]);

impl EyeLandmarkSet {
    pub fn outer_corner(&self) -> &LandmarkPoint {
        &self.0[0]
    }

    pub fn upper_lid(&self) -> (&LandmarkPoint, &LandmarkPoint) {
        (&self.0[1], &self.0[2])
    }

    pub fn inner_corner(&self) -> &LandmarkPoint {
        &self.0[3]
    }

    pub fn lower_lid(&self) -> (&LandmarkPoint, &LandmarkPoint) {
        (&self.0[4], &self.0[5])
    }

    pub fn to_pixels(&self, scale: ImageScale) -> [PixelPoint; 6] {
        self.0.map(|p| p.to_pixel(scale))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyePair {
    pub left: EyeLandmarkSet,
    pub right: EyeLandmarkSet,
}

/// 一张脸的全部关键点，按检测模型的原生编号排列
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceLandmarks {
    pub points: Vec<LandmarkPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl FaceLandmarks {
    pub fn new(points: Vec<LandmarkPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 全部关键点的像素外接框，四周外扩 `padding` 并裁剪到帧范围内
    ///
    /// 没有关键点时返回 `None`。关键点全部落在帧外同一侧时，
    /// 框退化为贴着该边的零宽（或零高）框，不会出现 min > max。
    pub fn bounding_box(
        &self,
        scale: ImageScale,
        padding: i32,
        frame_width: u32,
        frame_height: u32,
    ) -> Option<BoundingBox> {
        let mut pixels = self.points.iter().map(|p| p.to_pixel(scale));
        let first = pixels.next()?;
        let (mut x_min, mut y_min, mut x_max, mut y_max) = (first.x, first.y, first.x, first.y);
        for p in pixels {
            x_min = x_min.min(p.x);
            y_min = y_min.min(p.y);
            x_max = x_max.max(p.x);
            y_max = y_max.max(p.y);
        }

        let width = i32::try_from(frame_width).unwrap_or(i32::MAX);
        let height = i32::try_from(frame_height).unwrap_or(i32::MAX);
        // to_pixel 对帧外极远的点会饱和到 i32 边界
        let x_max = x_max.saturating_add(padding).clamp(0, width);
        let y_max = y_max.saturating_add(padding).clamp(0, height);
        Some(BoundingBox {
            x_min: x_min.saturating_sub(padding).clamp(0, x_max),
            y_min: y_min.saturating_sub(padding).clamp(0, y_max),
            x_max,
            y_max,
        })
    }
}

/// 检测模型编号 → 规范 6 点顺序的映射
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeIndexMap {
    pub left: [usize; 6],
    pub right: [usize; 6],
}

impl Default for EyeIndexMap {
    fn default() -> Self {
        Self::MEDIAPIPE_FACE_MESH
    }
}

impl EyeIndexMap {
    pub const MEDIAPIPE_FACE_MESH: EyeIndexMap = EyeIndexMap {
        left: MEDIAPIPE_LEFT_EYE,
        right: MEDIAPIPE_RIGHT_EYE,
    };

    pub fn extract(&self, face: &FaceLandmarks) -> Result<EyePair, LandmarkError> {
        Ok(EyePair {
            left: Self::select(face, &self.left)?,
            right: Self::select(face, &self.right)?,
        })
    }

    fn select(face: &FaceLandmarks, indices: &[usize; 6]) -> Result<EyeLandmarkSet, LandmarkError> {
        let mut out = [LandmarkPoint::new(0.0, 0.0); 6];
        for (slot, &index) in out.iter_mut().zip(indices) {
            *slot = *face.points.get(index).ok_or(LandmarkError::MissingIndex {
                index,
                available: face.points.len(),
            })?;
        }
        Ok(EyeLandmarkSet(out))
    }
}
