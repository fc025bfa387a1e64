//! EAR (Eye Aspect Ratio) 计算模块
//!
//! 标准 6 点公式：EAR = (|p2-p6| + |p3-p5|) / (2 * |p1-p4|)
//! - p1, p4: 眼角点（水平方向）
//! - p2, p3: 上眼睑点
//! - p5, p6: 下眼睑点
//!
//! 睁眼时 EAR 通常在 0.2 - 0.4 之间，闭眼时趋近于 0。

use thiserror::Error;

use crate::landmarks::{EyeLandmarkSet, EyePair, ImageScale};

/// 水平眼角距离低于该值（或非有限值）视为几何退化
pub const MIN_HORIZONTAL_DISTANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum EarError {
    #[error("degenerate eye geometry: horizontal distance {horizontal} is too small or not finite")]
    DegenerateGeometry { horizontal: f64 },
}

/// 单眼 EAR
///
/// 纯函数；眼角距离退化时返回 [`EarError::DegenerateGeometry`]，不会除零。
pub fn eye_aspect_ratio(eye: &EyeLandmarkSet, scale: ImageScale) -> Result<f64, EarError> {
    let horizontal = eye.outer_corner().distance(eye.inner_corner(), scale);
    if !horizontal.is_finite() || horizontal < MIN_HORIZONTAL_DISTANCE {
        return Err(EarError::DegenerateGeometry { horizontal });
    }

    let (upper1, upper2) = eye.upper_lid();
    let (lower1, lower2) = eye.lower_lid();
    // p2-p6, p3-p5
    let vertical1 = upper1.distance(lower2, scale);
    let vertical2 = upper2.distance(lower1, scale);

    Ok((vertical1 + vertical2) / (2.0 * horizontal))
}

/// 双眼取平均；一只眼退化时只用另一只，两只都退化返回 `None`
pub fn average_ear(left: Result<f64, EarError>, right: Result<f64, EarError>) -> Option<f64> {
    match (left, right) {
        (Ok(l), Ok(r)) => Some((l + r) / 2.0),
        (Ok(v), Err(_)) | (Err(_), Ok(v)) => Some(v),
        (Err(_), Err(_)) => None,
    }
}

/// 一帧的双眼 EAR 测量结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinocularEar {
    pub left: Result<f64, EarError>,
    pub right: Result<f64, EarError>,
}

impl BinocularEar {
    pub fn measure(eyes: &EyePair, scale: ImageScale) -> Self {
        Self {
            left: eye_aspect_ratio(&eyes.left, scale),
            right: eye_aspect_ratio(&eyes.right, scale),
        }
    }

    pub fn average(&self) -> Option<f64> {
        average_ear(self.left, self.right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::LandmarkPoint;

    const EPS: f64 = 1e-12;

    /// 对称六边形眼形：眼角间距 `h`，两条竖直距离分别为 `v1`、`v2`
    fn hexagon(h: f64, v1: f64, v2: f64) -> EyeLandmarkSet {
        let a = h / 3.0;
        let b = 2.0 * h / 3.0;
        EyeLandmarkSet([
            LandmarkPoint::new(0.0, 0.0),
            LandmarkPoint::new(a, -v1 / 2.0),
            LandmarkPoint::new(b, -v2 / 2.0),
            LandmarkPoint::new(h, 0.0),
            LandmarkPoint::new(b, v2 / 2.0),
            LandmarkPoint::new(a, v1 / 2.0),
        ])
    }

    #[test]
    fn formula_matches_known_distances() {
        let eye = hexagon(30.0, 9.0, 6.0);
        let ear = eye_aspect_ratio(&eye, ImageScale::IDENTITY).unwrap();
        assert!((ear - (9.0 + 6.0) / 60.0).abs() < EPS);
    }

    #[test]
    fn normalized_points_are_scaled_before_measuring() {
        // 归一化坐标在非正方形帧上：x 方向拉伸
        let eye = EyeLandmarkSet([
            LandmarkPoint::new(0.10, 0.50),
            LandmarkPoint::new(0.12, 0.49),
            LandmarkPoint::new(0.14, 0.49),
            LandmarkPoint::new(0.16, 0.50),
            LandmarkPoint::new(0.14, 0.51),
            LandmarkPoint::new(0.12, 0.51),
        ]);
        let scaled = eye_aspect_ratio(&eye, ImageScale::frame(640, 480)).unwrap();
        // 水平 0.06 * 640 = 38.4，竖直 0.02 * 480 = 9.6
        assert!((scaled - 9.6 / 38.4).abs() < 1e-9);

        let raw = eye_aspect_ratio(&eye, ImageScale::IDENTITY).unwrap();
        assert!((raw - 0.02 / 0.06).abs() < 1e-9);
    }

    #[test]
    fn collapsed_corners_are_degenerate() {
        let eye = hexagon(0.0, 5.0, 5.0);
        let err = eye_aspect_ratio(&eye, ImageScale::IDENTITY).unwrap_err();
        assert!(matches!(err, EarError::DegenerateGeometry { .. }));
    }

    #[test]
    fn nan_coordinates_are_degenerate() {
        let mut eye = hexagon(30.0, 9.0, 9.0);
        eye.0[3] = LandmarkPoint::new(f64::NAN, 0.0);
        assert!(eye_aspect_ratio(&eye, ImageScale::IDENTITY).is_err());
    }

    #[test]
    fn infinite_corner_distance_is_degenerate() {
        let mut eye = hexagon(30.0, 9.0, 9.0);
        eye.0[0] = LandmarkPoint::new(-1e308, 0.0);
        eye.0[3] = LandmarkPoint::new(1e308, 0.0);
        let err = eye_aspect_ratio(&eye, ImageScale::IDENTITY).unwrap_err();
        assert!(matches!(err, EarError::DegenerateGeometry { horizontal } if horizontal.is_infinite()));
    }

    #[test]
    fn average_uses_both_eyes() {
        assert_eq!(average_ear(Ok(0.2), Ok(0.3)), Some(0.25));
    }

    #[test]
    fn average_falls_back_to_single_eye() {
        let bad = Err(EarError::DegenerateGeometry { horizontal: 0.0 });
        assert_eq!(average_ear(bad, Ok(0.31)), Some(0.31));
        assert_eq!(average_ear(Ok(0.18), bad), Some(0.18));
        assert_eq!(average_ear(bad, bad), None);
    }

    #[test]
    fn binocular_measure_reports_each_eye() {
        let eyes = EyePair {
            left: hexagon(30.0, 9.0, 9.0),
            right: hexagon(0.0, 9.0, 9.0),
        };
        let m = BinocularEar::measure(&eyes, ImageScale::IDENTITY);
        assert!(m.left.is_ok());
        assert!(m.right.is_err());
        assert!((m.average().unwrap() - 0.3).abs() < EPS);
    }
}
