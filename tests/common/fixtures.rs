use blink_core::{EyeIndexMap, FaceLandmarks, LandmarkPoint};

use blink_monitor::source::{CoordinateSpace, DetectedFace, LandmarkFrame};

pub const FRAME_WIDTH: u32 = 640;
pub const FRAME_HEIGHT: u32 = 480;

/// 眼角间距（像素）
const EYE_WIDTH_PX: f64 = 30.0;

#[derive(Debug, Clone, Copy)]
pub enum Sample {
    Ear(f64),
    NoFace,
}

/// 生成一张 FaceMesh 编号的人脸，双眼 EAR 都等于 `ear`，像素坐标
pub fn face_with_ear(ear: f64) -> FaceLandmarks {
    let mut points = vec![LandmarkPoint::new(320.0, 240.0); 478];
    let map = EyeIndexMap::default();
    let half = EYE_WIDTH_PX * ear / 2.0;
    for (indices, x0) in [(map.left, 360.0), (map.right, 250.0)] {
        let y0 = 200.0;
        let eye = [
            (x0, y0),
            (x0 + 10.0, y0 - half),
            (x0 + 20.0, y0 - half),
            (x0 + EYE_WIDTH_PX, y0),
            (x0 + 20.0, y0 + half),
            (x0 + 10.0, y0 + half),
        ];
        for (&idx, (x, y)) in indices.iter().zip(eye) {
            points[idx] = LandmarkPoint::new(x, y);
        }
    }
    FaceLandmarks::new(points)
}

pub fn frame(sample: Sample) -> LandmarkFrame {
    match sample {
        Sample::Ear(ear) => LandmarkFrame {
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
            coordinates: CoordinateSpace::Pixel,
            faces: vec![DetectedFace {
                confidence: Some(0.95),
                landmarks: face_with_ear(ear),
            }],
        },
        Sample::NoFace => LandmarkFrame::no_face(FRAME_WIDTH, FRAME_HEIGHT),
    }
}

pub fn frames(samples: &[Sample]) -> Vec<LandmarkFrame> {
    samples.iter().copied().map(frame).collect()
}

pub fn ears(values: &[f64]) -> Vec<Sample> {
    values.iter().copied().map(Sample::Ear).collect()
}

/// JSON Lines 回放内容
pub fn replay_jsonl(frames: &[LandmarkFrame]) -> String {
    frames
        .iter()
        .map(|f| serde_json::to_string(f).expect("frame to json") + "\n")
        .collect()
}
