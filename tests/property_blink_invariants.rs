mod common;

use proptest::prelude::*;

use blink_core::{
    eye_aspect_ratio, BlinkConfig, EyeLandmarkSet, EyeStatus, FrameObservation, ImageScale,
    LandmarkPoint, SessionAggregator,
};
use blink_monitor::annotate::CollectingAnnotator;
use blink_monitor::pipeline::{Pipeline, PipelineSettings, StopSignal};
use blink_monitor::source::VecSource;

use common::fixtures::{frames, Sample};

const THRESHOLD: f64 = 0.25;
const DEBOUNCE: usize = 3;

fn observation() -> impl Strategy<Value = FrameObservation> {
    prop_oneof![
        8 => (0.0_f64..0.5).prop_map(FrameObservation::Ear),
        1 => Just(FrameObservation::NoFace),
        1 => Just(FrameObservation::Undefined),
    ]
}

fn trajectory(observations: &[FrameObservation]) -> Vec<(u64, u64, EyeStatus)> {
    let mut agg = SessionAggregator::new(BlinkConfig::default());
    observations
        .iter()
        .map(|&o| {
            let s = agg.process(o).snapshot;
            (s.frame_count, s.blink_count, s.last_status)
        })
        .collect()
}

fn is_closed(o: &FrameObservation) -> bool {
    matches!(o, FrameObservation::Ear(e) if *e < THRESHOLD)
}

/// 长度达到去抖帧数的最大闭眼区间数
fn long_runs(observations: &[FrameObservation]) -> u64 {
    observations
        .split(|o| !is_closed(o))
        .filter(|run| run.len() >= DEBOUNCE)
        .count() as u64
}

proptest! {
    #[test]
    fn pt_ear_formula_on_symmetric_hexagon(
        h in 1.0_f64..200.0,
        v1 in 0.0_f64..80.0,
        v2 in 0.0_f64..80.0,
        ox in -100.0_f64..100.0,
        oy in -100.0_f64..100.0,
    ) {
        let eye = EyeLandmarkSet([
            LandmarkPoint::new(ox, oy),
            LandmarkPoint::new(ox + h / 3.0, oy - v1 / 2.0),
            LandmarkPoint::new(ox + 2.0 * h / 3.0, oy - v2 / 2.0),
            LandmarkPoint::new(ox + h, oy),
            LandmarkPoint::new(ox + 2.0 * h / 3.0, oy + v2 / 2.0),
            LandmarkPoint::new(ox + h / 3.0, oy + v1 / 2.0),
        ]);
        let ear = eye_aspect_ratio(&eye, ImageScale::IDENTITY).unwrap();
        let expected = (v1 + v2) / (2.0 * h);
        prop_assert!((ear - expected).abs() < 1e-9);
        prop_assert!(ear >= 0.0);
    }

    #[test]
    fn pt_collapsed_eye_never_divides_by_zero(x in -1.0_f64..1.0, y in -1.0_f64..1.0, v in 0.0_f64..1.0) {
        let eye = EyeLandmarkSet([
            LandmarkPoint::new(x, y),
            LandmarkPoint::new(x, y - v),
            LandmarkPoint::new(x, y - v),
            LandmarkPoint::new(x, y),
            LandmarkPoint::new(x, y + v),
            LandmarkPoint::new(x, y + v),
        ]);
        prop_assert!(eye_aspect_ratio(&eye, ImageScale::IDENTITY).is_err());
    }

    #[test]
    fn pt_one_blink_per_long_run(observations in prop::collection::vec(observation(), 0..200)) {
        let traj = trajectory(&observations);
        let final_count = traj.last().map_or(0, |t| t.1);
        prop_assert_eq!(final_count, long_runs(&observations));
    }

    #[test]
    fn pt_blink_fires_where_run_reaches_debounce(observations in prop::collection::vec(observation(), 0..200)) {
        let traj = trajectory(&observations);
        let mut previous = 0;
        for (i, &(_, blinks, _)) in traj.iter().enumerate() {
            let fired = blinks > previous;
            let reaches = i + 1 >= DEBOUNCE
                && observations[i + 1 - DEBOUNCE..=i].iter().all(is_closed)
                && (i < DEBOUNCE || !is_closed(&observations[i - DEBOUNCE]));
            prop_assert_eq!(fired, reaches, "frame {}", i);
            previous = blinks;
        }
    }

    #[test]
    fn pt_counts_are_monotonic(observations in prop::collection::vec(observation(), 1..200)) {
        let traj = trajectory(&observations);
        for (i, window) in traj.windows(2).enumerate() {
            prop_assert_eq!(window[1].0, window[0].0 + 1, "frame {}", i);
            prop_assert!(window[1].1 >= window[0].1);
            prop_assert!(window[1].1 - window[0].1 <= 1);
        }
        prop_assert_eq!(traj[0].0, 1);
    }

    #[test]
    fn pt_short_runs_never_blink(lengths in prop::collection::vec(1_usize..DEBOUNCE, 0..30)) {
        let mut observations = Vec::new();
        for len in lengths {
            observations.extend(std::iter::repeat(FrameObservation::Ear(0.1)).take(len));
            observations.push(FrameObservation::Ear(0.3));
        }
        let traj = trajectory(&observations);
        prop_assert!(traj.iter().all(|t| t.1 == 0));
    }

    #[test]
    fn pt_status_reflects_observation(observations in prop::collection::vec(observation(), 1..100)) {
        let traj = trajectory(&observations);
        for (o, &(_, _, status)) in observations.iter().zip(&traj) {
            let expected = match o {
                FrameObservation::NoFace => EyeStatus::NoFaceDetected,
                FrameObservation::Ear(e) if *e < THRESHOLD => EyeStatus::Closed,
                _ => EyeStatus::Open,
            };
            prop_assert_eq!(status, expected);
        }
    }

    #[test]
    fn pt_landmark_replay_is_deterministic(
        samples in prop::collection::vec(
            prop_oneof![
                6 => (0.05_f64..0.45).prop_map(Sample::Ear),
                1 => Just(Sample::NoFace),
            ],
            0..60,
        )
    ) {
        let run = || {
            let mut annotator = CollectingAnnotator::default();
            Pipeline::new(PipelineSettings::default(), VecSource::new(frames(&samples)), &mut annotator)
                .run(&StopSignal::new());
            annotator
                .reports
                .iter()
                .map(|r| (r.snapshot.blink_count, r.snapshot.last_status))
                .collect::<Vec<_>>()
        };
        prop_assert_eq!(run(), run());
    }
}
