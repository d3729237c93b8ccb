//! Randomized checks of geometric and numeric invariants.

mod common;

use approx::assert_relative_eq;
use drape::{
    calibration::{Calibration, DISTANCE_SCALE_RANGE, RATIO_SCALE_RANGE},
    filter::{Ema, Filter},
    fit::{AssetSize, Fitter},
    landmark::{distance, face_bounding_box, Landmarks},
    orientation::OrientationEstimator,
    overlay::Category,
    rect::Rect,
    resolution::Resolution,
};
use nalgebra::Point2;

use common::{face, RES};

const ITERATIONS: usize = 500;

fn random_landmarks(rng: &mut fastrand::Rng) -> Landmarks {
    let len = rng.usize(1..=Landmarks::NUM_LANDMARKS);
    Landmarks::from_normalized((0..len).map(|_| [rng.f32(), rng.f32()]))
}

fn random_face(rng: &mut fastrand::Rng) -> Landmarks {
    let cx = 150.0 + rng.f32() * 340.0;
    let cy = 150.0 + rng.f32() * 180.0;
    face(RES, cx, cy, 0.3 + rng.f32() * 1.2)
}

#[test]
fn bounding_box_contains_all_landmarks() {
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    for _ in 0..ITERATIONS {
        let res = Resolution::new(rng.u32(1..2000), rng.u32(1..2000));
        let landmarks = random_landmarks(&mut rng);
        let bbox = face_bounding_box(&landmarks, res).unwrap();
        assert!(bbox.width() >= 0.0 && bbox.height() >= 0.0);
        // `x + width` may round one ulp below the maximum coordinate.
        let grown = Rect::from_top_left(bbox.x(), bbox.y(), bbox.width() + 1e-3, bbox.height() + 1e-3);
        for pt in landmarks.points(res) {
            assert!(grown.contains_point(pt), "{pt:?} outside {bbox:?}");
        }
    }
}

#[test]
fn distance_is_symmetric() {
    let mut rng = fastrand::Rng::with_seed(17);
    for _ in 0..ITERATIONS {
        let a = Point2::new(rng.f32() * 1000.0, rng.f32() * 1000.0);
        let b = Point2::new(rng.f32() * 1000.0, rng.f32() * 1000.0);
        assert_eq!(distance(Some(a), Some(b)), distance(Some(b), Some(a)));
        assert_eq!(distance(Some(a), Some(a)), 0.0);
        assert!(distance(Some(a), Some(b)) >= 0.0);
    }
}

#[test]
fn calibration_scales_stay_in_range() {
    let mut rng = fastrand::Rng::with_seed(99);
    for _ in 0..ITERATIONS {
        let mut calibration = Calibration::new();
        calibration.capture(&random_face(&mut rng), RES);

        let current = rng.f32() * 2000.0;
        for scale in [
            calibration.eye_scale(current),
            calibration.face_width_scale(current),
        ] {
            assert!((RATIO_SCALE_RANGE.0..=RATIO_SCALE_RANGE.1).contains(&scale), "{scale}");
        }
        let scale = calibration.distance_scale(current);
        assert!((DISTANCE_SCALE_RANGE.0..=DISTANCE_SCALE_RANGE.1).contains(&scale), "{scale}");
    }
}

#[test]
fn placements_preserve_aspect_ratio() {
    let mut rng = fastrand::Rng::with_seed(1234);
    for _ in 0..ITERATIONS {
        let mut calibration = Calibration::new();
        calibration.capture(&random_face(&mut rng), RES);
        let fitter = Fitter::new(&calibration, RES);

        let mut landmarks = random_face(&mut rng);
        if rng.bool() {
            // Truncated sets exercise the fallback estimates.
            let len = rng.usize(34..454);
            landmarks = Landmarks::from_normalized(landmarks.positions()[..len].to_vec());
        }
        let asset = AssetSize {
            user_scale: 0.5 + rng.f32() * 1.5,
            user_vertical_offset: rng.f32() - 0.5,
            ..AssetSize::new(rng.u32(1..1000) as f32, rng.u32(1..1000) as f32)
        };

        for category in Category::ALL {
            let placement = fitter.fit(category, Some(&landmarks), asset).unwrap();
            assert!(placement.width > 0.0, "{category}: {placement:?}");
            assert_relative_eq!(
                placement.height / placement.width,
                asset.height / asset.width,
                max_relative = 1e-4
            );
        }
    }
}

#[test]
fn smoothing_never_overshoots() {
    let mut rng = fastrand::Rng::with_seed(7);
    for _ in 0..ITERATIONS {
        let retention = rng.f32();
        let start = rng.f32() * 200.0 - 100.0;
        let target = rng.f32() * 200.0 - 100.0;
        let mut ema = Ema::retaining(retention, start);

        let mut previous = start;
        for _ in 0..20 {
            let value = ema.push(target);
            assert!((value - target).abs() <= (previous - target).abs() + 1e-3);
            previous = value;
        }
    }
}

#[test]
fn orientation_converges_to_constant_roll() {
    let mut estimator = OrientationEstimator::default();
    let tilted = Landmarks::from_normalized(
        face(RES, 320.0, 240.0, 1.0)
            .positions()
            .iter()
            .map(|&[x, y]| {
                // Rotate the face by 0.2 rad around the canvas center (in pixel space).
                let (px, py) = (x * 640.0 - 320.0, y * 480.0 - 240.0);
                let (sin, cos) = 0.2f32.sin_cos();
                [
                    (px * cos - py * sin + 320.0) / 640.0,
                    (px * sin + py * cos + 240.0) / 480.0,
                ]
            }),
    );

    let mut previous = 0.0;
    for _ in 0..60 {
        let roll = estimator.update(&tilted, RES).roll;
        assert!(roll >= previous - 1e-6 && roll <= 0.2 + 1e-4, "{roll}");
        previous = roll;
    }
    assert_relative_eq!(previous, 0.2, epsilon = 1e-3);
}
