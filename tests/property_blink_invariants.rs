use proptest::prelude::*;

use blink_monitor::session::rate::{face_lost_overlap_ms, rate_for_count, rolling_average};
use blink_monitor::session::{BlinkRatePoint, FaceLostPeriod, SessionQuality};
use blink_monitor::vision::{eye_aspect_ratio, EyeLandmarks, Point2D};
use blink_monitor::{BlinkDetector, BlinkDetectorConfig};

fn point() -> impl Strategy<Value = Point2D> {
    (-1000.0_f64..1000.0, -1000.0_f64..1000.0).prop_map(|(x, y)| Point2D::new(x, y))
}

proptest! {
    #[test]
    fn pt_ear_is_finite_and_non_negative(
        p1 in point(), p2 in point(), p3 in point(),
        p4 in point(), p5 in point(), p6 in point(),
    ) {
        let eye = EyeLandmarks { p1, p2, p3, p4, p5, p6 };
        let ear = eye_aspect_ratio(&eye);
        prop_assert!(ear.is_finite());
        prop_assert!(ear >= 0.0);
    }

    #[test]
    fn pt_degenerate_corners_give_zero(corner in point(), p2 in point(), p3 in point()) {
        let eye = EyeLandmarks {
            p1: corner,
            p2,
            p3,
            p4: corner,
            p5: p3,
            p6: p2,
        };
        prop_assert_eq!(eye_aspect_ratio(&eye), 0.0);
    }

    #[test]
    fn pt_blink_count_bounded_by_closed_runs(
        ears in prop::collection::vec(0.0_f64..0.5, 1..400),
        frames in 1_u32..5,
        debounce in 0.0_f64..300.0,
    ) {
        let cfg = BlinkDetectorConfig::new(0.25, frames, debounce).unwrap();
        let mut detector = BlinkDetector::new(cfg);

        let mut runs = 0u64;
        let mut prev_closed = false;
        let mut prev_count = 0;
        let mut blink_times = Vec::new();

        for (i, ear) in ears.iter().enumerate() {
            let ts = i as i64 * 33;
            let closed = *ear < 0.25;
            if closed && !prev_closed {
                runs += 1;
            }
            prev_closed = closed;

            detector.detect(*ear, ts);
            let count = detector.blink_count();
            prop_assert!(count >= prev_count);
            prop_assert!(count - prev_count <= 1);
            if count > prev_count {
                blink_times.push(ts);
            }
            prev_count = count;
        }

        prop_assert!(detector.blink_count() <= runs);
        for pair in blink_times.windows(2) {
            prop_assert!((pair[1] - pair[0]) as f64 > debounce);
        }
    }

    #[test]
    fn pt_open_eyes_never_blink(ears in prop::collection::vec(0.25_f64..1.0, 0..200)) {
        let mut detector = BlinkDetector::default();
        for (i, ear) in ears.iter().enumerate() {
            prop_assert!(!detector.detect(*ear, i as i64 * 33));
        }
        prop_assert_eq!(detector.blink_count(), 0);
    }

    #[test]
    fn pt_rate_is_capped(count in 0_usize..10_000, window in 1_i64..3_600_000) {
        let rate = rate_for_count(count, window);
        prop_assert!((0.0..=60.0).contains(&rate));
    }

    #[test]
    fn pt_rolling_average_within_sample_range(
        rates in prop::collection::vec(0.0_f64..60.0, 1..30),
        window_min in 1_i64..10,
    ) {
        let history: Vec<BlinkRatePoint> = rates
            .iter()
            .enumerate()
            .map(|(i, rate)| BlinkRatePoint { timestamp: (i as i64 + 1) * 60_000, rate: *rate })
            .collect();
        let now = history.len() as i64 * 60_000;
        let avg = rolling_average(&history, now, window_min * 60_000).unwrap();

        let min = rates.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = rates.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(avg >= min - 1e-9 && avg <= max + 1e-9);
    }

    #[test]
    fn pt_face_lost_overlap_never_exceeds_window(
        spans in prop::collection::vec((0_i64..600_000, 0_i64..60_000), 0..10),
        window in 1_i64..300_000,
    ) {
        let mut periods = Vec::new();
        let mut cursor = 0;
        for (gap, len) in spans {
            let start = cursor + gap;
            periods.push(FaceLostPeriod { start, end: Some(start + len) });
            cursor = start + len;
        }
        let now = cursor + 1;
        let overlap = face_lost_overlap_ms(&periods, now, window);
        prop_assert!(overlap >= 0);
        prop_assert!(overlap <= window);
    }

    #[test]
    fn pt_quality_degrades_monotonically(a in 0.0_f64..1.0, b in 0.0_f64..1.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let rank = |q: SessionQuality| match q {
            SessionQuality::Good => 0,
            SessionQuality::Fair => 1,
            SessionQuality::Poor => 2,
        };
        prop_assert!(
            rank(SessionQuality::from_face_lost_ratio(lo))
                <= rank(SessionQuality::from_face_lost_ratio(hi))
        );
    }
}
