use super::*;
use proptest::prelude::*;

fn line(n: usize) -> Vec<f64> {
    (0..n).map(|i| i as f64 * 10.0).collect()
}

#[test]
fn prefix_at_extremes() {
    let pts = line(201);
    assert_eq!(visible_prefix(&pts, Progress::START).len(), 1);
    assert_eq!(visible_prefix(&pts, Progress::END).len(), 201);
    assert_eq!(visible_prefix(&pts, Progress::new(0.5)).len(), 101);
    assert!(visible_prefix::<f64>(&[], Progress::END).is_empty());
}

#[test]
fn position_single_point_and_exact_indices() {
    assert_eq!(current_position(&[7.0], Progress::new(0.3)), Some(7.0));
    assert_eq!(current_position::<f64>(&[], Progress::new(0.3)), None);

    let pts = line(5);
    assert_eq!(current_position(&pts, Progress::START), Some(0.0));
    assert_eq!(current_position(&pts, Progress::new(0.5)), Some(20.0));
    assert_eq!(current_position(&pts, Progress::END), Some(40.0));
    assert_eq!(current_position(&pts, Progress::new(0.125)), Some(5.0));
}

#[test]
fn position_interpolates_in_cartesian_space() {
    let a = Vec3::new(0.0, 0.0, 0.0);
    let b = Vec3::new(2.0, 4.0, 6.0);
    let mid = current_position(&[a, b], Progress::new(0.5)).unwrap();
    assert_eq!(mid, Vec3::new(1.0, 2.0, 3.0));
}

#[test]
fn total_frames_examples() {
    assert_eq!(total_frames(0.0, 30), 2);
    assert_eq!(total_frames(8.0, 30), 240);
    assert_eq!(total_frames(2.0, 30), 60);
    assert_eq!(total_frames(-3.0, 30), 2);
    assert_eq!(total_frames(f64::NAN, 30), 2);
    assert_eq!(total_frames(0.05, 30), 2);
}

proptest! {
    #[test]
    fn prefix_is_bounded_and_monotone(n in 1usize..400, a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
        let pts = line(n);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let len_lo = visible_prefix(&pts, Progress::new(lo)).len();
        let len_hi = visible_prefix(&pts, Progress::new(hi)).len();
        prop_assert!((1..=n).contains(&len_lo));
        prop_assert!((1..=n).contains(&len_hi));
        prop_assert!(len_lo <= len_hi);
        prop_assert_eq!(visible_prefix(&pts, Progress::END).len(), n);
    }

    #[test]
    fn position_stays_on_bracketing_segment(n in 2usize..400, p in 0.0f64..=1.0) {
        let pts = line(n);
        let pos = current_position(&pts, Progress::new(p)).unwrap();
        let scaled = p * (n - 1) as f64;
        let i0 = (scaled.floor() as usize).min(n - 1);
        let i1 = (i0 + 1).min(n - 1);
        prop_assert!(pos >= pts[i0] - 1e-9);
        prop_assert!(pos <= pts[i1] + 1e-9);
    }

    #[test]
    fn position_is_continuous(n in 2usize..200, p in 0.0f64..0.999) {
        let pts = line(n);
        let eps = 1e-7;
        let x0 = current_position(&pts, Progress::new(p)).unwrap();
        let x1 = current_position(&pts, Progress::new(p + eps)).unwrap();
        // Slope is at most (n - 1) * 10 per unit of progress.
        prop_assert!((x1 - x0).abs() <= eps * (n as f64) * 10.0 + 1e-9);
    }

    #[test]
    fn total_frames_monotone_and_at_least_two(a in 0.0f64..600.0, b in 0.0f64..600.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(total_frames(lo, 30) >= 2);
        prop_assert!(total_frames(lo, 30) <= total_frames(hi, 30));
    }
}

#[test]
fn frame_progress_spans_the_whole_route() {
    assert_eq!(frame_progress(0, 60).get(), 0.0);
    assert_eq!(frame_progress(59, 60).get(), 1.0);
    assert!((frame_progress(30, 61).get() - 0.5).abs() < 1e-12);
}
