//! Values shown while replaying, derived from `(trajectory, cursor)` alone.

use crate::trajectory::{Sample, Trajectory};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry<'a> {
    pub position: &'a Sample,
    pub speed_kmh: f64,
    pub progress_percent: f64,
    pub traversed: &'a [Sample],
}

impl<'a> Telemetry<'a> {
    pub fn derive(trajectory: &'a Trajectory, cursor: usize) -> Self {
        Self {
            position: current_position(trajectory, cursor),
            speed_kmh: speed_kmh(trajectory, cursor),
            progress_percent: progress_percent(trajectory, cursor),
            traversed: traversed_prefix(trajectory, cursor),
        }
    }
}

/// Clamps an out-of-range cursor back to the first sample.
fn clamp_cursor(trajectory: &Trajectory, cursor: usize) -> usize {
    if cursor < trajectory.len() {
        cursor
    } else {
        0
    }
}

pub fn current_position(trajectory: &Trajectory, cursor: usize) -> &Sample {
    trajectory
        .get(cursor)
        .unwrap_or_else(|| trajectory.first())
}

/// Great-circle distance in kilometers
pub fn haversine_km(a: &Sample, b: &Sample) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Speed over the leg ending at `cursor`. Zero for the first sample and for legs with no elapsed
/// time.
pub fn speed_kmh(trajectory: &Trajectory, cursor: usize) -> f64 {
    let cursor = clamp_cursor(trajectory, cursor);
    if cursor == 0 {
        return 0.0;
    }
    let prev = &trajectory.samples()[cursor - 1];
    let next = &trajectory.samples()[cursor];
    leg_speed_kmh(prev, next)
}

pub fn leg_speed_kmh(prev: &Sample, next: &Sample) -> f64 {
    // Out-of-order timestamps are treated like a zero gap
    let elapsed_ms = next.timestamp.saturating_sub(prev.timestamp);
    if elapsed_ms <= 0 {
        return 0.0;
    }
    let hours = elapsed_ms as f64 / 3_600_000.0;
    haversine_km(prev, next) / hours
}

pub fn progress_percent(trajectory: &Trajectory, cursor: usize) -> f64 {
    if trajectory.len() <= 1 {
        return 0.0;
    }
    let cursor = clamp_cursor(trajectory, cursor);
    cursor as f64 / trajectory.last_index() as f64 * 100.0
}

/// Samples `0..=cursor`, the part of the route already driven.
pub fn traversed_prefix(trajectory: &Trajectory, cursor: usize) -> &[Sample] {
    let cursor = clamp_cursor(trajectory, cursor);
    &trajectory.samples()[..=cursor]
}

/// Rounds for display only
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hyderabad() -> Trajectory {
        let t0 = 1_700_000_000_000;
        Trajectory::new(vec![
            Sample::new(17.3850, 78.4866, t0),
            Sample::new(17.3860, 78.4876, t0 + 60_000),
        ])
        .unwrap()
    }

    fn straight(n: usize) -> Trajectory {
        Trajectory::new(
            (0..n)
                .map(|i| Sample::new(0.0, i as f64 * 0.01, i as i64 * 10_000))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn haversine_one_degree_of_longitude_at_equator() {
        let a = Sample::new(0.0, 0.0, 0);
        let b = Sample::new(0.0, 1.0, 0);
        let expected = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;
        assert!((haversine_km(&a, &b) - expected).abs() < 1e-9);
        assert_eq!(haversine_km(&a, &a), 0.0);
    }

    #[test]
    fn one_km_in_one_minute_is_sixty() {
        // 1 km along a meridian
        let d_lat = (1.0 / EARTH_RADIUS_KM).to_degrees();
        let traj = Trajectory::new(vec![
            Sample::new(0.0, 0.0, 0),
            Sample::new(d_lat, 0.0, 60_000),
        ])
        .unwrap();
        assert!((speed_kmh(&traj, 1) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn speed_at_start_is_zero() {
        assert_eq!(speed_kmh(&hyderabad(), 0), 0.0);
    }

    #[test]
    fn speed_with_no_elapsed_time_is_zero() {
        let traj = Trajectory::new(vec![Sample::new(0.0, 0.0, 5), Sample::new(1.0, 1.0, 5)]).unwrap();
        assert_eq!(speed_kmh(&traj, 1), 0.0);
        let traj = Trajectory::new(vec![Sample::new(0.0, 0.0, 9), Sample::new(1.0, 1.0, 5)]).unwrap();
        assert_eq!(speed_kmh(&traj, 1), 0.0);
    }

    #[test]
    fn hyderabad_leg() {
        let traj = hyderabad();
        let dist = haversine_km(&traj.samples()[0], &traj.samples()[1]);
        assert!((speed_kmh(&traj, 1) - dist * 60.0).abs() < 1e-9);
        // roughly 154 m in a minute
        assert_eq!(round_to(speed_kmh(&traj, 1), 1), 9.2);
        assert_eq!(progress_percent(&traj, 0), 0.0);
        assert_eq!(progress_percent(&traj, 1), 100.0);
    }

    #[test]
    fn progress_is_monotonic() {
        let traj = straight(7);
        let values: Vec<f64> = (0..7).map(|c| progress_percent(&traj, c)).collect();
        assert_eq!(values[0], 0.0);
        assert_eq!(values[6], 100.0);
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn single_sample() {
        let traj = straight(1);
        assert_eq!(progress_percent(&traj, 0), 0.0);
        assert_eq!(speed_kmh(&traj, 0), 0.0);
        assert_eq!(traversed_prefix(&traj, 0).len(), 1);
    }

    #[test]
    fn prefix_lengths() {
        let traj = straight(5);
        for cursor in 0..5 {
            let prefix = traversed_prefix(&traj, cursor);
            assert_eq!(prefix.len(), cursor + 1);
            assert_eq!(prefix, &traj.samples()[..=cursor]);
        }
        assert_eq!(traversed_prefix(&traj, 4), traj.samples());
    }

    #[test]
    fn out_of_range_cursor_falls_back_to_first() {
        let traj = straight(3);
        assert_eq!(current_position(&traj, 10), traj.first());
        assert_eq!(progress_percent(&traj, 10), 0.0);
        assert_eq!(speed_kmh(&traj, 10), 0.0);
        assert_eq!(traversed_prefix(&traj, 10).len(), 1);
    }

    #[test]
    fn derive_bundles_everything() {
        let traj = straight(3);
        let t = Telemetry::derive(&traj, 2);
        assert_eq!(t.position, traj.last());
        assert_eq!(t.progress_percent, 100.0);
        assert_eq!(t.traversed.len(), 3);
        assert!(t.speed_kmh > 0.0);
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(9.149, 1), 9.1);
        assert_eq!(round_to(9.15001, 1), 9.2);
        assert_eq!(round_to(33.3333, 0), 33.0);
    }
}
