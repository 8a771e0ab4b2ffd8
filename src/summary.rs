use std::fmt;

use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    store::{self, Source},
    telemetry::{haversine_km, leg_speed_kmh, round_to},
    trajectory::Trajectory,
};

/// Whole-trajectory figures, shown before replaying.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub samples: usize,
    pub start: i64,
    pub end: i64,
    pub distance_km: f64,
    pub max_speed_kmh: f64,
    /// None when no time elapses over the trajectory
    pub average_speed_kmh: Option<f64>,
}

impl Summary {
    pub fn new(trajectory: &Trajectory) -> Self {
        let mut distance_km = 0.0;
        let mut max_speed_kmh: f64 = 0.0;
        for pair in trajectory.samples().windows(2) {
            distance_km += haversine_km(&pair[0], &pair[1]);
            max_speed_kmh = max_speed_kmh.max(leg_speed_kmh(&pair[0], &pair[1]));
        }

        let start = trajectory.first().timestamp;
        let end = trajectory.last().timestamp;
        let hours = end.saturating_sub(start) as f64 / 3_600_000.0;
        let average_speed_kmh = (hours > 0.0).then(|| distance_km / hours);

        Self {
            samples: trajectory.len(),
            start,
            end,
            distance_km,
            max_speed_kmh,
            average_speed_kmh,
        }
    }
}

fn format_timestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}

/// Negative when the timestamps run backwards
fn format_duration(ms: i64) -> String {
    let sign = if ms < 0 { "-" } else { "" };
    let Some(delta) = TimeDelta::try_milliseconds(ms.saturating_abs()) else {
        return format!("{ms} ms");
    };
    format!(
        "{sign}{}h {:02}m {:02}s",
        delta.num_hours(),
        delta.num_minutes() % 60,
        delta.num_seconds() % 60
    )
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "samples:       {}", self.samples)?;
        writeln!(f, "start:         {}", format_timestamp(self.start))?;
        writeln!(f, "end:           {}", format_timestamp(self.end))?;
        let duration = self.end.saturating_sub(self.start);
        writeln!(f, "duration:      {}", format_duration(duration))?;
        writeln!(f, "distance:      {} km", round_to(self.distance_km, 3))?;
        writeln!(f, "max speed:     {} km/h", round_to(self.max_speed_kmh, 1))?;
        match self.average_speed_kmh {
            Some(x) => write!(f, "average speed: {} km/h", round_to(x, 1)),
            None => write!(f, "average speed: N/A"),
        }
    }
}

pub async fn run(source: &Source) -> Result<()> {
    let trajectory = store::load_trajectory(source).await?;
    println!("{}", Summary::new(&trajectory));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{telemetry::EARTH_RADIUS_KM, trajectory::Sample};

    #[test]
    fn straight_line() {
        // 1 km north per minute, then a 2 minute stop
        let km = (1.0 / EARTH_RADIUS_KM).to_degrees();
        let trajectory = Trajectory::new(vec![
            Sample::new(0.0, 0.0, 0),
            Sample::new(km, 0.0, 60_000),
            Sample::new(2.0 * km, 0.0, 120_000),
            Sample::new(2.0 * km, 0.0, 240_000),
        ])
        .unwrap();
        let summary = Summary::new(&trajectory);
        assert_eq!(summary.samples, 4);
        assert!((summary.distance_km - 2.0).abs() < 1e-9);
        assert!((summary.max_speed_kmh - 60.0).abs() < 1e-9);
        assert!((summary.average_speed_kmh.unwrap() - 30.0).abs() < 1e-9);

        let text = summary.to_string();
        assert!(text.contains("duration:      0h 04m 00s"));
        assert!(text.contains("distance:      2 km"));
        assert!(text.contains("start:         1970-01-01T00:00:00+00:00"));
    }

    #[test]
    fn extreme_timestamps() {
        let trajectory = Trajectory::new(vec![
            Sample::new(0.0, 0.0, i64::MIN),
            Sample::new(0.0, 0.0, i64::MAX),
        ])
        .unwrap();
        let summary = Summary::new(&trajectory);
        assert_eq!(summary.distance_km, 0.0);
        assert_eq!(summary.average_speed_kmh, Some(0.0));
        assert!(summary.to_string().contains("duration:"));
    }

    #[test]
    fn backwards_timestamps() {
        let trajectory = Trajectory::new(vec![
            Sample::new(0.0, 0.0, 240_000),
            Sample::new(0.0, 0.0, 0),
        ])
        .unwrap();
        let summary = Summary::new(&trajectory);
        assert_eq!(summary.average_speed_kmh, None);
        assert!(summary.to_string().contains("duration:      -0h 04m 00s"));
    }

    #[test]
    fn single_sample() {
        let trajectory = Trajectory::new(vec![Sample::new(1.0, 1.0, 5)]).unwrap();
        let summary = Summary::new(&trajectory);
        assert_eq!(summary.distance_km, 0.0);
        assert_eq!(summary.average_speed_kmh, None);
        assert!(summary.to_string().ends_with("average speed: N/A"));
    }
}
