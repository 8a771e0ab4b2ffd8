use geo_types::{Coord, LineString, Point};
use serde::Serialize;

/// One recorded fix of the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub latitude: f64,
    pub longitude: f64,
    /// Epoch milliseconds
    pub timestamp: i64,
}

impl Sample {
    pub fn new(latitude: f64, longitude: f64, timestamp: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }
}

/// The recorded samples of one replay session, in the order the source gave them.
///
/// Never empty. Samples are assumed to be chronological, but that is not checked.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    samples: Vec<Sample>,
}

impl Trajectory {
    /// None if there are no samples
    pub fn new(samples: Vec<Sample>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        Some(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn last_index(&self) -> usize {
        self.samples.len() - 1
    }

    pub fn get(&self, idx: usize) -> Option<&Sample> {
        self.samples.get(idx)
    }

    pub fn first(&self) -> &Sample {
        &self.samples[0]
    }

    pub fn last(&self) -> &Sample {
        &self.samples[self.last_index()]
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn as_line_string(&self) -> LineString {
        to_line_string(&self.samples)
    }
}

pub fn to_line_string(samples: &[Sample]) -> LineString {
    samples
        .iter()
        .map(|s| Coord {
            x: s.longitude,
            y: s.latitude,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_not_a_trajectory() {
        assert!(Trajectory::new(Vec::new()).is_none());
    }

    #[test]
    fn keeps_source_order() {
        let traj = Trajectory::new(vec![
            Sample::new(1.0, 2.0, 300),
            Sample::new(3.0, 4.0, 100),
        ])
        .unwrap();
        assert_eq!(traj.len(), 2);
        assert_eq!(traj.first().timestamp, 300);
        assert_eq!(traj.last().timestamp, 100);
    }

    #[test]
    fn line_string_is_lon_lat() {
        let traj = Trajectory::new(vec![Sample::new(17.385, 78.4866, 0)]).unwrap();
        let line = traj.as_line_string();
        let coord = line.0[0];
        assert_eq!(coord.x, 78.4866);
        assert_eq!(coord.y, 17.385);
        assert_eq!(traj.first().point().x(), 78.4866);
    }
}
