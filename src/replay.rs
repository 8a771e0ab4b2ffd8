//! The playback state machine.
//!
//! `Empty -> Paused <-> Playing -> Paused`. A [`Ticker`] exists exactly while playing; every
//! transition out of `Playing` drops it, so a tick that was due can never land afterwards.

use std::{sync::Arc, time::Duration};

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
    telemetry::Telemetry,
    trajectory::{Sample, Trajectory},
};

/// How long to wait between two cursor advances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pacing {
    /// Wall-clock uniform, regardless of the recorded gaps
    Fixed(Duration),
    /// Follow the recorded timestamp gaps, sped up by `time_scale`
    Recorded { time_scale: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Empty,
    Paused,
    Playing,
}

#[derive(Debug)]
struct Ticker {
    deadline: Instant,
}

impl Ticker {
    fn arm(delay: Duration) -> Self {
        Self {
            deadline: Instant::now() + delay,
        }
    }
}

#[derive(Debug)]
pub struct ReplayController {
    trajectory: Option<Arc<Trajectory>>,
    cursor: usize,
    ticker: Option<Ticker>,
    pacing: Pacing,
}

impl ReplayController {
    pub fn new(pacing: Pacing) -> Self {
        Self {
            trajectory: None,
            cursor: 0,
            ticker: None,
            pacing,
        }
    }

    pub fn state(&self) -> State {
        match (&self.trajectory, &self.ticker) {
            (None, _) => State::Empty,
            (Some(_), None) => State::Paused,
            (Some(_), Some(_)) => State::Playing,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_playing(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn trajectory(&self) -> Option<&Trajectory> {
        self.trajectory.as_deref()
    }

    /// None until a trajectory is loaded
    pub fn telemetry(&self) -> Option<Telemetry<'_>> {
        self.trajectory()
            .map(|trajectory| Telemetry::derive(trajectory, self.cursor))
    }

    /// When the next tick is due, if playing
    pub fn next_tick(&self) -> Option<Instant> {
        self.ticker.as_ref().map(|t| t.deadline)
    }

    /// Replaces any current trajectory and rewinds. An empty sample list changes nothing.
    pub fn on_load(&mut self, samples: Vec<Sample>) -> bool {
        let Some(trajectory) = Trajectory::new(samples) else {
            warn!("Loaded trajectory has no samples, ignoring it");
            return false;
        };
        self.ticker = None;
        self.trajectory = Some(Arc::new(trajectory));
        self.cursor = 0;
        true
    }

    /// Only starts from `Paused` with samples left to play; a finished replay needs a reset first.
    pub fn play(&mut self) -> bool {
        let Some(trajectory) = &self.trajectory else {
            debug!("play ignored, nothing loaded");
            return false;
        };
        if self.ticker.is_some() {
            return false;
        }
        if self.cursor >= trajectory.last_index() {
            debug!("play ignored, already at the final sample");
            return false;
        }
        self.ticker = Some(Ticker::arm(self.delay()));
        true
    }

    pub fn pause(&mut self) -> bool {
        self.ticker.take().is_some()
    }

    pub fn reset(&mut self) -> bool {
        if self.trajectory.is_none() {
            return false;
        }
        let was_playing = self.ticker.take().is_some();
        let moved = self.cursor != 0;
        self.cursor = 0;
        was_playing || moved
    }

    /// Advances by one sample. Halts at the final sample instead of looping.
    pub fn tick(&mut self) -> bool {
        if self.ticker.is_none() {
            return false;
        }
        let Some(last) = self.trajectory.as_ref().map(|t| t.last_index()) else {
            self.ticker = None;
            return false;
        };

        self.cursor = (self.cursor + 1).min(last);
        if self.cursor == last {
            debug!(cursor = self.cursor, "reached the final sample");
            self.ticker = None;
        } else {
            self.ticker = Some(Ticker::arm(self.delay()));
        }
        true
    }

    /// Delay before advancing from the current cursor
    fn delay(&self) -> Duration {
        match self.pacing {
            Pacing::Fixed(period) => period,
            Pacing::Recorded { time_scale } => {
                let Some(trajectory) = &self.trajectory else {
                    return Duration::ZERO;
                };
                let (Some(current), Some(next)) = (
                    trajectory.get(self.cursor),
                    trajectory.get(self.cursor + 1),
                ) else {
                    return Duration::ZERO;
                };
                let gap_ms = next.timestamp.saturating_sub(current.timestamp).max(0);
                Duration::try_from_secs_f64(gap_ms as f64 / 1000.0 / time_scale)
                    .unwrap_or(Duration::ZERO)
            }
        }
    }
}
