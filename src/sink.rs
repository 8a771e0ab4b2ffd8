//! What the map view consumes on every change.

use std::{fmt, io::Write};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    config::DisplayConfig,
    replay::ReplayController,
    telemetry::round_to,
    trajectory::Sample,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

impl From<&Sample> for Position {
    fn from(sample: &Sample) -> Self {
        Self {
            lat: sample.latitude,
            lng: sample.longitude,
        }
    }
}

/// One snapshot for the rendering side. Everything but `is_playing` is absent before a load.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub full_path: Vec<Position>,
    pub traversed_prefix: Vec<Position>,
    pub current_position: Option<Position>,
    #[serde(rename = "speedKmH")]
    pub speed_kmh: Option<f64>,
    pub progress_percent: Option<f64>,
    pub is_playing: bool,
    pub cursor: Option<usize>,
    pub timestamp: Option<i64>,
    #[serde(skip)]
    pub display: DisplayConfig,
}

impl Frame {
    pub fn new(replay: &ReplayController, display: &DisplayConfig) -> Self {
        let is_playing = replay.is_playing();
        let (Some(trajectory), Some(telemetry)) = (replay.trajectory(), replay.telemetry()) else {
            return Self {
                full_path: Vec::new(),
                traversed_prefix: Vec::new(),
                current_position: None,
                speed_kmh: None,
                progress_percent: None,
                is_playing,
                cursor: None,
                timestamp: None,
                display: *display,
            };
        };

        Self {
            full_path: trajectory.samples().iter().map(Position::from).collect(),
            traversed_prefix: telemetry.traversed.iter().map(Position::from).collect(),
            current_position: Some(telemetry.position.into()),
            speed_kmh: Some(round_to(telemetry.speed_kmh, display.speed_decimals)),
            progress_percent: Some(round_to(
                telemetry.progress_percent,
                display.progress_decimals,
            )),
            is_playing,
            cursor: Some(replay.cursor()),
            timestamp: Some(telemetry.position.timestamp),
            display: *display,
        }
    }
}

/// The status panel text
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_playing { "playing" } else { "paused" };
        match (self.current_position, self.speed_kmh, self.progress_percent) {
            (Some(pos), Some(speed), Some(progress)) => {
                let time = self
                    .timestamp
                    .and_then(DateTime::<Utc>::from_timestamp_millis)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "N/A".to_string());
                write!(
                    f,
                    "[{state}] {:.6}, {:.6} | {:.*} km/h | {:.*}% | {time}",
                    pos.lat,
                    pos.lng,
                    self.display.speed_decimals as usize,
                    speed,
                    self.display.progress_decimals as usize,
                    progress,
                )
            }
            _ => write!(f, "[{state}] N/A | N/A km/h | N/A% | N/A"),
        }
    }
}

pub trait Sink {
    fn render(&mut self, frame: &Frame) -> Result<()>;
}

/// One JSON object per line
pub struct JsonLines<W>(pub W);

impl<W: Write> Sink for JsonLines<W> {
    fn render(&mut self, frame: &Frame) -> Result<()> {
        serde_json::to_writer(&mut self.0, frame)?;
        writeln!(self.0)?;
        self.0.flush()?;
        Ok(())
    }
}

pub struct StatusLines<W>(pub W);

impl<W: Write> Sink for StatusLines<W> {
    fn render(&mut self, frame: &Frame) -> Result<()> {
        writeln!(self.0, "{frame}")?;
        self.0.flush()?;
        Ok(())
    }
}

impl Sink for Vec<Frame> {
    fn render(&mut self, frame: &Frame) -> Result<()> {
        self.push(frame.clone());
        Ok(())
    }
}
