//! Loading recorded samples from a file or URL.
//!
//! The records are projected 1:1 into [`Sample`]s. Nothing is reordered, deduplicated or checked
//! for monotonic timestamps; the source order is trusted.

use std::{fmt, io, path::PathBuf, str::FromStr};

use anyhow::Context;
use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::trajectory::{Sample, Trajectory};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to fetch samples: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed CSV payload: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid sample #{index}: {reason}")]
    InvalidSample { index: usize, reason: String },
}

/// Where the recorded samples come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Url(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Csv,
}

impl Source {
    pub fn format(&self) -> Format {
        let name = match self {
            Source::File(path) => path.to_string_lossy().to_string(),
            // ignore any query string
            Source::Url(url) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
        };
        if name.to_ascii_lowercase().ends_with(".csv") {
            Format::Csv
        } else {
            Format::Json
        }
    }

    async fn fetch(&self) -> Result<Vec<u8>, LoadError> {
        match self {
            Source::File(path) => tokio::fs::read(path).await.map_err(|source| LoadError::Read {
                path: path.clone(),
                source,
            }),
            Source::Url(url) => {
                let response = reqwest::get(url).await?.error_for_status()?;
                Ok(response.bytes().await?.to_vec())
            }
        }
    }
}

impl FromStr for Source {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(Source::Url(s.to_string()))
        } else {
            Ok(Source::File(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Url(url) => write!(f, "{url}"),
        }
    }
}

/// Fetches the full sample list once. An empty list is not an error here.
pub async fn load(source: &Source) -> Result<Vec<Sample>, LoadError> {
    let raw = source.fetch().await?;
    parse(&raw, source.format())
}

/// For the one-shot commands, where a missing trajectory is fatal.
pub async fn load_trajectory(source: &Source) -> anyhow::Result<Trajectory> {
    let samples = load(source)
        .await
        .with_context(|| format!("Failed to load samples from {source}"))?;
    Trajectory::new(samples).with_context(|| format!("{source} has no samples"))
}

pub fn parse(raw: &[u8], format: Format) -> Result<Vec<Sample>, LoadError> {
    match format {
        Format::Json => parse_json(raw),
        Format::Csv => parse_csv(raw),
    }
}

/// Serde representation of one record. The field names are fixed by the data files.
#[derive(Deserialize)]
struct RawSample {
    latitude: f64,
    longitude: f64,
    timestamp: RawTimestamp,
}

#[derive(Deserialize)]
#[serde(untagged, expecting = "timestamp must be an integer or a timestamp string")]
enum RawTimestamp {
    Millis(i64),
    Float(f64),
    Text(String),
}

fn parse_json(raw: &[u8]) -> Result<Vec<Sample>, LoadError> {
    // Records are decoded one by one so a bad one can be reported by index
    let records: Vec<Value> = serde_json::from_slice(raw)?;
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let raw: RawSample =
                serde_json::from_value(record).map_err(|e| LoadError::InvalidSample {
                    index,
                    reason: e.to_string(),
                })?;
            to_sample(index, raw)
        })
        .collect()
}

fn parse_csv(raw: &[u8]) -> Result<Vec<Sample>, LoadError> {
    let mut output = Vec::new();
    let mut reader = csv::Reader::from_reader(raw);
    for (index, result) in reader.deserialize().enumerate() {
        let record: RawSample = result.map_err(|e| {
            if matches!(e.kind(), csv::ErrorKind::Deserialize { .. }) {
                LoadError::InvalidSample {
                    index,
                    reason: e.to_string(),
                }
            } else {
                LoadError::Csv(e)
            }
        })?;
        output.push(to_sample(index, record)?);
    }

    Ok(output)
}

fn to_sample(index: usize, raw: RawSample) -> Result<Sample, LoadError> {
    let invalid = |reason: String| LoadError::InvalidSample { index, reason };

    if !(-90.0..=90.0).contains(&raw.latitude) {
        return Err(invalid(format!("latitude {} out of range", raw.latitude)));
    }
    if !(-180.0..=180.0).contains(&raw.longitude) {
        return Err(invalid(format!("longitude {} out of range", raw.longitude)));
    }
    let timestamp = match raw.timestamp {
        RawTimestamp::Millis(ms) => ms,
        RawTimestamp::Float(ms) if ms.is_finite() => ms.round() as i64,
        RawTimestamp::Float(ms) => return Err(invalid(format!("timestamp {ms} is not finite"))),
        RawTimestamp::Text(text) => parse_timestamp(&text)
            .ok_or_else(|| invalid(format!("unrecognized timestamp {text:?}")))?,
    };

    Ok(Sample::new(raw.latitude, raw.longitude, timestamp))
}

/// Epoch milliseconds from a numeric string, an RFC 3339 literal, or a naive UTC date-time.
pub fn parse_timestamp(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(ms) = text.parse::<i64>() {
        return Some(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    None
}
