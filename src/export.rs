//! Writes the replay state at one cursor as GeoJSON, for viewing in any map tool.

use std::{fs, path::Path};

use anyhow::{ensure, Result};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject};
use serde_json::json;

use crate::{
    store::{self, Source},
    telemetry::{round_to, Telemetry},
    trajectory::{to_line_string, Trajectory},
};

fn feature(geometry: geojson::Value, properties: serde_json::Value) -> Feature {
    let properties: Option<JsonObject> = match properties {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
    };
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geometry)),
        id: None,
        properties,
        foreign_members: None,
    }
}

/// The full route, the part already driven, and the vehicle
pub fn feature_collection(trajectory: &Trajectory, cursor: usize) -> FeatureCollection {
    let telemetry = Telemetry::derive(trajectory, cursor);

    let route = feature(
        geojson::Value::from(&trajectory.as_line_string()),
        json!({ "name": "route", "samples": trajectory.len() }),
    );
    let traversed = feature(
        geojson::Value::from(&to_line_string(telemetry.traversed)),
        json!({
            "name": "traversed",
            "progressPercent": round_to(telemetry.progress_percent, 1),
        }),
    );
    let vehicle = feature(
        geojson::Value::from(&telemetry.position.point()),
        json!({
            "name": "vehicle",
            "cursor": cursor,
            "speedKmH": round_to(telemetry.speed_kmh, 1),
            "timestamp": telemetry.position.timestamp,
        }),
    );

    FeatureCollection {
        bbox: None,
        features: vec![route, traversed, vehicle],
        foreign_members: None,
    }
}

/// Defaults to the final sample. Writes to stdout without an output path.
pub async fn run(source: &Source, cursor: Option<usize>, output: Option<&Path>) -> Result<()> {
    let trajectory = store::load_trajectory(source).await?;
    let cursor = cursor.unwrap_or(trajectory.last_index());
    ensure!(
        cursor < trajectory.len(),
        "Cursor {cursor} is past the last sample ({})",
        trajectory.last_index()
    );

    let x = GeoJson::from(feature_collection(&trajectory, cursor)).to_string();
    match output {
        Some(path) => fs::write(path, x)?,
        None => println!("{x}"),
    }

    Ok(())
}
