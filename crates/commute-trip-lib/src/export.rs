//! GeoJSON trip artifact construction and persistence
//!
//! A finished trip is written as a single GeoJSON `Feature`. The path lives in the
//! `polyline` property; `geometry.coordinates` is always empty to keep files small, so
//! readers must decode the polyline rather than trust the geometry.

use crate::{Fix, Result, Trip, TripSink, polyline, utils};
use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Nominal sampling interval advertised in every artifact, in seconds
pub const SAMPLE_RATE_S: u32 = 2;

/// GeoJSON object type of the artifact root
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    Feature,
}

/// GeoJSON geometry type of the artifact
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    LineString,
}

/// Placeholder geometry; coordinates stay empty
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: GeometryKind,
    pub coordinates: Vec<[f64; 2]>,
}

/// Coarse travel direction from the first and last longitude
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "A->B")]
    AToB,
    #[serde(rename = "B->A")]
    BToA,
}

impl Direction {
    /// `AToB` only when the trip ends strictly east of where it started
    pub fn infer(first: &Fix, last: &Fix) -> Self {
        if first.lon() < last.lon() {
            Direction::AToB
        } else {
            Direction::BToA
        }
    }
}

/// Feature properties, serialized in file order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TripProperties {
    pub polyline: String,
    pub start_time: String,
    pub end_time: String,
    pub direction: Direction,
    pub route_label: String,
    pub sample_rate_s: u32,
    pub point_count: usize,
    /// `[min_lon, min_lat, max_lon, max_lat]`
    pub bbox: [f64; 4],
}

/// The persisted GeoJSON Feature for one completed trip
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TripArtifact {
    #[serde(rename = "type")]
    pub kind: FeatureKind,
    pub geometry: Geometry,
    pub properties: TripProperties,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl TripArtifact {
    /// Filename this artifact is saved under
    pub fn filename(&self) -> String {
        filename(&self.properties.start_time, &self.properties.route_label)
    }

    /// Decode the stored polyline back into `(lat, lon)` pairs
    pub fn decode_path(&self) -> Result<Vec<(f64, f64)>> {
        polyline::decode(&self.properties.polyline)
    }

    /// Bounding box as a geo rectangle (x = longitude, y = latitude)
    pub fn bounding_rect(&self) -> Rect<f64> {
        let [min_lon, min_lat, max_lon, max_lat] = self.properties.bbox;
        Rect::new(
            Coord {
                x: min_lon,
                y: min_lat,
            },
            Coord {
                x: max_lon,
                y: max_lat,
            },
        )
    }

    /// UTF-8 JSON bytes as written to the sink
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Build the artifact for a non-empty, ordered list of fixes
///
/// Returns `Ok(None)` for an empty list: a trip without fixes has no artifact.
///
/// # Arguments
/// * `fixes` - Accepted fixes in arrival order
/// * `start_utc_millis` / `end_utc_millis` - Trip bounds in epoch milliseconds
/// * `label` - Caller-supplied route label; blank labels become `unlabeled`
pub fn build(
    fixes: &[Fix],
    start_utc_millis: i64,
    end_utc_millis: i64,
    label: &str,
) -> Result<Option<TripArtifact>> {
    #[cfg(feature = "profiling")]
    profiling::scope!("export::build");

    let (Some(first), Some(last)) = (fixes.first(), fixes.last()) else {
        return Ok(None);
    };

    let bbox = bounding_box(fixes);

    Ok(Some(TripArtifact {
        kind: FeatureKind::Feature,
        geometry: Geometry {
            kind: GeometryKind::LineString,
            coordinates: Vec::new(),
        },
        properties: TripProperties {
            polyline: polyline::encode(fixes.iter().map(Fix::lat_lon)),
            start_time: utils::iso_utc(start_utc_millis)?,
            end_time: utils::iso_utc(end_utc_millis)?,
            direction: Direction::infer(first, last),
            route_label: utils::route_label(label),
            sample_rate_s: SAMPLE_RATE_S,
            point_count: fixes.len(),
            bbox: [
                bbox.min().x,
                bbox.min().y,
                bbox.max().x,
                bbox.max().y,
            ],
        },
    }))
}

/// Build the artifact for a recorded trip
///
/// Uses the trip's own start and end stamps; a trip that was never finished is treated
/// as ending when it started.
pub fn from_trip(trip: &Trip, label: &str) -> Result<Option<TripArtifact>> {
    let start_utc_millis = trip.start_utc_millis();
    let end_utc_millis = trip.end_utc_millis().unwrap_or(start_utc_millis);
    build(trip.fixes(), start_utc_millis, end_utc_millis, label)
}

/// Compute the bounding box in a single pass
///
/// Seeds are the far edges of the valid range so one fix yields a point-sized box.
pub fn bounding_box(fixes: &[Fix]) -> Rect<f64> {
    let mut min_lat = utils::MAX_LATITUDE;
    let mut min_lon = utils::MAX_LONGITUDE;
    let mut max_lat = -utils::MAX_LATITUDE;
    let mut max_lon = -utils::MAX_LONGITUDE;

    for fix in fixes {
        min_lat = min_lat.min(fix.lat());
        min_lon = min_lon.min(fix.lon());
        max_lat = max_lat.max(fix.lat());
        max_lon = max_lon.max(fix.lon());
    }

    Rect::new(
        Coord {
            x: min_lon,
            y: min_lat,
        },
        Coord {
            x: max_lon,
            y: max_lat,
        },
    )
}

/// Derive the artifact filename: `trip_<start with ':' -> '-'>_<sanitized label>.json`
pub fn filename(start_iso: &str, label: &str) -> String {
    let safe_iso = start_iso.replace(':', "-");
    let safe_label = utils::sanitize_label(label);
    format!("trip_{}_{}.json", safe_iso, safe_label)
}

/// Serialize the artifact and hand it to the sink under its derived filename
///
/// Sink errors are returned unchanged; nothing is retried.
pub fn write(artifact: &TripArtifact, sink: &dyn TripSink) -> Result<PathBuf> {
    #[cfg(feature = "profiling")]
    profiling::scope!("export::write");

    let bytes = artifact.to_json_bytes()?;
    let filename = artifact.filename();
    let path = sink.write(&filename, &bytes)?;
    tracing::info!(
        "Saved trip {} ({} points, {} bytes)",
        path.display(),
        artifact.properties.point_count,
        bytes.len()
    );
    Ok(path)
}
