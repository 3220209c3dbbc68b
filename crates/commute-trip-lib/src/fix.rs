//! Position samples and the trip buffer that collects them
//!
//! This module provides the immutable [`Fix`] value delivered by a position source and
//! the [`Trip`] that owns the accepted fixes of one recording session.

use crate::utils;
use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

/// A single GPS sample
///
/// Fields are private so a fix cannot change once constructed; optional measurements
/// are attached with the `with_*` builders before the fix is handed to the recorder.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    /// Sample time in milliseconds since the Unix epoch (UTC)
    #[serde(rename = "t_millis")]
    timestamp_millis: i64,
    /// Latitude in degrees
    lat: f64,
    /// Longitude in degrees
    lon: f64,
    /// Horizontal accuracy radius in meters, if the source reported one
    #[serde(rename = "acc", default, skip_serializing_if = "Option::is_none")]
    accuracy_m: Option<f32>,
    /// Ground speed in meters per second
    #[serde(rename = "spd", default, skip_serializing_if = "Option::is_none")]
    speed_mps: Option<f32>,
    /// Bearing in degrees
    #[serde(rename = "brg", default, skip_serializing_if = "Option::is_none")]
    bearing_deg: Option<f32>,
}

impl Fix {
    /// Create a fix with position only
    pub fn new(timestamp_millis: i64, lat: f64, lon: f64) -> Self {
        Self {
            timestamp_millis,
            lat,
            lon,
            accuracy_m: None,
            speed_mps: None,
            bearing_deg: None,
        }
    }

    /// Attach a horizontal accuracy radius in meters
    pub fn with_accuracy(mut self, accuracy_m: f32) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }

    /// Attach a ground speed in meters per second
    pub fn with_speed(mut self, speed_mps: f32) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }

    /// Attach a bearing in degrees
    pub fn with_bearing(mut self, bearing_deg: f32) -> Self {
        self.bearing_deg = Some(bearing_deg);
        self
    }

    /// Convert a GPX track point into a fix
    ///
    /// GPX carries no accuracy radius, so the resulting fix always passes the accuracy
    /// filter. Returns `None` when the waypoint has no (parseable) time.
    pub fn from_waypoint(waypoint: &gpx::Waypoint) -> Option<Self> {
        let time = waypoint.time.as_ref()?.format().ok()?;
        let timestamp_millis = utils::parse_rfc3339_millis(&time)?;
        let point = waypoint.point();
        let mut fix = Self::new(timestamp_millis, point.y(), point.x());
        if let Some(speed) = waypoint.speed {
            fix = fix.with_speed(speed as f32);
        }
        Some(fix)
    }

    #[inline]
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp_millis
    }

    #[inline]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    #[inline]
    pub fn lon(&self) -> f64 {
        self.lon
    }

    #[inline]
    pub fn accuracy_m(&self) -> Option<f32> {
        self.accuracy_m
    }

    #[inline]
    pub fn speed_mps(&self) -> Option<f32> {
        self.speed_mps
    }

    #[inline]
    pub fn bearing_deg(&self) -> Option<f32> {
        self.bearing_deg
    }

    /// Position as `(lat, lon)`, the order the polyline codec expects
    #[inline]
    pub fn lat_lon(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }

    /// Position as a geo point (x = longitude, y = latitude)
    #[inline]
    pub fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    /// Check whether the coordinates are inside WGS84 bounds
    #[inline]
    pub fn has_valid_coordinates(&self) -> bool {
        utils::is_valid_coordinate(self.lat, self.lon)
    }
}

/// The accepted fixes of one recording session, in arrival order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trip {
    fixes: Vec<Fix>,
    start_utc_millis: i64,
    end_utc_millis: Option<i64>,
}

impl Trip {
    /// Start an empty trip at the given time
    pub fn new(start_utc_millis: i64) -> Self {
        Self {
            fixes: Vec::new(),
            start_utc_millis,
            end_utc_millis: None,
        }
    }

    /// Append a fix; arrival order is kept as-is
    #[inline]
    pub(crate) fn push(&mut self, fix: Fix) {
        self.fixes.push(fix);
    }

    /// Stamp the end time once the trip is handed to export
    #[inline]
    pub(crate) fn finish(&mut self, end_utc_millis: i64) {
        self.end_utc_millis = Some(end_utc_millis);
    }

    #[inline]
    pub fn fixes(&self) -> &[Fix] {
        &self.fixes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    #[inline]
    pub fn last(&self) -> Option<&Fix> {
        self.fixes.last()
    }

    #[inline]
    pub fn start_utc_millis(&self) -> i64 {
        self.start_utc_millis
    }

    /// End time, set only after export has claimed the trip
    #[inline]
    pub fn end_utc_millis(&self) -> Option<i64> {
        self.end_utc_millis
    }

    /// Path length in meters along consecutive fixes (haversine)
    pub fn distance_meters(&self) -> f64 {
        self.fixes
            .windows(2)
            .map(|pair| Haversine.distance(pair[0].point(), pair[1].point()))
            .sum()
    }
}
