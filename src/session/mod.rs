// Data model shared with the replay server: session metadata, frames and
// the request/response envelopes used to retrieve them.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};

use crate::{errors::ReplayError, replay::geometry::Point};

/// RGB triple as sent by the server for team colours.
pub type Rgb = [u8; 3];

pub const DEFAULT_DRIVER_COLOR: Rgb = [255, 255, 255];

/// Treats an explicit `null` the same way as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionType {
    #[serde(rename = "R")]
    Race,
    #[serde(rename = "S")]
    Sprint,
}

impl SessionType {
    pub fn code(&self) -> &'static str {
        match self {
            SessionType::Race => "R",
            SessionType::Sprint => "S",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for SessionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "R" | "RACE" => Ok(SessionType::Race),
            "S" | "SPRINT" => Ok(SessionType::Sprint),
            other => Err(format!("unknown session type '{other}', expected R or S")),
        }
    }
}

/// Body of the session load request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRequest {
    pub year: i32,
    pub round: u32,
    pub session_type: SessionType,
    pub force_refresh: bool,
}

/// Centerline of the circuit as two parallel coordinate arrays.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackLayout {
    #[serde(default)]
    pub x: Vec<f64>,
    #[serde(default)]
    pub y: Vec<f64>,
}

impl TrackLayout {
    /// Pairs up the coordinate arrays in path order. A trailing coordinate
    /// without a partner is dropped.
    pub fn points(&self) -> Vec<Point> {
        self.x
            .iter()
            .zip(self.y.iter())
            .map(|(x, y)| Point::new(*x, *y))
            .collect()
    }
}

/// Half-open `[start_time, end_time)` window during which a track status
/// holds. A missing end means the status lasts until the end of the session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackStatusInterval {
    pub status: String,
    pub start_time: f64,
    #[serde(default)]
    pub end_time: Option<f64>,
}

impl TrackStatusInterval {
    pub fn contains(&self, t: f64) -> bool {
        self.start_time <= t && self.end_time.is_none_or(|end| t < end)
    }
}

/// Metadata for a loaded replay. Frames are not part of it and are
/// retrieved in batches through the session id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub total_frames: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub track_layout: TrackLayout,
    #[serde(default, deserialize_with = "null_as_default")]
    pub driver_colors: BTreeMap<String, Rgb>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub driver_names: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub driver_teams: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub track_statuses: Vec<TrackStatusInterval>,
    #[serde(default)]
    pub total_laps: Option<u32>,
    #[serde(default)]
    pub circuit_rotation: Option<f64>,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub round_number: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub session_type: Option<String>,
}

impl Session {
    /// Parses the body of a session load response.
    ///
    /// The server answers `{success: true, ...session}` or
    /// `{success: false, error}`; anything that is not a JSON object with a
    /// `success` flag is rejected.
    pub fn from_response_body(body: &str) -> Result<Session, ReplayError> {
        if body.trim().is_empty() {
            return Err(ReplayError::EmptyResponse);
        }
        let value: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| ReplayError::InvalidResponse { source: e })?;

        if !value
            .get("success")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
        {
            let reason = value
                .get("error")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("Unknown error")
                .to_string();
            return Err(ReplayError::SessionLoadFailed { reason });
        }

        serde_json::from_value(value).map_err(|e| ReplayError::InvalidResponse { source: e })
    }

    pub fn rotation_degrees(&self) -> f64 {
        self.circuit_rotation.unwrap_or(0.)
    }

    pub fn driver_color(&self, code: &str) -> Rgb {
        self.driver_colors
            .get(code)
            .copied()
            .unwrap_or(DEFAULT_DRIVER_COLOR)
    }

    pub fn driver_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.driver_names.get(code).map(String::as_str).unwrap_or(code)
    }

    pub fn driver_team(&self, code: &str) -> &str {
        self.driver_teams.get(code).map(String::as_str).unwrap_or("")
    }

    /// `(Round N) Event | Year`, only when all three parts are known.
    pub fn header(&self) -> Option<String> {
        match (&self.event_name, self.round_number, self.year) {
            (Some(event), Some(round), Some(year)) if !event.is_empty() && round > 0 => {
                Some(format!("(Round {round}) {event} | {year}"))
            }
            _ => None,
        }
    }
}

/// Per-driver state within one frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverState {
    pub x: f64,
    pub y: f64,
    /// Cumulative race distance, used for ranking
    pub dist: f64,
    /// Relative distance, reaches 1 once the car is out of the session
    pub rel_dist: f64,
    /// km/h
    pub speed: f64,
    pub gear: u32,
    pub drs: u32,
    /// Tyre compound identifier
    pub tyre: f64,
    pub lap: u32,
}

impl DriverState {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_out(&self) -> bool {
        self.rel_dist >= 1.
    }
}

/// Snapshot of every driver at one sampled timestep.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Elapsed race time in seconds
    pub t: f64,
    #[serde(default)]
    pub lap: u32,
    #[serde(default)]
    pub drivers: BTreeMap<String, DriverState>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameBatchRequest {
    pub session_id: String,
    pub start_index: usize,
    pub count: usize,
}

/// A contiguous run of frames starting at `start_index`. May hold fewer
/// frames than requested; an empty batch means there is nothing more.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameBatch {
    #[serde(default)]
    pub frames: Vec<Frame>,
    #[serde(default)]
    pub start_index: usize,
    pub end_index: usize,
    #[serde(default)]
    pub total_frames: Option<usize>,
}
