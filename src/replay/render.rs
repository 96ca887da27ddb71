// Toolkit independent description of what to draw for one tick. The UI
// paints a RenderPlan as-is; everything that depends on the frame data is
// decided here.

use itertools::Itertools;

use crate::session::{DriverState, Frame, Rgb, Session};

use super::{
    geometry::{Point, TrackGeometry},
    selection::Selection,
    track_status::{TrackStatus, resolve_status},
};

pub const TRACK_STROKE_WIDTH: f32 = 4.;
pub const MARKER_RADIUS: f32 = 6.;
pub const SELECTED_MARKER_RADIUS: f32 = 8.;
pub const SELECTION_RING_RADIUS: f32 = 10.;
pub const SELECTION_RING_WIDTH: f32 = 3.;
pub const BACKGROUND_COLOR: Rgb = [0, 0, 0];
pub const SELECTION_RING_COLOR: Rgb = [255, 255, 255];

#[derive(Debug, Clone, PartialEq)]
pub struct CarMarker {
    pub code: String,
    /// Screen position
    pub position: Point,
    pub color: Rgb,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HudText {
    pub header: Option<String>,
    pub lap: String,
    pub race_time: String,
    pub speed: String,
    pub flag: Option<&'static str>,
    pub status: TrackStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub frame_index: usize,
    pub status: TrackStatus,
    pub track_color: Rgb,
    /// Closed polylines, already in screen space
    pub inner: Vec<Point>,
    pub outer: Vec<Point>,
    /// Draw order: rank order with the selected car moved to the end
    pub cars: Vec<CarMarker>,
    /// None while the current frame is not loaded
    pub hud: Option<HudText>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub position: usize,
    pub code: String,
    pub color: Rgb,
    pub tyre: f64,
    pub out: bool,
    pub selected: bool,
}

impl LeaderboardEntry {
    pub fn tyre_icon_path(&self) -> String {
        format!("images/tyres/{}.0.png", self.tyre)
    }
}

/// Details of the selected driver for the side panel.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverInfo {
    pub code: String,
    pub name: String,
    pub team: String,
    pub color: Rgb,
    pub speed: String,
    pub gear: u32,
    pub drs: &'static str,
    pub lap: u32,
}

impl DriverInfo {
    pub fn portrait_path(&self) -> String {
        format!("images/drivers/{}.png", self.code)
    }
}

/// Drivers of `frame` by cumulative distance, leader first. The sort is
/// stable so equal distances keep the frame's code order.
pub fn standings(frame: &Frame) -> Vec<(&str, &DriverState)> {
    frame
        .drivers
        .iter()
        .map(|(code, driver)| (code.as_str(), driver))
        .sorted_by(|(_, a), (_, b)| b.dist.total_cmp(&a.dist))
        .collect()
}

pub fn leaderboard(session: &Session, frame: &Frame, selection: &Selection) -> Vec<LeaderboardEntry> {
    standings(frame)
        .into_iter()
        .enumerate()
        .map(|(i, (code, driver))| LeaderboardEntry {
            position: i + 1,
            code: code.to_string(),
            color: session.driver_color(code),
            tyre: driver.tyre,
            out: driver.is_out(),
            selected: selection.is_selected(code),
        })
        .collect()
}

/// Info panel contents, or None when nothing is selected or the selected
/// driver is not part of `frame`.
pub fn driver_info(session: &Session, frame: &Frame, selection: &Selection) -> Option<DriverInfo> {
    let code = selection.selected()?;
    let driver = frame.drivers.get(code)?;
    Some(DriverInfo {
        code: code.to_string(),
        name: session.driver_name(code).to_string(),
        team: session.driver_team(code).to_string(),
        color: session.driver_color(code),
        speed: format!("{:.1} km/h", driver.speed),
        gear: driver.gear,
        drs: drs_label(driver.drs),
        lap: driver.lap,
    })
}

pub fn drs_label(drs: u32) -> &'static str {
    match drs {
        8 => "Eligible",
        10 | 12 | 14 => "On",
        _ => "Off",
    }
}

/// `HH:MM:SS` from seconds, truncating fractions. Negative times show as zero.
pub fn format_race_time(t: f64) -> String {
    let total = if t.is_finite() { t.max(0.) as u64 } else { 0 };
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

pub fn format_lap(lap: u32, total_laps: Option<u32>) -> String {
    match total_laps {
        Some(total) if total > 0 => format!("Lap: {lap}/{total}"),
        _ => format!("Lap: {lap}"),
    }
}

pub fn format_speed(speed: f64) -> String {
    format!("(x{speed})")
}

fn hud_text(session: &Session, frame: &Frame, status: TrackStatus, speed: f64) -> HudText {
    HudText {
        header: session.header(),
        lap: format_lap(frame.lap, session.total_laps),
        race_time: format!("Race Time: {}", format_race_time(frame.t)),
        speed: format_speed(speed),
        flag: status.label(),
        status,
    }
}

/// Builds the plan for one tick. Without a frame only the track is drawn,
/// in the default status colour.
pub fn build_render_plan(
    session: &Session,
    geometry: &TrackGeometry,
    frame_index: usize,
    frame: Option<&Frame>,
    selection: &Selection,
    speed: f64,
) -> RenderPlan {
    let transform = geometry.transform();
    let status = TrackStatus::from_code(
        frame
            .map(|f| resolve_status(&session.track_statuses, f.t))
            .unwrap_or_default(),
    );
    let to_screen = |points: &[Point]| -> Vec<Point> {
        points.iter().map(|p| transform.world_to_screen(*p)).collect()
    };

    let mut cars = Vec::new();
    let mut hud = None;
    if let Some(frame) = frame {
        let (selected, normal): (Vec<_>, Vec<_>) = standings(frame)
            .into_iter()
            .map(|(code, driver)| CarMarker {
                code: code.to_string(),
                position: transform.world_to_screen(driver.position()),
                color: session.driver_color(code),
                selected: selection.is_selected(code),
            })
            .partition(|car| car.selected);
        cars = normal;
        cars.extend(selected);
        hud = Some(hud_text(session, frame, status, speed));
    }

    RenderPlan {
        frame_index,
        status,
        track_color: status.track_color(),
        inner: to_screen(&geometry.inner),
        outer: to_screen(&geometry.outer),
        cars,
        hud,
    }
}
