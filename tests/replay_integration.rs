// End-to-end replays over recorded sessions: load, prime, tick, select

use std::{collections::BTreeMap, io::Write, sync::Arc, time::Duration};

use serde_json::json;
use tempfile::NamedTempFile;

use trackside::{
    Frame, PlaybackCommand, RecordedBackend, ReplayController, Session,
    backend::SessionLoader,
    replay::{geometry::Point, track_status::TrackStatus},
    session::{DriverState, SessionRequest, SessionType},
};

const WAIT: Duration = Duration::from_secs(10);

fn recording(total_frames: usize, rotation: Option<f64>) -> serde_json::Value {
    let frames: Vec<_> = (0..total_frames)
        .map(|i| {
            let progress = i as f64;
            json!({
                "t": i as f64 / 25.,
                "lap": 1 + i / 50,
                "drivers": {
                    "LEC": {"x": 2000., "y": 0., "dist": 100. + progress, "rel_dist": 0.1,
                            "speed": 301.2, "gear": 8, "drs": 12, "tyre": 1, "lap": 1},
                    "NOR": {"x": 0., "y": 2000., "dist": 90. + progress, "rel_dist": 0.1,
                            "speed": 288.0, "gear": 7, "drs": 0, "tyre": 2, "lap": 1},
                }
            })
        })
        .collect();
    json!({
        "session": {
            "success": true,
            "session_id": "2024_7_R",
            "total_frames": total_frames,
            "track_layout": {"x": [0., 4000., 4000., 0.], "y": [0., 0., 4000., 4000.]},
            "driver_colors": {"LEC": [220, 0, 0], "NOR": [255, 135, 0]},
            "driver_names": {"LEC": "Charles Leclerc", "NOR": "Lando Norris"},
            "driver_teams": null,
            "track_statuses": [
                {"status": "1", "start_time": 0., "end_time": 2.},
                {"status": "6", "start_time": 2., "end_time": null}
            ],
            "total_laps": 63,
            "circuit_rotation": rotation,
            "event_name": "Emilia Romagna Grand Prix",
            "round_number": 7,
            "year": 2024
        },
        "frames": frames
    })
}

fn recorded_backend(total_frames: usize, rotation: Option<f64>) -> Arc<RecordedBackend> {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", recording(total_frames, rotation)).unwrap();
    file.flush().unwrap();
    Arc::new(RecordedBackend::from_file(file.path()).unwrap())
}

fn start(backend: Arc<RecordedBackend>) -> ReplayController {
    let session = backend
        .load_session(&SessionRequest {
            year: 2024,
            round: 7,
            session_type: SessionType::Race,
            force_refresh: false,
        })
        .unwrap();
    let mut replay = ReplayController::new(session, backend, 1024., 768.);
    assert!(replay.wait_for_frames(WAIT).is_empty());
    assert!(replay.is_primed());
    replay
}

#[test]
fn test_four_seconds_of_playback_clamps_to_last_frame() {
    let mut replay = start(recorded_backend(100, None));

    // 25 fps at 1x for 4 s is frame 100, one past the end
    for _ in 0..40 {
        assert!(replay.advance(0.1).is_empty());
    }
    assert_eq!(replay.clock().frame_index(), 99.);

    let plan = replay.render_plan();
    assert_eq!(plan.frame_index, 99);
    let hud = plan.hud.unwrap();
    assert_eq!(hud.header.as_deref(), Some("(Round 7) Emilia Romagna Grand Prix | 2024"));
    assert_eq!(hud.lap, "Lap: 2/63");
    assert_eq!(hud.race_time, "Race Time: 00:00:03");
    assert_eq!(hud.flag, Some("VIRTUAL SAFETY CAR"));
    assert_eq!(plan.status, TrackStatus::VirtualSafetyCar);
}

#[test]
fn test_pause_speed_and_seek_controls() {
    let mut replay = start(recorded_backend(200, None));

    replay.apply(PlaybackCommand::TogglePause);
    replay.advance(5.);
    assert_eq!(replay.clock().frame_index(), 0.);

    replay.apply(PlaybackCommand::TogglePause);
    for _ in 0..4 {
        replay.apply(PlaybackCommand::IncreaseSpeed);
    }
    assert_eq!(replay.clock().speed(), 16.);
    replay.advance(0.25);
    assert_eq!(replay.clock().current_frame(), 100);

    replay.apply(PlaybackCommand::Rewind);
    assert_eq!(replay.clock().current_frame(), 90);
    replay.apply(PlaybackCommand::SeekTo(1e9));
    assert_eq!(replay.clock().current_frame(), 199);

    replay.apply(PlaybackCommand::CycleSpeedPreset);
    assert_eq!(replay.clock().speed(), 0.5);
}

#[test]
fn test_click_selects_car_on_rotated_circuit() {
    let mut replay = start(recorded_backend(10, Some(90.)));

    let plan = replay.render_plan();
    let nor = plan.cars.iter().find(|c| c.code == "NOR").unwrap().position;
    assert!(replay.handle_click(Point::new(nor.x, nor.y + 5.)));
    assert_eq!(replay.selection().selected(), Some("NOR"));

    let plan = replay.render_plan();
    let last = plan.cars.last().unwrap();
    assert_eq!(last.code, "NOR");
    assert!(last.selected);

    let info = replay.driver_info().unwrap();
    assert_eq!(info.name, "Lando Norris");
    assert_eq!(info.team, "");
    assert_eq!(info.speed, "288.0 km/h");
    assert_eq!(info.drs, "Off");

    // the leaderboard toggles the same selection
    replay.toggle_selection("NOR");
    assert!(replay.driver_info().is_none());
}

#[test]
fn test_missing_frames_are_recovered() {
    let frames: Vec<Frame> = (0..12_000)
        .map(|i| Frame {
            t: i as f64 / 25.,
            lap: 1,
            drivers: BTreeMap::from([(
                "PIA".to_string(),
                DriverState {
                    x: 10.,
                    y: 10.,
                    dist: i as f64,
                    ..DriverState::default()
                },
            )]),
        })
        .collect();
    let session: Session = serde_json::from_value(json!({
        "session_id": "2024_9_S",
        "total_frames": 12_000,
        "track_layout": {"x": [0., 100., 100.], "y": [0., 0., 100.]},
    }))
    .unwrap();
    let mut replay = ReplayController::new(
        session.clone(),
        Arc::new(RecordedBackend::new(session, frames)),
        800.,
        600.,
    );
    replay.wait_for_frames(WAIT);
    assert_eq!(replay.frames().loaded_count(), 5000);

    replay.apply(PlaybackCommand::SeekTo(9000.));
    // nothing cached there yet: track only, and a window is requested
    let plan = replay.render_plan();
    assert!(plan.hud.is_none());
    assert!(plan.cars.is_empty());
    assert!(replay.frames().is_pending(9000));

    replay.wait_for_frames(WAIT);
    assert!(replay.frames().is_loaded(8900));
    assert!(replay.frames().is_loaded(9399));
    let plan = replay.render_plan();
    assert_eq!(plan.cars.len(), 1);
    assert!(plan.hud.is_some());
}
