use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Vec2};

use trackside::replay::{render::HudText, track_status::TrackStatus};

use super::scene::color_from_rgb;

const HUD_MARGIN: f32 = 12.;
const HUD_LINE_HEIGHT: f32 = 22.;

/// Text colour of the flag banner, one per flag condition.
fn flag_color(status: TrackStatus) -> Color32 {
    match status {
        TrackStatus::Green => Color32::WHITE,
        TrackStatus::Yellow => Color32::from_rgb(255, 215, 0),
        TrackStatus::Red => Color32::from_rgb(255, 68, 68),
        TrackStatus::SafetyCar | TrackStatus::VirtualSafetyCar => {
            color_from_rgb(status.track_color())
        }
    }
}

pub(crate) fn paint_hud(painter: &Painter, rect: Rect, hud: &HudText) {
    let mut cursor = rect.left_top() + Vec2::splat(HUD_MARGIN);
    let mut line = |text: &str, font: FontId, color: Color32| {
        painter.text(cursor, Align2::LEFT_TOP, text, font, color);
        cursor += Vec2::new(0., HUD_LINE_HEIGHT);
    };

    if let Some(header) = &hud.header {
        line(header, FontId::proportional(18.), Color32::WHITE);
    }
    line(&hud.lap, FontId::proportional(15.), Color32::WHITE);
    line(&hud.race_time, FontId::monospace(14.), Color32::LIGHT_GRAY);
    line(&hud.speed, FontId::proportional(14.), Color32::LIGHT_GRAY);

    if let Some(flag) = hud.flag {
        painter.text(
            Pos2::new(rect.center().x, rect.top() + HUD_MARGIN),
            Align2::CENTER_TOP,
            flag,
            FontId::proportional(20.),
            flag_color(hud.status),
        );
    }
}
