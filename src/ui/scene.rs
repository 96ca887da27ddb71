use egui::{Align2, Color32, FontId, Painter, Pos2, Sense, Shape, Stroke, Ui, Vec2};

use trackside::{
    ReplayController,
    replay::{
        geometry::Point,
        render::{
            BACKGROUND_COLOR, MARKER_RADIUS, RenderPlan, SELECTED_MARKER_RADIUS,
            SELECTION_RING_COLOR, SELECTION_RING_RADIUS, SELECTION_RING_WIDTH, TRACK_STROKE_WIDTH,
        },
    },
    session::Rgb,
};

use super::hud;

pub(crate) fn color_from_rgb(rgb: Rgb) -> Color32 {
    Color32::from_rgb(rgb[0], rgb[1], rgb[2])
}

fn to_pos(origin: Pos2, point: Point) -> Pos2 {
    origin + Vec2::new(point.x as f32, point.y as f32)
}

fn to_point(origin: Pos2, pos: Pos2) -> Point {
    Point::new((pos.x - origin.x) as f64, (pos.y - origin.y) as f64)
}

/// Fills the remaining space with the track canvas: resizes the projection
/// to it, paints the current plan and forwards clicks to the selection.
pub(crate) fn track_canvas(ui: &mut Ui, replay: &mut ReplayController) {
    let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click());
    let rect = response.rect;
    let origin = rect.min;
    replay.resize(rect.width() as f64, rect.height() as f64);

    if response.clicked()
        && let Some(pos) = response.interact_pointer_pos()
    {
        replay.handle_click(to_point(origin, pos));
    }

    let plan = replay.render_plan();
    painter.rect_filled(rect, 0., color_from_rgb(BACKGROUND_COLOR));
    paint_plan(&painter, origin, &plan);
    if let Some(hud_text) = &plan.hud {
        hud::paint_hud(&painter, rect, hud_text);
    }

    if let Some(pos) = response.hover_pos() {
        let world = replay.pointer_world(to_point(origin, pos));
        painter.text(
            rect.left_bottom() + Vec2::new(8., -8.),
            Align2::LEFT_BOTTOM,
            format!("x: {:.0}  y: {:.0}", world.x, world.y),
            FontId::monospace(12.),
            Color32::GRAY,
        );
    }
}

fn paint_plan(painter: &Painter, origin: Pos2, plan: &RenderPlan) {
    let track_stroke = Stroke::new(TRACK_STROKE_WIDTH, color_from_rgb(plan.track_color));
    for boundary in [&plan.inner, &plan.outer] {
        if boundary.len() < 2 {
            continue;
        }
        let points = boundary.iter().map(|p| to_pos(origin, *p)).collect();
        painter.add(Shape::closed_line(points, track_stroke));
    }

    for car in &plan.cars {
        let center = to_pos(origin, car.position);
        let fill = color_from_rgb(car.color);
        if car.selected {
            painter.circle_stroke(
                center,
                SELECTION_RING_RADIUS,
                Stroke::new(SELECTION_RING_WIDTH, color_from_rgb(SELECTION_RING_COLOR)),
            );
            painter.circle_filled(center, SELECTED_MARKER_RADIUS, fill);
        } else {
            painter.circle_filled(center, MARKER_RADIUS, fill);
        }
    }
}
