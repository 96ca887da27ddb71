use egui::{Color32, Frame, Image, RichText, Sense, Ui, load::SizeHint};

use trackside::ReplayController;

use super::{PALETTE_HIGHLIGHT, scene::color_from_rgb};

const TYRE_ICON_SIZE: f32 = 18.;
const PORTRAIT_HEIGHT: f32 = 96.;

/// Shows the image at `uri` only once it has loaded; missing assets leave
/// no trace in the layout.
fn optional_image(ui: &mut Ui, uri: &str, max_height: f32) {
    if let Ok(egui::load::TexturePoll::Ready { .. }) =
        ui.ctx().try_load_texture(uri, Default::default(), SizeHint::default())
    {
        ui.add(Image::new(uri.to_string()).max_height(max_height));
    }
}

fn asset_uri(asset_base: Option<&str>, path: &str) -> Option<String> {
    asset_base.map(|base| format!("{base}/{path}"))
}

pub(crate) fn leaderboard(ui: &mut Ui, replay: &mut ReplayController, asset_base: Option<&str>) {
    ui.heading("Leaderboard");
    ui.separator();

    let mut clicked = None;
    for entry in replay.leaderboard() {
        let fill = if entry.selected {
            PALETTE_HIGHLIGHT
        } else {
            Color32::TRANSPARENT
        };
        let response = Frame::new()
            .fill(fill)
            .inner_margin(2)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new(format!("{}.", entry.position)).color(Color32::WHITE));
                    ui.label(
                        RichText::new(&entry.code)
                            .strong()
                            .color(color_from_rgb(entry.color)),
                    );
                    if entry.out {
                        ui.label(RichText::new("OUT").color(Color32::from_rgb(255, 68, 68)));
                    }
                    if let Some(uri) = asset_uri(asset_base, &entry.tyre_icon_path()) {
                        optional_image(ui, &uri, TYRE_ICON_SIZE);
                    }
                });
            })
            .response
            .interact(Sense::click());
        if response.clicked() {
            clicked = Some(entry.code.clone());
        }
    }

    if let Some(code) = clicked {
        replay.toggle_selection(&code);
    }
}

pub(crate) fn driver_info(ui: &mut Ui, replay: &ReplayController, asset_base: Option<&str>) {
    let Some(info) = replay.driver_info() else {
        return;
    };

    ui.add_space(12.);
    Frame::new()
        .fill(color_from_rgb(info.color))
        .inner_margin(6)
        .show(ui, |ui| {
            ui.label(RichText::new(&info.name).strong().color(Color32::BLACK));
            if !info.team.is_empty() {
                ui.label(RichText::new(&info.team).color(Color32::BLACK));
            }
        });
    if let Some(uri) = asset_uri(asset_base, &info.portrait_path()) {
        optional_image(ui, &uri, PORTRAIT_HEIGHT);
    }

    egui::Grid::new("driver_info_grid")
        .num_columns(2)
        .striped(false)
        .show(ui, |ui| {
            ui.label("Speed");
            ui.label(&info.speed);
            ui.end_row();
            ui.label("Gear");
            ui.label(info.gear.to_string());
            ui.end_row();
            ui.label("DRS");
            ui.label(info.drs);
            ui.end_row();
            ui.label("Lap");
            ui.label(info.lap.to_string());
            ui.end_row();
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_uri_requires_base() {
        assert_eq!(
            asset_uri(Some("http://127.0.0.1:5000"), "images/drivers/NOR.png").as_deref(),
            Some("http://127.0.0.1:5000/images/drivers/NOR.png")
        );
        assert_eq!(asset_uri(None, "images/drivers/NOR.png"), None);
    }
}
