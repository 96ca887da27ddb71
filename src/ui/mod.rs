pub(crate) mod config;
mod hud;
mod input;
mod panels;
mod scene;

use std::{
    sync::{
        Arc,
        mpsc::{self, Receiver},
    },
    thread,
    time::Instant,
};

use egui::{Color32, RichText, Visuals, style::Widgets};
use log::{error, info, warn};

use config::AppConfig;
use trackside::{
    FrameSource, PlaybackCommand, ReplayController, ReplayError, Session, SessionLoader,
    SessionRequest,
};

pub(crate) const PALETTE_BLACK: Color32 = Color32::from_rgb(12, 12, 12);
pub(crate) const PALETTE_GREY: Color32 = Color32::from_rgb(34, 34, 38);
pub(crate) const PALETTE_HIGHLIGHT: Color32 = Color32::from_rgb(60, 60, 72);
pub(crate) const PALETTE_RED: Color32 = Color32::from_rgb(225, 6, 0);

const SIDE_PANEL_WIDTH: f32 = 220.;

/// Where sessions and their frames come from.
pub(crate) struct ReplaySource {
    pub(crate) loader: Arc<dyn SessionLoader>,
    pub(crate) frames: Arc<dyn FrameSource>,
    pub(crate) request: SessionRequest,
}

enum UiState {
    Loading,
    Error { message: String },
    Replaying,
}

pub(crate) struct ReplayApp {
    source: ReplaySource,
    app_config: AppConfig,
    ui_state: UiState,
    replay: Option<ReplayController>,
    session_rx: Option<Receiver<Result<Session, ReplayError>>>,
    last_update: Option<Instant>,
    fetch_error: Option<String>,
    asset_base: Option<String>,
}

fn describe(error: &ReplayError) -> String {
    let cause = error.root_cause();
    if std::ptr::eq(cause, error) {
        error.to_string()
    } else {
        format!("{error}: {cause}")
    }
}

impl ReplayApp {
    pub(crate) fn new(
        source: ReplaySource,
        app_config: AppConfig,
        cc: &eframe::CreationContext<'_>,
    ) -> Self {
        egui_extras::install_image_loaders(&cc.egui_ctx);
        let default_visuals = Visuals {
            dark_mode: true,
            hyperlink_color: PALETTE_RED,
            faint_bg_color: PALETTE_BLACK,
            extreme_bg_color: PALETTE_GREY,
            panel_fill: PALETTE_BLACK,
            button_frame: true,
            widgets: Widgets::dark(),
            striped: false,
            ..Default::default()
        };
        cc.egui_ctx.set_visuals(default_visuals);

        let asset_base = source.frames.asset_base_url();
        let mut app = Self {
            source,
            app_config,
            ui_state: UiState::Loading,
            replay: None,
            session_rx: None,
            last_update: None,
            fetch_error: None,
            asset_base,
        };
        app.start_loading();
        app
    }

    /// Loads the session on a background thread; the result is picked up
    /// by `update`.
    fn start_loading(&mut self) {
        let (session_tx, session_rx) = mpsc::channel();
        let loader = self.source.loader.clone();
        let request = self.source.request.clone();
        thread::spawn(move || {
            // the app may have exited meanwhile
            let _ = session_tx.send(loader.load_session(&request));
        });
        self.session_rx = Some(session_rx);
        self.ui_state = UiState::Loading;
        self.fetch_error = None;
    }

    fn receive_session(&mut self) {
        let Some(session_rx) = &self.session_rx else {
            return;
        };
        let Ok(result) = session_rx.try_recv() else {
            return;
        };
        self.session_rx = None;

        match result {
            Ok(session) => {
                info!(
                    "Starting replay of {} ({} frames)",
                    session.session_id, session.total_frames
                );
                let frames = self.source.frames.clone();
                match &mut self.replay {
                    Some(replay) => replay.reload(session, frames),
                    None => {
                        // resized to the canvas on the first paint
                        let size: egui::Vec2 = self.app_config.window_size.clone().into();
                        self.replay = Some(ReplayController::new(
                            session,
                            frames,
                            size.x as f64,
                            size.y as f64,
                        ))
                    }
                }
                self.last_update = None;
                self.ui_state = UiState::Replaying;
            }
            Err(e) => {
                error!("Error loading session: {}", describe(&e));
                self.ui_state = UiState::Error {
                    message: describe(&e),
                };
            }
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        let Some(replay) = &mut self.replay else {
            return;
        };
        let mut commands = Vec::new();
        ui.horizontal(|ui| {
            let pause_label = if replay.clock().is_paused() {
                "\u{25B6} Play"
            } else {
                "\u{23F8} Pause"
            };
            if ui.button(pause_label).clicked() {
                commands.push(PlaybackCommand::TogglePause);
            }
            if ui.button("\u{23EA}").on_hover_text("Back 10 frames").clicked() {
                commands.push(PlaybackCommand::Rewind);
            }
            if ui.button("\u{23E9}").on_hover_text("Forward 10 frames").clicked() {
                commands.push(PlaybackCommand::FastForward);
            }
            if ui
                .button(format!("{}x", replay.clock().speed()))
                .on_hover_text("Cycle playback speed")
                .clicked()
            {
                commands.push(PlaybackCommand::CycleSpeedPreset);
            }
            if ui.button("\u{21BA} Restart").clicked() {
                commands.push(PlaybackCommand::Restart);
            }

            let last_frame = replay.clock().total_frames().saturating_sub(1) as f64;
            let mut position = replay.clock().frame_index();
            let slider = egui::Slider::new(&mut position, 0.0..=last_frame).show_value(false);
            if ui.add(slider).changed() {
                commands.push(PlaybackCommand::SeekTo(position));
            }
            ui.label(format!(
                "{} / {}",
                replay.clock().current_frame(),
                replay.clock().total_frames()
            ));
        });
        for command in commands {
            replay.apply(command);
        }
    }

    fn show_replay(&mut self, ctx: &egui::Context) {
        let now = Instant::now();
        let delta = self
            .last_update
            .map(|last| now.duration_since(last).as_secs_f64())
            .unwrap_or(0.);
        self.last_update = Some(now);

        let mut reload = false;
        egui::TopBottomPanel::top("replay_toolbar")
            .frame(egui::Frame::new().inner_margin(4).fill(PALETTE_BLACK))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    self.toolbar(ui);
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        reload = ui.button("\u{27F3} Reload").clicked();
                    });
                });
                if let Some(message) = &self.fetch_error {
                    ui.label(RichText::new(message).color(PALETTE_RED));
                }
            });
        if reload {
            info!("Reloading session");
            self.start_loading();
            return;
        }

        let Some(replay) = &mut self.replay else {
            return;
        };
        for command in input::pressed_commands(ctx) {
            replay.apply(command);
        }
        let errors = replay.advance(delta);
        if let Some(last) = errors.last() {
            for e in &errors {
                warn!("Frame fetch failed: {}", describe(e));
            }
            self.fetch_error = Some(describe(last));
        } else if self.fetch_error.is_some() && !replay.has_fetch_failure() {
            self.fetch_error = None;
        }

        let asset_base = self.asset_base.as_deref();
        egui::SidePanel::right("replay_side_panel")
            .exact_width(SIDE_PANEL_WIDTH)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    panels::leaderboard(ui, replay, asset_base);
                    panels::driver_info(ui, replay, asset_base);
                });
            });
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| scene::track_canvas(ui, replay));

        ctx.request_repaint();
    }
}

impl eframe::App for ReplayApp {
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Err(e) = self.app_config.save() {
            error!("Error while saving config file: {}", e);
        }
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(rect) = ctx.input(|i| i.viewport().inner_rect) {
            self.app_config.window_size = rect.size().into();
        }
        self.receive_session();

        match &self.ui_state {
            UiState::Loading => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.centered_and_justified(|ui| {
                        ui.spinner();
                        ui.label("Loading session...");
                    });
                });
                ctx.request_repaint();
            }
            UiState::Error { message } => {
                let message = message.clone();
                let mut retry = false;
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(40.);
                        ui.label(RichText::new(message).color(PALETTE_RED).size(16.));
                        retry = ui.button("Retry").clicked();
                    });
                });
                if retry {
                    self.start_loading();
                }
            }
            UiState::Replaying => self.show_replay(ctx),
        }
    }
}
