use eframe::egui;
use egui::{Color32, RichText};
use crate::app::app_core::DreamweaverApp;
use crate::audio::PlaybackState;

pub fn render_header(app: &mut DreamweaverApp, ctx: &egui::Context) {
    egui::TopBottomPanel::top("header")
        .min_height(60.0)
        .show(ctx, |ui| {
            ui.add_space(8.0);
            ui.vertical_centered(|ui| {
                ui.label(
                    RichText::new("🌙 Dreamweaver ✨")
                        .size(26.0)
                        .strong()
                        .color(Color32::from_rgb(200, 190, 255)),
                );
                ui.label("Deeply refined stories tailored to every dreamer, every age, and every mood.");
            });

            // 故事页面显示返回按钮
            if app.state.story.is_some() && !app.state.generation.is_loading {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("🗑 Start Over").clicked() {
                        app.reset();
                    }
                });
            }
            ui.add_space(8.0);
        });
}

pub fn render_status_bar(app: &mut DreamweaverApp, ctx: &egui::Context) {
    egui::TopBottomPanel::bottom("bottom_status_bar")
        .min_height(25.0)
        .show(ctx, |ui| {
            ui.add_space(3.0);
            ui.horizontal(|ui| {
                ui.label("Status:");

                let (status_text, status_color) = status_label(app);
                ui.colored_label(status_color, status_text);
                ui.separator();

                let audio = &app.config.get_config().audio;
                ui.label(format!("PCM: {} Hz, {} ch", audio.sample_rate, audio.channels));

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if let Some(path) = app.config.config_path() {
                        ui.weak(format!("Config: {}", path.display()));
                    }
                });
            });
            ui.add_space(3.0);
        });
}

fn status_label(app: &DreamweaverApp) -> (&'static str, Color32) {
    if app.state.generation.is_loading {
        return ("Weaving", Color32::from_rgb(255, 165, 0)); // 橙色
    }
    if app.state.playback.device_error.is_some() {
        return ("Audio device unavailable", Color32::from_rgb(200, 60, 60)); // 红色
    }

    match app.narrator.state() {
        Some(PlaybackState::Playing) => ("Narrating", Color32::from_rgb(0, 170, 90)), // 绿色
        Some(PlaybackState::Paused) => ("Paused", Color32::from_rgb(255, 165, 0)),
        Some(PlaybackState::Ended) => ("The End", Color32::from_rgb(150, 150, 255)),
        Some(PlaybackState::Idle) | Some(PlaybackState::Stopped) | None => {
            ("Ready", Color32::from_rgb(160, 160, 160))
        }
    }
}
