use egui::{Color32, RichText};
use crate::app::app_core::DreamweaverApp;
use crate::audio::format_clock;

/// 旁白播放控件：播放/暂停、重播、进度条和时间
pub fn render_player(app: &mut DreamweaverApp, ui: &mut egui::Ui) {
    if let Some(error) = app.state.playback.device_error.clone() {
        ui.horizontal(|ui| {
            ui.colored_label(Color32::from_rgb(255, 120, 120), format!("🔇 {}", error));
            if ui.button("Retry").clicked() {
                app.retry_narration();
            }
        });
        return;
    }

    let Some(status) = app.narrator.status() else {
        let note = app
            .state
            .story
            .as_ref()
            .and_then(|s| s.narration_note.clone())
            .unwrap_or_else(|| "Summoning the narrator...".to_string());
        ui.vertical_centered(|ui| {
            ui.label(RichText::new(note).italics());
        });
        return;
    };

    ui.horizontal(|ui| {
        ui.label(RichText::new("🔊 Now Playing").strong());
        ui.weak("Narration");
        if app.state.playback.finished.get() {
            ui.colored_label(Color32::from_rgb(150, 150, 255), "✨ The End");
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let toggle_text = if status.is_playing() { "⏸" } else { "▶" };
            if ui.add(egui::Button::new(RichText::new(toggle_text).size(22.0))).clicked() {
                app.toggle_playback();
            }
            if ui.button("⟲").on_hover_text("Restart").clicked() {
                app.restart_playback();
            }
        });
    });

    ui.add(
        egui::ProgressBar::new((status.progress_percent.min(100.0) / 100.0) as f32)
            .desired_height(8.0),
    );

    ui.horizontal(|ui| {
        ui.weak(format_clock(status.position_secs));
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.weak(format_clock(status.duration_secs));
        });
    });
}
