use eframe::egui;
use egui::{Color32, RichText};
use crate::app::app_core::DreamweaverApp;

pub fn render_main_panel(app: &mut DreamweaverApp, ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        if app.state.generation.is_loading {
            render_loading(app, ui);
        } else if app.state.story.is_some() {
            render_story(app, ui);
        } else {
            crate::app::ui::preferences::render_preferences(app, ui);
        }
    });
}

fn render_loading(app: &DreamweaverApp, ui: &mut egui::Ui) {
    ui.vertical_centered(|ui| {
        ui.add_space(120.0);
        ui.add(egui::Spinner::new().size(48.0));
        ui.add_space(20.0);
        ui.label(
            RichText::new(format!("\"{}\"", app.state.generation.loading_message))
                .size(22.0)
                .italics(),
        );
        ui.label(format!(
            "Blending {} with a touch of {}...",
            app.state.request.theme, app.state.request.mood
        ));
    });
}

fn render_story(app: &mut DreamweaverApp, ui: &mut egui::Ui) {
    // 播放器固定在底部，故事正文可滚动
    egui::TopBottomPanel::bottom("narration_panel")
        .resizable(false)
        .show_inside(ui, |ui| {
            ui.add_space(8.0);
            crate::app::ui::player::render_player(app, ui);
            ui.add_space(8.0);
        });

    let Some(story) = app.state.story.as_ref() else {
        return;
    };

    egui::ScrollArea::vertical().show(ui, |ui| {
        ui.horizontal(|ui| {
            ui.colored_label(Color32::from_rgb(170, 150, 255), app.state.request.theme.label());
            ui.separator();
            ui.weak(format!("For {}", app.state.request.age));
        });
        ui.add_space(10.0);

        ui.label(RichText::new(&story.title).size(30.0).strong());
        ui.add_space(16.0);

        for paragraph in story.content.split('\n').filter(|p| !p.trim().is_empty()) {
            ui.label(RichText::new(paragraph).size(17.0));
            ui.add_space(10.0);
        }
    });
}
