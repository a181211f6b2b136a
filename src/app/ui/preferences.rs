use egui::{Color32, RichText};
use crate::app::app_core::DreamweaverApp;
use crate::types::{MagicIngredient, StoryLength, StoryMood, StoryTheme, TargetAge};

pub fn render_preferences(app: &mut DreamweaverApp, ui: &mut egui::Ui) {
    egui::ScrollArea::vertical().show(ui, |ui| {
        let request = &mut app.state.request;

        section(ui, "👤 Who is the Dreamer?");
        ui.horizontal_wrapped(|ui| {
            for age in TargetAge::ALL {
                ui.selectable_value(&mut request.age, *age, age.label());
            }
        });

        section(ui, "📖 Choose a World");
        ui.horizontal_wrapped(|ui| {
            for theme in StoryTheme::ALL {
                ui.selectable_value(&mut request.theme, *theme, theme.label());
            }
        });

        section(ui, "🎵 Set the Mood");
        ui.horizontal_wrapped(|ui| {
            for mood in StoryMood::ALL {
                ui.selectable_value(&mut request.mood, *mood, mood.label());
            }
        });

        section(ui, "⏱ Story Length");
        ui.horizontal_wrapped(|ui| {
            for length in StoryLength::ALL {
                ui.selectable_value(&mut request.length, *length, length.label());
            }
        });

        section(ui, "⚡ Magic Ingredients (optional)");
        ui.horizontal_wrapped(|ui| {
            for ingredient in MagicIngredient::ALL {
                let selected = request.ingredients.contains(ingredient);
                if ui.selectable_label(selected, ingredient.label()).clicked() {
                    request.toggle_ingredient(*ingredient);
                }
            }
        });

        ui.add_space(20.0);

        if let Some(error) = &app.state.generation.error {
            ui.colored_label(Color32::from_rgb(255, 120, 120), error);
            ui.add_space(8.0);
        }

        ui.vertical_centered(|ui| {
            let button = egui::Button::new(RichText::new("🪄 Weave the Magic").size(20.0))
                .min_size(egui::vec2(240.0, 48.0));
            if ui.add(button).clicked() {
                app.start_generation();
            }
        });
    });
}

fn section(ui: &mut egui::Ui, title: &str) {
    ui.add_space(14.0);
    ui.label(RichText::new(title).size(18.0).strong());
    ui.add_space(4.0);
}
