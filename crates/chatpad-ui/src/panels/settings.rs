//! Settings panel for generation settings and history reset.
//! Every change is reported as a patch; the store validates and persists it.

use egui::{self, RichText, Vec2};
use chatpad_types::settings::SettingsPatch;
use crate::state::{parse_seed, UiState};
use crate::theme::*;

/// What the caller should do after rendering the settings panel
pub enum SettingsAction {
    None,
    /// Apply this patch to the store
    Changed(SettingsPatch),
    /// The user confirmed clearing the conversation
    ClearHistory,
}

pub fn settings_panel(ui: &mut egui::Ui, state: &mut UiState) -> SettingsAction {
    let mut patch = SettingsPatch::default();
    let mut clear_confirmed = false;

    egui::Frame::default()
        .fill(BG_SECONDARY)
        .inner_margin(PANEL_PADDING)
        .corner_radius(PANEL_ROUNDING)
        .show(ui, |ui| {
            ui.heading(RichText::new("Settings").color(TEXT_PRIMARY));
            ui.separator();

            // ── Generation ───────────────────────────────────
            ui.label(RichText::new("Generation").color(ACCENT).strong());
            ui.add_space(2.0);

            ui.label(RichText::new("Model").color(TEXT_SECONDARY).small());
            let model_edit = ui.add(
                egui::TextEdit::singleline(&mut state.model_input).hint_text("gpt-4"),
            );
            if model_edit.lost_focus() && state.model_input != state.settings.model {
                patch = std::mem::take(&mut patch).model(state.model_input.clone());
            }

            ui.add_space(4.0);

            ui.label(RichText::new("Temperature").color(TEXT_SECONDARY).small());
            let mut temperature = state.settings.temperature;
            if ui
                .add(egui::Slider::new(&mut temperature, 0.0..=1.0).step_by(0.1))
                .changed()
            {
                patch = std::mem::take(&mut patch).temperature(temperature);
            }

            ui.add_space(12.0);
            ui.separator();
            ui.add_space(4.0);

            // ── Seed ─────────────────────────────────────────
            ui.label(RichText::new("Seed").color(ACCENT).strong());
            ui.add_space(2.0);

            let mut random = state.settings.use_random_seed;
            if ui.checkbox(&mut random, "Random seed for every request").changed() {
                patch = std::mem::take(&mut patch).use_random_seed(random);
            }

            ui.label(RichText::new("Fixed seed").color(TEXT_SECONDARY).small());
            let seed_edit = ui.add_enabled(
                !random,
                egui::TextEdit::singleline(&mut state.seed_input).hint_text("0 – 999999999999999"),
            );
            if seed_edit.changed() {
                patch = std::mem::take(&mut patch).fixed_seed(parse_seed(&state.seed_input));
            }
            if !random && state.settings.fixed_seed.is_none() {
                ui.label(
                    RichText::new("No fixed seed set: a random seed is used.")
                        .color(TEXT_SECONDARY)
                        .small()
                        .italics(),
                );
            }

            if let Some(fb) = &state.settings_feedback {
                ui.add_space(4.0);
                let color = if fb.success { SUCCESS } else { ERROR };
                ui.label(RichText::new(&fb.message).color(color).small());
            }

            ui.add_space(16.0);
            ui.separator();
            ui.add_space(8.0);

            // ── History ──────────────────────────────────────
            if state.confirm_clear {
                ui.label(
                    RichText::new("Clear the whole chat history?")
                        .color(WARNING)
                        .strong(),
                );
                ui.horizontal(|ui| {
                    if ui.button(RichText::new("Clear").color(ERROR)).clicked() {
                        clear_confirmed = true;
                        state.confirm_clear = false;
                    }
                    if ui.button("Cancel").clicked() {
                        state.confirm_clear = false;
                    }
                });
            } else if ui
                .add_enabled(
                    !state.is_busy(),
                    egui::Button::new(RichText::new("Clear history").color(TEXT_PRIMARY))
                        .fill(BG_SURFACE)
                        .corner_radius(PANEL_ROUNDING)
                        .min_size(Vec2::new(120.0, 28.0)),
                )
                .clicked()
            {
                state.confirm_clear = true;
            }
        });

    if clear_confirmed {
        SettingsAction::ClearHistory
    } else if !patch.is_empty() {
        SettingsAction::Changed(patch)
    } else {
        SettingsAction::None
    }
}
