//! Notebook panel: a full-height text surface with New and Export controls.

use egui::{self, RichText};
use crate::state::UiState;
use crate::theme::*;

pub enum NotebookAction {
    None,
    /// The body changed; autosave it
    Edited(String),
    /// The user confirmed starting a new document
    NewDocument,
    Export,
}

pub fn notebook_panel(ui: &mut egui::Ui, state: &mut UiState) -> NotebookAction {
    let mut action = NotebookAction::None;

    egui::Frame::default()
        .fill(BG_PRIMARY)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.heading(RichText::new("Notebook").color(TEXT_PRIMARY).strong());
                ui.separator();

                if state.confirm_new_document {
                    ui.label(
                        RichText::new("Discard the current document?")
                            .color(WARNING),
                    );
                    if ui.button(RichText::new("Discard").color(ERROR)).clicked() {
                        state.confirm_new_document = false;
                        action = NotebookAction::NewDocument;
                    }
                    if ui.button("Cancel").clicked() {
                        state.confirm_new_document = false;
                    }
                } else {
                    if ui.button("New").clicked() {
                        state.confirm_new_document = true;
                    }
                    if ui.button("Export").clicked() {
                        action = NotebookAction::Export;
                    }
                    ui.label(
                        RichText::new("Drop a file here to open it")
                            .color(TEXT_SECONDARY)
                            .small(),
                    );
                }
            });

            ui.separator();

            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    let editor = egui::TextEdit::multiline(&mut state.notebook_text)
                        .hint_text("Start typing here...")
                        .desired_width(f32::INFINITY)
                        .desired_rows(24)
                        .font(egui::FontId::proportional(15.0));
                    if ui.add(editor).changed() {
                        action = NotebookAction::Edited(state.notebook_text.clone());
                    }
                });
        });

    action
}
