//! Main egui application. Composes the panels and routes user intent to the
//! conversation store and the notebook.

use std::cell::RefCell;
use std::rc::Rc;

use egui::{self, CentralPanel, RichText, SidePanel, TopBottomPanel};

use chatpad_core::event_bus::EventBus;
use chatpad_core::notebook::NotebookDocument;
use chatpad_core::ports::CompletionPort;
use chatpad_core::store::ConversationStore;
use chatpad_core::turn::send_message;
use chatpad_platform::export::{download_document, DEFAULT_FILENAME};
use chatpad_platform::storage::{auto_detect_storage, load_app_config, open_storage};
use chatpad_platform::TextCompletionClient;
use chatpad_types::config::StorageBackendType;
use chatpad_ui::panels::chat;
use chatpad_ui::panels::notebook::{self, NotebookAction};
use chatpad_ui::panels::settings::{self, SettingsAction};
use chatpad_ui::state::{Tab, UiState};
use chatpad_ui::theme;

/// The main application state
pub struct ChatpadApp {
    ui_state: UiState,
    event_bus: EventBus,
    store: Rc<RefCell<ConversationStore>>,
    notebook: NotebookDocument,
    completion: Rc<dyn CompletionPort>,
    first_frame: bool,
}

impl ChatpadApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let detected = auto_detect_storage();
        let config = load_app_config(detected.as_ref());
        let event_bus = EventBus::new();

        let storage = match config.storage.backend {
            StorageBackendType::Auto => detected,
            _ => open_storage(&config.storage),
        };
        let store = ConversationStore::restore(storage.clone(), event_bus.clone())
            .with_context_window(config.context_window);
        let notebook = NotebookDocument::load(storage);

        let completion: Rc<dyn CompletionPort> =
            Rc::new(TextCompletionClient::new(config.completion.clone()));
        log::info!("Completion endpoint: {}", completion.endpoint_name());

        let mut ui_state = UiState::new();
        ui_state.notebook_text = notebook.content().to_string();

        Self {
            ui_state,
            event_bus,
            store: Rc::new(RefCell::new(store)),
            notebook,
            completion,
            first_frame: true,
        }
    }

    /// Run a chat turn in the background. Results reach the UI as events.
    fn dispatch_message(&self, text: String, ctx: &egui::Context) {
        let store = self.store.clone();
        let completion = self.completion.clone();
        let ctx = ctx.clone();

        wasm_bindgen_futures::spawn_local(async move {
            match send_message(&store, &text, completion.as_ref()).await {
                Ok(reply) => log::debug!("Reply received ({} chars)", reply.content.len()),
                Err(e) if e.is_network() => log::warn!("Completion failed: {}", e),
                Err(e) => log::error!("Chat turn rejected: {}", e),
            }
            ctx.request_repaint();
        });
    }

    fn handle_settings(&mut self, action: SettingsAction) {
        match action {
            SettingsAction::None => {}
            SettingsAction::Changed(patch) => {
                // Rejections are reported to the panel through ValidationFailed
                if let Err(e) = self.store.borrow_mut().update_settings(patch) {
                    log::debug!("Settings change rejected: {}", e);
                }
            }
            SettingsAction::ClearHistory => {
                if let Err(e) = self.store.borrow_mut().clear() {
                    log::warn!("Clear history rejected: {}", e);
                }
            }
        }
    }

    fn handle_notebook(&mut self, action: NotebookAction) {
        match action {
            NotebookAction::None => {}
            NotebookAction::Edited(text) => self.notebook.edit(text),
            NotebookAction::NewDocument => {
                self.notebook.new_document();
                self.ui_state.notebook_text = self.notebook.content().to_string();
            }
            NotebookAction::Export => {
                if let Err(e) = download_document(self.notebook.content(), DEFAULT_FILENAME) {
                    log::error!("Export failed: {}", e);
                }
            }
        }
    }

    /// Files dropped on the window open in the notebook.
    fn import_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        // Only the last file is kept; each import replaces the body
        if let Some(file) = dropped.last() {
            match &file.bytes {
                Some(bytes) => {
                    self.notebook.import(String::from_utf8_lossy(bytes).into_owned());
                    self.ui_state.notebook_text = self.notebook.content().to_string();
                    self.ui_state.active_tab = Tab::Notebook;
                    log::info!("Opened {}", file.name);
                }
                None => log::warn!("Dropped file {} has no readable contents", file.name),
            }
        }
    }
}

impl eframe::App for ChatpadApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.first_frame {
            theme::apply_theme(ctx);
            self.first_frame = false;
        }

        // Drain events from the conversation store
        if self.event_bus.has_pending() {
            self.ui_state.process_events(self.event_bus.drain());
            ctx.request_repaint();
        }

        if self.ui_state.is_busy() {
            ctx.request_repaint();
        }

        self.import_dropped_files(ctx);

        // ── Top bar ──────────────────────────────────────────
        TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new("Chatpad")
                        .strong()
                        .color(theme::ACCENT)
                        .size(16.0),
                );
                ui.separator();
                ui.selectable_value(&mut self.ui_state.active_tab, Tab::Chat, "Chat");
                ui.selectable_value(&mut self.ui_state.active_tab, Tab::Notebook, "Notebook");
                ui.separator();
                ui.label(
                    RichText::new(format!(
                        "Model: {} | T={}",
                        self.ui_state.settings.model, self.ui_state.settings.temperature
                    ))
                    .color(theme::TEXT_SECONDARY)
                    .small(),
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .selectable_label(self.ui_state.show_settings, "Settings")
                        .clicked()
                    {
                        self.ui_state.show_settings = !self.ui_state.show_settings;
                    }
                });
            });
        });

        // ── Settings side panel ──────────────────────────────
        if self.ui_state.show_settings && self.ui_state.active_tab == Tab::Chat {
            let mut action = SettingsAction::None;
            SidePanel::right("settings_panel")
                .min_width(280.0)
                .max_width(350.0)
                .show(ctx, |ui| {
                    action = settings::settings_panel(ui, &mut self.ui_state);
                });
            self.handle_settings(action);
        }

        // ── Main content ─────────────────────────────────────
        match self.ui_state.active_tab {
            Tab::Chat => {
                let mut submitted = None;
                CentralPanel::default().show(ctx, |ui| {
                    submitted = chat::chat_panel(ui, &mut self.ui_state);
                });
                if let Some(text) = submitted {
                    self.dispatch_message(text, ctx);
                }
            }
            Tab::Notebook => {
                let mut action = NotebookAction::None;
                CentralPanel::default().show(ctx, |ui| {
                    action = notebook::notebook_panel(ui, &mut self.ui_state);
                });
                self.handle_notebook(action);
            }
        }
    }
}
