//! UI-level state that drives rendering.
//! This is a read-only projection of the conversation store plus transient
//! widget state (input buffers, open dialogs), updated each frame by
//! draining the EventBus.

use chatpad_types::event::ChatEvent;
use chatpad_types::message::{Message, Role, MAX_SEED};
use chatpad_types::settings::Settings;

pub const FALLBACK_REPLY: &str =
    "Sorry, something went wrong while processing your request. Please try again.";
pub const CLEARED_NOTICE: &str = "Chat history cleared. Start a new conversation!";
pub const WELCOME_NOTICE: &str = "Ask anything to start a conversation.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Chat,
    Notebook,
}

/// A system line shown in the chat instead of a message bubble
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
}

/// Feedback shown under the settings form
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    pub message: String,
    pub success: bool,
}

/// State visible to UI panels
pub struct UiState {
    /// Displayed conversation
    pub messages: Vec<Message>,
    /// A completion request is outstanding
    pub busy: bool,
    pub status_text: String,
    pub notice: Option<Notice>,
    pub input_text: String,
    pub active_tab: Tab,
    pub show_settings: bool,
    /// Last settings reported by the store
    pub settings: Settings,
    /// Model field being edited
    pub model_input: String,
    /// Fixed-seed field being edited
    pub seed_input: String,
    pub settings_feedback: Option<Feedback>,
    /// Clear-history confirmation is showing
    pub confirm_clear: bool,
    pub notebook_text: String,
    /// New-document confirmation is showing
    pub confirm_new_document: bool,
}

impl UiState {
    pub fn new() -> Self {
        let settings = Settings::default();
        Self {
            messages: Vec::new(),
            busy: false,
            status_text: "Ready".to_string(),
            notice: Some(Notice {
                text: WELCOME_NOTICE.to_string(),
                is_error: false,
            }),
            input_text: String::new(),
            active_tab: Tab::Chat,
            show_settings: false,
            model_input: settings.model.clone(),
            seed_input: String::new(),
            settings,
            settings_feedback: None,
            confirm_clear: false,
            notebook_text: String::new(),
            confirm_new_document: false,
        }
    }

    /// Process events from the EventBus and update UI state
    pub fn process_events(&mut self, events: Vec<ChatEvent>) {
        for event in events {
            match event {
                ChatEvent::HistoryRestored { messages, settings } => {
                    if !messages.is_empty() {
                        self.notice = None;
                    }
                    self.messages = messages;
                    self.sync_settings(settings);
                }
                ChatEvent::MessageAppended { message } => {
                    if message.role == Role::Assistant {
                        self.busy = false;
                        self.status_text = "Ready".to_string();
                    }
                    self.notice = None;
                    self.messages.push(message);
                }
                ChatEvent::HistoryCleared => {
                    self.messages.clear();
                    self.notice = Some(Notice {
                        text: CLEARED_NOTICE.to_string(),
                        is_error: false,
                    });
                }
                ChatEvent::SettingsChanged { settings } => {
                    self.sync_settings(settings);
                    self.settings_feedback = Some(Feedback {
                        message: "Saved".to_string(),
                        success: true,
                    });
                }
                ChatEvent::RequestStarted { .. } => {
                    self.busy = true;
                    self.status_text = "Thinking...".to_string();
                }
                ChatEvent::RequestFailed { message } => {
                    self.busy = false;
                    self.status_text = format!("Error: {}", message);
                    self.notice = Some(Notice {
                        text: FALLBACK_REPLY.to_string(),
                        is_error: true,
                    });
                }
                ChatEvent::ValidationFailed { message } => {
                    self.settings_feedback = Some(Feedback {
                        message,
                        success: false,
                    });
                }
            }
        }
    }

    fn sync_settings(&mut self, settings: Settings) {
        self.model_input = settings.model.clone();
        if let Some(seed) = settings.fixed_seed {
            self.seed_input = seed.to_string();
        }
        self.settings = settings;
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Send is allowed for non-blank input while nothing is in flight
    pub fn can_send(&self) -> bool {
        !self.busy && !self.input_text.trim().is_empty()
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the fixed-seed field. Anything that is not an integer in
/// `0..=MAX_SEED` means "no fixed seed".
pub fn parse_seed(input: &str) -> Option<u64> {
    input
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|seed| *seed <= MAX_SEED)
}
