//! Conversation store. Owns the message log and the generation settings.
//!
//! Every mutation is written through to the [`StoragePort`] immediately and
//! announced on the [`EventBus`]. Storage failures never escape: they are
//! logged and the in-memory state stays authoritative.

use std::rc::Rc;

use chatpad_types::{
    ChatError, Result,
    config::{CONVERSATION_LOG_KEY, SETTINGS_KEY},
    event::ChatEvent,
    message::{Message, Role, MAX_SEED},
    settings::{Settings, SettingsPatch},
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::event_bus::EventBus;
use crate::ports::{CompletionRequest, StoragePort};

/// Messages replayed as context when none is configured (5 exchanges)
pub const DEFAULT_CONTEXT_WINDOW: usize = 10;

pub struct ConversationStore {
    log: Vec<Message>,
    settings: Settings,
    storage: Rc<dyn StoragePort>,
    event_bus: EventBus,
    context_window: usize,
    rng: StdRng,
    in_flight: bool,
}

impl ConversationStore {
    /// Empty log and default settings. Nothing is read from storage.
    pub fn new(storage: Rc<dyn StoragePort>, event_bus: EventBus) -> Self {
        Self {
            log: Vec::new(),
            settings: Settings::default(),
            storage,
            event_bus,
            context_window: DEFAULT_CONTEXT_WINDOW,
            rng: StdRng::from_entropy(),
            in_flight: false,
        }
    }

    /// Create a store and restore its state from storage.
    pub fn restore(storage: Rc<dyn StoragePort>, event_bus: EventBus) -> Self {
        let mut store = Self::new(storage, event_bus);
        store.load_from_persistence();
        store
    }

    pub fn with_context_window(mut self, messages: usize) -> Self {
        self.context_window = messages;
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.log
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Whether a completion request is outstanding
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    // ─── Log ─────────────────────────────────────────────────

    pub fn append_user_message(&mut self, text: &str) -> Result<&Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(self.reject("message must not be empty".to_string()));
        }
        Ok(self.push(Message::user(text)))
    }

    /// Append a reply stamped with the current model and temperature.
    pub fn append_assistant_message(&mut self, text: impl Into<String>, seed: u64) -> Result<&Message> {
        if seed > MAX_SEED {
            return Err(self.reject(format!("seed {} exceeds {}", seed, MAX_SEED)));
        }
        let message = Message::assistant(
            text,
            self.settings.model.clone(),
            self.settings.temperature,
            seed,
        );
        Ok(self.push(message))
    }

    fn push(&mut self, message: Message) -> &Message {
        self.log.push(message.clone());
        self.persist_log();
        self.event_bus.emit(ChatEvent::MessageAppended { message });
        &self.log[self.log.len() - 1]
    }

    /// Transcript of the last `context_window` messages, one
    /// `"<Role>: <content>"` line each, plus a trailing `"\nUser: "` prompt
    /// marker. Empty when the log is empty.
    pub fn build_context(&self) -> String {
        let start = self.log.len().saturating_sub(self.context_window);
        let mut context = String::new();
        for message in &self.log[start..] {
            context.push_str(&message.transcript_line());
            context.push('\n');
        }
        if !context.is_empty() {
            context.push('\n');
            context.push_str(Role::User.label());
            context.push_str(": ");
        }
        context
    }

    /// Empty the log. The caller confirms with the user beforehand.
    ///
    /// Fails with [`ChatError::Busy`] while a request is outstanding, since
    /// its reply would otherwise open the new log without a user turn.
    pub fn clear(&mut self) -> Result<()> {
        if self.in_flight {
            return Err(ChatError::Busy);
        }
        self.log.clear();
        self.persist_log();
        self.event_bus.emit(ChatEvent::HistoryCleared);
        log::info!("Conversation history cleared");
        Ok(())
    }

    // ─── Settings ────────────────────────────────────────────

    /// Draw the seed for the next request.
    ///
    /// A fixed seed is used only when random seeding is off and one is set;
    /// with random seeding off and no fixed seed, a random seed is drawn.
    pub fn next_seed(&mut self) -> u64 {
        match (self.settings.use_random_seed, self.settings.fixed_seed) {
            (false, Some(seed)) => seed,
            _ => self.rng.gen_range(0..=MAX_SEED),
        }
    }

    /// Merge `patch` into the settings. Rejected fields keep their previous
    /// value; the remaining fields are applied and persisted.
    pub fn update_settings(&mut self, patch: SettingsPatch) -> Result<()> {
        let before = self.settings.clone();
        let result = self.settings.apply(patch);

        if self.settings != before {
            self.persist_settings();
            self.event_bus.emit(ChatEvent::SettingsChanged {
                settings: self.settings.clone(),
            });
        }

        if let Err(ChatError::Validation(message)) = &result {
            log::warn!("Rejected settings update: {}", message);
            self.event_bus.emit(ChatEvent::ValidationFailed {
                message: message.clone(),
            });
        }
        result
    }

    // ─── Turns ───────────────────────────────────────────────

    /// Record the user's message and build the outbound request.
    ///
    /// The context covers only the messages before this one; the new text is
    /// appended after the trailing `User: ` marker instead of appearing twice
    /// in the prompt. Fails with
    /// [`ChatError::Busy`] while another request is outstanding.
    pub fn begin_turn(&mut self, text: &str) -> Result<CompletionRequest> {
        if self.in_flight {
            return Err(ChatError::Busy);
        }

        let context = self.build_context();
        let text = self.append_user_message(text)?.content.clone();
        let seed = self.next_seed();

        self.in_flight = true;
        self.event_bus.emit(ChatEvent::RequestStarted { seed });

        Ok(CompletionRequest {
            prompt: context + &text,
            model: self.settings.model.clone(),
            temperature: self.settings.temperature,
            seed,
        })
    }

    /// Apply the outcome of a request started by [`begin_turn`].
    /// The reply is stamped with the model, temperature and seed that were
    /// sent, whatever the settings are now. A failed request leaves the log
    /// untouched and returns the error.
    ///
    /// [`begin_turn`]: ConversationStore::begin_turn
    pub fn finish_turn(
        &mut self,
        req: &CompletionRequest,
        outcome: Result<String>,
    ) -> Result<Message> {
        self.in_flight = false;
        match outcome {
            Ok(text) => {
                let message =
                    Message::assistant(text, req.model.clone(), req.temperature, req.seed);
                Ok(self.push(message).clone())
            }
            Err(e) => {
                log::warn!("Completion request failed: {}", e);
                self.event_bus.emit(ChatEvent::RequestFailed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    // ─── Persistence ─────────────────────────────────────────

    /// Restore log and settings. Absent or malformed data falls back to an
    /// empty log and default settings.
    pub fn load_from_persistence(&mut self) {
        self.log = match self.read_log() {
            Ok(Some(messages)) => messages,
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("Discarding stored conversation log: {}", e);
                Vec::new()
            }
        };

        let mut settings = Settings::default();
        match self.read_settings() {
            Ok(Some(patch)) => {
                if let Err(e) = settings.apply(patch) {
                    log::warn!("Ignoring stored settings fields: {}", e);
                }
            }
            Ok(None) => {}
            Err(e) => log::warn!("Discarding stored settings: {}", e),
        }
        self.settings = settings;

        log::info!(
            "Restored {} messages from {}",
            self.log.len(),
            self.storage.backend_name()
        );
        self.event_bus.emit(ChatEvent::HistoryRestored {
            messages: self.log.clone(),
            settings: self.settings.clone(),
        });
    }

    pub fn save_to_persistence(&self) {
        self.persist_log();
        self.persist_settings();
    }

    fn read_log(&self) -> Result<Option<Vec<Message>>> {
        match self.storage.get(CONVERSATION_LOG_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn read_settings(&self) -> Result<Option<SettingsPatch>> {
        match self.storage.get(SETTINGS_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn persist_log(&self) {
        if let Err(e) = write_json(self.storage.as_ref(), CONVERSATION_LOG_KEY, &self.log) {
            log::warn!("Failed to save conversation log: {}", e);
        }
    }

    fn persist_settings(&self) {
        if let Err(e) = write_json(self.storage.as_ref(), SETTINGS_KEY, &self.settings) {
            log::warn!("Failed to save settings: {}", e);
        }
    }

    fn reject(&self, message: String) -> ChatError {
        self.event_bus.emit(ChatEvent::ValidationFailed {
            message: message.clone(),
        });
        ChatError::Validation(message)
    }
}

fn write_json<T: serde::Serialize + ?Sized>(
    storage: &dyn StoragePort,
    key: &str,
    value: &T,
) -> Result<()> {
    let json = serde_json::to_string(value)?;
    storage.set(key, &json)
}
