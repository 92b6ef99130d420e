use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::settings::Settings;

/// Events emitted by the conversation store.
/// UI subscribes to these for reactive updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChatEvent {
    /// Log and settings were restored from storage
    HistoryRestored { messages: Vec<Message>, settings: Settings },

    /// A message was appended to the log
    MessageAppended { message: Message },

    /// The log was emptied
    HistoryCleared,

    /// Settings changed (the full, merged value)
    SettingsChanged { settings: Settings },

    /// A completion request was dispatched
    RequestStarted { seed: u64 },

    /// The completion request failed; no reply was recorded
    RequestFailed { message: String },

    /// A store operation rejected its input
    ValidationFailed { message: String },
}
