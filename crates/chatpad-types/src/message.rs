use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Largest seed the generation service accepts.
pub const MAX_SEED: u64 = 999_999_999_999_999;

/// Role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label used when rendering the role into a context transcript
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// A single message in the conversation log.
///
/// `model`, `temperature` and `seed` are set for assistant messages and
/// absent for user messages. The constructors uphold this and deserialization
/// rejects records that break it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "MessageRecord")]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub seed: Option<u64>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
            created_at: Utc::now(),
            model: None,
            temperature: None,
            seed: None,
        }
    }

    pub fn assistant(
        text: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        seed: u64,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
            created_at: Utc::now(),
            model: Some(model.into()),
            temperature: Some(temperature),
            seed: Some(seed),
        }
    }

    /// One transcript line: `"<RoleLabel>: <content>"`
    pub fn transcript_line(&self) -> String {
        format!("{}: {}", self.role.label(), self.content)
    }

    /// Caption shown under a message bubble.
    /// `HH:MM` for user messages, `HH:MM • model • T=0.7 • Seed=42` for replies.
    pub fn info_line(&self) -> String {
        let time = self.created_at.with_timezone(&Local).format("%H:%M");
        match (&self.model, self.temperature, self.seed) {
            (Some(model), Some(temperature), Some(seed)) => {
                format!("{} • {} • T={} • Seed={}", time, model, temperature, seed)
            }
            _ => time.to_string(),
        }
    }
}

/// Wire form of a message, validated into [`Message`] on the way in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageRecord {
    role: Role,
    content: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    seed: Option<u64>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = String;

    fn try_from(rec: MessageRecord) -> Result<Self, Self::Error> {
        match rec.role {
            Role::User => {
                if rec.model.is_some() || rec.temperature.is_some() || rec.seed.is_some() {
                    return Err("user message carries generation metadata".to_string());
                }
            }
            Role::Assistant => {
                let temperature = rec
                    .temperature
                    .ok_or_else(|| "assistant message without temperature".to_string())?;
                if !(0.0..=1.0).contains(&temperature) {
                    return Err(format!("temperature {} out of range", temperature));
                }
                let seed = rec
                    .seed
                    .ok_or_else(|| "assistant message without seed".to_string())?;
                if seed > MAX_SEED {
                    return Err(format!("seed {} out of range", seed));
                }
                if rec.model.is_none() {
                    return Err("assistant message without model".to_string());
                }
            }
        }

        Ok(Self {
            role: rec.role,
            content: rec.content,
            created_at: rec.created_at,
            model: rec.model,
            temperature: rec.temperature,
            seed: rec.seed,
        })
    }
}
