use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ChatError;
use crate::message::MAX_SEED;

pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// User-facing generation settings, persisted under `conversation-settings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub model: String,
    pub temperature: f32,
    pub use_random_seed: bool,
    /// Only consulted when `use_random_seed` is false
    pub fixed_seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            use_random_seed: true,
            fixed_seed: None,
        }
    }
}

impl Settings {
    /// Merge the supplied fields. Valid fields are applied even when others
    /// are rejected; rejected fields keep their prior value and are named in
    /// the returned validation error.
    pub fn apply(&mut self, patch: SettingsPatch) -> Result<(), ChatError> {
        let mut rejected = Vec::new();

        if let Some(model) = patch.model {
            let model = model.trim();
            if model.is_empty() {
                rejected.push("model must not be empty".to_string());
            } else {
                self.model = model.to_string();
            }
        }

        if let Some(temperature) = patch.temperature {
            if temperature.is_finite() && (0.0..=1.0).contains(&temperature) {
                self.temperature = temperature;
            } else {
                rejected.push(format!("temperature {} is outside [0, 1]", temperature));
            }
        }

        if let Some(use_random_seed) = patch.use_random_seed {
            self.use_random_seed = use_random_seed;
        }

        match patch.fixed_seed {
            Some(Some(seed)) if seed > MAX_SEED => {
                rejected.push(format!("seed {} exceeds {}", seed, MAX_SEED));
            }
            Some(seed) => self.fixed_seed = seed,
            None => {}
        }

        if rejected.is_empty() {
            Ok(())
        } else {
            Err(ChatError::Validation(rejected.join("; ")))
        }
    }
}

/// Partial settings update. Absent fields are left untouched.
///
/// `fixed_seed` is tri-state: `None` leaves it, `Some(None)` unsets it,
/// `Some(Some(n))` sets it. The same shape deserializes stored settings, where
/// a missing key is "leave" and `null` is "unset".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub use_random_seed: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub fixed_seed: Option<Option<u64>>,
}

impl SettingsPatch {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn use_random_seed(mut self, on: bool) -> Self {
        self.use_random_seed = Some(on);
        self
    }

    pub fn fixed_seed(mut self, seed: Option<u64>) -> Self {
        self.fixed_seed = Some(seed);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.model.is_none()
            && self.temperature.is_none()
            && self.use_random_seed.is_none()
            && self.fixed_seed.is_none()
    }
}

fn present<'de, D>(de: D) -> Result<Option<Option<u64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<u64>::deserialize(de).map(Some)
}
