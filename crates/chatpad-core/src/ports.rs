//! Port traits at the hexagonal architecture boundary.
//!
//! These traits are defined here in `chatpad-core` (pure Rust).
//! Implementations live in `chatpad-platform` (browser adapters).
//! The core never imports platform code; it only depends on these traits.

use async_trait::async_trait;
use chatpad_types::Result;

// ─── Completion Port ─────────────────────────────────────────

/// One outbound request to the text-generation service
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Context transcript followed by the new user text
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub seed: u64,
}

impl CompletionRequest {
    /// `<base>/<encoded prompt>?model=..&temperature=..&seed=..`
    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/{}?model={}&temperature={}&seed={}",
            base_url.trim_end_matches('/'),
            urlencoding::encode(&self.prompt),
            urlencoding::encode(&self.model),
            self.temperature,
            self.seed,
        )
    }
}

#[async_trait(?Send)]
pub trait CompletionPort {
    /// Send the request and return the plain-text completion.
    /// Non-2xx statuses, transport failures and timeouts are errors.
    async fn complete(&self, req: &CompletionRequest) -> Result<String>;

    /// Name of this endpoint (for logging/debug)
    fn endpoint_name(&self) -> &str;
}

// ─── Storage Port ────────────────────────────────────────────

/// Synchronous string key-value store, shaped after browser `localStorage`.
pub trait StoragePort {
    /// Get a value by key
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Name of this backend (for logging/debug)
    fn backend_name(&self) -> &str;
}
