//! Text-completion adapter for GET-style generation endpoints.
//!
//! The whole prompt travels in the URL path and the response body is the
//! plain-text completion. Uses browser `fetch()` via gloo-net, bounded by a
//! gloo-timers timeout that aborts the underlying fetch.

use async_trait::async_trait;
use futures::future::{self, Either};
use gloo_net::http::Request;
use gloo_timers::future::TimeoutFuture;
use web_sys::{AbortController, AbortSignal};

use chatpad_core::ports::{CompletionPort, CompletionRequest};
use chatpad_types::{config::CompletionConfig, ChatError, Result};

pub struct TextCompletionClient {
    config: CompletionConfig,
}

impl TextCompletionClient {
    pub fn new(config: CompletionConfig) -> Self {
        Self { config }
    }
}

#[async_trait(?Send)]
impl CompletionPort for TextCompletionClient {
    async fn complete(&self, req: &CompletionRequest) -> Result<String> {
        let url = req.url(&self.config.base_url);
        let timeout_ms = self.config.timeout_ms;

        let controller = AbortController::new()
            .map_err(|e| ChatError::JsInterop(format!("{:?}", e)))?;

        let fetch = Box::pin(fetch_text(url, controller.signal()));
        let timer = Box::pin(TimeoutFuture::new(timeout_ms));

        match future::select(fetch, timer).await {
            Either::Left((result, _)) => result,
            Either::Right(((), _)) => {
                controller.abort();
                log::warn!("Completion request timed out after {}ms", timeout_ms);
                Err(ChatError::Timeout(timeout_ms))
            }
        }
    }

    fn endpoint_name(&self) -> &str {
        &self.config.base_url
    }
}

async fn fetch_text(url: String, signal: AbortSignal) -> Result<String> {
    let response = Request::get(&url)
        .abort_signal(Some(&signal))
        .send()
        .await
        .map_err(|e| ChatError::Network(e.to_string()))?;

    if !response.ok() {
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        return Err(ChatError::Network(format!("HTTP {}: {}", status, text)));
    }

    response
        .text()
        .await
        .map_err(|e| ChatError::Network(e.to_string()))
}
