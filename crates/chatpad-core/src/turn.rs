//! One chat turn: record the user's text, call the completion service,
//! record the reply.
//!
//! The store borrow is released before the request is awaited so the UI can
//! keep reading the store while the request is outstanding.

use std::cell::RefCell;

use chatpad_types::{message::Message, Result};

use crate::ports::CompletionPort;
use crate::store::ConversationStore;

/// Run a full turn and return the assistant reply.
///
/// Validation and [`Busy`](chatpad_types::ChatError::Busy) errors are returned
/// before anything is sent. Request failures are returned once, without retry,
/// and leave only the user message in the log.
pub async fn send_message(
    store: &RefCell<ConversationStore>,
    text: &str,
    completion: &dyn CompletionPort,
) -> Result<Message> {
    let request = store.borrow_mut().begin_turn(text)?;
    log::debug!(
        "Dispatching completion to {} (model={}, seed={})",
        completion.endpoint_name(),
        request.model,
        request.seed
    );

    let outcome = completion.complete(&request).await;
    store.borrow_mut().finish_turn(&request, outcome)
}
