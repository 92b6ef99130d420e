//! Browser adapters for the `chatpad-core` ports.

pub mod storage;
pub mod completion;
pub mod export;

pub use completion::TextCompletionClient;
