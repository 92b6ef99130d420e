//! Notebook document: a single text body persisted under `notebook-content`.

use std::rc::Rc;

use chatpad_types::config::NOTEBOOK_KEY;

use crate::ports::StoragePort;

/// Body of a fresh document. Never restored from storage.
pub const PLACEHOLDER: &str = "<p>Start typing here...</p>";

pub struct NotebookDocument {
    content: String,
    storage: Rc<dyn StoragePort>,
}

impl NotebookDocument {
    /// Open the stored document, or an empty one if nothing (or only the
    /// placeholder) was saved.
    pub fn load(storage: Rc<dyn StoragePort>) -> Self {
        let content = match storage.get(NOTEBOOK_KEY) {
            Ok(Some(saved)) if saved != PLACEHOLDER => saved,
            Ok(_) => String::new(),
            Err(e) => {
                log::warn!("Failed to load notebook: {}", e);
                String::new()
            }
        };
        Self { content, storage }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn edit(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.save();
    }

    /// Replace the body with the contents of an opened file.
    pub fn import(&mut self, content: impl Into<String>) {
        self.edit(content);
        log::info!("Notebook imported ({} bytes)", self.content.len());
    }

    /// Start over. The caller confirms with the user beforehand.
    pub fn new_document(&mut self) {
        self.content.clear();
        if let Err(e) = self.storage.set(NOTEBOOK_KEY, PLACEHOLDER) {
            log::warn!("Notebook autosave failed: {}", e);
        }
    }

    fn save(&self) {
        if let Err(e) = self.storage.set(NOTEBOOK_KEY, &self.content) {
            log::warn!("Notebook autosave failed: {}", e);
        }
    }
}
