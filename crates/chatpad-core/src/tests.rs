#[cfg(test)]
mod tests {
    use crate::event_bus::EventBus;
    use crate::notebook::{NotebookDocument, PLACEHOLDER};
    use crate::ports::*;
    use crate::store::ConversationStore;
    use crate::turn::send_message;
    use chatpad_types::config::{CONVERSATION_LOG_KEY, NOTEBOOK_KEY, SETTINGS_KEY};
    use chatpad_types::event::ChatEvent;
    use chatpad_types::message::*;
    use chatpad_types::settings::*;
    use chatpad_types::{ChatError, Result};

    use async_trait::async_trait;
    use futures::executor::block_on;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;

    // ─── Mocks ───────────────────────────────────────────────

    struct MockStorage {
        data: RefCell<HashMap<String, String>>,
        fail: Cell<bool>,
    }

    impl MockStorage {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                data: RefCell::new(HashMap::new()),
                fail: Cell::new(false),
            })
        }

        fn raw(&self, key: &str) -> Option<String> {
            self.data.borrow().get(key).cloned()
        }

        fn put(&self, key: &str, value: &str) {
            self.data.borrow_mut().insert(key.to_string(), value.to_string());
        }
    }

    impl StoragePort for MockStorage {
        fn get(&self, key: &str) -> Result<Option<String>> {
            if self.fail.get() {
                return Err(ChatError::Storage("quota exceeded".to_string()));
            }
            Ok(self.data.borrow().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            if self.fail.get() {
                return Err(ChatError::Storage("quota exceeded".to_string()));
            }
            self.data.borrow_mut().insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn backend_name(&self) -> &str {
            "mock"
        }
    }

    /// Completion service returning a canned outcome and recording requests
    struct MockCompletion {
        outcome: Result<String>,
        requests: RefCell<Vec<CompletionRequest>>,
    }

    impl MockCompletion {
        fn replying(text: &str) -> Self {
            Self {
                outcome: Ok(text.to_string()),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn failing(err: ChatError) -> Self {
            Self {
                outcome: Err(err),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    #[async_trait(?Send)]
    impl CompletionPort for MockCompletion {
        async fn complete(&self, req: &CompletionRequest) -> Result<String> {
            self.requests.borrow_mut().push(req.clone());
            self.outcome.clone()
        }

        fn endpoint_name(&self) -> &str {
            "mock"
        }
    }

    fn store_with(storage: &Rc<MockStorage>) -> (ConversationStore, EventBus) {
        let bus = EventBus::new();
        let store = ConversationStore::new(storage.clone(), bus.clone());
        (store, bus)
    }

    // ─── EventBus Tests ──────────────────────────────────────

    #[test]
    fn test_event_bus_emit_and_drain() {
        let bus = EventBus::new();
        assert!(!bus.has_pending());
        bus.emit(ChatEvent::HistoryCleared);
        bus.emit(ChatEvent::RequestStarted { seed: 1 });
        assert!(bus.has_pending());
        assert_eq!(bus.drain().len(), 2);
        assert!(!bus.has_pending());
    }

    #[test]
    fn test_event_bus_clone_shares_state() {
        let bus1 = EventBus::new();
        let bus2 = bus1.clone();
        bus1.emit(ChatEvent::HistoryCleared);
        assert!(bus2.has_pending());
        assert_eq!(bus2.drain().len(), 1);
        assert!(!bus1.has_pending());
    }

    // ─── Log Tests ───────────────────────────────────────────

    #[test]
    fn test_append_preserves_call_order() {
        let storage = MockStorage::new();
        let (mut store, _) = store_with(&storage);

        store.append_user_message("one").unwrap();
        store.append_assistant_message("two", 1).unwrap();
        store.append_user_message("three").unwrap();
        store.append_assistant_message("four", 2).unwrap();

        let contents: Vec<&str> = store.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three", "four"]);
    }

    #[test]
    fn test_append_user_trims_and_rejects_blank() {
        let storage = MockStorage::new();
        let (mut store, bus) = store_with(&storage);

        let err = store.append_user_message("   \n\t").unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
        assert!(store.messages().is_empty());
        assert!(storage.raw(CONVERSATION_LOG_KEY).is_none());
        assert!(bus
            .drain()
            .iter()
            .any(|e| matches!(e, ChatEvent::ValidationFailed { .. })));

        let msg = store.append_user_message("  hello  ").unwrap();
        assert_eq!(msg.content, "hello");
        assert_eq!(msg.role, Role::User);
    }

    #[test]
    fn test_assistant_message_uses_current_settings() {
        let storage = MockStorage::new();
        let (mut store, _) = store_with(&storage);
        store
            .update_settings(SettingsPatch::default().model("mistral").temperature(0.3))
            .unwrap();

        let msg = store.append_assistant_message("reply", 77).unwrap();
        assert_eq!(msg.model.as_deref(), Some("mistral"));
        assert_eq!(msg.temperature, Some(0.3));
        assert_eq!(msg.seed, Some(77));
    }

    #[test]
    fn test_append_is_written_through() {
        let storage = MockStorage::new();
        let (mut store, bus) = store_with(&storage);

        store.append_user_message("persist me").unwrap();
        let raw = storage.raw(CONVERSATION_LOG_KEY).unwrap();
        assert!(raw.contains("persist me"));

        let events = bus.drain();
        assert!(matches!(events.last(), Some(ChatEvent::MessageAppended { .. })));
    }

    // ─── Context Tests ───────────────────────────────────────

    #[test]
    fn test_build_context_empty_log() {
        let storage = MockStorage::new();
        let (store, _) = store_with(&storage);
        assert_eq!(store.build_context(), "");
    }

    #[test]
    fn test_build_context_format() {
        let storage = MockStorage::new();
        let (mut store, _) = store_with(&storage);
        store.append_user_message("hi").unwrap();
        store.append_assistant_message("hello", 5).unwrap();

        assert_eq!(store.build_context(), "User: hi\nAssistant: hello\n\nUser: ");
    }

    #[test]
    fn test_build_context_keeps_last_ten() {
        let storage = MockStorage::new();
        let (mut store, _) = store_with(&storage);
        for i in 0..25 {
            if i % 2 == 0 {
                store.append_user_message(&format!("m{}", i)).unwrap();
            } else {
                store.append_assistant_message(format!("m{}", i), i).unwrap();
            }
        }

        let context = store.build_context();
        let lines: Vec<&str> = context.lines().filter(|l| l.contains(": m")).collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "Assistant: m15");
        assert_eq!(lines[9], "User: m24");
        assert!(!context.contains("m14"));
    }

    #[test]
    fn test_build_context_custom_window() {
        let storage = MockStorage::new();
        let bus = EventBus::new();
        let mut store = ConversationStore::new(storage.clone(), bus).with_context_window(2);
        store.append_user_message("a").unwrap();
        store.append_user_message("b").unwrap();
        store.append_user_message("c").unwrap();
        assert_eq!(store.build_context(), "User: b\nUser: c\n\nUser: ");
    }

    // ─── Seed Tests ──────────────────────────────────────────

    #[test]
    fn test_next_seed_fixed() {
        let storage = MockStorage::new();
        let (mut store, _) = store_with(&storage);
        store
            .update_settings(SettingsPatch::default().use_random_seed(false).fixed_seed(Some(42)))
            .unwrap();
        for _ in 0..20 {
            assert_eq!(store.next_seed(), 42);
        }
    }

    #[test]
    fn test_next_seed_random_in_range() {
        let storage = MockStorage::new();
        let (mut store, _) = store_with(&storage);
        for _ in 0..1000 {
            assert!(store.next_seed() <= MAX_SEED);
        }
    }

    #[test]
    fn test_next_seed_random_ignores_fixed_seed() {
        let storage = MockStorage::new();
        let (mut store, _) = store_with(&storage);
        store
            .update_settings(SettingsPatch::default().fixed_seed(Some(42)))
            .unwrap();
        assert!(store.settings().use_random_seed);
        let draws: Vec<u64> = (0..10).map(|_| store.next_seed()).collect();
        assert!(draws.iter().all(|s| *s <= MAX_SEED));
        assert!(draws.iter().any(|s| *s != 42));
    }

    #[test]
    fn test_next_seed_falls_back_to_random_without_fixed_seed() {
        let storage = MockStorage::new();
        let (mut store, _) = store_with(&storage);
        store
            .update_settings(SettingsPatch::default().use_random_seed(false))
            .unwrap();
        assert!(store.settings().fixed_seed.is_none());
        assert!(store.next_seed() <= MAX_SEED);
    }

    // ─── Settings Tests ──────────────────────────────────────

    #[test]
    fn test_update_settings_rejects_temperature() {
        let storage = MockStorage::new();
        let (mut store, bus) = store_with(&storage);
        let before = store.settings().temperature;

        let err = store
            .update_settings(SettingsPatch::default().temperature(1.5))
            .unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
        assert_eq!(store.settings().temperature, before);

        let events = bus.drain();
        assert!(events.iter().any(|e| matches!(e, ChatEvent::ValidationFailed { .. })));
        assert!(!events.iter().any(|e| matches!(e, ChatEvent::SettingsChanged { .. })));
    }

    #[test]
    fn test_update_settings_rejects_empty_model() {
        let storage = MockStorage::new();
        let (mut store, _) = store_with(&storage);
        assert!(store.update_settings(SettingsPatch::default().model("")).is_err());
        assert_eq!(store.settings().model, DEFAULT_MODEL);
    }

    #[test]
    fn test_update_settings_persists() {
        let storage = MockStorage::new();
        let (mut store, _) = store_with(&storage);
        store
            .update_settings(SettingsPatch::default().model("llama").fixed_seed(Some(9)))
            .unwrap();

        let raw = storage.raw(SETTINGS_KEY).unwrap();
        let saved: Settings = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved.model, "llama");
        assert_eq!(saved.fixed_seed, Some(9));
    }

    // ─── Persistence Tests ───────────────────────────────────

    #[test]
    fn test_clear_then_load_is_empty() {
        let storage = MockStorage::new();
        let (mut store, _) = store_with(&storage);
        store.append_user_message("a").unwrap();
        store.append_assistant_message("b", 3).unwrap();

        store.clear().unwrap();
        assert!(store.messages().is_empty());
        store.load_from_persistence();
        assert!(store.messages().is_empty());
    }

    #[test]
    fn test_persist_and_restore_three_messages() {
        let storage = MockStorage::new();
        let (mut store, _) = store_with(&storage);
        store.append_user_message("question").unwrap();
        store.append_assistant_message("answer", 123_456).unwrap();
        store.append_user_message("follow-up").unwrap();
        let original = store.messages().to_vec();

        let restored = ConversationStore::restore(storage.clone(), EventBus::new());
        assert_eq!(restored.messages().len(), 3);
        assert_eq!(restored.messages(), original.as_slice());
    }

    #[test]
    fn test_restore_settings() {
        let storage = MockStorage::new();
        let (mut store, _) = store_with(&storage);
        store
            .update_settings(
                SettingsPatch::default()
                    .model("mistral")
                    .temperature(0.4)
                    .use_random_seed(false)
                    .fixed_seed(Some(8)),
            )
            .unwrap();

        let restored = ConversationStore::restore(storage.clone(), EventBus::new());
        assert_eq!(restored.settings(), store.settings());
    }

    #[test]
    fn test_restore_emits_history_restored() {
        let storage = MockStorage::new();
        let (mut store, _) = store_with(&storage);
        store.append_user_message("x").unwrap();

        let bus = EventBus::new();
        let _ = ConversationStore::restore(storage.clone(), bus.clone());
        match bus.drain().as_slice() {
            [ChatEvent::HistoryRestored { messages, .. }] => assert_eq!(messages.len(), 1),
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_log_falls_back_to_empty() {
        let storage = MockStorage::new();
        storage.put(CONVERSATION_LOG_KEY, "{not json");
        let store = ConversationStore::restore(storage.clone(), EventBus::new());
        assert!(store.messages().is_empty());

        // Structurally valid JSON but a user record with a seed
        storage.put(
            CONVERSATION_LOG_KEY,
            r#"[{"role":"user","content":"x","createdAt":"2026-01-01T00:00:00Z","model":null,"temperature":null,"seed":1}]"#,
        );
        let store = ConversationStore::restore(storage.clone(), EventBus::new());
        assert!(store.messages().is_empty());
    }

    #[test]
    fn test_malformed_settings_fall_back_to_defaults() {
        let storage = MockStorage::new();
        storage.put(SETTINGS_KEY, "[1, 2");
        let store = ConversationStore::restore(storage.clone(), EventBus::new());
        assert_eq!(store.settings(), &Settings::default());
    }

    #[test]
    fn test_stored_settings_merge_field_by_field() {
        let storage = MockStorage::new();
        storage.put(
            SETTINGS_KEY,
            r#"{"model":"mistral","temperature":3.0,"useRandomSeed":false,"fixedSeed":5}"#,
        );
        let store = ConversationStore::restore(storage.clone(), EventBus::new());
        assert_eq!(store.settings().model, "mistral");
        assert_eq!(store.settings().temperature, DEFAULT_TEMPERATURE);
        assert!(!store.settings().use_random_seed);
        assert_eq!(store.settings().fixed_seed, Some(5));
    }

    #[test]
    fn test_storage_failure_is_absorbed() {
        let storage = MockStorage::new();
        storage.fail.set(true);

        let mut store = ConversationStore::restore(storage.clone(), EventBus::new());
        assert!(store.messages().is_empty());

        store.append_user_message("still recorded").unwrap();
        store.clear().unwrap();
        store.update_settings(SettingsPatch::default().temperature(0.1)).unwrap();
        store.save_to_persistence();
        assert_eq!(store.settings().temperature, 0.1);
    }

    // ─── Turn Tests ──────────────────────────────────────────

    #[test]
    fn test_send_message_success() {
        let storage = MockStorage::new();
        let (store, bus) = store_with(&storage);
        let store = RefCell::new(store);
        let completion = MockCompletion::replying("Hello from the model");

        let reply = block_on(send_message(&store, "Hi", &completion)).unwrap();
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, "Hello from the model");

        let store = store.borrow();
        assert_eq!(store.messages().len(), 2);
        assert_eq!(store.messages()[0].content, "Hi");
        assert!(!store.is_busy());

        let sent = completion.requests.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].prompt, "Hi");
        assert_eq!(reply.seed, Some(sent[0].seed));

        let events = bus.drain();
        assert!(events.iter().any(|e| matches!(e, ChatEvent::RequestStarted { .. })));
    }

    #[test]
    fn test_send_message_prompt_includes_prior_context() {
        let storage = MockStorage::new();
        let (store, _) = store_with(&storage);
        let store = RefCell::new(store);
        let completion = MockCompletion::replying("hello");

        block_on(send_message(&store, "hi", &completion)).unwrap();
        block_on(send_message(&store, "next", &completion)).unwrap();

        let sent = completion.requests.borrow();
        assert_eq!(sent[1].prompt, "User: hi\nAssistant: hello\n\nUser: next");
        assert_eq!(store.borrow().messages().len(), 4);
    }

    #[test]
    fn test_send_message_uses_fixed_seed_and_settings() {
        let storage = MockStorage::new();
        let (mut store, _) = store_with(&storage);
        store
            .update_settings(
                SettingsPatch::default()
                    .model("mistral")
                    .temperature(0.2)
                    .use_random_seed(false)
                    .fixed_seed(Some(42)),
            )
            .unwrap();
        let store = RefCell::new(store);
        let completion = MockCompletion::replying("ok");

        let reply = block_on(send_message(&store, "q", &completion)).unwrap();
        let sent = completion.requests.borrow();
        assert_eq!(sent[0].seed, 42);
        assert_eq!(sent[0].model, "mistral");
        assert_eq!(sent[0].temperature, 0.2);
        assert_eq!(reply.seed, Some(42));
    }

    #[test]
    fn test_send_message_network_failure() {
        let storage = MockStorage::new();
        let (store, bus) = store_with(&storage);
        let store = RefCell::new(store);
        let completion = MockCompletion::failing(ChatError::Network("HTTP 503".to_string()));

        let err = block_on(send_message(&store, "Hi", &completion)).unwrap_err();
        assert!(err.is_network());

        let store = store.borrow();
        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.messages()[0].role, Role::User);
        assert!(!store.is_busy());

        let events = bus.drain();
        assert!(events.iter().any(|e| matches!(e, ChatEvent::RequestFailed { .. })));
    }

    #[test]
    fn test_send_message_timeout_is_network_failure() {
        let storage = MockStorage::new();
        let (store, _) = store_with(&storage);
        let store = RefCell::new(store);
        let completion = MockCompletion::failing(ChatError::Timeout(60_000));

        let err = block_on(send_message(&store, "Hi", &completion)).unwrap_err();
        assert!(err.is_network());
        assert_eq!(store.borrow().messages().len(), 1);
    }

    #[test]
    fn test_send_message_blank_is_not_sent() {
        let storage = MockStorage::new();
        let (store, _) = store_with(&storage);
        let store = RefCell::new(store);
        let completion = MockCompletion::replying("never");

        let err = block_on(send_message(&store, "   ", &completion)).unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
        assert!(completion.requests.borrow().is_empty());
        assert!(!store.borrow().is_busy());
    }

    #[test]
    fn test_begin_turn_rejects_second_request() {
        let storage = MockStorage::new();
        let (mut store, _) = store_with(&storage);

        let req = store.begin_turn("first").unwrap();
        assert!(store.is_busy());
        assert_eq!(store.begin_turn("second").unwrap_err(), ChatError::Busy);
        assert_eq!(store.messages().len(), 1);

        store.finish_turn(&req, Ok("done".to_string())).unwrap();
        assert!(!store.is_busy());
        assert!(store.begin_turn("second").is_ok());
    }

    #[test]
    fn test_reply_keeps_settings_that_were_sent() {
        let storage = MockStorage::new();
        let (mut store, _) = store_with(&storage);

        let req = store.begin_turn("hi").unwrap();
        store
            .update_settings(SettingsPatch::default().model("mistral").temperature(0.1))
            .unwrap();
        let reply = store.finish_turn(&req, Ok("hello".to_string())).unwrap();

        assert_eq!(reply.model.as_deref(), Some("gpt-4"));
        assert_eq!(reply.temperature, Some(0.7));
        assert_eq!(reply.seed, Some(req.seed));
        // The next turn picks up the new settings
        assert_eq!(store.begin_turn("again").unwrap().model, "mistral");
    }

    #[test]
    fn test_clear_rejected_while_in_flight() {
        let storage = MockStorage::new();
        let (mut store, bus) = store_with(&storage);

        let req = store.begin_turn("hi").unwrap();
        bus.drain();
        assert_eq!(store.clear().unwrap_err(), ChatError::Busy);
        assert!(!bus.drain().iter().any(|e| matches!(e, ChatEvent::HistoryCleared)));

        store.finish_turn(&req, Ok("reply".to_string())).unwrap();
        let roles: Vec<Role> = store.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(store.build_context(), "User: hi\nAssistant: reply\n\nUser: ");

        store.clear().unwrap();
        assert!(store.messages().is_empty());
    }

    // ─── CompletionRequest Tests ─────────────────────────────

    #[test]
    fn test_completion_request_url() {
        let req = CompletionRequest {
            prompt: "User: hi\n\nUser: what's 2+2?".to_string(),
            model: "gpt-4".to_string(),
            temperature: 0.7,
            seed: 42,
        };
        let url = req.url("https://text.pollinations.ai/");
        assert_eq!(
            url,
            "https://text.pollinations.ai/User%3A%20hi%0A%0AUser%3A%20what%27s%202%2B2%3F?model=gpt-4&temperature=0.7&seed=42"
        );
    }

    #[test]
    fn test_completion_request_url_encodes_model() {
        let req = CompletionRequest {
            prompt: "x".to_string(),
            model: "a b&c".to_string(),
            temperature: 1.0,
            seed: 0,
        };
        assert!(req.url("http://h").contains("model=a%20b%26c&temperature=1&seed=0"));
    }

    // ─── Notebook Tests ──────────────────────────────────────

    #[test]
    fn test_notebook_starts_empty() {
        let storage = MockStorage::new();
        let doc = NotebookDocument::load(storage.clone());
        assert_eq!(doc.content(), "");
    }

    #[test]
    fn test_notebook_restores_saved_body() {
        let storage = MockStorage::new();
        storage.put(NOTEBOOK_KEY, "<p>My notes</p>");
        let doc = NotebookDocument::load(storage.clone());
        assert_eq!(doc.content(), "<p>My notes</p>");
    }

    #[test]
    fn test_notebook_ignores_placeholder() {
        let storage = MockStorage::new();
        storage.put(NOTEBOOK_KEY, PLACEHOLDER);
        let doc = NotebookDocument::load(storage.clone());
        assert_eq!(doc.content(), "");
    }

    #[test]
    fn test_notebook_edit_writes_through() {
        let storage = MockStorage::new();
        let mut doc = NotebookDocument::load(storage.clone());
        doc.edit("draft");
        assert_eq!(storage.raw(NOTEBOOK_KEY).as_deref(), Some("draft"));
        doc.import("<h1>Imported</h1>");
        assert_eq!(storage.raw(NOTEBOOK_KEY).as_deref(), Some("<h1>Imported</h1>"));
    }

    #[test]
    fn test_notebook_new_document_resets() {
        let storage = MockStorage::new();
        let mut doc = NotebookDocument::load(storage.clone());
        doc.edit("old text");
        doc.new_document();
        assert_eq!(doc.content(), "");
        assert_eq!(storage.raw(NOTEBOOK_KEY).as_deref(), Some(PLACEHOLDER));

        let reopened = NotebookDocument::load(storage.clone());
        assert_eq!(reopened.content(), "");
    }

    #[test]
    fn test_notebook_storage_failure_is_absorbed() {
        let storage = MockStorage::new();
        storage.fail.set(true);
        let mut doc = NotebookDocument::load(storage.clone());
        doc.edit("kept in memory");
        assert_eq!(doc.content(), "kept in memory");
    }
}
