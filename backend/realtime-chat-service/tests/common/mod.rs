#![allow(dead_code)]

use std::sync::Arc;

use realtime_chat_service::config::Config;
use realtime_chat_service::middleware::JwtVerifier;
use realtime_chat_service::models::{Conversation, UserSummary};
use realtime_chat_service::services::{ConversationService, PresenceService};
use realtime_chat_service::state::AppState;
use realtime_chat_service::store::{ChatStore, MemoryStore};
use realtime_chat_service::websocket::handlers::ConnectionContext;
use realtime_chat_service::websocket::ConnectionId;
use serde_json::Value;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret";

pub struct Harness {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::with_store(store.clone(), store)
    }

    /// Serve the services from `service_store`, which wraps `store`; users
    /// and conversations are seeded through `store`.
    pub fn with_store(service_store: Arc<dyn ChatStore>, store: Arc<MemoryStore>) -> Self {
        let state = AppState::new(
            service_store,
            JwtVerifier::from_secret(TEST_SECRET),
            Config::for_tests(TEST_SECRET),
        );
        Self { state, store }
    }

    pub async fn user(&self, name: &str) -> UserSummary {
        let user = UserSummary {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@roommate.test", name.to_lowercase()),
        };
        self.store.insert_user(user.clone()).await;
        user
    }

    pub async fn conversation(&self, a: Uuid, b: Uuid) -> Conversation {
        ConversationService::get_or_create(self.store.as_ref(), a, b)
            .await
            .unwrap()
    }

    /// A connection context wired to a receiver, not yet announced
    pub fn client(&self, user_id: Uuid) -> Client {
        let (tx, rx) = unbounded_channel();
        Client {
            ctx: ConnectionContext::new(ConnectionId::new(), user_id, tx, self.state.clone()),
            rx,
        }
    }

    /// A connection that went through the connect path
    pub async fn connect(&self, user_id: Uuid) -> Client {
        let client = self.client(user_id);
        PresenceService::connect(&client.ctx).await.unwrap();
        client
    }

    pub fn token(&self, user_id: Uuid) -> String {
        self.state
            .verifier
            .issue(user_id, chrono::Duration::minutes(10))
            .unwrap()
    }
}

pub struct Client {
    pub ctx: ConnectionContext,
    pub rx: UnboundedReceiver<String>,
}

impl Client {
    /// Everything delivered so far, decoded
    pub fn drain(&mut self) -> Vec<Value> {
        let mut events = Vec::new();
        while let Ok(text) = self.rx.try_recv() {
            events.push(serde_json::from_str(&text).unwrap());
        }
        events
    }

    /// Delivered events named `event`, discarding the rest
    pub fn take(&mut self, event: &str) -> Vec<Value> {
        self.drain()
            .into_iter()
            .filter(|e| e["event"] == event)
            .collect()
    }
}
