use crate::{
    config::Config,
    middleware::JwtVerifier,
    store::ChatStore,
    websocket::{PresenceRegistry, RoomRegistry},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    pub presence: PresenceRegistry,
    pub rooms: RoomRegistry,
    pub verifier: Arc<JwtVerifier>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn ChatStore>, verifier: JwtVerifier, config: Config) -> Self {
        Self {
            store,
            presence: PresenceRegistry::new(),
            rooms: RoomRegistry::new(),
            verifier: Arc::new(verifier),
            config: Arc::new(config),
        }
    }
}
