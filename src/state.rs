use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::RegistrationPolicy;
use crate::store::{EventStore, MemoryStore, PgStore, UserStore};

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub events: Arc<dyn EventStore>,
    pub tokens: TokenService,
    pub registration_policy: RegistrationPolicy,
}

impl AppState {
    pub fn postgres(store: PgStore, tokens: TokenService, policy: RegistrationPolicy) -> Self {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            events: store,
            tokens,
            registration_policy: policy,
        }
    }

    pub fn in_memory(tokens: TokenService, policy: RegistrationPolicy) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            events: store,
            tokens,
            registration_policy: policy,
        }
    }
}
