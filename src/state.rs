//! Shared server state

use std::sync::Arc;

use crate::auth::IdentityProvider;
use crate::config::LimitsConfig;
use crate::db::Database;
use crate::llm::LlmClient;
use crate::ratelimit::RateLimiter;

/// Everything a request handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub llm: Arc<LlmClient>,
    /// `None` when no identity provider is configured; authenticated
    /// routes then answer 500.
    pub identity: Option<Arc<dyn IdentityProvider>>,
    pub limits: Arc<Limiters>,
}

/// The process-local request limiters
pub struct Limiters {
    /// Every route, keyed by client address
    pub global: RateLimiter,
    /// Model-backed room routes, keyed by user
    pub ai: RateLimiter,
    /// Room creation, keyed by user
    pub room_creation: RateLimiter,
}

impl Limiters {
    pub fn from_config(config: &LimitsConfig) -> Self {
        Self {
            global: RateLimiter::per_minute(config.requests_per_minute),
            ai: RateLimiter::per_minute(config.ai_requests_per_minute),
            room_creation: RateLimiter::per_hour(config.rooms_per_hour),
        }
    }

    pub fn prune(&self) {
        self.global.prune();
        self.ai.prune();
        self.room_creation.prune();
    }
}

impl AppState {
    pub fn new(
        db: Arc<Database>,
        llm: Arc<LlmClient>,
        identity: Option<Arc<dyn IdentityProvider>>,
        limits: &LimitsConfig,
    ) -> Self {
        Self {
            db,
            llm,
            identity,
            limits: Arc::new(Limiters::from_config(limits)),
        }
    }
}
