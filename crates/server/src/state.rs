//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::ai::{AiClient, AiError};
use crate::config::ServerConfig;
use crate::services::TokenService;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    tokens: TokenService,
    ai: Option<AiClient>,
}

impl AppState {
    /// Build the state from configuration and a pool.
    ///
    /// # Errors
    ///
    /// Returns `AiError::Http` if the AI service is configured but its HTTP
    /// client cannot be built.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, AiError> {
        let tokens = TokenService::new(&config.auth);
        let ai = config.ai.as_ref().map(AiClient::new).transpose()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                ai,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// The AI client, if configured.
    #[must_use]
    pub fn ai(&self) -> Option<&AiClient> {
        self.inner.ai.as_ref()
    }
}
