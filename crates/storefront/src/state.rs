//! Application state shared across handlers.

use std::sync::Arc;

use lettre::transport::smtp::Error as SmtpError;
use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::auth::TokenKeys;
use crate::services::email::{EmailService, Notifier};
use crate::services::notify::Dispatcher;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    tokens: TokenKeys,
    email: EmailService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP transport cannot be configured.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, SmtpError> {
        let tokens = TokenKeys::new(&config.jwt_secret, config.token_ttl_days);
        let email = EmailService::new(&config.email)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                email,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Bearer token signing and verification keys.
    #[must_use]
    pub fn tokens(&self) -> &TokenKeys {
        &self.inner.tokens
    }

    /// Outgoing mail.
    #[must_use]
    pub fn notifier(&self) -> &dyn Notifier {
        &self.inner.email
    }

    /// Order email dispatcher addressed to the configured admins.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher<'_> {
        let config = &self.inner.config;
        Dispatcher::new(&self.inner.email, &config.admin_emails, &config.frontend_url)
    }
}
