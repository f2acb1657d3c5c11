//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::services::mail::{MailClient, MailError};
use crate::services::push::PushClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the database pool, configuration, and outbound
/// clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    pool: PgPool,
    mail: MailClient,
    push: PushClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the mail client cannot be built from the
    /// configuration.
    pub fn new(config: Config, pool: PgPool) -> Result<Self, MailError> {
        let mail = MailClient::new(&config.mail)?;
        let push = PushClient::new(&config.push);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                mail,
                push,
            }),
        })
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the transactional mail client.
    #[must_use]
    pub fn mail(&self) -> &MailClient {
        &self.inner.mail
    }

    /// Get a reference to the web-push client.
    #[must_use]
    pub fn push(&self) -> &PushClient {
        &self.inner.push
    }
}
