use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;

use crate::auth::jwt::JwtKeys;
use crate::config::AppConfig;
use crate::db;
use crate::mail::{LogMailer, Mailer, SmtpMailer};
use crate::products::{PgProductStore, ProductStore};
use crate::users::{PgUserStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub users: Arc<dyn UserStore>,
    pub products: Arc<dyn ProductStore>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Builds the state and returns the pool so the caller can migrate.
    pub async fn init() -> anyhow::Result<(Self, PgPool)> {
        let config = Arc::new(AppConfig::from_env()?);
        let jwt = JwtKeys::new(&config.jwt).context("load jwt signing key")?;

        let db = db::connect(&config.database_url).await?;

        let mailer = match &config.smtp {
            Some(smtp) => {
                Arc::new(SmtpMailer::new(smtp).context("configure smtp relay")?) as Arc<dyn Mailer>
            }
            None => {
                tracing::warn!("SMTP_HOST not set; password reset emails will only be logged");
                Arc::new(LogMailer) as Arc<dyn Mailer>
            }
        };

        let state = Self::from_parts(
            config,
            jwt,
            Arc::new(PgUserStore::new(db.clone())),
            Arc::new(PgProductStore::new(db.clone())),
            mailer,
        );
        Ok((state, db))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        jwt: JwtKeys,
        users: Arc<dyn UserStore>,
        products: Arc<dyn ProductStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            config,
            jwt,
            users,
            products,
            mailer,
        }
    }
}
