use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::{HttpIdentityProvider, IdentityProvider};
use crate::config::AppConfig;
use crate::domains::clock::VenueClock;
use crate::gateways::{PaymentGateway, XenditClient};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    config: Arc<AppConfig>,
    identity: Arc<dyn IdentityProvider>,
    payments: Arc<dyn PaymentGateway>,
}

impl AppState {
    pub fn new(db: PgPool, config: AppConfig) -> anyhow::Result<Self> {
        let identity = HttpIdentityProvider::new(
            &config.identity_base_url,
            &config.identity_api_key,
            config.external_timeout,
        )?;
        let payments = XenditClient::new(
            &config.xendit_base_url,
            &config.xendit_api_key,
            config.external_timeout,
        )?;

        Ok(Self::with_providers(
            db,
            config,
            Arc::new(identity),
            Arc::new(payments),
        ))
    }

    /// Wire explicit gateway implementations, e.g. in-process fakes.
    pub fn with_providers(
        db: PgPool,
        config: AppConfig,
        identity: Arc<dyn IdentityProvider>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            identity,
            payments,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    pub fn payments(&self) -> &dyn PaymentGateway {
        self.payments.as_ref()
    }

    /// The current instant in venue-local terms.
    pub fn clock(&self) -> VenueClock {
        VenueClock::with_offset_minutes(Utc::now(), self.config.venue_utc_offset_minutes)
    }
}
