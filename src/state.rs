use std::sync::Arc;

use anyhow::anyhow;
use examtrack_config::{
    AttendanceConfig, ClientGovernorConfig, CorsConfig, JwtConfig, RateLimitConfig,
};
use examtrack_db::init_db_pool;
use sqlx::PgPool;

use crate::events::EventBus;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub cors_config: CorsConfig,
    pub rate_limit_config: RateLimitConfig,
    pub attendance_config: AttendanceConfig,
    pub events: EventBus,
    pub auth_governor: Arc<ClientGovernorConfig>,
    pub public_governor: Arc<ClientGovernorConfig>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        jwt_config: JwtConfig,
        cors_config: CorsConfig,
        rate_limit_config: RateLimitConfig,
        attendance_config: AttendanceConfig,
    ) -> anyhow::Result<Self> {
        let auth_governor = rate_limit_config
            .auth_governor_config()
            .ok_or_else(|| anyhow!("Invalid auth rate limit settings"))?;
        let public_governor = rate_limit_config
            .public_governor_config()
            .ok_or_else(|| anyhow!("Invalid public rate limit settings"))?;
        Ok(Self {
            db,
            jwt_config,
            cors_config,
            rate_limit_config,
            attendance_config,
            events: EventBus::default(),
            auth_governor,
            public_governor,
        })
    }

    /// State for `db` with every other setting read from the environment.
    pub fn from_env(db: PgPool) -> anyhow::Result<Self> {
        Self::new(
            db,
            JwtConfig::from_env(),
            CorsConfig::from_env(),
            RateLimitConfig::from_env(),
            AttendanceConfig::from_env(),
        )
    }
}

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let db = init_db_pool().await?;
    AppState::from_env(db)
}
