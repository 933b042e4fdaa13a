//! services/api/src/bin/seed.rs
//!
//! Prepares a database for the storefront: runs migrations, creates the
//! administrator account when `ADMIN_*` is configured and inserts the default
//! catalog. Safe to run repeatedly; nothing is dropped or overwritten.

use api_lib::{
    adapters::{Argon2Hasher, DbAdapter},
    config::SeedConfig,
    error::ApiError,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use storefront_core::{default_catalog, AdminSetup, Catalog, Registrar, Registration};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let config = SeedConfig::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db_pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;

    match &config.admin {
        Some(admin) => {
            let registrar = Registrar::new(db_adapter.clone(), Arc::new(Argon2Hasher::new()));
            let setup = registrar
                .ensure_admin(Registration {
                    full_name: "Administrator".to_string(),
                    username: admin.username.clone(),
                    email: admin.email.clone(),
                    password: admin.password.clone(),
                })
                .await
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            match setup {
                AdminSetup::Created(user) => info!(user_id = user.id.0, "Administrator created"),
                AdminSetup::AlreadyAdmin(user) => {
                    info!(user_id = user.id.0, "Administrator already exists")
                }
                AdminSetup::NotAdmin(user) => warn!(
                    user_id = user.id.0,
                    username = %user.username,
                    "ADMIN_USERNAME or ADMIN_EMAIL belongs to an account without administrator rights; left unchanged"
                ),
            }
        }
        None => warn!("ADMIN_USERNAME, ADMIN_EMAIL and ADMIN_PASSWORD not all set; skipping administrator"),
    }

    let inserted = Catalog::new(db_adapter)
        .seed_if_absent(&default_catalog())
        .await?;
    info!(inserted, "Seeding complete");

    Ok(())
}
