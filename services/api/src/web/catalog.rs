//! services/api/src/web/catalog.rs
//!
//! Product listing, admin catalog seeding and the health check.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use storefront_core::default_catalog;
use storefront_core::domain::{Product, UserId};
use tracing::{error, info};
use utoipa::ToSchema;

use crate::web::{auth::MessageResponse, error::HttpError, state::AppState};

#[derive(Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: i32,
    pub name: String,
    pub category: Option<String>,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub stock: i32,
    pub dimensions: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub threshold: Option<i32>,
    pub featured: bool,
    pub is_new: bool,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            category: p.category,
            price: p.price,
            stock: p.stock,
            dimensions: p.dimensions,
            description: p.description,
            image: p.image,
            threshold: p.threshold,
            featured: p.featured,
            is_new: p.is_new,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SeedResponse {
    pub msg: String,
    pub inserted: u64,
}

/// List every product in the catalog, ordered by id.
#[utoipa::path(
    get,
    path = "/products",
    tag = "catalog",
    responses(
        (status = 200, description = "The full catalog", body = [ProductResponse]),
        (status = 500, description = "Internal server error", body = MessageResponse)
    )
)]
pub async fn list_products_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ProductResponse>>, HttpError> {
    let products = state.catalog.list_products().await?;
    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

/// Insert the built-in starter products that are not in the catalog yet.
#[utoipa::path(
    post,
    path = "/seed-products",
    tag = "catalog",
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Seeding finished", body = SeedResponse),
        (status = 401, description = "Missing or bad token", body = MessageResponse),
        (status = 403, description = "Caller is not an administrator", body = MessageResponse)
    )
)]
pub async fn seed_products_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
) -> Result<impl IntoResponse, HttpError> {
    let admin = state.auth.require_admin(user_id).await?;
    let inserted = state.catalog.seed_if_absent(&default_catalog()).await?;
    info!(admin = %admin.username, inserted, "Seed requested");

    Ok((
        StatusCode::CREATED,
        Json(SeedResponse {
            msg: format!("Seed complete. {} new products added.", inserted),
            inserted,
        }),
    ))
}

/// Check that the database answers.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Database reachable", body = MessageResponse),
        (status = 500, description = "Database unreachable", body = MessageResponse)
    )
)]
pub async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, HttpError> {
    state.health.ping().await.map_err(|e| {
        error!("Health check failed: {}", e);
        HttpError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Database connection failed",
        )
    })?;
    Ok(MessageResponse::new("Database connection OK"))
}
