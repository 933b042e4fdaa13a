pub mod account;
pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod state;
pub mod wishlist;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ConfigError;
pub use middleware::{optional_auth, require_auth};
pub use openapi::ApiDoc;
pub use state::AppState;

/// Builds the complete application: API routes, Swagger UI and request tracing.
pub fn router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/products", get(catalog::list_products_handler))
        .route("/health", get(catalog::health_handler));

    // Guests may check out; a token, when sent, must be valid.
    let checkout_routes = Router::new()
        .route("/checkout", post(checkout::checkout_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            optional_auth,
        ));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/change-password", post(auth::change_password_handler))
        .route("/seed-products", post(catalog::seed_products_handler))
        .route(
            "/wishlist",
            get(wishlist::list_wishlist_handler).post(wishlist::add_to_wishlist_handler),
        )
        .route(
            "/wishlist/{product_id}",
            delete(wishlist::remove_from_wishlist_handler),
        )
        .route("/user/orders", get(account::list_orders_handler))
        .route("/user/profile", put(account::update_profile_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(checkout_routes)
        .merge(protected_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}

/// CORS for the storefront frontend at `origin`.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, ConfigError> {
    let origin = origin
        .parse::<HeaderValue>()
        .map_err(|e| ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string()))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]))
}
