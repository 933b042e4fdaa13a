//! services/api/src/web/openapi.rs
//!
//! The master definition for the OpenAPI specification.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::web::{account, auth, catalog, checkout, wishlist};

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::change_password_handler,
        catalog::list_products_handler,
        catalog::seed_products_handler,
        catalog::health_handler,
        checkout::checkout_handler,
        wishlist::list_wishlist_handler,
        wishlist::add_to_wishlist_handler,
        wishlist::remove_from_wishlist_handler,
        account::list_orders_handler,
        account::update_profile_handler,
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and passwords."),
        (name = "catalog", description = "Products and catalog seeding."),
        (name = "checkout", description = "Order placement."),
        (name = "wishlist", description = "The caller's saved products."),
        (name = "account", description = "Order history and profile."),
        (name = "health", description = "Liveness of the service and its database.")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` JWT scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route_and_the_bearer_scheme() {
        let doc = ApiDoc::openapi();

        for path in [
            "/auth/register",
            "/auth/login",
            "/auth/change-password",
            "/products",
            "/seed-products",
            "/checkout",
            "/wishlist",
            "/wishlist/{product_id}",
            "/user/orders",
            "/user/profile",
            "/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let schemes = doc
            .components
            .as_ref()
            .map(|c| c.security_schemes.contains_key("bearer"));
        assert_eq!(schemes, Some(true));
    }
}
