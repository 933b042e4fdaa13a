//! services/api/src/web/wishlist.rs
//!
//! Wishlist endpoints. All of them act on the caller's own list.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_core::domain::{ProductId, UserId, WishlistItem};
use utoipa::ToSchema;

use crate::web::{
    auth::MessageResponse,
    error::{ApiJson, HttpError},
    state::AppState,
};

#[derive(Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct AddToWishlistRequest {
    pub product_id: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct AddToWishlistResponse {
    pub msg: String,
    pub id: i32,
}

/// The product fields shown on a wishlist.
#[derive(Serialize, ToSchema)]
pub struct WishlistProduct {
    pub id: i32,
    pub name: String,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub image: Option<String>,
    pub category: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct WishlistItemResponse {
    pub wishlist_id: i32,
    pub product: WishlistProduct,
}

impl From<WishlistItem> for WishlistItemResponse {
    fn from(item: WishlistItem) -> Self {
        Self {
            wishlist_id: item.wishlist_id,
            product: WishlistProduct {
                id: item.product.id,
                name: item.product.name,
                price: item.product.price,
                image: item.product.image,
                category: item.product.category,
            },
        }
    }
}

/// List the caller's wishlist in the order items were added.
#[utoipa::path(
    get,
    path = "/wishlist",
    tag = "wishlist",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The caller's wishlist", body = [WishlistItemResponse]),
        (status = 401, description = "Missing or bad token", body = MessageResponse)
    )
)]
pub async fn list_wishlist_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<Vec<WishlistItemResponse>>, HttpError> {
    let items = state.wishlist.list(user_id).await?;
    Ok(Json(items.into_iter().map(WishlistItemResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/wishlist",
    tag = "wishlist",
    request_body = AddToWishlistRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Added", body = AddToWishlistResponse),
        (status = 400, description = "Missing product_id or already in wishlist", body = MessageResponse),
        (status = 404, description = "Product not found", body = MessageResponse)
    )
)]
pub async fn add_to_wishlist_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    ApiJson(req): ApiJson<AddToWishlistRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let product_id = req
        .product_id
        .ok_or_else(|| HttpError::bad_request("product_id required"))?;

    let entry = state.wishlist.add(user_id, product_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(AddToWishlistResponse {
            msg: "Added to wishlist".to_string(),
            id: entry.id,
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/wishlist/{product_id}",
    tag = "wishlist",
    params(("product_id" = i32, Path, description = "The product to remove")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Removed", body = MessageResponse),
        (status = 404, description = "Item not found in wishlist", body = MessageResponse)
    )
)]
pub async fn remove_from_wishlist_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<MessageResponse>, HttpError> {
    state.wishlist.remove(user_id, product_id).await?;
    Ok(MessageResponse::new("Removed from wishlist"))
}
