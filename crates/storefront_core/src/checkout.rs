//! crates/storefront_core/src/checkout.rs
//!
//! The order processor: turns a cart plus shipping details into a durable order,
//! enforcing stock availability inside a single transaction.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{
    max_amount, CartLine, LedgerKind, NewLedgerEntry, NewOrder, NewOrderItem, OrderStatus, PlacedOrder,
    ProductId, ShippingInfo, UserId,
};
use crate::ports::{CheckoutStore, CheckoutTransaction, PortError};

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("No items in cart")]
    EmptyCart,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Quantity for product {0} must be at least 1")]
    InvalidQuantity(ProductId),

    #[error("{0} must be between 0 and 9999999999.99")]
    InvalidAmount(&'static str),

    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    #[error("Not enough stock for product {product_id}: {available} available, {requested} requested")]
    InsufficientStock {
        product_id: ProductId,
        available: i32,
        requested: i32,
    },

    #[error("User not found")]
    UserNotFound,

    #[error("Storage error: {0}")]
    Storage(PortError),
}

impl From<PortError> for CheckoutError {
    fn from(error: PortError) -> Self {
        match error {
            // Products are read through `lock_product`, so a missing row here
            // is the buyer's account.
            PortError::NotFound(_) => CheckoutError::UserNotFound,
            other => CheckoutError::Storage(other),
        }
    }
}

pub struct OrderProcessor {
    store: Arc<dyn CheckoutStore>,
}

impl OrderProcessor {
    pub fn new(store: Arc<dyn CheckoutStore>) -> Self {
        Self { store }
    }

    /// Places an order for `cart`, all-or-nothing.
    ///
    /// Input is validated before the transaction opens. Once it is open, any
    /// error drops the transaction uncommitted, which discards the order row,
    /// every item written so far and every stock decrement.
    pub async fn place_order(
        &self,
        cart: &[CartLine],
        shipping: ShippingInfo,
        user_id: Option<UserId>,
    ) -> Result<PlacedOrder, CheckoutError> {
        let new_order = validate(cart, shipping, user_id)?;

        let mut tx = self.store.begin().await?;
        match write_order(&mut *tx, cart, &new_order).await {
            Ok(placed) => {
                tx.commit().await?;

                if let Some(items_total) = placed
                    .items_total()
                    .filter(|total| *total != placed.order.total_amount)
                {
                    warn!(
                        order_id = placed.order.id,
                        %items_total,
                        total_amount = %placed.order.total_amount,
                        "Order total does not match the sum of its line items"
                    );
                }
                info!(
                    order_id = placed.order.id,
                    items = placed.items.len(),
                    user_id = ?user_id.map(|id| id.0),
                    "Order placed"
                );
                Ok(placed)
            }
            Err(e) => {
                warn!("Checkout rolled back: {}", e);
                Err(e)
            }
        }
    }
}

/// Writes the order header, then locks, decrements and records each line.
async fn write_order(
    tx: &mut dyn CheckoutTransaction,
    cart: &[CartLine],
    new_order: &NewOrder,
) -> Result<PlacedOrder, CheckoutError> {
    let order = tx.insert_order(new_order).await?;
    let mut items = Vec::with_capacity(cart.len());

    for line in cart {
        let product = tx
            .lock_product(line.product_id)
            .await?
            .ok_or(CheckoutError::ProductNotFound(line.product_id))?;

        let price = line.unit_price.unwrap_or(product.price);
        let line_total = price
            .checked_mul(Decimal::from(line.quantity))
            .filter(|total| in_range(*total))
            .ok_or(CheckoutError::InvalidAmount("line total"))?;

        if !tx.decrement_stock(product.id, line.quantity).await? {
            return Err(CheckoutError::InsufficientStock {
                product_id: product.id,
                available: product.stock,
                requested: line.quantity,
            });
        }

        let item = tx
            .insert_order_item(&NewOrderItem {
                order_id: order.id,
                product_id: product.id,
                qty: line.quantity,
                price,
            })
            .await?;

        if let Some(user_id) = new_order.user_id {
            tx.record_ledger_entry(&NewLedgerEntry {
                kind: LedgerKind::Purchase,
                user_id,
                product_id: product.id,
                quantity: line.quantity,
                amount: line_total,
                note: Some(format!("Order #{}", order.id)),
            })
            .await?;
        }

        items.push(item);
    }

    Ok(PlacedOrder { order, items })
}

fn validate(
    cart: &[CartLine],
    shipping: ShippingInfo,
    user_id: Option<UserId>,
) -> Result<NewOrder, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let full_name = required("full_name", shipping.full_name)?;
    let email = required("email", shipping.email)?;
    let street_address = required("street_address", shipping.street_address)?;
    let city = required("city", shipping.city)?;
    let postal_code = required("postal_code", shipping.postal_code)?;
    let country = required("country", shipping.country)?;
    let total_amount = shipping
        .total_amount
        .ok_or(CheckoutError::MissingField("total_amount"))?;

    if !in_range(total_amount) {
        return Err(CheckoutError::InvalidAmount("total_amount"));
    }

    for line in cart {
        if line.quantity < 1 {
            return Err(CheckoutError::InvalidQuantity(line.product_id));
        }
        if let Some(price) = line.unit_price {
            let line_total = price.checked_mul(Decimal::from(line.quantity));
            if !in_range(price) || !line_total.is_some_and(in_range) {
                return Err(CheckoutError::InvalidAmount("unit_price"));
            }
        }
    }

    Ok(NewOrder {
        user_id,
        total_amount,
        status: OrderStatus::Pending,
        full_name,
        email,
        phone: shipping.phone.filter(|p| !p.trim().is_empty()),
        street_address,
        city,
        postal_code,
        country,
    })
}

fn in_range(amount: Decimal) -> bool {
    amount >= Decimal::ZERO && amount <= max_amount()
}

fn required(name: &'static str, value: String) -> Result<String, CheckoutError> {
    if value.trim().is_empty() {
        Err(CheckoutError::MissingField(name))
    } else {
        Ok(value)
    }
}
