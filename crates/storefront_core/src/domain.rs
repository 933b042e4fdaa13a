//! crates/storefront_core/src/domain.rs
//!
//! Defines the pure, core data structures for the storefront.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

pub type ProductId = i32;
pub type OrderId = i32;

//=========================================================================================
// Users
//=========================================================================================

/// The single identity type used for every authenticated operation.
///
/// Tokens carry it as a decimal string subject; everything past the
/// authentication boundary works with this value only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i32);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i32>().map(UserId)
    }
}

/// Represents a user - used throughout the app. Never carries the password hash.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub full_name: Option<String>,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Only used internally for login and password changes - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// A user about to be inserted. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// Registration input as submitted by a client, before validation.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Partial profile update.
///
/// `None` leaves a field untouched. For `phone` and `address` the inner
/// option is the new value, so `Some(None)` clears the field.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
}

//=========================================================================================
// Catalog
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub dimensions: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    /// Low-stock threshold used by the storefront to flag scarce items.
    pub threshold: Option<i32>,
    pub featured: bool,
    pub is_new: bool,
    pub created_at: DateTime<Utc>,
}

/// A catalog definition used when seeding products.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub category: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub dimensions: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub threshold: Option<i32>,
    pub featured: bool,
    pub is_new: bool,
}

//=========================================================================================
// Orders
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            other => Err(format!("unknown order status '{other}'")),
        }
    }
}

/// One line of a submitted cart.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i32,
    /// Overrides the catalog price when present.
    pub unit_price: Option<Decimal>,
}

/// Shipping and contact details submitted with a cart.
///
/// Fields are raw client input; blank strings count as missing.
#[derive(Debug, Clone, Default)]
pub struct ShippingInfo {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub street_address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub total_amount: Option<Decimal>,
}

/// Validated order header handed to the checkout transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Option<UserId>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub street_address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub street_address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub qty: i32,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub id: i32,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub qty: i32,
    pub price: Decimal,
}

/// Largest amount the money columns (`NUMERIC(12, 2)`) can hold.
pub fn max_amount() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

impl OrderItem {
    /// `price × qty`, or `None` if that overflows.
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.qty))
    }
}

/// The result of a successful checkout.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl PlacedOrder {
    /// Sum of price × quantity over every line item.
    pub fn items_total(&self) -> Option<Decimal> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.line_total()?))
    }
}

/// An order item joined with whatever is left of its product.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub qty: i32,
    pub price: Decimal,
    pub product_name: Option<String>,
    pub image: Option<String>,
}

/// An order as shown in a user's order history.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderWithItems {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

//=========================================================================================
// Ledger
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerKind {
    Purchase,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerKind::Purchase => "purchase",
        }
    }
}

/// A row of the `transactions` ledger, written alongside authenticated purchases.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub kind: LedgerKind,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub amount: Decimal,
    pub note: Option<String>,
}

//=========================================================================================
// Wishlist
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct WishlistEntry {
    pub id: i32,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}

/// A wishlist row together with a snapshot of its product.
#[derive(Debug, Clone, PartialEq)]
pub struct WishlistItem {
    pub wishlist_id: i32,
    pub product: Product,
}
