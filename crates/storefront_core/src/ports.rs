//! crates/storefront_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the storefront's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or
//! cryptographic libraries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    NewLedgerEntry, NewOrder, NewOrderItem, NewProduct, NewUser, Order, OrderItem,
    OrderWithItems, Product, ProductId, ProfileChanges, User, UserCredentials, UserId,
    WishlistEntry, WishlistItem,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, crypto).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness constraint rejected the write. Carries the constraint name.
    #[error("Conflicting write: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Persistence Ports
//=========================================================================================

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user. Unique violations surface as `PortError::Conflict`.
    async fn create_user(&self, new_user: &NewUser) -> PortResult<User>;

    async fn get_user(&self, user_id: UserId) -> PortResult<User>;

    /// Looks a user up by username OR email.
    async fn find_credentials_by_login(&self, login: &str)
        -> PortResult<Option<UserCredentials>>;

    async fn get_credentials(&self, user_id: UserId) -> PortResult<UserCredentials>;

    /// True when another user (not `excluding`) already owns the username.
    async fn username_taken(&self, username: &str, excluding: Option<UserId>) -> PortResult<bool>;

    /// True when another user (not `excluding`) already owns the email.
    async fn email_taken(&self, email: &str, excluding: Option<UserId>) -> PortResult<bool>;

    async fn update_password_hash(&self, user_id: UserId, password_hash: &str) -> PortResult<()>;

    async fn update_profile(&self, user_id: UserId, changes: &ProfileChanges) -> PortResult<User>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_products(&self) -> PortResult<Vec<Product>>;

    async fn get_product(&self, product_id: ProductId) -> PortResult<Option<Product>>;

    /// Inserts every definition whose name is not already present and returns
    /// how many rows were written.
    async fn insert_products_if_absent(&self, products: &[NewProduct]) -> PortResult<u64>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Orders placed by the user, newest first, each with its line items.
    async fn list_orders_for_user(&self, user_id: UserId) -> PortResult<Vec<OrderWithItems>>;
}

#[async_trait]
pub trait WishlistStore: Send + Sync {
    /// Inserts the pair. A duplicate surfaces as `PortError::Conflict`.
    async fn add_wishlist_entry(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> PortResult<WishlistEntry>;

    /// Returns false when there was nothing to delete.
    async fn remove_wishlist_entry(&self, user_id: UserId, product_id: ProductId)
        -> PortResult<bool>;

    async fn list_wishlist(&self, user_id: UserId) -> PortResult<Vec<WishlistItem>>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    /// Round-trips a trivial query to the backing store.
    async fn ping(&self) -> PortResult<()>;
}

//=========================================================================================
// Checkout Unit of Work
//=========================================================================================

/// Opens the transactional scope the order processor runs in.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    async fn begin(&self) -> PortResult<Box<dyn CheckoutTransaction>>;
}

/// A single open checkout transaction.
///
/// Nothing written through it is visible to other readers until `commit`
/// succeeds. Dropping it without committing rolls every write back.
#[async_trait]
pub trait CheckoutTransaction: Send {
    async fn insert_order(&mut self, order: &NewOrder) -> PortResult<Order>;

    /// Reads the product and holds a row lock on it until the transaction ends.
    async fn lock_product(&mut self, product_id: ProductId) -> PortResult<Option<Product>>;

    /// Decrements stock only if at least `quantity` units remain.
    /// Returns false, leaving stock untouched, otherwise.
    async fn decrement_stock(&mut self, product_id: ProductId, quantity: i32) -> PortResult<bool>;

    async fn insert_order_item(&mut self, item: &NewOrderItem) -> PortResult<OrderItem>;

    async fn record_ledger_entry(&mut self, entry: &NewLedgerEntry) -> PortResult<()>;

    async fn commit(&mut self) -> PortResult<()>;
}

//=========================================================================================
// Credential Ports
//=========================================================================================

/// Slow, salted password hashing.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> PortResult<String>;

    /// Ok(false) on mismatch; Err only when the stored hash is unreadable.
    fn verify(&self, password: &str, password_hash: &str) -> PortResult<bool>;
}

/// Why a presented bearer token was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenRejection {
    #[error("token has expired")]
    Expired,
    #[error("token is invalid: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates signed bearer tokens carrying a user id subject.
pub trait TokenService: Send + Sync {
    fn issue(&self, user_id: UserId) -> PortResult<IssuedToken>;

    fn verify(&self, token: &str) -> Result<UserId, TokenRejection>;
}
