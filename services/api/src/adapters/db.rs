//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the persistence ports from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::error::{DatabaseError, ErrorKind};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use storefront_core::domain::{
    NewLedgerEntry, NewOrder, NewOrderItem, NewProduct, NewUser, Order, OrderItem, OrderLine,
    OrderWithItems, Product, ProductId, ProfileChanges, User, UserCredentials, UserId,
    WishlistEntry, WishlistItem,
};
use storefront_core::ports::{
    CatalogStore, CheckoutStore, CheckoutTransaction, OrderStore, PortError, PortResult,
    StoreHealth, UserStore, WishlistStore,
};

const USER_COLUMNS: &str =
    "id, full_name, username, email, is_admin, phone, address, created_at, updated_at";

const PRODUCT_COLUMNS: &str = "id, name, category, price, stock, dimensions, description, \
     image, threshold, featured, is_new, created_at";

const ORDER_COLUMNS: &str = "id, user_id, total_amount, status, full_name, email, phone, \
     street_address, city, postal_code, country, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements every persistence port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn unexpected(error: sqlx::Error) -> PortError {
    PortError::Unexpected(error.to_string())
}

/// Unique violations become `Conflict` carrying the violated constraint's name.
/// Foreign key violations mean the referenced row is gone.
fn write_error(error: sqlx::Error) -> PortError {
    match error.as_database_error() {
        Some(db) if matches!(db.kind(), ErrorKind::UniqueViolation) => {
            PortError::Conflict(constraint_name(db))
        }
        Some(db) if matches!(db.kind(), ErrorKind::ForeignKeyViolation) => {
            PortError::NotFound(format!("Row referenced by {} not found", constraint_name(db)))
        }
        _ => unexpected(error),
    }
}

fn constraint_name(db: &dyn DatabaseError) -> String {
    db.constraint().unwrap_or("unknown").to_string()
}

fn not_found(what: String) -> impl FnOnce(sqlx::Error) -> PortError {
    move |error| match error {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        other => unexpected(other),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: i32,
    full_name: Option<String>,
    username: String,
    email: String,
    is_admin: bool,
    phone: Option<String>,
    address: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: UserId(self.id),
            full_name: self.full_name,
            username: self.username,
            email: self.email,
            is_admin: self.is_admin,
            phone: self.phone,
            address: self.address,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    #[sqlx(flatten)]
    user: UserRecord,
    password_hash: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user: self.user.to_domain(),
            password_hash: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct ProductRecord {
    id: i32,
    name: String,
    category: Option<String>,
    price: Decimal,
    stock: i32,
    dimensions: Option<String>,
    description: Option<String>,
    image: Option<String>,
    threshold: Option<i32>,
    featured: bool,
    is_new: bool,
    created_at: DateTime<Utc>,
}
impl ProductRecord {
    fn to_domain(self) -> Product {
        Product {
            id: self.id,
            name: self.name,
            category: self.category,
            price: self.price,
            stock: self.stock,
            dimensions: self.dimensions,
            description: self.description,
            image: self.image,
            threshold: self.threshold,
            featured: self.featured,
            is_new: self.is_new,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct OrderRecord {
    id: i32,
    user_id: Option<i32>,
    total_amount: Decimal,
    status: String,
    full_name: String,
    email: String,
    phone: Option<String>,
    street_address: String,
    city: String,
    postal_code: String,
    country: String,
    created_at: DateTime<Utc>,
}
impl OrderRecord {
    fn to_domain(self) -> PortResult<Order> {
        Ok(Order {
            id: self.id,
            user_id: self.user_id.map(UserId),
            total_amount: self.total_amount,
            status: self.status.parse().map_err(PortError::Unexpected)?,
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            street_address: self.street_address,
            city: self.city,
            postal_code: self.postal_code,
            country: self.country,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct OrderItemRecord {
    id: i32,
    order_id: i32,
    product_id: i32,
    qty: i32,
    price: Decimal,
}
impl OrderItemRecord {
    fn to_domain(self) -> OrderItem {
        OrderItem {
            id: self.id,
            order_id: self.order_id,
            product_id: self.product_id,
            qty: self.qty,
            price: self.price,
        }
    }
}

/// An order item joined with its (possibly deleted) product.
#[derive(FromRow)]
struct OrderLineRecord {
    order_id: i32,
    product_id: i32,
    qty: i32,
    price: Decimal,
    product_name: Option<String>,
    image: Option<String>,
}
impl OrderLineRecord {
    fn to_domain(self) -> OrderLine {
        OrderLine {
            product_id: self.product_id,
            qty: self.qty,
            price: self.price,
            product_name: self.product_name,
            image: self.image,
        }
    }
}

#[derive(FromRow)]
struct WishlistRecord {
    id: i32,
    user_id: i32,
    product_id: i32,
    created_at: DateTime<Utc>,
}
impl WishlistRecord {
    fn to_domain(self) -> WishlistEntry {
        WishlistEntry {
            id: self.id,
            user_id: UserId(self.user_id),
            product_id: self.product_id,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct WishlistItemRecord {
    wishlist_id: i32,
    #[sqlx(flatten)]
    product: ProductRecord,
}

//=========================================================================================
// `UserStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserStore for DbAdapter {
    async fn create_user(&self, new_user: &NewUser) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (full_name, username, email, password_hash, is_admin) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.full_name)
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(record.to_domain())
    }

    async fn get_user(&self, user_id: UserId) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id.0)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found(format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn find_credentials_by_login(
        &self,
        login: &str,
    ) -> PortResult<Option<UserCredentials>> {
        let record = sqlx::query_as::<_, CredentialsRecord>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users \
             WHERE username = $1 OR email = $1 ORDER BY id LIMIT 1"
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(CredentialsRecord::to_domain))
    }

    async fn get_credentials(&self, user_id: UserId) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE id = $1"
        ))
        .bind(user_id.0)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found(format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn username_taken(&self, username: &str, excluding: Option<UserId>) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 AND id IS DISTINCT FROM $2)",
        )
        .bind(username)
        .bind(excluding.map(|id| id.0))
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn email_taken(&self, email: &str, excluding: Option<UserId>) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 AND id IS DISTINCT FROM $2)",
        )
        .bind(email)
        .bind(excluding.map(|id| id.0))
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn update_password_hash(&self, user_id: UserId, password_hash: &str) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(password_hash)
        .bind(user_id.0)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    async fn update_profile(&self, user_id: UserId, changes: &ProfileChanges) -> PortResult<User> {
        // phone and address distinguish "leave alone" from "set to NULL".
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET \
                 full_name = COALESCE($2, full_name), \
                 email = COALESCE($3, email), \
                 username = COALESCE($4, username), \
                 phone = CASE WHEN $5 THEN $6 ELSE phone END, \
                 address = CASE WHEN $7 THEN $8 ELSE address END, \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id.0)
        .bind(changes.full_name.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.username.as_deref())
        .bind(changes.phone.is_some())
        .bind(changes.phone.clone().flatten())
        .bind(changes.address.is_some())
        .bind(changes.address.clone().flatten())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            other => write_error(other),
        })?;
        Ok(record.to_domain())
    }
}

//=========================================================================================
// `CatalogStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CatalogStore for DbAdapter {
    async fn list_products(&self) -> PortResult<Vec<Product>> {
        let records = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(ProductRecord::to_domain).collect())
    }

    async fn get_product(&self, product_id: ProductId) -> PortResult<Option<Product>> {
        let record = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(ProductRecord::to_domain))
    }

    async fn insert_products_if_absent(&self, products: &[NewProduct]) -> PortResult<u64> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // Serializes concurrent seeders so the name check below cannot race.
        sqlx::query("LOCK TABLE products IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        let mut inserted = 0;
        for product in products {
            let result = sqlx::query(
                "INSERT INTO products \
                     (name, category, price, stock, dimensions, description, image, \
                      threshold, featured, is_new) \
                 SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10 \
                 WHERE NOT EXISTS (SELECT 1 FROM products WHERE name = $1)",
            )
            .bind(&product.name)
            .bind(&product.category)
            .bind(product.price)
            .bind(product.stock)
            .bind(&product.dimensions)
            .bind(&product.description)
            .bind(&product.image)
            .bind(product.threshold)
            .bind(product.featured)
            .bind(product.is_new)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
            inserted += result.rows_affected();
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(inserted)
    }
}

//=========================================================================================
// `OrderStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl OrderStore for DbAdapter {
    async fn list_orders_for_user(&self, user_id: UserId) -> PortResult<Vec<OrderWithItems>> {
        let orders = sqlx::query_as::<_, OrderRecord>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let order_ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
        let lines = sqlx::query_as::<_, OrderLineRecord>(
            "SELECT oi.order_id, oi.product_id, oi.qty, oi.price, \
                    p.name AS product_name, p.image \
             FROM order_items oi \
             LEFT JOIN products p ON p.id = oi.product_id \
             WHERE oi.order_id = ANY($1) \
             ORDER BY oi.id",
        )
        .bind(&order_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut by_order: HashMap<i32, Vec<OrderLine>> = HashMap::new();
        for line in lines {
            by_order
                .entry(line.order_id)
                .or_default()
                .push(line.to_domain());
        }

        orders
            .into_iter()
            .map(|record| {
                let lines = by_order.remove(&record.id).unwrap_or_default();
                Ok(OrderWithItems {
                    order: record.to_domain()?,
                    lines,
                })
            })
            .collect()
    }
}

//=========================================================================================
// `WishlistStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl WishlistStore for DbAdapter {
    async fn add_wishlist_entry(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> PortResult<WishlistEntry> {
        let record = sqlx::query_as::<_, WishlistRecord>(
            "INSERT INTO wishlists (user_id, product_id) VALUES ($1, $2) \
             RETURNING id, user_id, product_id, created_at",
        )
        .bind(user_id.0)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(record.to_domain())
    }

    async fn remove_wishlist_entry(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM wishlists WHERE user_id = $1 AND product_id = $2")
            .bind(user_id.0)
            .bind(product_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_wishlist(&self, user_id: UserId) -> PortResult<Vec<WishlistItem>> {
        let records = sqlx::query_as::<_, WishlistItemRecord>(
            "SELECT w.id AS wishlist_id, p.id, p.name, p.category, p.price, p.stock, \
                    p.dimensions, p.description, p.image, p.threshold, p.featured, \
                    p.is_new, p.created_at \
             FROM wishlists w \
             JOIN products p ON p.id = w.product_id \
             WHERE w.user_id = $1 \
             ORDER BY w.created_at, w.id",
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records
            .into_iter()
            .map(|r| WishlistItem {
                wishlist_id: r.wishlist_id,
                product: r.product.to_domain(),
            })
            .collect())
    }
}

#[async_trait]
impl StoreHealth for DbAdapter {
    async fn ping(&self) -> PortResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// Checkout Transaction
//=========================================================================================

#[async_trait]
impl CheckoutStore for DbAdapter {
    async fn begin(&self) -> PortResult<Box<dyn CheckoutTransaction>> {
        let tx = self.pool.begin().await.map_err(unexpected)?;
        Ok(Box::new(PgCheckoutTransaction { tx: Some(tx) }))
    }
}

/// A checkout running inside one PostgreSQL transaction.
///
/// `sqlx` rolls the transaction back when it is dropped uncommitted.
pub struct PgCheckoutTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgCheckoutTransaction {
    fn open(&mut self) -> PortResult<&mut Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| PortError::Unexpected("checkout transaction already closed".into()))
    }
}

#[async_trait]
impl CheckoutTransaction for PgCheckoutTransaction {
    async fn insert_order(&mut self, order: &NewOrder) -> PortResult<Order> {
        let tx = self.open()?;
        let record = sqlx::query_as::<_, OrderRecord>(&format!(
            "INSERT INTO orders \
                 (user_id, total_amount, status, full_name, email, phone, \
                  street_address, city, postal_code, country) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.user_id.map(|id| id.0))
        .bind(order.total_amount)
        .bind(order.status.as_str())
        .bind(&order.full_name)
        .bind(&order.email)
        .bind(&order.phone)
        .bind(&order.street_address)
        .bind(&order.city)
        .bind(&order.postal_code)
        .bind(&order.country)
        .fetch_one(&mut **tx)
        .await
        .map_err(write_error)?;
        record.to_domain()
    }

    async fn lock_product(&mut self, product_id: ProductId) -> PortResult<Option<Product>> {
        let tx = self.open()?;
        let record = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(product_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(unexpected)?;
        Ok(record.map(ProductRecord::to_domain))
    }

    async fn decrement_stock(&mut self, product_id: ProductId, quantity: i32) -> PortResult<bool> {
        let tx = self.open()?;
        let result = sqlx::query(
            "UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2",
        )
        .bind(product_id)
        .bind(quantity)
        .execute(&mut **tx)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_order_item(&mut self, item: &NewOrderItem) -> PortResult<OrderItem> {
        let tx = self.open()?;
        let record = sqlx::query_as::<_, OrderItemRecord>(
            "INSERT INTO order_items (order_id, product_id, qty, price) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, order_id, product_id, qty, price",
        )
        .bind(item.order_id)
        .bind(item.product_id)
        .bind(item.qty)
        .bind(item.price)
        .fetch_one(&mut **tx)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn record_ledger_entry(&mut self, entry: &NewLedgerEntry) -> PortResult<()> {
        let tx = self.open()?;
        sqlx::query(
            "INSERT INTO transactions (type, user_id, product_id, quantity, amount, note) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entry.kind.as_str())
        .bind(entry.user_id.0)
        .bind(entry.product_id)
        .bind(entry.quantity)
        .bind(entry.amount)
        .bind(&entry.note)
        .execute(&mut **tx)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn commit(&mut self) -> PortResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| PortError::Unexpected("checkout transaction already closed".into()))?;
        tx.commit().await.map_err(unexpected)
    }
}
