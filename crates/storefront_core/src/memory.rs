//! crates/storefront_core/src/memory.rs
//!
//! An in-memory implementation of every persistence port.
//!
//! Transactions work on a private copy of the state and publish it on commit.
//! They are serialized through an async gate, which plays the role of the row
//! locks a relational store would take. Dropping an uncommitted transaction
//! discards its copy.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::{
    NewLedgerEntry, NewOrder, NewOrderItem, NewProduct, NewUser, Order, OrderItem, OrderLine,
    OrderWithItems, Product, ProductId, ProfileChanges, User, UserCredentials, UserId,
    WishlistEntry, WishlistItem,
};
use crate::ports::{
    CatalogStore, CheckoutStore, CheckoutTransaction, OrderStore, PortError, PortResult,
    StoreHealth, UserStore, WishlistStore,
};

#[derive(Debug, Clone, Default)]
struct State {
    users: Vec<UserCredentials>,
    products: Vec<Product>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    ledger: Vec<NewLedgerEntry>,
    wishlists: Vec<WishlistEntry>,
    next_id: i32,
    /// Remaining order item inserts before the store starts failing.
    fail_items_after: Option<usize>,
    transactions_begun: usize,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    /// Mirrors the `user_id` foreign keys of the relational schema.
    fn require_user(&self, user_id: UserId, constraint: &str) -> PortResult<()> {
        if self.users.iter().any(|c| c.user.id == user_id) {
            Ok(())
        } else {
            Err(PortError::NotFound(format!(
                "User {} referenced by {} not found",
                user_id, constraint
            )))
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    gate: Arc<AsyncMutex<()>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a test panicked while holding it.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inserts a product directly, bypassing seeding rules. Returns its id.
    pub fn insert_product(&self, product: NewProduct) -> ProductId {
        let mut state = self.state();
        let id = state.next_id();
        state.products.push(product_from(id, product));
        id
    }

    /// Inserts a plain shopper account directly. Returns its id.
    pub fn insert_user(&self, username: &str) -> UserId {
        let mut state = self.state();
        let now = Utc::now();
        let id = UserId(state.next_id());
        state.users.push(UserCredentials {
            user: User {
                id,
                full_name: None,
                username: username.to_string(),
                email: format!("{username}@example.com"),
                is_admin: false,
                phone: None,
                address: None,
                created_at: now,
                updated_at: now,
            },
            password_hash: String::new(),
        });
        id
    }

    pub fn delete_user(&self, user_id: UserId) {
        self.state().users.retain(|c| c.user.id != user_id);
    }

    pub fn stock_of(&self, product_id: ProductId) -> Option<i32> {
        self.state()
            .products
            .iter()
            .find(|p| p.id == product_id)
            .map(|p| p.stock)
    }

    pub fn product_count(&self) -> usize {
        self.state().products.len()
    }

    pub fn order_count(&self) -> usize {
        self.state().orders.len()
    }

    pub fn order_item_count(&self) -> usize {
        self.state().order_items.len()
    }

    pub fn ledger_entries(&self) -> Vec<NewLedgerEntry> {
        self.state().ledger.clone()
    }

    pub fn wishlist_count(&self) -> usize {
        self.state().wishlists.len()
    }

    pub fn transactions_begun(&self) -> usize {
        self.state().transactions_begun
    }

    pub fn delete_product(&self, product_id: ProductId) {
        self.state().products.retain(|p| p.id != product_id);
    }

    /// Makes every order item insert after the first `count` fail.
    pub fn fail_order_items_after(&self, count: usize) {
        self.state().fail_items_after = Some(count);
    }
}

fn product_from(id: ProductId, p: NewProduct) -> Product {
    Product {
        id,
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
        created_at: Utc::now(),
    }
}

/// A plain product definition for tests.
pub fn sample_product(name: &str, price: Decimal, stock: i32) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        category: Some("Living Room".to_string()),
        price,
        stock,
        dimensions: None,
        description: None,
        image: Some(format!("{}.png", name.to_lowercase())),
        threshold: Some(5),
        featured: false,
        is_new: false,
    }
}

//=========================================================================================
// Users
//=========================================================================================

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new_user: &NewUser) -> PortResult<User> {
        let mut state = self.state();
        if state.users.iter().any(|c| c.user.username == new_user.username) {
            return Err(PortError::Conflict("users_username_key".to_string()));
        }
        if state.users.iter().any(|c| c.user.email == new_user.email) {
            return Err(PortError::Conflict("users_email_key".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: UserId(state.next_id()),
            full_name: Some(new_user.full_name.clone()),
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            is_admin: new_user.is_admin,
            phone: None,
            address: None,
            created_at: now,
            updated_at: now,
        };
        state.users.push(UserCredentials {
            user: user.clone(),
            password_hash: new_user.password_hash.clone(),
        });
        Ok(user)
    }

    async fn get_user(&self, user_id: UserId) -> PortResult<User> {
        self.get_credentials(user_id).await.map(|c| c.user)
    }

    async fn find_credentials_by_login(
        &self,
        login: &str,
    ) -> PortResult<Option<UserCredentials>> {
        Ok(self
            .state()
            .users
            .iter()
            .find(|c| c.user.username == login || c.user.email == login)
            .cloned())
    }

    async fn get_credentials(&self, user_id: UserId) -> PortResult<UserCredentials> {
        self.state()
            .users
            .iter()
            .find(|c| c.user.id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn username_taken(&self, username: &str, excluding: Option<UserId>) -> PortResult<bool> {
        Ok(self
            .state()
            .users
            .iter()
            .any(|c| c.user.username == username && Some(c.user.id) != excluding))
    }

    async fn email_taken(&self, email: &str, excluding: Option<UserId>) -> PortResult<bool> {
        Ok(self
            .state()
            .users
            .iter()
            .any(|c| c.user.email == email && Some(c.user.id) != excluding))
    }

    async fn update_password_hash(&self, user_id: UserId, password_hash: &str) -> PortResult<()> {
        let mut state = self.state();
        let creds = state
            .users
            .iter_mut()
            .find(|c| c.user.id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        creds.password_hash = password_hash.to_string();
        creds.user.updated_at = Utc::now();
        Ok(())
    }

    async fn update_profile(&self, user_id: UserId, changes: &ProfileChanges) -> PortResult<User> {
        let mut state = self.state();
        if let Some(username) = &changes.username {
            if state
                .users
                .iter()
                .any(|c| &c.user.username == username && c.user.id != user_id)
            {
                return Err(PortError::Conflict("users_username_key".to_string()));
            }
        }
        if let Some(email) = &changes.email {
            if state
                .users
                .iter()
                .any(|c| &c.user.email == email && c.user.id != user_id)
            {
                return Err(PortError::Conflict("users_email_key".to_string()));
            }
        }

        let user = &mut state
            .users
            .iter_mut()
            .find(|c| c.user.id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?
            .user;
        if let Some(full_name) = &changes.full_name {
            user.full_name = Some(full_name.clone());
        }
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        if let Some(username) = &changes.username {
            user.username = username.clone();
        }
        if let Some(phone) = &changes.phone {
            user.phone = phone.clone();
        }
        if let Some(address) = &changes.address {
            user.address = address.clone();
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

//=========================================================================================
// Catalog, Orders, Wishlist
//=========================================================================================

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_products(&self) -> PortResult<Vec<Product>> {
        let mut products = self.state().products.clone();
        products.sort_by_key(|p| p.id);
        Ok(products)
    }

    async fn get_product(&self, product_id: ProductId) -> PortResult<Option<Product>> {
        Ok(self
            .state()
            .products
            .iter()
            .find(|p| p.id == product_id)
            .cloned())
    }

    async fn insert_products_if_absent(&self, products: &[NewProduct]) -> PortResult<u64> {
        let mut state = self.state();
        let mut inserted = 0;
        for product in products {
            if state.products.iter().any(|p| p.name == product.name) {
                continue;
            }
            let id = state.next_id();
            state.products.push(product_from(id, product.clone()));
            inserted += 1;
        }
        Ok(inserted)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn list_orders_for_user(&self, user_id: UserId) -> PortResult<Vec<OrderWithItems>> {
        let state = self.state();
        let mut orders: Vec<&Order> = state
            .orders
            .iter()
            .filter(|o| o.user_id == Some(user_id))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(orders
            .into_iter()
            .map(|order| OrderWithItems {
                order: order.clone(),
                lines: state
                    .order_items
                    .iter()
                    .filter(|i| i.order_id == order.id)
                    .map(|i| {
                        let product = state.products.iter().find(|p| p.id == i.product_id);
                        OrderLine {
                            product_id: i.product_id,
                            qty: i.qty,
                            price: i.price,
                            product_name: product.map(|p| p.name.clone()),
                            image: product.and_then(|p| p.image.clone()),
                        }
                    })
                    .collect(),
            })
            .collect())
    }
}

#[async_trait]
impl WishlistStore for MemoryStore {
    async fn add_wishlist_entry(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> PortResult<WishlistEntry> {
        let mut state = self.state();
        state.require_user(user_id, "wishlists_user_id_fkey")?;
        if state
            .wishlists
            .iter()
            .any(|w| w.user_id == user_id && w.product_id == product_id)
        {
            return Err(PortError::Conflict("unique_wishlist_item".to_string()));
        }
        let entry = WishlistEntry {
            id: state.next_id(),
            user_id,
            product_id,
            created_at: Utc::now(),
        };
        state.wishlists.push(entry.clone());
        Ok(entry)
    }

    async fn remove_wishlist_entry(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> PortResult<bool> {
        let mut state = self.state();
        let before = state.wishlists.len();
        state
            .wishlists
            .retain(|w| !(w.user_id == user_id && w.product_id == product_id));
        Ok(state.wishlists.len() < before)
    }

    async fn list_wishlist(&self, user_id: UserId) -> PortResult<Vec<WishlistItem>> {
        let state = self.state();
        Ok(state
            .wishlists
            .iter()
            .filter(|w| w.user_id == user_id)
            .filter_map(|w| {
                state
                    .products
                    .iter()
                    .find(|p| p.id == w.product_id)
                    .map(|p| WishlistItem {
                        wishlist_id: w.id,
                        product: p.clone(),
                    })
            })
            .collect())
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> PortResult<()> {
        Ok(())
    }
}

//=========================================================================================
// Checkout Transactions
//=========================================================================================

#[async_trait]
impl CheckoutStore for MemoryStore {
    async fn begin(&self) -> PortResult<Box<dyn CheckoutTransaction>> {
        let guard = self.gate.clone().lock_owned().await;
        let working = {
            let mut state = self.state();
            state.transactions_begun += 1;
            state.clone()
        };
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            working,
            decrements: Vec::new(),
            _guard: guard,
        }))
    }
}

struct MemoryTransaction {
    store: MemoryStore,
    working: State,
    /// Stock taken by this transaction, applied to the live catalog on commit.
    decrements: Vec<(ProductId, i32)>,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl CheckoutTransaction for MemoryTransaction {
    async fn insert_order(&mut self, order: &NewOrder) -> PortResult<Order> {
        if let Some(user_id) = order.user_id {
            self.working.require_user(user_id, "orders_user_id_fkey")?;
        }
        let order = Order {
            id: self.working.next_id(),
            user_id: order.user_id,
            total_amount: order.total_amount,
            status: order.status,
            full_name: order.full_name.clone(),
            email: order.email.clone(),
            phone: order.phone.clone(),
            street_address: order.street_address.clone(),
            city: order.city.clone(),
            postal_code: order.postal_code.clone(),
            country: order.country.clone(),
            created_at: Utc::now(),
        };
        self.working.orders.push(order.clone());
        Ok(order)
    }

    async fn lock_product(&mut self, product_id: ProductId) -> PortResult<Option<Product>> {
        Ok(self
            .working
            .products
            .iter()
            .find(|p| p.id == product_id)
            .cloned())
    }

    async fn decrement_stock(&mut self, product_id: ProductId, quantity: i32) -> PortResult<bool> {
        match self
            .working
            .products
            .iter_mut()
            .find(|p| p.id == product_id && p.stock >= quantity)
        {
            Some(product) => {
                product.stock -= quantity;
                self.decrements.push((product_id, quantity));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_order_item(&mut self, item: &NewOrderItem) -> PortResult<OrderItem> {
        if let Some(remaining) = self.working.fail_items_after.as_mut() {
            if *remaining == 0 {
                return Err(PortError::Unexpected("simulated storage failure".to_string()));
            }
            *remaining -= 1;
        }

        let item = OrderItem {
            id: self.working.next_id(),
            order_id: item.order_id,
            product_id: item.product_id,
            qty: item.qty,
            price: item.price,
        };
        self.working.order_items.push(item.clone());
        Ok(item)
    }

    async fn record_ledger_entry(&mut self, entry: &NewLedgerEntry) -> PortResult<()> {
        self.working
            .require_user(entry.user_id, "transactions_user_id_fkey")?;
        self.working.ledger.push(entry.clone());
        Ok(())
    }

    async fn commit(&mut self) -> PortResult<()> {
        // Only the rows a checkout writes are published. Products may have been
        // added outside the transaction, so only their stock is touched.
        let working = std::mem::take(&mut self.working);
        let mut state = self.store.state();
        for (product_id, quantity) in self.decrements.drain(..) {
            if let Some(product) = state.products.iter_mut().find(|p| p.id == product_id) {
                product.stock -= quantity;
            }
        }
        state.orders = working.orders;
        state.order_items = working.order_items;
        state.ledger = working.ledger;
        state.next_id = state.next_id.max(working.next_id);
        Ok(())
    }
}
