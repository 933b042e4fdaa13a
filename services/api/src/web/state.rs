//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;
use storefront_core::ports::{
    CatalogStore, CheckoutStore, OrderStore, PasswordHasher, StoreHealth, TokenService,
    UserStore, WishlistStore,
};
use storefront_core::{AccountService, Authenticator, Catalog, OrderProcessor, WishlistManager};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub auth: Authenticator,
    pub orders: OrderProcessor,
    pub wishlist: WishlistManager,
    pub catalog: Catalog,
    pub accounts: AccountService,
    pub health: Arc<dyn StoreHealth>,
}

impl AppState {
    /// Wires every component to one backing store.
    pub fn new<S>(
        store: Arc<S>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenService>,
    ) -> Self
    where
        S: UserStore
            + CatalogStore
            + OrderStore
            + WishlistStore
            + CheckoutStore
            + StoreHealth
            + 'static,
    {
        Self {
            auth: Authenticator::new(store.clone(), hasher, tokens),
            orders: OrderProcessor::new(store.clone()),
            wishlist: WishlistManager::new(store.clone(), store.clone()),
            catalog: Catalog::new(store.clone()),
            accounts: AccountService::new(store.clone(), store.clone()),
            health: store,
        }
    }
}
