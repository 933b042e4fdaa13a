//! crates/storefront_core/src/wishlist.rs
//!
//! Wishlist management: one entry per (user, product) pair.

use std::sync::Arc;

use crate::domain::{ProductId, UserId, WishlistEntry, WishlistItem};
use crate::ports::{CatalogStore, PortError, WishlistStore};

#[derive(Debug, thiserror::Error)]
pub enum WishlistError {
    #[error("Already in wishlist")]
    AlreadyExists,

    #[error("Item not found in wishlist")]
    NotFound,

    #[error("Product not found")]
    ProductNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Storage error: {0}")]
    Storage(PortError),
}

impl From<PortError> for WishlistError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::Conflict(_) => WishlistError::AlreadyExists,
            PortError::NotFound(_) => WishlistError::UserNotFound,
            other => WishlistError::Storage(other),
        }
    }
}

pub struct WishlistManager {
    wishlists: Arc<dyn WishlistStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl WishlistManager {
    pub fn new(wishlists: Arc<dyn WishlistStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { wishlists, catalog }
    }

    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<WishlistEntry, WishlistError> {
        if self.catalog.get_product(product_id).await?.is_none() {
            return Err(WishlistError::ProductNotFound);
        }

        // The (user_id, product_id) unique constraint turns a duplicate into AlreadyExists.
        self.wishlists
            .add_wishlist_entry(user_id, product_id)
            .await
            .map_err(WishlistError::from)
    }

    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<(), WishlistError> {
        if self
            .wishlists
            .remove_wishlist_entry(user_id, product_id)
            .await?
        {
            Ok(())
        } else {
            Err(WishlistError::NotFound)
        }
    }

    pub async fn list(&self, user_id: UserId) -> Result<Vec<WishlistItem>, WishlistError> {
        Ok(self.wishlists.list_wishlist(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use super::*;
    use crate::memory::{MemoryStore, sample_product};

    fn manager(store: &MemoryStore) -> WishlistManager {
        WishlistManager::new(Arc::new(store.clone()), Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn add_list_and_remove() -> TestResult {
        let store = MemoryStore::new();
        let lamp = store.insert_product(sample_product("Lamp", Decimal::new(4999, 2), 4));
        let shopper = store.insert_user("shopper");
        let wishlist = manager(&store);

        let entry = wishlist.add(shopper, lamp).await?;
        let items = wishlist.list(shopper).await?;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].wishlist_id, entry.id);
        assert_eq!(items[0].product.name, "Lamp");
        assert!(wishlist.list(UserId(shopper.0 + 100)).await?.is_empty());

        wishlist.remove(shopper, lamp).await?;
        assert!(wishlist.list(shopper).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn adding_the_same_product_twice_keeps_one_row() -> TestResult {
        let store = MemoryStore::new();
        let lamp = store.insert_product(sample_product("Lamp", Decimal::new(4999, 2), 4));
        let shopper = store.insert_user("shopper");
        let wishlist = manager(&store);
        wishlist.add(shopper, lamp).await?;

        let again = wishlist.add(shopper, lamp).await;

        assert!(matches!(again, Err(WishlistError::AlreadyExists)));
        assert_eq!(store.wishlist_count(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn unknown_product_cannot_be_wished_for() {
        let store = MemoryStore::new();

        let result = manager(&store).add(UserId(1), 12345).await;

        assert!(matches!(result, Err(WishlistError::ProductNotFound)));
        assert_eq!(store.wishlist_count(), 0);
    }

    #[tokio::test]
    async fn removing_an_absent_entry_is_not_found() {
        let store = MemoryStore::new();

        let result = manager(&store).remove(UserId(1), 1).await;

        assert!(matches!(result, Err(WishlistError::NotFound)));
    }

    #[tokio::test]
    async fn deleted_account_cannot_add_to_a_wishlist() {
        let store = MemoryStore::new();
        let lamp = store.insert_product(sample_product("Lamp", Decimal::new(4999, 2), 4));
        let gone = store.insert_user("gone");
        store.delete_user(gone);

        let result = manager(&store).add(gone, lamp).await;

        assert!(matches!(result, Err(WishlistError::UserNotFound)));
        assert_eq!(store.wishlist_count(), 0);
    }
}
