//! crates/storefront_core/src/catalog.rs
//!
//! Product listing and idempotent catalog seeding.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

use crate::domain::{NewProduct, Product};
use crate::ports::{CatalogStore, PortResult};

pub struct Catalog {
    store: Arc<dyn CatalogStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn list_products(&self) -> PortResult<Vec<Product>> {
        self.store.list_products().await
    }

    /// Inserts the definitions whose name is not in the catalog yet.
    /// Calling it again with the same definitions inserts nothing.
    pub async fn seed_if_absent(&self, products: &[NewProduct]) -> PortResult<u64> {
        let inserted = self.store.insert_products_if_absent(products).await?;
        info!(inserted, offered = products.len(), "Catalog seeded");
        Ok(inserted)
    }
}

/// The storefront's built-in starter catalog.
pub fn default_catalog() -> Vec<NewProduct> {
    fn product(
        name: &str,
        category: &str,
        price: Decimal,
        stock: i32,
        dimensions: Option<&str>,
        description: &str,
        image: &str,
        threshold: Option<i32>,
        featured: bool,
        is_new: bool,
    ) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            category: Some(category.to_string()),
            price,
            stock,
            dimensions: dimensions.map(str::to_string),
            description: Some(description.to_string()),
            image: Some(image.to_string()),
            threshold,
            featured,
            is_new,
        }
    }

    vec![
        product(
            "Luxury Sofa",
            "Living Room",
            Decimal::new(1_299_999, 2),
            10,
            Some("200x90x100 cm"),
            "A premium luxury sofa with soft cushions.",
            "sofa.png",
            Some(5),
            true,
            true,
        ),
        product(
            "Modern Chair",
            "Living Room",
            Decimal::new(899_999, 2),
            20,
            Some("100x50x50 cm"),
            "A stylish and comfortable chair.",
            "chair.png",
            Some(5),
            false,
            true,
        ),
        product(
            "Dining Table Set",
            "Dining Room",
            Decimal::new(1_599_999, 2),
            5,
            Some("250x100x75 cm"),
            "Elegant dining set with 6 chairs.",
            "dining.png",
            Some(5),
            true,
            false,
        ),
        product(
            "Streamer Chair",
            "Gaming Chairs",
            Decimal::new(680_000, 2),
            15,
            None,
            "Professional streamer chair with premium features.",
            "streamer-chair.png",
            None,
            false,
            false,
        ),
        product(
            "Racing Style Chair",
            "Gaming Chairs",
            Decimal::new(520_000, 2),
            20,
            None,
            "Racing style gaming chair with ergonomic design.",
            "racing-chair.png",
            None,
            false,
            false,
        ),
        product(
            "Pro Gaming Chair",
            "Gaming Chairs",
            Decimal::new(450_000, 2),
            25,
            None,
            "Professional gaming chair for esports enthusiasts.",
            "gaming-chair.png",
            None,
            true,
            false,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;
    use crate::memory::{MemoryStore, sample_product};

    #[tokio::test]
    async fn seeding_twice_inserts_each_product_once() -> TestResult {
        let store = MemoryStore::new();
        let catalog = Catalog::new(Arc::new(store.clone()));
        let defaults = default_catalog();

        assert_eq!(catalog.seed_if_absent(&defaults).await?, defaults.len() as u64);
        assert_eq!(catalog.seed_if_absent(&defaults).await?, 0);
        assert_eq!(store.product_count(), defaults.len());

        Ok(())
    }

    #[tokio::test]
    async fn seeding_skips_names_already_present() -> TestResult {
        let store = MemoryStore::new();
        store.insert_product(sample_product("Luxury Sofa", Decimal::ONE, 1));
        let catalog = Catalog::new(Arc::new(store.clone()));

        let inserted = catalog.seed_if_absent(&default_catalog()).await?;

        assert_eq!(inserted, 5);
        let sofas = catalog
            .list_products()
            .await?
            .into_iter()
            .filter(|p| p.name == "Luxury Sofa")
            .count();
        assert_eq!(sofas, 1);

        Ok(())
    }

    #[tokio::test]
    async fn products_are_listed_in_id_order() -> TestResult {
        let store = MemoryStore::new();
        let first = store.insert_product(sample_product("Lamp", Decimal::ONE, 1));
        let second = store.insert_product(sample_product("Rug", Decimal::ONE, 1));

        let ids: Vec<_> = Catalog::new(Arc::new(store))
            .list_products()
            .await?
            .iter()
            .map(|p| p.id)
            .collect();

        assert_eq!(ids, vec![first, second]);

        Ok(())
    }
}
