//! crates/storefront_core/src/account.rs
//!
//! Account self-service: order history and profile editing.

use std::sync::Arc;
use tracing::info;

use crate::domain::{OrderWithItems, ProfileChanges, User, UserId};
use crate::ports::{OrderStore, PortError, UserStore};

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("User not found")]
    UserNotFound,

    #[error("Email already taken")]
    EmailTaken,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Storage error: {0}")]
    Storage(PortError),
}

impl From<PortError> for AccountError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound(_) => AccountError::UserNotFound,
            PortError::Conflict(constraint) if constraint.contains("email") => {
                AccountError::EmailTaken
            }
            PortError::Conflict(_) => AccountError::UsernameTaken,
            other => AccountError::Storage(other),
        }
    }
}

pub struct AccountService {
    users: Arc<dyn UserStore>,
    orders: Arc<dyn OrderStore>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>, orders: Arc<dyn OrderStore>) -> Self {
        Self { users, orders }
    }

    /// The user's orders, newest first.
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<OrderWithItems>, AccountError> {
        self.orders
            .list_orders_for_user(user_id)
            .await
            .map_err(AccountError::Storage)
    }

    /// Applies a partial profile update.
    ///
    /// Blank names, emails and usernames are ignored rather than stored.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        changes: ProfileChanges,
    ) -> Result<User, AccountError> {
        let changes = ProfileChanges {
            full_name: changes.full_name.filter(|v| !v.trim().is_empty()),
            email: changes.email.filter(|v| !v.trim().is_empty()),
            username: changes.username.filter(|v| !v.trim().is_empty()),
            phone: changes.phone,
            address: changes.address,
        };

        // Fails with UserNotFound before any uniqueness lookups.
        self.users.get_user(user_id).await?;

        if let Some(email) = &changes.email {
            if self.users.email_taken(email, Some(user_id)).await? {
                return Err(AccountError::EmailTaken);
            }
        }
        if let Some(username) = &changes.username {
            if self.users.username_taken(username, Some(user_id)).await? {
                return Err(AccountError::UsernameTaken);
            }
        }

        let user = self.users.update_profile(user_id, &changes).await?;
        info!(user_id = user_id.0, "Profile updated");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use super::*;
    use crate::auth::tests::{authenticator, registration};
    use crate::checkout::OrderProcessor;
    use crate::domain::{CartLine, ShippingInfo};
    use crate::memory::{MemoryStore, sample_product};

    fn accounts(store: &MemoryStore) -> AccountService {
        AccountService::new(Arc::new(store.clone()), Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn profile_update_changes_only_supplied_fields() -> TestResult {
        let store = MemoryStore::new();
        let user = authenticator(&store)
            .register(registration("maria", "maria@example.com"))
            .await?;

        let updated = accounts(&store)
            .update_profile(
                user.id,
                ProfileChanges {
                    full_name: Some("".into()),
                    phone: Some(Some("0917 123 4567".into())),
                    address: Some(Some("Intramuros, Manila".into())),
                    ..Default::default()
                },
            )
            .await?;

        assert_eq!(updated.full_name.as_deref(), Some("Maria Clara"));
        assert_eq!(updated.username, "maria");
        assert_eq!(updated.phone.as_deref(), Some("0917 123 4567"));
        assert_eq!(updated.address.as_deref(), Some("Intramuros, Manila"));

        let cleared = accounts(&store)
            .update_profile(
                user.id,
                ProfileChanges {
                    phone: Some(None),
                    ..Default::default()
                },
            )
            .await?;
        assert_eq!(cleared.phone, None);
        assert_eq!(cleared.address.as_deref(), Some("Intramuros, Manila"));

        Ok(())
    }

    #[tokio::test]
    async fn email_or_username_of_another_user_is_refused() -> TestResult {
        let store = MemoryStore::new();
        let auth = authenticator(&store);
        let maria = auth.register(registration("maria", "maria@example.com")).await?;
        auth.register(registration("ibarra", "ibarra@example.com")).await?;

        let email = accounts(&store)
            .update_profile(
                maria.id,
                ProfileChanges {
                    email: Some("ibarra@example.com".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(email, Err(AccountError::EmailTaken)));

        let username = accounts(&store)
            .update_profile(
                maria.id,
                ProfileChanges {
                    username: Some("ibarra".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(username, Err(AccountError::UsernameTaken)));

        // Keeping one's own email is not a conflict.
        accounts(&store)
            .update_profile(
                maria.id,
                ProfileChanges {
                    email: Some("maria@example.com".into()),
                    ..Default::default()
                },
            )
            .await?;

        Ok(())
    }

    #[tokio::test]
    async fn profile_update_for_unknown_user_is_not_found() {
        let store = MemoryStore::new();

        let result = accounts(&store)
            .update_profile(UserId(99), ProfileChanges::default())
            .await;

        assert!(matches!(result, Err(AccountError::UserNotFound)));
    }

    #[tokio::test]
    async fn order_history_lists_only_own_orders_with_product_details() -> TestResult {
        let store = MemoryStore::new();
        let chair = store.insert_product(sample_product("Chair", Decimal::new(10000, 2), 10));
        let processor = OrderProcessor::new(Arc::new(store.clone()));
        let shipping = ShippingInfo {
            full_name: "Maria Clara".into(),
            email: "maria@example.com".into(),
            phone: None,
            street_address: "1 Calle Real".into(),
            city: "Manila".into(),
            postal_code: "1000".into(),
            country: "Philippines".into(),
            total_amount: Some(Decimal::new(10000, 2)),
        };
        let cart = [CartLine {
            product_id: chair,
            quantity: 1,
            unit_price: None,
        }];

        let buyer = store.insert_user("maria");

        let first = processor
            .place_order(&cart, shipping.clone(), Some(buyer))
            .await?;
        let second = processor
            .place_order(&cart, shipping.clone(), Some(buyer))
            .await?;
        processor.place_order(&cart, shipping, None).await?;

        let history = accounts(&store).list_orders(buyer).await?;

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].order.id, second.order.id);
        assert_eq!(history[1].order.id, first.order.id);
        assert_eq!(history[0].lines[0].product_name.as_deref(), Some("Chair"));
        assert_eq!(history[0].lines[0].image.as_deref(), Some("chair.png"));

        Ok(())
    }
}
