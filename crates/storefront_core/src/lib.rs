pub mod account;
pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod domain;
pub mod ports;
pub mod wishlist;

#[cfg(any(test, feature = "memory"))]
pub mod memory;

pub use account::{AccountError, AccountService};
pub use auth::{AdminSetup, AuthError, Authenticator, LoginSession, Registrar};
pub use catalog::{default_catalog, Catalog};
pub use checkout::{CheckoutError, OrderProcessor};
pub use domain::{
    CartLine, NewProduct, Order, OrderItem, OrderStatus, OrderWithItems, PlacedOrder, Product,
    ProductId, ProfileChanges, Registration, ShippingInfo, User, UserId, WishlistItem,
};
pub use ports::{
    CatalogStore, CheckoutStore, OrderStore, PasswordHasher, PortError, PortResult, StoreHealth,
    TokenService, UserStore, WishlistStore,
};
pub use wishlist::{WishlistError, WishlistManager};
