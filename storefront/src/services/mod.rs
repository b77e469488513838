// storefront/src/services/mod.rs

pub mod cart_snapshot;
pub mod inventory;
pub mod notifier;
pub mod orders;
pub mod payment_mock;
