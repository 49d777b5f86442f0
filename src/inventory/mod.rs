//! Inventory Store boundary
//!
//! The coordination core only reads snapshots and listens for change
//! notifications. `InMemoryInventoryStore` is the reference store used by the
//! binary and the tests; durable backends implement the same trait.

pub mod memory;
pub mod store;

pub use memory::{InMemoryInventoryStore, NewItem};
pub use store::{
    ChangeKind, InventoryChange, InventoryStore, InventorySubscription, SubscriptionEvent,
};
