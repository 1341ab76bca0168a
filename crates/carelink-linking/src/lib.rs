//! Caregiver linking.
//!
//! A user hands out a short link code; a caregiver redeems it to create a
//! caregiver link. Storage sits behind [`LinkStore`] so the same rules run
//! against SQLite in production and [`MemoryStore`] in tests. Identity is
//! always passed in explicitly and authorization is checked here, never
//! left to the store.

pub mod code;
pub mod error;
pub mod memory;
pub mod service;
pub mod store;

pub use code::{CodeGenerator, RandomCodes};
pub use error::LinkError;
pub use memory::MemoryStore;
pub use service::{LinkingConfig, LinkingService};
pub use store::{LinkStore, StoreError};
