//! Storage implementations for different backends

#[cfg(feature = "in-memory")]
pub mod in_memory;
#[cfg(feature = "postgrest")]
pub mod postgrest;

#[cfg(feature = "in-memory")]
pub use in_memory::{InMemoryDataStore, InMemoryIdentityProvider};
#[cfg(feature = "postgrest")]
pub use postgrest::PostgrestDataStore;
