//! Non-persistent adapters.

pub mod credentials_store;

pub use credentials_store::InMemoryCredentialsStore;
