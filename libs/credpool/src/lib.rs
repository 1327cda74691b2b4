//! Credential pool shared by end-to-end test runners.
//!
//! A pool is an ordered list of test accounts persisted as one JSON file.
//! Each test file checks out one free account, uses it, and checks it back
//! in when it finishes. Writes are compare-and-swap on a version counter so
//! concurrent runners on the same host cannot claim the same account.

pub mod env;
pub mod error;
pub mod pool;
pub mod record;
pub mod store;

pub use env::{generate, CredentialSource, EnvSource, MapSource};
pub use error::PoolError;
pub use pool::{CredentialPool, TokenUpdate};
pub use record::{CredentialRecord, PoolDocument, Versioned};
pub use store::{FilePoolStore, MemoryPoolStore, PoolStore};
