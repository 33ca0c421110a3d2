//! # In-Memory Backend
//!
//! A complete [`jsonapi_service::Storage`] backend over process memory,
//! plus the demo article/tag/user resource declarations used by the
//! binary and the integration suite.

pub mod fixtures;
pub mod storage;

pub use storage::{MemoryStorage, PersistAction, PersistHook};
