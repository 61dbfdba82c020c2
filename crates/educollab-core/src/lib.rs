//! Core types and stores for the EduCollab community application.
//!
//! Two stores make up the whole data layer: [`IdentityStore`] owns the
//! authenticated session and the identity registry, [`ContentStore`] owns the
//! post, event, group and message collections. Both persist through any
//! [`KeyValueStore`] backend and hold no global state, so any number of
//! independent instances can coexist.
//!
//! This crate is deliberately free of database and CLI dependencies.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod content;
pub mod content_store;
pub mod credential;
pub mod error;
pub mod identity;
pub mod identity_store;
pub mod storage;

pub use content_store::ContentStore;
pub use error::{Error, Result};
pub use identity_store::{IdentityConfig, IdentityStore};
pub use storage::{KeyValueStore, MemoryStore, Storage, StorageKey};
