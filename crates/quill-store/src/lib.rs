//! # quill-store
//!
//! Local persistence for the Quill messaging client: the message log,
//! negotiated double-ratchet sessions, and the pre-key / one-time-key pools
//! used for asynchronous session establishment.
//!
//! The crate exposes an asynchronous [`Store`] handle that wraps a
//! `rusqlite::Connection`.  Opening a store returns immediately; the schema
//! is created by a background task, and operations that touch key material
//! wait on a readiness signal before running.  All binary key material
//! crosses the SQLite boundary as lower-case hex text — callers only ever
//! see raw byte buffers.

pub mod keys;
pub mod messages;
pub mod models;
pub mod schema;
pub mod sessions;
pub mod store;

mod codec;
mod error;

pub use error::StoreError;
pub use models::*;
pub use store::{Readiness, Store};
