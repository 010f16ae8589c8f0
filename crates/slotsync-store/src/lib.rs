//! # slotsync Store
//!
//! Storage media for slotsync. Provides a trait-based interface over a
//! string-keyed, string-valued, synchronous key-value store, with in-memory,
//! SQLite, and browser `localStorage` implementations.
//!
//! ## Key Types
//!
//! - [`Storage`] - The trait every medium implements
//! - [`MemoryStorage`] - Non-persistent storage for tests and single-process use
//! - [`SqliteStorage`] - Persistent storage shared by every process that opens the file
//! - [`SlotChange`] - A change recorded by another writer of a SQLite medium
//! - `LocalStorage` - `window.localStorage` (wasm32 only)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use slotsync_store::{SqliteStorage, Storage};
//!
//! let storage = SqliteStorage::open("slots.db").unwrap();
//! storage.set_item("theme", "dark").unwrap();
//! assert_eq!(storage.get_item("theme").unwrap().as_deref(), Some("dark"));
//! ```
//!
//! ## Design Notes
//!
//! - **Full replacement**: writes replace the whole value of one key; there is
//!   no read-modify-write primitive.
//! - **Atomic single-key replace**: each backend makes a single `set_item`
//!   indivisible (mutex-guarded map, one SQLite transaction, `Storage.setItem`).
//! - **Change log**: the SQLite medium records every effective mutation with
//!   the writer's id, so other processes can observe foreign writes.

pub mod error;
pub mod memory;
#[cfg(not(target_arch = "wasm32"))]
pub mod migration;
#[cfg(not(target_arch = "wasm32"))]
pub mod sqlite;
pub mod traits;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use error::{Result, StorageError};
pub use memory::MemoryStorage;
#[cfg(not(target_arch = "wasm32"))]
pub use sqlite::{SlotChange, SqliteStorage, WriterId};
pub use traits::Storage;
#[cfg(target_arch = "wasm32")]
pub use web::LocalStorage;
