//! # slotsync Testkit
//!
//! Testing utilities for slotsync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Wire vectors**: Legacy slot contents with the envelope migration must
//!   turn them into, and the exact JSON envelope of common payloads
//! - **Generators**: Proptest strategies for payloads and legacy documents
//! - **Fixtures**: Multi-context origins and shared SQLite files
//!
//! ## Wire Vectors
//!
//! ```rust
//! use slotsync_testkit::vectors::{all_vectors, verify_all_vectors};
//!
//! assert!(!all_vectors().is_empty());
//! assert!(verify_all_vectors().iter().all(|(_, ok, _)| *ok));
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use slotsync_testkit::generators::Profile;
//!
//! proptest! {
//!     #[test]
//!     fn write_then_read(profile: Profile) {
//!         let context = slotsync::Context::in_memory();
//!         let binding = context.bind("profile", None::<Profile>);
//!         binding.write(&profile).unwrap();
//!         prop_assert_eq!(binding.read(), Some(profile));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use slotsync_testkit::fixtures::OriginFixture;
//!
//! let fixture = OriginFixture::new(2);
//! fixture.seed("legacy", "plain text");
//! let name = fixture.tab(0).bind("legacy", None::<String>);
//! assert_eq!(name.read().as_deref(), Some("plain text"));
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{NotifyCounter, OriginFixture, SqliteFixture};
pub use generators::{Profile, Theme};
pub use vectors::{all_vectors, verify_all_vectors, WireVector};
