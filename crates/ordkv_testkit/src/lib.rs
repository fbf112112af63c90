//! # ordkv Testkit
//!
//! Test utilities for ordkv.
//!
//! This crate provides:
//! - Test fixtures and engine helpers
//! - Property-based test generators using proptest
//! - A `BTreeMap` reference model of a store
//! - Integration test helpers that check the engine against the model
//! - Stress testing utilities
//!
//! ## Usage
//!
//! ```rust
//! use ordkv_testkit::prelude::*;
//!
//! with_engine(|engine| {
//!     engine
//!         .update(|tx| tx.store(TEST_STORE)?.put(b"k", b"v"))
//!         .unwrap();
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod model;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::model::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use model::*;
pub use stress::*;
