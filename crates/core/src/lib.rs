//! Core domain types and shared logic for Wisp.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Slug identifiers and generation
//! - Expiry evaluation (time limits and view limits)
//! - Wish content validation
//! - Configuration types

pub mod config;
pub mod error;
pub mod expiry;
pub mod slug;
pub mod wish;

pub use error::{Error, Result};
pub use expiry::{ExpiryCause, evaluate_expiry, remaining_views};
pub use slug::{SLUG_LENGTH, Slug};
pub use wish::{DEFAULT_THEME, NewWish};
