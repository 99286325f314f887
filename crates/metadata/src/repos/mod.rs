//! Repository traits.

pub mod wishes;

pub use wishes::{ViewOutcome, WishRepo};
