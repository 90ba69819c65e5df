//! Common utilities and types shared across the draft room crates.

#![warn(clippy::pedantic)]

/// Module for shared identifier types
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for tracing subscriber setup shared by the binaries
pub mod observability;
