//! Workspace umbrella crate.
//!
//! Re-exports the storefront core so host applications can depend on
//! `storefront-workspace` alone and pick platform defaults through the
//! `desktop-shims` feature.

pub use core_service::*;
