//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the storefront core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on.
//! It establishes the configuration builder, logging conventions, and event
//! broadcasting mechanisms used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, StorageKeys};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus};
