//! Persistence contracts for banner settings.
//!
//! # Responsibility
//! - Define the settings storage contract used by the runtime.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Loaded settings are validated before they are returned.

pub mod settings_repo;
