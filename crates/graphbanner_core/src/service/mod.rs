//! Banner use-case services.
//!
//! # Responsibility
//! - Resolve where the banner view goes for the active document.
//! - Route host events and settings edits into placement resolutions.

pub mod placement;
pub mod runtime;
