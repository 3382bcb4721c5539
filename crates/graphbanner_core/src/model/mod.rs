//! Domain model for embedded graph banners.
//!
//! # Responsibility
//! - Define identifiers exchanged with the host (views, containers, nodes, listeners).
//! - Describe the active document view, editing mode and device class queried from the host.
//! - Define per-resolution visibility policy inputs.
//!
//! # Invariants
//! - Every pooled view is identified by a stable `ViewId` for its whole lifetime.
//! - Policy values are ephemeral and recomputed on every resolution.

pub mod policy;
pub mod view;
