//! Pooled embedded graph views.
//!
//! # Responsibility
//! - `handle`: one embedded visualization instance, its node, binding, placement,
//!   style and click-to-activate interaction state.
//! - `pool`: bounded collection of handles with the reuse/eviction/creation policy.
//!
//! # Invariants
//! - A handle is created lazily on first need and recycled across documents.
//! - The pool never holds more handles than its capacity.
//! - At most one handle is attached to a given host container.

pub mod handle;
pub mod pool;

pub use handle::{BindCompletion, BindError, BindStatus, Interaction, PlaceStatus, ViewHandle};
pub use pool::{AcquireSource, Acquisition, ViewPool};
