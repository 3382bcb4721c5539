//! Host capability boundary.
//!
//! # Responsibility
//! - Define the narrow set of host operations the banner core depends on.
//! - Keep node manipulation, rendering and workspace queries behind one trait.
//!
//! # Invariants
//! - Core code never reaches host internals except through [`HostCapability`].
//! - Host failures are reported as [`HostError`] values; callers swallow them at
//!   the operation boundary.

mod memory;

pub use memory::MemoryHost;

use crate::model::view::{
    ActiveView, ContainerId, DeviceClass, ListenerId, NodeId, ViewId, ViewMode, ViewStyle,
};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type HostResult<T> = Result<T, HostError>;

/// Failures reported by the host capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// Visualization capability is not loaded (e.g. core graph plugin disabled).
    Unavailable,
    /// Document no longer exists in the vault.
    DocumentNotFound(String),
    /// Target container was closed.
    ContainerGone(ContainerId),
    /// View id is unknown to the host.
    UnknownView(ViewId),
    /// Any other rejected node manipulation.
    Rejected(String),
}

impl Display for HostError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "host visualization capability is unavailable"),
            Self::DocumentNotFound(path) => write!(f, "document not found: {path}"),
            Self::ContainerGone(container) => write!(f, "host container is gone: {container}"),
            Self::UnknownView(view_id) => write!(f, "unknown embedded view: {view_id}"),
            Self::Rejected(message) => write!(f, "host rejected operation: {message}"),
        }
    }
}

impl Error for HostError {}

/// Progress of a visualization reinitialization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindProgress {
    /// Reinitialized synchronously.
    Ready,
    /// Completion arrives later through the runtime's bind-complete entry point.
    Pending,
}

/// Result of inserting a view node after a title anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorMatch {
    /// Anchor found; node unlinked from any previous parent and inserted.
    Inserted,
    /// Anchor missing; nothing changed.
    Missing,
}

/// Operations the banner core consumes from the host application.
pub trait HostCapability {
    /// Creates an embeddable visualization instance and returns its container node.
    fn create_embedded_view(&mut self, view_id: ViewId) -> HostResult<NodeId>;
    /// Releases the visualization instance behind `view_id`.
    fn destroy_embedded_view(&mut self, view_id: ViewId);
    /// Reinitializes the visualization scoped to `document_path`.
    fn reinitialize_view(
        &mut self,
        view_id: ViewId,
        document_path: &str,
    ) -> HostResult<BindProgress>;
    /// Notifies the visualization that its viewport changed.
    fn resize(&mut self, view_id: ViewId) -> HostResult<()>;
    /// Inserts `node` right after the element matched by `anchor_selector` in `container`.
    fn insert_after_anchor(
        &mut self,
        node: NodeId,
        container: ContainerId,
        anchor_selector: &str,
    ) -> HostResult<AnchorMatch>;
    /// Unlinks `node` from its parent, if any.
    fn detach_node(&mut self, node: NodeId);
    /// Whether `container` is still part of the live workspace.
    fn container_exists(&self, container: ContainerId) -> bool;
    fn apply_style(&mut self, node: NodeId, style: &ViewStyle) -> HostResult<()>;
    /// Toggles pointer interception on the overlay above the visualization.
    fn set_overlay_intercept(&mut self, node: NodeId, intercept: bool) -> HostResult<()>;
    fn register_outside_pointer_listener(&mut self, view_id: ViewId) -> ListenerId;
    fn unregister_listener(&mut self, listener: ListenerId);
    fn active_view(&self) -> Option<ActiveView>;
    fn current_mode(&self) -> ViewMode;
    fn device_class(&self) -> DeviceClass;
    /// Shows a user-facing notice.
    fn notify(&mut self, message: &str);
}
