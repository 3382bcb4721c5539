//! View and host identity types.
//!
//! # Responsibility
//! - Name the handles the core exchanges with the host capability.
//! - Carry the visual style applied to one embedded view.
//!
//! # Invariants
//! - `ViewId` is generated once per handle and never reused.
//! - `ContainerId`/`NodeId` values are minted by the host; the core never fabricates them.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Title element the banner is inserted after.
pub const TITLE_ANCHOR_SELECTOR: &str = ".inline-title";

/// Stable identifier for one pooled embedded view.
///
/// Kept as a type alias so signatures read in domain terms.
pub type ViewId = Uuid;

/// Host container (pane content element) that can host a banner.
///
/// Owned by the host application; the core only holds it as a back-reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContainerId(pub u64);

impl Display for ContainerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "container#{}", self.0)
    }
}

/// Node created by the host for one embedded view; owned by its view handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Registration token for a host pointer listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

/// Document type rendered by the active host view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    /// Note editor/reader; the only kind that receives a banner.
    Markdown,
    /// Any other host view (canvas, pdf, graph, empty pane...).
    Other,
}

/// Snapshot of the host's currently active document view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveView {
    /// Container whose title anchor receives the banner.
    pub container: ContainerId,
    pub kind: ViewKind,
    /// Vault-relative document path; `None` for an empty pane.
    pub document_path: Option<String>,
}

impl ActiveView {
    /// Active markdown view showing `path` inside `container`.
    pub fn markdown(container: ContainerId, path: impl Into<String>) -> Self {
        Self {
            container,
            kind: ViewKind::Markdown,
            document_path: Some(path.into()),
        }
    }
}

/// Current editing mode of the active view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Edit,
    Read,
}

/// Device class reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Desktop,
    Mobile,
}

/// Visual state of one embedded view, pushed to the host as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewStyle {
    pub visible: bool,
    pub compact: bool,
    pub simplified: bool,
    /// Interactive-mode marker (drag/zoom reach the visualization).
    pub active: bool,
    pub height_px: u32,
}

impl ViewStyle {
    /// Initial style of a freshly created view: hidden, passive, full layout.
    pub fn initial(height_px: u32) -> Self {
        Self {
            visible: false,
            compact: false,
            simplified: false,
            active: false,
            height_px,
        }
    }
}
