//! In-memory host used by headless simulations and tests.
//!
//! Models containers with anchor selectors, vault documents, node parenting and
//! listener registration, and records every expensive call so callers can assert
//! how often views were created, reinitialized, moved or resized.

use super::{AnchorMatch, BindProgress, HostCapability, HostError, HostResult};
use crate::model::view::{
    ActiveView, ContainerId, DeviceClass, ListenerId, NodeId, ViewId, ViewKind, ViewMode,
    ViewStyle, TITLE_ANCHOR_SELECTOR,
};
use std::collections::{BTreeMap, BTreeSet};

/// Headless [`HostCapability`] implementation.
#[derive(Debug)]
pub struct MemoryHost {
    next_container: u64,
    next_node: u64,
    next_listener: u64,
    available: bool,
    async_binds: bool,
    containers: BTreeMap<ContainerId, BTreeSet<String>>,
    documents: BTreeSet<String>,
    views: BTreeMap<ViewId, NodeId>,
    parents: BTreeMap<NodeId, ContainerId>,
    styles: BTreeMap<NodeId, ViewStyle>,
    overlay_intercept: BTreeMap<NodeId, bool>,
    listeners: BTreeMap<ListenerId, ViewId>,
    reinitializations: Vec<(ViewId, String)>,
    pending_binds: Vec<(ViewId, String)>,
    created: usize,
    destroyed: Vec<ViewId>,
    inserts: usize,
    resizes: Vec<ViewId>,
    active: Option<ActiveView>,
    mode: ViewMode,
    device: DeviceClass,
    notices: Vec<String>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// Desktop host in read mode with no open panes.
    pub fn new() -> Self {
        Self {
            next_container: 1,
            next_node: 1,
            next_listener: 1,
            available: true,
            async_binds: false,
            containers: BTreeMap::new(),
            documents: BTreeSet::new(),
            views: BTreeMap::new(),
            parents: BTreeMap::new(),
            styles: BTreeMap::new(),
            overlay_intercept: BTreeMap::new(),
            listeners: BTreeMap::new(),
            reinitializations: Vec::new(),
            pending_binds: Vec::new(),
            created: 0,
            destroyed: Vec::new(),
            inserts: 0,
            resizes: Vec::new(),
            active: None,
            mode: ViewMode::Read,
            device: DeviceClass::Desktop,
            notices: Vec::new(),
        }
    }

    /// Opens a pane whose content exposes the given anchor selectors.
    pub fn open_container(&mut self, anchors: &[&str]) -> ContainerId {
        let container = ContainerId(self.next_container);
        self.next_container += 1;
        self.containers.insert(
            container,
            anchors.iter().map(|anchor| anchor.to_string()).collect(),
        );
        container
    }

    /// Opens `path` in a new pane with a title anchor and makes it active.
    pub fn open_document(&mut self, path: &str) -> ContainerId {
        let container = self.open_container(&[TITLE_ANCHOR_SELECTOR]);
        self.show_document(container, path);
        container
    }

    /// Navigates an existing pane to `path` and makes it active.
    pub fn show_document(&mut self, container: ContainerId, path: &str) {
        self.documents.insert(path.to_string());
        self.active = Some(ActiveView::markdown(container, path));
    }

    /// Closes a pane; nodes parented to it become orphaned.
    pub fn close_container(&mut self, container: ContainerId) {
        self.containers.remove(&container);
        self.parents.retain(|_, parent| *parent != container);
        if self
            .active
            .as_ref()
            .is_some_and(|active| active.container == container)
        {
            self.active = None;
        }
    }

    pub fn add_anchor(&mut self, container: ContainerId, anchor: &str) {
        if let Some(anchors) = self.containers.get_mut(&container) {
            anchors.insert(anchor.to_string());
        }
    }

    pub fn add_document(&mut self, path: &str) {
        self.documents.insert(path.to_string());
    }

    pub fn remove_document(&mut self, path: &str) {
        self.documents.remove(path);
    }

    pub fn set_active(&mut self, active: Option<ActiveView>) {
        self.active = active;
    }

    /// Makes a non-markdown view (canvas, pdf...) active in `container`.
    pub fn show_other_view(&mut self, container: ContainerId) {
        self.active = Some(ActiveView {
            container,
            kind: ViewKind::Other,
            document_path: None,
        });
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        self.mode = mode;
    }

    pub fn set_device(&mut self, device: DeviceClass) {
        self.device = device;
    }

    /// Simulates the visualization capability being unloaded.
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// When enabled, reinitialization stays pending until taken and completed.
    pub fn set_async_binds(&mut self, async_binds: bool) {
        self.async_binds = async_binds;
    }

    /// Drains reinitializations still waiting for completion.
    pub fn take_pending_binds(&mut self) -> Vec<(ViewId, String)> {
        std::mem::take(&mut self.pending_binds)
    }

    pub fn reinitializations(&self) -> &[(ViewId, String)] {
        &self.reinitializations
    }

    /// Number of reinitializations requested for `path` across all views.
    pub fn reinit_count(&self, path: &str) -> usize {
        self.reinitializations
            .iter()
            .filter(|(_, bound)| bound == path)
            .count()
    }

    pub fn created_count(&self) -> usize {
        self.created
    }

    pub fn destroyed(&self) -> &[ViewId] {
        &self.destroyed
    }

    pub fn live_view_count(&self) -> usize {
        self.views.len()
    }

    pub fn insert_count(&self) -> usize {
        self.inserts
    }

    pub fn resize_count(&self, view_id: ViewId) -> usize {
        self.resizes.iter().filter(|id| **id == view_id).count()
    }

    pub fn parent_of(&self, node: NodeId) -> Option<ContainerId> {
        self.parents.get(&node).copied()
    }

    pub fn style_of(&self, node: NodeId) -> Option<ViewStyle> {
        self.styles.get(&node).copied()
    }

    pub fn overlay_intercepts(&self, node: NodeId) -> bool {
        self.overlay_intercept.get(&node).copied().unwrap_or(true)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    fn node_of(&self, view_id: ViewId) -> HostResult<NodeId> {
        self.views
            .get(&view_id)
            .copied()
            .ok_or(HostError::UnknownView(view_id))
    }
}

impl HostCapability for MemoryHost {
    fn create_embedded_view(&mut self, view_id: ViewId) -> HostResult<NodeId> {
        if !self.available {
            return Err(HostError::Unavailable);
        }
        let node = NodeId(self.next_node);
        self.next_node += 1;
        self.views.insert(view_id, node);
        self.overlay_intercept.insert(node, true);
        self.created += 1;
        Ok(node)
    }

    fn destroy_embedded_view(&mut self, view_id: ViewId) {
        if let Some(node) = self.views.remove(&view_id) {
            self.parents.remove(&node);
            self.styles.remove(&node);
            self.overlay_intercept.remove(&node);
            self.destroyed.push(view_id);
        }
    }

    fn reinitialize_view(
        &mut self,
        view_id: ViewId,
        document_path: &str,
    ) -> HostResult<BindProgress> {
        if !self.available {
            return Err(HostError::Unavailable);
        }
        self.node_of(view_id)?;
        if !self.documents.contains(document_path) {
            return Err(HostError::DocumentNotFound(document_path.to_string()));
        }

        self.reinitializations
            .push((view_id, document_path.to_string()));
        if self.async_binds {
            self.pending_binds
                .push((view_id, document_path.to_string()));
            return Ok(BindProgress::Pending);
        }
        Ok(BindProgress::Ready)
    }

    fn resize(&mut self, view_id: ViewId) -> HostResult<()> {
        self.node_of(view_id)?;
        self.resizes.push(view_id);
        Ok(())
    }

    fn insert_after_anchor(
        &mut self,
        node: NodeId,
        container: ContainerId,
        anchor_selector: &str,
    ) -> HostResult<AnchorMatch> {
        let anchors = self
            .containers
            .get(&container)
            .ok_or(HostError::ContainerGone(container))?;
        if !anchors.contains(anchor_selector) {
            return Ok(AnchorMatch::Missing);
        }
        self.parents.insert(node, container);
        self.inserts += 1;
        Ok(AnchorMatch::Inserted)
    }

    fn detach_node(&mut self, node: NodeId) {
        self.parents.remove(&node);
    }

    fn container_exists(&self, container: ContainerId) -> bool {
        self.containers.contains_key(&container)
    }

    fn apply_style(&mut self, node: NodeId, style: &ViewStyle) -> HostResult<()> {
        if !self.overlay_intercept.contains_key(&node) {
            return Err(HostError::Rejected(format!("unknown node {node}")));
        }
        self.styles.insert(node, *style);
        Ok(())
    }

    fn set_overlay_intercept(&mut self, node: NodeId, intercept: bool) -> HostResult<()> {
        match self.overlay_intercept.get_mut(&node) {
            Some(current) => {
                *current = intercept;
                Ok(())
            }
            None => Err(HostError::Rejected(format!("unknown node {node}"))),
        }
    }

    fn register_outside_pointer_listener(&mut self, view_id: ViewId) -> ListenerId {
        let listener = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.insert(listener, view_id);
        listener
    }

    fn unregister_listener(&mut self, listener: ListenerId) {
        self.listeners.remove(&listener);
    }

    fn active_view(&self) -> Option<ActiveView> {
        self.active.clone()
    }

    fn current_mode(&self) -> ViewMode {
        self.mode
    }

    fn device_class(&self) -> DeviceClass {
        self.device
    }

    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}
