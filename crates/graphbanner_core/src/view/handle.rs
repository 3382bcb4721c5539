//! One reusable embedded graph view.
//!
//! # Responsibility
//! - Own the host node created for the visualization instance.
//! - Track which document the visualization renders and skip redundant rebinds.
//! - Insert/reposition the node after a title anchor in a host container.
//! - Run the click-to-activate state machine for drag/zoom input.
//!
//! # Invariants
//! - `bind` reinitializes the visualization at most once per distinct document;
//!   a request for the target already in flight is a no-op.
//! - The outside-pointer listener exists only while the handle is active.
//! - `attached_parent` is a back-reference; the container belongs to the host.

use crate::host::{AnchorMatch, BindProgress, HostCapability, HostError, HostResult};
use crate::model::view::{ContainerId, ListenerId, NodeId, ViewId, ViewStyle};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

/// Visualization reinitialization failure. Non-fatal; retried on the next trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// Host visualization capability is not available.
    Unavailable,
    /// Target document no longer exists.
    DocumentMissing(String),
    /// Any other host failure.
    Host(HostError),
}

impl Display for BindError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "graph view capability is unavailable"),
            Self::DocumentMissing(path) => write!(f, "cannot bind missing document: {path}"),
            Self::Host(err) => write!(f, "graph view bind failed: {err}"),
        }
    }
}

impl Error for BindError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Host(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HostError> for BindError {
    fn from(value: HostError) -> Self {
        match value {
            HostError::Unavailable => Self::Unavailable,
            HostError::DocumentNotFound(path) => Self::DocumentMissing(path),
            other => Self::Host(other),
        }
    }
}

/// Outcome of [`ViewHandle::bind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindStatus {
    /// Already bound to the document; nothing requested.
    Unchanged,
    /// Visualization reinitialized synchronously.
    Rebound,
    /// Reinitialization requested; completion arrives later.
    Pending,
    /// Same target already in flight; nothing requested.
    InFlight,
}

/// Outcome of [`ViewHandle::finish_bind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindCompletion {
    Applied,
    /// Completion for a target that is no longer in flight.
    Stale,
    Failed(BindError),
}

/// Outcome of [`ViewHandle::place`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceStatus {
    /// Node inserted (or moved) after the anchor.
    Inserted,
    /// Already in place; only the viewport was refreshed.
    Resized,
    /// Anchor not found; nothing changed.
    AnchorMissing,
}

/// Interactive-mode state of one handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// Overlay intercepts pointer input; the graph is static.
    Passive,
    /// Drag/zoom reach the visualization.
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InteractionState {
    Passive,
    Active { listener: ListenerId },
}

/// One embedded visualization instance and its container node.
#[derive(Debug)]
pub struct ViewHandle {
    id: ViewId,
    node: NodeId,
    bound_path: Option<String>,
    in_flight: Option<String>,
    attached_parent: Option<ContainerId>,
    interaction: InteractionState,
    style: ViewStyle,
}

impl ViewHandle {
    /// Creates the visualization instance and its node through the host.
    pub fn create(host: &mut dyn HostCapability, height_px: u32) -> HostResult<Self> {
        let id = Uuid::new_v4();
        let node = host.create_embedded_view(id)?;
        let style = ViewStyle::initial(height_px);
        if let Err(err) = host.apply_style(node, &style) {
            warn!(
                "event=view_style module=view status=error view_id={} error={}",
                id, err
            );
        }
        info!(
            "event=view_create module=view status=ok view_id={} node={}",
            id, node
        );

        Ok(Self {
            id,
            node,
            bound_path: None,
            in_flight: None,
            attached_parent: None,
            interaction: InteractionState::Passive,
            style,
        })
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Document the visualization currently renders; `None` until first bind.
    pub fn bound_path(&self) -> Option<&str> {
        self.bound_path.as_deref()
    }

    /// Target of an outstanding asynchronous bind.
    pub fn binding_target(&self) -> Option<&str> {
        self.in_flight.as_deref()
    }

    /// Container recorded by the last successful placement.
    pub fn attached_parent(&self) -> Option<ContainerId> {
        self.attached_parent
    }

    /// Attached parent, only if the host still has that container.
    pub fn live_parent(&self, host: &dyn HostCapability) -> Option<ContainerId> {
        self.attached_parent
            .filter(|container| host.container_exists(*container))
    }

    pub fn interaction(&self) -> Interaction {
        match self.interaction {
            InteractionState::Passive => Interaction::Passive,
            InteractionState::Active { .. } => Interaction::Active,
        }
    }

    pub fn style(&self) -> ViewStyle {
        self.style
    }

    /// Binds the visualization to `document_path`, reinitializing only on change.
    ///
    /// # Errors
    /// Returns [`BindError`] when the host cannot reinitialize; the previous
    /// binding is kept.
    pub fn bind(
        &mut self,
        host: &mut dyn HostCapability,
        document_path: &str,
    ) -> Result<BindStatus, BindError> {
        if self.in_flight.as_deref() == Some(document_path) {
            return Ok(BindStatus::InFlight);
        }
        if self.bound_path.as_deref() == Some(document_path) {
            // Back on the bound document: an outstanding request is superseded.
            if self.in_flight.take().is_some() {
                debug!(
                    "event=view_bind module=view status=superseded view_id={}",
                    self.id
                );
            }
            return Ok(BindStatus::Unchanged);
        }

        let started_at = Instant::now();
        match host.reinitialize_view(self.id, document_path) {
            Ok(BindProgress::Ready) => {
                self.bound_path = Some(document_path.to_string());
                self.in_flight = None;
                info!(
                    "event=view_bind module=view status=ok view_id={} duration_ms={}",
                    self.id,
                    started_at.elapsed().as_millis()
                );
                debug!("event=view_bind module=view view_id={} path={}", self.id, document_path);
                Ok(BindStatus::Rebound)
            }
            Ok(BindProgress::Pending) => {
                self.in_flight = Some(document_path.to_string());
                info!(
                    "event=view_bind module=view status=pending view_id={}",
                    self.id
                );
                Ok(BindStatus::Pending)
            }
            Err(err) => {
                self.in_flight = None;
                warn!(
                    "event=view_bind module=view status=error view_id={} error={}",
                    self.id, err
                );
                Err(err.into())
            }
        }
    }

    /// Applies the completion of an asynchronous bind for `document_path`.
    pub fn finish_bind(
        &mut self,
        document_path: &str,
        result: HostResult<()>,
    ) -> BindCompletion {
        if self.in_flight.as_deref() != Some(document_path) {
            debug!(
                "event=view_bind_complete module=view status=stale view_id={}",
                self.id
            );
            return BindCompletion::Stale;
        }
        self.in_flight = None;

        match result {
            Ok(()) => {
                self.bound_path = Some(document_path.to_string());
                info!(
                    "event=view_bind_complete module=view status=ok view_id={}",
                    self.id
                );
                BindCompletion::Applied
            }
            Err(err) => {
                warn!(
                    "event=view_bind_complete module=view status=error view_id={} error={}",
                    self.id, err
                );
                BindCompletion::Failed(err.into())
            }
        }
    }

    /// Forgets the current binding so the next `bind` reinitializes unconditionally.
    pub fn invalidate_binding(&mut self) {
        self.bound_path = None;
        self.in_flight = None;
    }

    /// Places the node after `anchor_selector` inside `container`.
    ///
    /// Already attached to a live `container`: only notifies a resize. Missing
    /// anchor: no effect, the caller retries on the next trigger.
    pub fn place(
        &mut self,
        host: &mut dyn HostCapability,
        container: ContainerId,
        anchor_selector: &str,
    ) -> HostResult<PlaceStatus> {
        if self.live_parent(host) == Some(container) {
            host.resize(self.id)?;
            return Ok(PlaceStatus::Resized);
        }

        match host.insert_after_anchor(self.node, container, anchor_selector)? {
            AnchorMatch::Missing => {
                debug!(
                    "event=view_place module=view status=skip view_id={} container={} reason=anchor_missing",
                    self.id, container
                );
                Ok(PlaceStatus::AnchorMissing)
            }
            AnchorMatch::Inserted => {
                let previous = self.attached_parent.replace(container);
                info!(
                    "event=view_place module=view status=ok view_id={} container={} moved_from={}",
                    self.id,
                    container,
                    previous.map_or_else(|| "none".to_string(), |c| c.to_string())
                );
                Ok(PlaceStatus::Inserted)
            }
        }
    }

    /// Unlinks the node from its parent without destroying the view.
    pub fn detach(&mut self, host: &mut dyn HostCapability) {
        if self.attached_parent.take().is_some() {
            host.detach_node(self.node);
        }
    }

    pub fn set_visible(&mut self, host: &mut dyn HostCapability, visible: bool) {
        self.update_style(host, |style| style.visible = visible);
    }

    pub fn set_compact(&mut self, host: &mut dyn HostCapability, compact: bool) {
        self.update_style(host, |style| style.compact = compact);
    }

    pub fn set_simplified(&mut self, host: &mut dyn HostCapability, simplified: bool) {
        self.update_style(host, |style| style.simplified = simplified);
    }

    pub fn set_height(&mut self, host: &mut dyn HostCapability, height_px: u32) {
        self.update_style(host, |style| style.height_px = height_px);
    }

    /// Pointer-up on the overlay: passive -> active.
    ///
    /// Returns `true` when the state changed.
    pub fn on_overlay_pointer_up(&mut self, host: &mut dyn HostCapability) -> bool {
        if self.interaction != InteractionState::Passive {
            return false;
        }
        if let Err(err) = host.set_overlay_intercept(self.node, false) {
            warn!(
                "event=view_activate module=view status=error view_id={} error={}",
                self.id, err
            );
            return false;
        }

        let listener = host.register_outside_pointer_listener(self.id);
        self.interaction = InteractionState::Active { listener };
        self.update_style(host, |style| style.active = true);
        debug!("event=view_activate module=view status=ok view_id={}", self.id);
        true
    }

    /// Pointer-down outside the handle's container: active -> passive.
    ///
    /// Returns `true` when the state changed.
    pub fn on_outside_pointer_down(&mut self, host: &mut dyn HostCapability) -> bool {
        let InteractionState::Active { listener } = self.interaction else {
            return false;
        };
        host.unregister_listener(listener);
        self.interaction = InteractionState::Passive;

        if let Err(err) = host.set_overlay_intercept(self.node, true) {
            warn!(
                "event=view_deactivate module=view status=error view_id={} error={}",
                self.id, err
            );
        }
        self.update_style(host, |style| style.active = false);
        debug!("event=view_deactivate module=view status=ok view_id={}", self.id);
        true
    }

    /// Unregisters listeners, unlinks the node and releases the visualization.
    pub fn destroy(mut self, host: &mut dyn HostCapability) {
        if let InteractionState::Active { listener } = self.interaction {
            host.unregister_listener(listener);
            self.interaction = InteractionState::Passive;
        }
        host.detach_node(self.node);
        self.attached_parent = None;
        host.destroy_embedded_view(self.id);
        info!("event=view_destroy module=view status=ok view_id={}", self.id);
    }

    fn update_style(&mut self, host: &mut dyn HostCapability, change: impl FnOnce(&mut ViewStyle)) {
        let mut next = self.style;
        change(&mut next);
        if next == self.style {
            return;
        }
        match host.apply_style(self.node, &next) {
            Ok(()) => self.style = next,
            Err(err) => warn!(
                "event=view_style module=view status=error view_id={} error={}",
                self.id, err
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BindCompletion, BindError, BindStatus, Interaction, PlaceStatus, ViewHandle};
    use crate::host::{HostError, MemoryHost};
    use crate::model::view::TITLE_ANCHOR_SELECTOR;

    fn handle_with_host() -> (ViewHandle, MemoryHost) {
        let mut host = MemoryHost::new();
        let handle = ViewHandle::create(&mut host, 200).expect("handle should be created");
        (handle, host)
    }

    #[test]
    fn bind_same_path_twice_reinitializes_once() {
        let (mut handle, mut host) = handle_with_host();
        host.add_document("a.md");

        assert_eq!(handle.bind(&mut host, "a.md"), Ok(BindStatus::Rebound));
        assert_eq!(handle.bind(&mut host, "a.md"), Ok(BindStatus::Unchanged));
        assert_eq!(host.reinit_count("a.md"), 1);
        assert_eq!(handle.bound_path(), Some("a.md"));
    }

    #[test]
    fn failed_bind_keeps_previous_binding() {
        let (mut handle, mut host) = handle_with_host();
        host.add_document("a.md");
        handle.bind(&mut host, "a.md").expect("first bind");

        let err = handle
            .bind(&mut host, "deleted.md")
            .expect_err("missing document must fail");
        assert_eq!(err, BindError::DocumentMissing("deleted.md".to_string()));
        assert_eq!(handle.bound_path(), Some("a.md"));

        host.set_available(false);
        host.add_document("b.md");
        assert_eq!(handle.bind(&mut host, "b.md"), Err(BindError::Unavailable));
        assert_eq!(handle.bound_path(), Some("a.md"));
    }

    #[test]
    fn in_flight_bind_for_same_target_is_not_repeated() {
        let (mut handle, mut host) = handle_with_host();
        host.add_document("a.md");
        host.set_async_binds(true);

        assert_eq!(handle.bind(&mut host, "a.md"), Ok(BindStatus::Pending));
        assert_eq!(handle.bind(&mut host, "a.md"), Ok(BindStatus::InFlight));
        assert_eq!(host.reinit_count("a.md"), 1);
        assert_eq!(handle.bound_path(), None);

        assert_eq!(handle.finish_bind("a.md", Ok(())), BindCompletion::Applied);
        assert_eq!(handle.bound_path(), Some("a.md"));
        assert_eq!(handle.bind(&mut host, "a.md"), Ok(BindStatus::Unchanged));
        assert_eq!(host.reinit_count("a.md"), 1);
    }

    #[test]
    fn superseded_bind_completion_is_stale() {
        let (mut handle, mut host) = handle_with_host();
        host.add_document("a.md");
        host.add_document("b.md");
        host.set_async_binds(true);

        handle.bind(&mut host, "a.md").expect("bind a");
        handle.bind(&mut host, "b.md").expect("bind b");
        assert_eq!(handle.binding_target(), Some("b.md"));

        assert_eq!(handle.finish_bind("a.md", Ok(())), BindCompletion::Stale);
        assert_eq!(handle.bound_path(), None);
        assert_eq!(
            handle.finish_bind("b.md", Err(HostError::Unavailable)),
            BindCompletion::Failed(BindError::Unavailable)
        );
        assert_eq!(handle.binding_target(), None);
    }

    #[test]
    fn invalidate_forces_rebind_of_same_document() {
        let (mut handle, mut host) = handle_with_host();
        host.add_document("a.md");
        handle.bind(&mut host, "a.md").expect("bind");

        handle.invalidate_binding();
        assert_eq!(handle.bound_path(), None);
        assert_eq!(handle.bind(&mut host, "a.md"), Ok(BindStatus::Rebound));
        assert_eq!(host.reinit_count("a.md"), 2);
        assert_eq!(handle.bound_path(), Some("a.md"));
    }

    #[test]
    fn place_inserts_once_then_only_resizes() {
        let (mut handle, mut host) = handle_with_host();
        let container = host.open_document("a.md");

        let first = handle
            .place(&mut host, container, TITLE_ANCHOR_SELECTOR)
            .expect("place");
        assert_eq!(first, PlaceStatus::Inserted);
        let second = handle
            .place(&mut host, container, TITLE_ANCHOR_SELECTOR)
            .expect("place");
        assert_eq!(second, PlaceStatus::Resized);

        assert_eq!(host.insert_count(), 1);
        assert_eq!(host.resize_count(handle.id()), 1);
        assert_eq!(host.parent_of(handle.node()), Some(container));
    }

    #[test]
    fn place_without_anchor_has_no_effect() {
        let (mut handle, mut host) = handle_with_host();
        let ready = host.open_document("a.md");
        handle
            .place(&mut host, ready, TITLE_ANCHOR_SELECTOR)
            .expect("place");

        let loading = host.open_container(&[]);
        let status = handle
            .place(&mut host, loading, TITLE_ANCHOR_SELECTOR)
            .expect("place");
        assert_eq!(status, PlaceStatus::AnchorMissing);
        assert_eq!(handle.attached_parent(), Some(ready));
        assert_eq!(host.parent_of(handle.node()), Some(ready));
    }

    #[test]
    fn place_moves_node_between_containers() {
        let (mut handle, mut host) = handle_with_host();
        let first = host.open_document("a.md");
        let second = host.open_document("b.md");

        handle
            .place(&mut host, first, TITLE_ANCHOR_SELECTOR)
            .expect("place first");
        handle
            .place(&mut host, second, TITLE_ANCHOR_SELECTOR)
            .expect("place second");
        assert_eq!(handle.attached_parent(), Some(second));
        assert_eq!(host.parent_of(handle.node()), Some(second));
    }

    #[test]
    fn interaction_cycles_do_not_leak_listeners() {
        let (mut handle, mut host) = handle_with_host();
        assert_eq!(handle.interaction(), Interaction::Passive);
        assert!(!handle.on_outside_pointer_down(&mut host));

        for _ in 0..5 {
            assert!(handle.on_overlay_pointer_up(&mut host));
            assert!(!handle.on_overlay_pointer_up(&mut host));
            assert_eq!(handle.interaction(), Interaction::Active);
            assert!(!host.overlay_intercepts(handle.node()));
            assert!(handle.style().active);
            assert_eq!(host.listener_count(), 1);

            assert!(handle.on_outside_pointer_down(&mut host));
            assert_eq!(handle.interaction(), Interaction::Passive);
            assert!(host.overlay_intercepts(handle.node()));
            assert!(!handle.style().active);
            assert_eq!(host.listener_count(), 0);
        }
    }

    #[test]
    fn destroy_releases_listener_node_and_view() {
        let (mut handle, mut host) = handle_with_host();
        let container = host.open_document("a.md");
        handle
            .place(&mut host, container, TITLE_ANCHOR_SELECTOR)
            .expect("place");
        handle.on_overlay_pointer_up(&mut host);
        let id = handle.id();
        let node = handle.node();

        handle.destroy(&mut host);
        assert_eq!(host.listener_count(), 0);
        assert_eq!(host.parent_of(node), None);
        assert_eq!(host.destroyed(), &[id]);
        assert_eq!(host.live_view_count(), 0);
    }

    #[test]
    fn style_changes_reach_host() {
        let (mut handle, mut host) = handle_with_host();
        handle.set_visible(&mut host, true);
        handle.set_compact(&mut host, true);
        handle.set_simplified(&mut host, true);
        handle.set_height(&mut host, 320);

        let style = host.style_of(handle.node()).expect("style applied");
        assert!(style.visible && style.compact && style.simplified);
        assert_eq!(style.height_px, 320);
        assert_eq!(style, handle.style());
    }
}
