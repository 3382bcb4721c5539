//! Placement resolution for the active document view.
//!
//! # Responsibility
//! - Evaluate visibility policy for the active document.
//! - Acquire a pooled handle and realize the decision: hide, or bind + place + style.
//!
//! # Invariants
//! - Resolution never returns an error; failures degrade to a hidden or skipped
//!   banner for this cycle and are retried on the next trigger.
//! - Gates run in a fixed order: supported view, per-note disable / ignore,
//!   edit-mode hiding, mobile disabling.
//! - Suppressed documents never create a handle; an attached one is only hidden.
//! - A forced refresh clears the binding right before rebinding so the
//!   visualization re-fits even for an unchanged document.

use crate::host::HostCapability;
use crate::ignore::IgnoreRules;
use crate::model::policy::PolicyContext;
use crate::model::view::{ActiveView, ViewId, ViewKind, TITLE_ANCHOR_SELECTOR};
use crate::settings::BannerSettings;
use crate::view::{AcquireSource, BindStatus, PlaceStatus, ViewPool};
use log::{debug, info, warn};

/// Event that started a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    FileOpen,
    LayoutChange,
    NoteToggle,
    SettingsChange,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FileOpen => "file_open",
            Self::LayoutChange => "layout_change",
            Self::NoteToggle => "note_toggle",
            Self::SettingsChange => "settings_change",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Rebind only when the document changed.
    Normal,
    /// Rebind even for the same document (dimensions changed).
    Forced,
}

/// Why nothing was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleReason {
    NoActiveView,
    UnsupportedView,
    NoDocument,
    /// The active view's pane is no longer open.
    ContainerClosed,
}

/// Why the banner is hidden for the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiddenReason {
    DisabledForNote,
    Ignored,
    EditMode,
    MobileDisabled,
}

/// Why placement did not complete this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    CreateFailed,
    BindFailed,
    AnchorMissing,
    HostFailure,
}

/// Successful placement details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedView {
    pub view_id: ViewId,
    pub source: AcquireSource,
    pub bind: BindStatus,
    pub place: PlaceStatus,
    pub compact: bool,
    pub simplified: bool,
}

/// Result of one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    Idle(IdleReason),
    Hidden {
        view_id: Option<ViewId>,
        reason: HiddenReason,
    },
    Placed(PlacedView),
    Skipped {
        view_id: Option<ViewId>,
        reason: SkipReason,
    },
}

impl PlacementOutcome {
    pub fn view_id(&self) -> Option<ViewId> {
        match self {
            Self::Idle(_) => None,
            Self::Hidden { view_id, .. } | Self::Skipped { view_id, .. } => *view_id,
            Self::Placed(placed) => Some(placed.view_id),
        }
    }

    pub fn placed(&self) -> Option<&PlacedView> {
        match self {
            Self::Placed(placed) => Some(placed),
            _ => None,
        }
    }

    fn status(&self) -> &'static str {
        match self {
            Self::Idle(_) => "idle",
            Self::Hidden { .. } => "hidden",
            Self::Placed(_) => "ok",
            Self::Skipped { .. } => "skip",
        }
    }
}

/// Orchestrates policy, pool and handle for one resolution.
pub struct PlacementEngine<'a> {
    host: &'a mut dyn HostCapability,
    pool: &'a mut ViewPool,
    settings: &'a BannerSettings,
    ignore: &'a IgnoreRules,
}

impl<'a> PlacementEngine<'a> {
    pub fn new(
        host: &'a mut dyn HostCapability,
        pool: &'a mut ViewPool,
        settings: &'a BannerSettings,
        ignore: &'a IgnoreRules,
    ) -> Self {
        Self {
            host,
            pool,
            settings,
            ignore,
        }
    }

    /// Resolves banner placement for `active` as one pass over the pool.
    pub fn resolve(
        &mut self,
        active: Option<&ActiveView>,
        trigger: Trigger,
        refresh: RefreshMode,
    ) -> PlacementOutcome {
        self.pool.begin_pass();
        let outcome = self.resolve_in_pass(active, refresh);
        self.pool.end_pass();

        info!(
            "event=placement_resolve module=placement status={} trigger={} forced={} view_id={}",
            outcome.status(),
            trigger.as_str(),
            refresh == RefreshMode::Forced,
            outcome
                .view_id()
                .map_or_else(|| "none".to_string(), |id| id.to_string())
        );
        debug!(
            "event=placement_resolve module=placement outcome={:?}",
            outcome
        );
        outcome
    }

    fn resolve_in_pass(
        &mut self,
        active: Option<&ActiveView>,
        refresh: RefreshMode,
    ) -> PlacementOutcome {
        let Some(active) = active else {
            return PlacementOutcome::Idle(IdleReason::NoActiveView);
        };
        if active.kind != ViewKind::Markdown {
            return PlacementOutcome::Idle(IdleReason::UnsupportedView);
        }
        let Some(path) = active.document_path.as_deref() else {
            return PlacementOutcome::Idle(IdleReason::NoDocument);
        };
        let container = active.container;
        if !self.host.container_exists(container) {
            return PlacementOutcome::Idle(IdleReason::ContainerClosed);
        }

        let policy = PolicyContext::evaluate(
            path,
            self.settings,
            self.ignore,
            self.host.current_mode(),
            self.host.device_class(),
        );

        if policy.is_suppressed() {
            let reason = if policy.is_per_note_disabled {
                HiddenReason::DisabledForNote
            } else {
                HiddenReason::Ignored
            };
            let view_id = self.pool.find_attached(&*self.host, container);
            if let Some(view_id) = view_id {
                self.hide(view_id);
            }
            return PlacementOutcome::Hidden { view_id, reason };
        }

        let acquisition = match self.pool.acquire(
            self.host,
            container,
            path,
            self.settings.banner_height_px,
        ) {
            Ok(acquisition) => acquisition,
            Err(err) => {
                warn!(
                    "event=placement_acquire module=placement status=error container={} error={}",
                    container, err
                );
                return PlacementOutcome::Skipped {
                    view_id: None,
                    reason: SkipReason::CreateFailed,
                };
            }
        };
        let view_id = acquisition.view_id;

        if policy.hides_in_edit_mode() {
            self.hide(view_id);
            return PlacementOutcome::Hidden {
                view_id: Some(view_id),
                reason: HiddenReason::EditMode,
            };
        }
        let compact = policy.compact();

        if policy.disabled_on_mobile() {
            self.hide(view_id);
            return PlacementOutcome::Hidden {
                view_id: Some(view_id),
                reason: HiddenReason::MobileDisabled,
            };
        }
        let simplified = policy.simplified();

        let skipped = |reason| PlacementOutcome::Skipped {
            view_id: Some(view_id),
            reason,
        };
        let Some(handle) = self.pool.get_mut(view_id) else {
            return skipped(SkipReason::HostFailure);
        };

        handle.set_visible(self.host, true);
        if refresh == RefreshMode::Forced {
            handle.invalidate_binding();
        }

        let bind = match handle.bind(self.host, path) {
            Ok(status) => status,
            Err(err) => {
                warn!(
                    "event=placement_bind module=placement status=error view_id={} error={}",
                    view_id, err
                );
                handle.set_visible(self.host, false);
                return skipped(SkipReason::BindFailed);
            }
        };

        let place = match handle.place(self.host, container, TITLE_ANCHOR_SELECTOR) {
            Ok(PlaceStatus::AnchorMissing) => return skipped(SkipReason::AnchorMissing),
            Ok(status) => status,
            Err(err) => {
                warn!(
                    "event=placement_place module=placement status=error view_id={} error={}",
                    view_id, err
                );
                handle.set_visible(self.host, false);
                return skipped(SkipReason::HostFailure);
            }
        };

        handle.set_compact(self.host, compact);
        handle.set_simplified(self.host, simplified);
        handle.set_height(self.host, self.settings.banner_height_px);

        PlacementOutcome::Placed(PlacedView {
            view_id,
            source: acquisition.source,
            bind,
            place,
            compact,
            simplified,
        })
    }

    fn hide(&mut self, view_id: ViewId) {
        if let Some(handle) = self.pool.get_mut(view_id) {
            handle.set_visible(self.host, false);
        }
    }
}
