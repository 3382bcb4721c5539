//! Process-wide banner runtime.
//!
//! # Responsibility
//! - Own the host capability, settings, compiled ignore rules, view pool and
//!   layout debounce for the lifetime of the plugin.
//! - Route host events (file open, layout change, clock ticks, pointer input,
//!   asynchronous bind completion, toggle command, settings edits) into
//!   placement resolutions.
//! - Tear everything down exactly once.
//!
//! # Invariants
//! - Layout-change bursts resolve once per quiet window, against the active view
//!   the host reports when the window elapses.
//! - A synchronous layout resolution drops any pending debounced one.
//! - Settings reaching the pool or the engine are always valid; rejected input
//!   keeps the previous value and notifies the user.
//! - After shutdown no trigger resolves and no scheduled work fires.

use crate::host::{HostCapability, HostResult};
use crate::ignore::IgnoreRules;
use crate::model::policy::{EditModeBehavior, MobileBehavior};
use crate::model::view::{ActiveView, ViewId};
use crate::repo::settings_repo::SettingsRepository;
use crate::schedule::DebounceScheduler;
use crate::service::placement::{PlacementEngine, PlacementOutcome, RefreshMode, Trigger};
use crate::settings::{BannerSettings, ConfigError, NumericSetting};
use crate::view::{BindCompletion, Interaction, ViewPool};
use log::{debug, info, warn};

/// Stable id of the per-note toggle command.
pub const TOGGLE_COMMAND_ID: &str = "toggle-graph-banner";
/// User-facing name of the per-note toggle command.
pub const TOGGLE_COMMAND_NAME: &str = "Toggle graph banner for current note";

/// Pointer input relevant to the interactive-mode state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    /// Pointer released on a handle's overlay.
    OverlayUp { view_id: ViewId },
    /// Pointer pressed somewhere; `inside` names the handle whose container
    /// contains the target, if any.
    Down { inside: Option<ViewId> },
}

/// Result of the toggle command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleResult {
    pub document_path: String,
    /// Whether the banner is now disabled for the document.
    pub disabled: bool,
    pub outcome: PlacementOutcome,
}

/// Owning context for the banner core.
pub struct BannerRuntime<H: HostCapability> {
    host: H,
    settings: BannerSettings,
    ignore: IgnoreRules,
    pool: ViewPool,
    layout_debounce: DebounceScheduler<()>,
    store: Option<Box<dyn SettingsRepository>>,
    shut_down: bool,
}

impl<H: HostCapability> BannerRuntime<H> {
    /// Starts the runtime with explicit settings.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when `settings` fail validation.
    pub fn new(host: H, settings: BannerSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self::start(host, settings, None))
    }

    /// Starts the runtime with settings loaded from `store`.
    ///
    /// Missing settings start from defaults. Unreadable or invalid settings
    /// also fall back to defaults and the user is notified.
    pub fn with_store(mut host: H, store: Box<dyn SettingsRepository>) -> Self {
        let settings = match store.load() {
            Ok(Some(settings)) => settings,
            Ok(None) => BannerSettings::default(),
            Err(err) => {
                warn!(
                    "event=runtime_start module=runtime status=degraded error_code=settings_load_failed error={}",
                    err
                );
                host.notify(&format!(
                    "Graph banner settings could not be loaded and were reset: {err}"
                ));
                BannerSettings::default()
            }
        };
        Self::start(host, settings, Some(store))
    }

    fn start(
        host: H,
        settings: BannerSettings,
        store: Option<Box<dyn SettingsRepository>>,
    ) -> Self {
        info!(
            "event=runtime_start module=runtime status=ok capacity={} debounce_ms={} grace_ms={} ignore_rules={} disabled_notes={}",
            settings.capacity,
            settings.debounce_ms,
            settings.teardown_grace_ms,
            settings.ignore_patterns.len(),
            settings.disabled_notes.len()
        );
        Self {
            ignore: IgnoreRules::compile(&settings.ignore_patterns),
            pool: ViewPool::new(settings.capacity),
            layout_debounce: DebounceScheduler::new(settings.debounce_ms),
            host,
            settings,
            store,
            shut_down: false,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn settings(&self) -> &BannerSettings {
        &self.settings
    }

    pub fn pool(&self) -> &ViewPool {
        &self.pool
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn has_pending_layout_change(&self) -> bool {
        self.layout_debounce.is_pending()
    }

    /// Earliest time at which [`BannerRuntime::tick`] has work to do.
    pub fn next_deadline(&self) -> Option<u64> {
        match (
            self.layout_debounce.due_at(),
            self.pool.next_retirement_due(),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// A document was opened; resolves immediately.
    pub fn on_file_open(&mut self) -> Option<PlacementOutcome> {
        self.resolve_active(Trigger::FileOpen, RefreshMode::Normal)
    }

    /// Workspace layout changed; debounced unless the quiet window is 0.
    ///
    /// Returns the outcome only when resolved synchronously.
    pub fn on_layout_change(&mut self, now_ms: u64) -> Option<PlacementOutcome> {
        if self.shut_down {
            return None;
        }
        if self.settings.debounce_ms == 0 {
            self.layout_debounce.cancel();
            return self.resolve_active(Trigger::LayoutChange, RefreshMode::Normal);
        }

        let restarted = self.layout_debounce.trigger(now_ms, ());
        debug!(
            "event=layout_change module=runtime status=scheduled restarted={} due_ms={}",
            restarted,
            self.layout_debounce.due_at().unwrap_or(now_ms)
        );
        None
    }

    /// Advances scheduled work to `now_ms`: retirements, then the debounced
    /// layout resolution when its quiet window elapsed.
    pub fn tick(&mut self, now_ms: u64) -> Option<PlacementOutcome> {
        if self.shut_down {
            return None;
        }
        let retired = self.pool.fire_due(&mut self.host, now_ms);
        if retired > 0 {
            debug!(
                "event=runtime_tick module=runtime status=ok retired={}",
                retired
            );
        }

        let fired = self.layout_debounce.poll(now_ms)?;
        debug!(
            "event=layout_change module=runtime status=fired coalesced={}",
            fired.coalesced
        );
        self.resolve_active(Trigger::LayoutChange, RefreshMode::Normal)
    }

    /// Re-resolves the active document; `Forced` rebinds even when unchanged.
    pub fn refresh(&mut self, refresh: RefreshMode) -> Option<PlacementOutcome> {
        self.resolve_active(Trigger::SettingsChange, refresh)
    }

    /// Runs the per-note toggle command for the active document.
    ///
    /// Returns `None` when no document is active or after shutdown.
    pub fn toggle_current_note(&mut self) -> Option<ToggleResult> {
        if self.shut_down {
            return None;
        }
        let active = self.host.active_view()?;
        let document_path = active.document_path.clone()?;

        let disabled = self.settings.toggle_note(&document_path);
        info!(
            "event=command module=runtime status=ok command={} disabled={}",
            TOGGLE_COMMAND_ID, disabled
        );
        self.persist();

        let outcome = self.resolve(Some(&active), Trigger::NoteToggle, RefreshMode::Normal);
        Some(ToggleResult {
            document_path,
            disabled,
            outcome,
        })
    }

    /// Applies raw settings input for one numeric setting.
    ///
    /// Height changes force a rebind of the active banner; other changes
    /// re-resolve normally.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for malformed or out-of-range input; the previous
    /// value is kept and the user is notified.
    pub fn update_numeric_setting(
        &mut self,
        setting: NumericSetting,
        raw: &str,
        now_ms: u64,
    ) -> Result<Option<PlacementOutcome>, ConfigError> {
        let value = match self.settings.set_numeric(setting, raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    "event=settings_update module=runtime status=error key={} error={}",
                    setting.key(),
                    err
                );
                self.host.notify(&format!("Graph banner: {err}"));
                return Err(err);
            }
        };
        info!(
            "event=settings_update module=runtime status=ok key={} value={}",
            setting.key(),
            value
        );

        match setting {
            NumericSetting::Capacity => {
                self.pool.set_capacity(
                    &mut self.host,
                    self.settings.capacity,
                    now_ms,
                    self.settings.teardown_grace_ms,
                );
            }
            NumericSetting::DebounceMs => {
                self.layout_debounce.set_quiet_ms(value);
                if value == 0 && self.layout_debounce.cancel() {
                    debug!(
                        "event=layout_change module=runtime status=canceled reason=quiet_window_zero"
                    );
                }
            }
            NumericSetting::TeardownGraceMs | NumericSetting::BannerHeightPx => {}
        }
        self.persist();

        let refresh = if setting == NumericSetting::BannerHeightPx {
            RefreshMode::Forced
        } else {
            RefreshMode::Normal
        };
        Ok(self.refresh(refresh))
    }

    pub fn set_edit_mode_behavior(
        &mut self,
        behavior: EditModeBehavior,
    ) -> Option<PlacementOutcome> {
        self.settings.edit_mode_behavior = behavior;
        self.persist();
        self.refresh(RefreshMode::Normal)
    }

    pub fn set_mobile_behavior(&mut self, behavior: MobileBehavior) -> Option<PlacementOutcome> {
        self.settings.mobile_behavior = behavior;
        self.persist();
        self.refresh(RefreshMode::Normal)
    }

    /// Replaces the ignore lines and re-resolves.
    pub fn set_ignore_patterns(&mut self, lines: Vec<String>) -> Option<PlacementOutcome> {
        self.ignore = IgnoreRules::compile(&lines);
        self.settings.ignore_patterns = lines;
        self.persist();
        self.refresh(RefreshMode::Normal)
    }

    /// Routes the host's completion of an asynchronous bind.
    ///
    /// A failed completion hides the banner until the next trigger.
    pub fn on_bind_complete(
        &mut self,
        view_id: ViewId,
        document_path: &str,
        result: HostResult<()>,
    ) -> Option<BindCompletion> {
        if self.shut_down {
            return None;
        }
        let handle = self.pool.get_mut(view_id)?;
        let completion = handle.finish_bind(document_path, result);
        if matches!(completion, BindCompletion::Failed(_)) {
            handle.set_visible(&mut self.host, false);
        }
        Some(completion)
    }

    /// Dispatches pointer input to the handles' interactive-mode state.
    ///
    /// Returns the number of handles that changed state.
    pub fn on_pointer(&mut self, event: PointerEvent) -> usize {
        if self.shut_down {
            return 0;
        }
        match event {
            PointerEvent::OverlayUp { view_id } => self
                .pool
                .get_mut(view_id)
                .map_or(0, |handle| usize::from(handle.on_overlay_pointer_up(&mut self.host))),
            PointerEvent::Down { inside } => {
                let mut changed = 0;
                for handle in self.pool.iter_mut() {
                    if Some(handle.id()) == inside || handle.interaction() == Interaction::Passive
                    {
                        continue;
                    }
                    if handle.on_outside_pointer_down(&mut self.host) {
                        changed += 1;
                    }
                }
                changed
            }
        }
    }

    /// Cancels pending work and destroys every pooled view. Idempotent.
    ///
    /// Returns the number of destroyed views.
    pub fn shutdown(&mut self) -> usize {
        if self.shut_down {
            return 0;
        }
        let canceled_layout = self.layout_debounce.cancel();
        let destroyed = self.pool.teardown(&mut self.host);
        self.shut_down = true;
        info!(
            "event=runtime_shutdown module=runtime status=ok destroyed={} canceled_layout={}",
            destroyed, canceled_layout
        );
        destroyed
    }

    fn resolve_active(
        &mut self,
        trigger: Trigger,
        refresh: RefreshMode,
    ) -> Option<PlacementOutcome> {
        if self.shut_down {
            return None;
        }
        let active = self.host.active_view();
        Some(self.resolve(active.as_ref(), trigger, refresh))
    }

    fn resolve(
        &mut self,
        active: Option<&ActiveView>,
        trigger: Trigger,
        refresh: RefreshMode,
    ) -> PlacementOutcome {
        PlacementEngine::new(
            &mut self.host,
            &mut self.pool,
            &self.settings,
            &self.ignore,
        )
        .resolve(active, trigger, refresh)
    }

    fn persist(&mut self) {
        let Some(store) = self.store.as_mut() else {
            return;
        };
        if let Err(err) = store.save(&self.settings) {
            warn!(
                "event=settings_save module=runtime status=error error={}",
                err
            );
        }
    }
}

impl<H: HostCapability> Drop for BannerRuntime<H> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::{BannerRuntime, PointerEvent};
    use crate::host::MemoryHost;
    use crate::settings::{BannerSettings, ConfigError, NumericSetting};
    use crate::view::Interaction;

    fn runtime() -> BannerRuntime<MemoryHost> {
        BannerRuntime::new(MemoryHost::new(), BannerSettings::default())
            .expect("default settings are valid")
    }

    #[test]
    fn rejects_invalid_initial_settings() {
        let mut settings = BannerSettings::default();
        settings.capacity = 0;
        let err = BannerRuntime::new(MemoryHost::new(), settings)
            .err()
            .expect("zero capacity must be rejected");
        assert!(matches!(err, ConfigError::OutOfRange { key: "capacity", .. }));
    }

    #[test]
    fn pointer_events_drive_only_targeted_handles() {
        let mut runtime = runtime();
        runtime.host_mut().open_document("a.md");
        let first = runtime
            .on_file_open()
            .and_then(|outcome| outcome.view_id())
            .expect("first banner");
        runtime.host_mut().open_document("b.md");
        let second = runtime
            .on_file_open()
            .and_then(|outcome| outcome.view_id())
            .expect("second banner");

        assert_eq!(runtime.on_pointer(PointerEvent::OverlayUp { view_id: first }), 1);
        assert_eq!(runtime.on_pointer(PointerEvent::OverlayUp { view_id: second }), 1);
        assert_eq!(runtime.host().listener_count(), 2);

        assert_eq!(runtime.on_pointer(PointerEvent::Down { inside: Some(first) }), 1);
        let interaction = |id| {
            runtime
                .pool()
                .get(id)
                .map(|handle| handle.interaction())
                .expect("pooled")
        };
        assert_eq!(interaction(first), Interaction::Active);
        assert_eq!(interaction(second), Interaction::Passive);
        assert_eq!(runtime.host().listener_count(), 1);

        assert_eq!(runtime.on_pointer(PointerEvent::Down { inside: None }), 1);
        assert_eq!(runtime.host().listener_count(), 0);
    }

    #[test]
    fn invalid_numeric_input_notifies_and_keeps_value() {
        let mut runtime = runtime();
        let err = runtime
            .update_numeric_setting(NumericSetting::BannerHeightPx, "tall", 0)
            .expect_err("non-numeric height must fail");
        assert!(matches!(err, ConfigError::NotANumber { .. }));
        assert_eq!(
            runtime.settings().banner_height_px,
            BannerSettings::default().banner_height_px
        );
        assert_eq!(runtime.host().notices().len(), 1);
        assert!(runtime.host().notices()[0].contains("banner_height_px"));
    }

    #[test]
    fn zero_quiet_window_drops_pending_layout_change() {
        let mut runtime = runtime();
        let pane = runtime.host_mut().open_document("a.md");
        runtime.on_file_open();
        runtime.on_layout_change(0);
        assert!(runtime.has_pending_layout_change());

        runtime.host_mut().show_document(pane, "b.md");
        runtime
            .update_numeric_setting(NumericSetting::DebounceMs, "0", 10)
            .expect("zero is in range");
        assert!(!runtime.has_pending_layout_change());

        assert!(runtime.on_layout_change(20).is_some());
        assert!(runtime.tick(1_000).is_none());
        assert_eq!(runtime.host().reinit_count("a.md"), 1);
        assert_eq!(runtime.host().reinit_count("b.md"), 1);
    }

    #[test]
    fn synchronous_layout_change_drops_pending_one() {
        let mut runtime = runtime();
        runtime.host_mut().open_document("a.md");
        runtime.on_layout_change(0);

        runtime.settings.debounce_ms = 0;
        assert!(runtime.on_layout_change(10).is_some());
        assert!(!runtime.has_pending_layout_change());
        assert!(runtime.tick(1_000).is_none());
    }

    #[test]
    fn shutdown_is_idempotent_and_stops_triggers() {
        let mut runtime = runtime();
        runtime.host_mut().open_document("a.md");
        runtime.on_file_open();
        runtime.on_layout_change(0);

        assert_eq!(runtime.shutdown(), 1);
        assert_eq!(runtime.shutdown(), 0);
        assert!(runtime.on_file_open().is_none());
        assert!(runtime.tick(u64::MAX).is_none());
        assert!(!runtime.has_pending_layout_change());
        assert_eq!(runtime.host().live_view_count(), 0);
    }
}
