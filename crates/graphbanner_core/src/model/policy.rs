//! Visibility policy inputs for one placement resolution.

use crate::ignore::IgnoreRules;
use crate::model::view::{DeviceClass, ViewMode};
use crate::settings::BannerSettings;
use serde::{Deserialize, Serialize};

/// Banner behavior while the active view is in edit mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditModeBehavior {
    #[default]
    Full,
    Compact,
    Hidden,
}

/// Banner behavior on mobile devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MobileBehavior {
    #[default]
    Full,
    Simplified,
    Disabled,
}

/// Policy evaluated for one document on one resolution pass. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyContext {
    pub document_path: String,
    pub is_ignored: bool,
    pub is_per_note_disabled: bool,
    pub edit_mode_behavior: EditModeBehavior,
    pub is_edit_mode: bool,
    pub is_mobile: bool,
    pub mobile_behavior: MobileBehavior,
}

impl PolicyContext {
    pub fn evaluate(
        document_path: &str,
        settings: &BannerSettings,
        ignore: &IgnoreRules,
        mode: ViewMode,
        device: DeviceClass,
    ) -> Self {
        Self {
            document_path: document_path.to_string(),
            is_ignored: ignore.is_ignored(document_path),
            is_per_note_disabled: settings.is_note_disabled(document_path),
            edit_mode_behavior: settings.edit_mode_behavior,
            is_edit_mode: mode == ViewMode::Edit,
            is_mobile: device == DeviceClass::Mobile,
            mobile_behavior: settings.mobile_behavior,
        }
    }

    /// Either independent gate suppresses the banner for this document.
    pub fn is_suppressed(&self) -> bool {
        self.is_per_note_disabled || self.is_ignored
    }

    pub fn hides_in_edit_mode(&self) -> bool {
        self.is_edit_mode && self.edit_mode_behavior == EditModeBehavior::Hidden
    }

    pub fn compact(&self) -> bool {
        self.is_edit_mode && self.edit_mode_behavior == EditModeBehavior::Compact
    }

    pub fn disabled_on_mobile(&self) -> bool {
        self.is_mobile && self.mobile_behavior == MobileBehavior::Disabled
    }

    pub fn simplified(&self) -> bool {
        self.is_mobile && self.mobile_behavior == MobileBehavior::Simplified
    }
}

#[cfg(test)]
mod tests {
    use super::{EditModeBehavior, MobileBehavior, PolicyContext};
    use crate::ignore::IgnoreRules;
    use crate::model::view::{DeviceClass, ViewMode};
    use crate::settings::BannerSettings;

    #[test]
    fn compact_applies_only_in_edit_mode() {
        let mut settings = BannerSettings::default();
        settings.edit_mode_behavior = EditModeBehavior::Compact;
        let ignore = IgnoreRules::default();

        let editing = PolicyContext::evaluate(
            "a.md",
            &settings,
            &ignore,
            ViewMode::Edit,
            DeviceClass::Desktop,
        );
        assert!(editing.compact());
        assert!(!editing.hides_in_edit_mode());

        let reading = PolicyContext::evaluate(
            "a.md",
            &settings,
            &ignore,
            ViewMode::Read,
            DeviceClass::Desktop,
        );
        assert!(!reading.compact());
    }

    #[test]
    fn mobile_flags_ignore_desktop_devices() {
        let mut settings = BannerSettings::default();
        settings.mobile_behavior = MobileBehavior::Disabled;
        let ignore = IgnoreRules::default();

        let desktop = PolicyContext::evaluate(
            "a.md",
            &settings,
            &ignore,
            ViewMode::Read,
            DeviceClass::Desktop,
        );
        assert!(!desktop.disabled_on_mobile());

        let mobile = PolicyContext::evaluate(
            "a.md",
            &settings,
            &ignore,
            ViewMode::Read,
            DeviceClass::Mobile,
        );
        assert!(mobile.disabled_on_mobile());
        assert!(!mobile.simplified());
    }

    #[test]
    fn suppression_combines_ignore_and_per_note_gates() {
        let mut settings = BannerSettings::default();
        settings.disabled_notes.insert("daily/today.md".to_string());
        let ignore = IgnoreRules::compile(&["Archive/*"]);

        let disabled = PolicyContext::evaluate(
            "daily/today.md",
            &settings,
            &ignore,
            ViewMode::Read,
            DeviceClass::Desktop,
        );
        assert!(disabled.is_per_note_disabled);
        assert!(disabled.is_suppressed());

        let ignored = PolicyContext::evaluate(
            "Archive/old.md",
            &settings,
            &ignore,
            ViewMode::Read,
            DeviceClass::Desktop,
        );
        assert!(ignored.is_ignored);
        assert!(ignored.is_suppressed());

        let shown = PolicyContext::evaluate(
            "notes/a.md",
            &settings,
            &ignore,
            ViewMode::Read,
            DeviceClass::Desktop,
        );
        assert!(!shown.is_suppressed());
    }
}
