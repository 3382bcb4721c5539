//! Core logic for the graph banner.
//! Owns view pooling, placement resolution and settings; the host editor is
//! reached only through [`host::HostCapability`].

pub mod db;
pub mod host;
pub mod ignore;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schedule;
pub mod service;
pub mod settings;
pub mod view;

pub use host::{HostCapability, HostError, HostResult, MemoryHost};
pub use ignore::{is_ignored, IgnoreRule, IgnoreRules};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::policy::{EditModeBehavior, MobileBehavior};
pub use model::view::{ActiveView, ContainerId, DeviceClass, ViewId, ViewKind, ViewMode};
pub use repo::settings_repo::{
    RepoError, RepoResult, SettingsRepository, SqliteSettingsRepository,
};
pub use schedule::{DebounceScheduler, TimerQueue};
pub use service::placement::{PlacementEngine, PlacementOutcome, RefreshMode, Trigger};
pub use service::runtime::{BannerRuntime, PointerEvent, ToggleResult};
pub use settings::{BannerSettings, ConfigError, NumericSetting};
pub use view::{ViewHandle, ViewPool};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
