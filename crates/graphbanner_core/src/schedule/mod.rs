//! Cancelable scheduled work driven by host-supplied clock ticks.
//!
//! # Responsibility
//! - Hold delayed tasks (retirement of pooled views, debounced layout work).
//! - Release due tasks when the host reports the current time.
//!
//! # Invariants
//! - Time is supplied by the caller in milliseconds; nothing here reads a clock.
//! - Canceled tasks never fire.

pub mod debounce;
pub mod timer;

pub use debounce::DebounceScheduler;
pub use timer::TimerQueue;
