//! Sphere runtime configuration.

use std::time::Duration;

/// Tunables fixed at sphere creation.
#[derive(Clone, Copy, Debug, Default)]
pub struct SphereConfig {
    /// Panel count override (4 or 8). `None` sizes from available
    /// hardware parallelism.
    pub panel_count: Option<u8>,
    /// Idle time after which the coordinator notifies its parent and
    /// hibernates. `None` disables hibernation. State is never lost.
    pub inactivity_timeout: Option<Duration>,
    /// Wall-clock bound on a single frame. Expiry is fatal for the
    /// sphere. `None` disables the bound.
    pub frame_timeout: Option<Duration>,
}
