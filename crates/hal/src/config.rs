//! Process-wide HAL tunables.

use std::sync::{Mutex, OnceLock};

/// Default acquire-fence wait (milliseconds).
pub const DEFAULT_FENCE_TIMEOUT_MS: u64 = 5_000;
/// Default waiting-queue depth (requests).
pub const DEFAULT_QUEUE_DEPTH: usize = 4;
/// Default video node.
pub const DEFAULT_DEVICE_PATH: &str = "/dev/video0";

/// Tunables for the capture pipeline.
#[derive(Clone, Copy, Debug)]
pub struct HalTunables {
    pub fence_timeout_ms: u64,
    pub queue_depth: usize,
}

impl Default for HalTunables {
    fn default() -> Self {
        Self {
            fence_timeout_ms: DEFAULT_FENCE_TIMEOUT_MS,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

impl HalTunables {
    fn sanitized(self) -> Self {
        Self {
            fence_timeout_ms: self.fence_timeout_ms.max(1),
            queue_depth: self.queue_depth.max(1),
        }
    }
}

static HAL_TUNABLES: OnceLock<Mutex<HalTunables>> = OnceLock::new();

/// Override pipeline tunables process-wide.
pub fn set_hal_tunables(tunables: HalTunables) {
    let lock = HAL_TUNABLES.get_or_init(|| Mutex::new(HalTunables::default()));
    if let Ok(mut guard) = lock.lock() {
        *guard = tunables.sanitized();
    }
}

pub(crate) fn hal_tunables() -> HalTunables {
    HAL_TUNABLES
        .get()
        .and_then(|lock| lock.lock().ok().map(|t| *t))
        .unwrap_or_default()
}

/// Builder for process-wide tunables.
#[derive(Clone, Debug, Default)]
pub struct HalConfig {
    tunables: HalTunables,
}

impl HalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the acquire-fence wait.
    pub fn fence_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.tunables.fence_timeout_ms = timeout_ms;
        self
    }

    /// Override the waiting-queue depth.
    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.tunables.queue_depth = depth;
        self
    }

    /// Apply the configuration to the global tunables.
    pub fn apply(self) {
        set_hal_tunables(self.tunables);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_contract() {
        let tunables = HalTunables::default();
        assert_eq!(tunables.fence_timeout_ms, 5_000);
        assert!(tunables.queue_depth >= 1);
    }

    #[test]
    fn sanitize_clamps_zeroes() {
        let tunables = HalTunables {
            fence_timeout_ms: 0,
            queue_depth: 0,
        }
        .sanitized();
        assert_eq!(tunables.fence_timeout_ms, 1);
        assert_eq!(tunables.queue_depth, 1);
    }
}
