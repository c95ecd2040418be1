//! Pool set configuration

use super::tiers::{self, ClassSpec, DeviceId, tiers_for};
use crate::error::PoolResult;

/// Configuration for a [`TieredPool`](super::TieredPool).
///
/// Built once, before any pool exists, and owned by the pool set for its
/// whole lifetime.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// The size classes, in strictly increasing block-size order
    pub tiers: Vec<ClassSpec>,

    /// Upper bound on tracking-table capacity per class. `None` means the
    /// table grows as far as memory allows. A bound below a class's
    /// `min_reserve` cannot be honored and leaves that class unable to track
    /// draws at all.
    pub max_tracked: Option<usize>,

    /// Zero every block on draw, whichever side it came from
    pub zero_on_draw: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::for_device(DeviceId(0))
    }
}

impl PoolConfig {
    /// Configuration for a specific device. Unrecognized identifiers resolve
    /// to the default tier set; this never fails.
    #[must_use]
    pub fn for_device(device: DeviceId) -> Self {
        Self {
            tiers: tiers_for(device).to_vec(),
            max_tracked: None,
            zero_on_draw: true,
        }
    }

    /// Configuration with a custom tier set
    #[must_use]
    pub fn with_tiers(tiers: Vec<ClassSpec>) -> Self {
        Self {
            tiers,
            max_tracked: None,
            zero_on_draw: true,
        }
    }

    /// Bound per-class tracking-table growth
    #[must_use = "builder methods must be chained or built"]
    pub fn max_tracked(mut self, limit: usize) -> Self {
        self.max_tracked = Some(limit);
        self
    }

    /// Disable zeroing of drawn blocks
    #[must_use = "builder methods must be chained or built"]
    pub fn without_zeroing(mut self) -> Self {
        self.zero_on_draw = false;
        self
    }

    pub(crate) fn validate(&self) -> PoolResult<()> {
        tiers::validate(&self.tiers)
    }
}
