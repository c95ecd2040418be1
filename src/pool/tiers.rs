//! Size-class descriptors and the device capability table
//!
//! Every supported device shares the same five block-size tiers; devices
//! differ only in how many blocks each tier keeps in its emergency reserve.
//! The tier set is selected once, before any pool is built, and an
//! unrecognized device always resolves to the default set.

use crate::core::types::size::KB;
use crate::error::{PoolError, PoolResult};

/// Static configuration of one size class.
///
/// Classes within a tier set must be kept in strictly increasing order by
/// block size; tier selection picks the first class that fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassSpec {
    /// Size of one block in bytes
    pub size: usize,
    /// Blocks kept preallocated for emergencies. Used only when a regular
    /// allocation fails, so keep it as small as profiling allows.
    pub min_reserve: usize,
    /// Class name, visible in logs and leak reports
    pub name: &'static str,
}

impl ClassSpec {
    /// Creates a new class descriptor
    #[must_use]
    pub const fn new(size: usize, min_reserve: usize, name: &'static str) -> Self {
        Self {
            size,
            min_reserve,
            name,
        }
    }
}

/// Opaque device identifier supplied by the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(pub u64);

/// Adrastea-class devices run with shallow reserves.
pub const ADRASTEA: DeviceId = DeviceId(0xabcd);

/// WCN6750 devices get a mid-depth reserve profile.
pub const WCN6750: DeviceId = DeviceId(0x6750);

const DEFAULT_TIERS: &[ClassSpec] = &[
    ClassSpec::new(8 * KB, 16, "pool-8k"),
    ClassSpec::new(16 * KB, 16, "pool-16k"),
    ClassSpec::new(32 * KB, 22, "pool-32k"),
    ClassSpec::new(64 * KB, 38, "pool-64k"),
    ClassSpec::new(128 * KB, 10, "pool-128k"),
];

const ADRASTEA_TIERS: &[ClassSpec] = &[
    ClassSpec::new(8 * KB, 2, "pool-8k"),
    ClassSpec::new(16 * KB, 10, "pool-16k"),
    ClassSpec::new(32 * KB, 8, "pool-32k"),
    ClassSpec::new(64 * KB, 4, "pool-64k"),
    ClassSpec::new(128 * KB, 2, "pool-128k"),
];

const WCN6750_TIERS: &[ClassSpec] = &[
    ClassSpec::new(8 * KB, 2, "pool-8k"),
    ClassSpec::new(16 * KB, 8, "pool-16k"),
    ClassSpec::new(32 * KB, 11, "pool-32k"),
    ClassSpec::new(64 * KB, 15, "pool-64k"),
    ClassSpec::new(128 * KB, 4, "pool-128k"),
];

/// Resolve the tier set for a device. Never fails: anything unrecognized
/// gets the default profile.
#[must_use]
pub fn tiers_for(device: DeviceId) -> &'static [ClassSpec] {
    match device {
        ADRASTEA => ADRASTEA_TIERS,
        WCN6750 => WCN6750_TIERS,
        _ => DEFAULT_TIERS,
    }
}

/// Check the tier-set invariants: non-empty, strictly increasing block sizes.
pub(crate) fn validate(tiers: &[ClassSpec]) -> PoolResult<()> {
    if tiers.is_empty() {
        return Err(PoolError::invalid_config("tier set is empty"));
    }
    for spec in tiers {
        if spec.size == 0 {
            return Err(PoolError::invalid_config(format!(
                "class '{}' has a zero block size",
                spec.name
            )));
        }
    }
    for pair in tiers.windows(2) {
        if pair[1].size <= pair[0].size {
            return Err(PoolError::invalid_config(format!(
                "classes '{}' and '{}' are not in strictly increasing size order",
                pair[0].name, pair[1].name
            )));
        }
    }
    Ok(())
}
