//! Tiered preallocated pools
//!
//! A small set of fixed block sizes ("tiers"), each backed by the general
//! allocator plus a preallocated emergency reserve, with every outstanding
//! block tracked so its owner can be resolved at release time.

mod config;
mod reserve;
mod tiered;
mod tiers;
mod track;

pub use config::PoolConfig;
pub use tiered::{BlockGuard, ClassInfo, LeakReport, TieredPool};
pub use tiers::{ADRASTEA, ClassSpec, DeviceId, WCN6750, tiers_for};

use core::ptr::NonNull;

/// A raw pool block.
///
/// Plain bytes with no drop glue; ownership moves with the wrapper through
/// reserve queues and tracking slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawBlock(pub(crate) NonNull<u8>);

// SAFETY: a RawBlock is an owned, untyped byte buffer with no thread
// affinity. Whoever holds the wrapper holds the block; the queues and tables
// it travels through enforce exclusive ownership.
unsafe impl Send for RawBlock {}
// SAFETY: &RawBlock only exposes the address, never the bytes behind it.
unsafe impl Sync for RawBlock {}
