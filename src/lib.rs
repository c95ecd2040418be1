//! # reserve-pool
//!
//! Tiered, preallocated memory pools with emergency reserves, for subsystems
//! that must get a block even while the general-purpose allocator is failing
//! or may not be asked to block.
//!
//! A [`TieredPool`] owns a small set of size classes (tiers). Each tier keeps
//! a floor of preallocated blocks: a draw goes to the backing allocator
//! first and falls back to the reserve only when that attempt fails. Every
//! block handed out is registered in a per-tier tracking table, so the owning
//! tier can be resolved again at release time and anything never released
//! shows up in an audit.
//!
//! ## Quick start
//!
//! ```
//! use reserve_pool::{DeviceId, PoolConfig, TieredPool};
//!
//! # fn main() -> reserve_pool::PoolResult<()> {
//! // Tier depths are selected per device; unknown devices get the defaults.
//! let pools = TieredPool::new(PoolConfig::for_device(DeviceId(0x6750)))?;
//!
//! // Too small for the pools: the caller should use the regular allocator.
//! assert!(pools.acquire(512).is_none());
//!
//! // Served from the 16K tier; returned to it when the guard drops.
//! if let Some(block) = pools.acquire(9 * 1024) {
//!     assert_eq!(block.size(), 16 * 1024);
//! }
//!
//! // Nothing outstanding at the checkpoint.
//! assert!(pools.audit().is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! [`TieredPool`] is `Sync`; acquire and release run on whatever thread the
//! caller uses. The tracking tables sit behind a single busy-wait lock that
//! is safe for non-preemptible callers, and callers that cannot be suspended
//! pass [`AllocContext::Atomic`] so nothing downstream blocks on their
//! behalf.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(clippy::all)]
#![warn(clippy::perf)]
#![warn(clippy::pedantic)]
#![warn(rust_2018_idioms)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::unnecessary_literal_bound)]

// Error types
pub mod error;

// Core modules
pub mod allocator;
pub mod core;
pub mod pool;

// Re-export the working set at the crate root
pub use crate::allocator::{BackingAlloc, SystemAllocator};
pub use crate::core::types::AllocContext;
pub use crate::error::{PoolError, PoolResult};
pub use crate::pool::{
    ADRASTEA, BlockGuard, ClassInfo, ClassSpec, DeviceId, LeakReport, PoolConfig, TieredPool,
    WCN6750, tiers_for,
};

/// Convenient re-exports of commonly used types and traits.
pub mod prelude {
    pub use crate::allocator::{BackingAlloc, SystemAllocator};
    pub use crate::core::types::AllocContext;
    pub use crate::error::{PoolError, PoolResult};
    pub use crate::pool::{BlockGuard, ClassSpec, DeviceId, PoolConfig, TieredPool};
}
