//! Tiered pool engine
//!
//! Owns one [`ReservePool`] and one [`TrackTable`] per configured size class.
//! `acquire` picks the smallest class that fits, draws a block (backing
//! allocator first, reserve second) and registers it; `release` resolves the
//! owning class and returns the block; `audit` reports every block still on
//! loan.
//!
//! # Locking
//!
//! A single busy-wait lock guards every tracking table. Callers may be
//! non-preemptible, so the lock must never sleep, and nothing that can block
//! is ever done while it is held: the lock is released before every draw,
//! every pool return and every backing-allocator call.

use core::fmt;
use core::mem;
use core::ptr::NonNull;
use std::sync::Arc;

use spin::Mutex;
use tracing::{debug, error, info, warn};

use super::config::PoolConfig;
use super::reserve::ReservePool;
use super::tiers::ClassSpec;
use super::track::{TrackError, TrackTable};
use crate::allocator::{BackingAlloc, SystemAllocator};
use crate::core::types::AllocContext;
use crate::error::{PoolError, PoolResult};

struct ClassState {
    spec: ClassSpec,
    /// `None` when pool creation failed at init; the tier is permanently
    /// unusable, which fails requests against it but not the subsystem.
    pool: Option<ReservePool>,
}

/// A set of tiered, preallocated pools.
///
/// Built once at subsystem startup from a [`PoolConfig`], torn down once via
/// [`shutdown`](Self::shutdown) or drop. Acquire and release may be called
/// from any number of threads concurrently.
///
/// # Example
///
/// ```
/// use reserve_pool::{PoolConfig, TieredPool};
///
/// # fn main() -> reserve_pool::PoolResult<()> {
/// let pools = TieredPool::new(PoolConfig::default())?;
///
/// if let Some(block) = pools.acquire(16 * 1024) {
///     assert!(block.size() >= 16 * 1024);
///     // returned to its pool when dropped
/// }
///
/// assert!(pools.audit().is_empty());
/// # Ok(())
/// # }
/// ```
pub struct TieredPool {
    classes: Vec<ClassState>,
    /// One table per class, same indexing as `classes`. `None` marks a class
    /// whose table could not be built: it keeps its pool but refuses draws,
    /// because an untracked block could never be resolved at release time.
    tables: Mutex<Vec<Option<TrackTable>>>,
}

impl TieredPool {
    /// Build all pools for `config`, backed by the system allocator.
    ///
    /// A class whose reserve cannot be primed is skipped (requests for that
    /// tier will fail); an invalid tier set fails construction outright.
    pub fn new(config: PoolConfig) -> PoolResult<Self> {
        Self::with_backing(config, Arc::new(SystemAllocator::new()))
    }

    /// Build all pools drawing from a caller-supplied backing allocator.
    pub fn with_backing(config: PoolConfig, backing: Arc<dyn BackingAlloc>) -> PoolResult<Self> {
        config.validate()?;

        let mut classes = Vec::with_capacity(config.tiers.len());
        let mut tables = Vec::with_capacity(config.tiers.len());

        for spec in &config.tiers {
            let pool = match ReservePool::new(
                spec.size,
                spec.min_reserve,
                config.zero_on_draw,
                backing.clone(),
            ) {
                Ok(pool) => {
                    info!(
                        class = spec.name,
                        size = spec.size,
                        min_reserve = spec.min_reserve,
                        backing = backing.name(),
                        "created reserve pool"
                    );
                    Some(pool)
                }
                Err(err) => {
                    error!(class = spec.name, %err, "reserve pool creation failed; tier disabled");
                    None
                }
            };

            let table = if pool.is_some() {
                match TrackTable::new(spec.min_reserve, config.max_tracked) {
                    Ok(table) => Some(table),
                    Err(_) => {
                        error!(
                            class = spec.name,
                            "tracking table allocation failed; tier will refuse draws"
                        );
                        None
                    }
                }
            } else {
                None
            };

            classes.push(ClassState { spec: *spec, pool });
            tables.push(table);
        }

        Ok(Self {
            classes,
            tables: Mutex::new(tables),
        })
    }

    /// Smallest configured block size; requests below it bypass the pools.
    fn threshold(&self) -> Option<usize> {
        self.classes.first().map(|class| class.spec.size)
    }

    /// Acquire a block of at least `size` bytes from a blocking context.
    ///
    /// Returns `None` both for bypass (request below the smallest tier; use
    /// the general allocator instead) and for pool-path failure; only the
    /// latter is logged.
    pub fn acquire(&self, size: usize) -> Option<BlockGuard<'_>> {
        self.acquire_in(size, AllocContext::Blocking)
    }

    /// Acquire a block of at least `size` bytes, stating the caller's
    /// execution context.
    pub fn acquire_in(&self, size: usize, ctx: AllocContext) -> Option<BlockGuard<'_>> {
        match self.try_acquire_in(size, ctx) {
            Ok(block) => Some(block),
            Err(err) if err.is_bypass() => None,
            Err(err) => {
                error!(size, ?ctx, %err, "no preallocated block available");
                None
            }
        }
    }

    /// Acquire with a full error report instead of `None`.
    pub fn try_acquire_in(&self, size: usize, ctx: AllocContext) -> PoolResult<BlockGuard<'_>> {
        let threshold = self
            .threshold()
            .ok_or_else(|| PoolError::no_matching_class(size))?;
        if size < threshold {
            return Err(PoolError::below_threshold(size, threshold));
        }

        // Smallest class that fits and still has a pool handle. A failed draw
        // does not cascade to larger tiers.
        let (idx, spec, pool) = self
            .classes
            .iter()
            .enumerate()
            .find_map(|(idx, class)| {
                if class.spec.size < size {
                    return None;
                }
                class.pool.as_ref().map(|pool| (idx, class.spec, pool))
            })
            .ok_or_else(|| PoolError::no_matching_class(size))?;

        // A class without a table must not hand out blocks; check before
        // drawing so the failure has no side effects.
        if self.tables.lock()[idx].is_none() {
            return Err(PoolError::tracking_unavailable(spec.name));
        }

        let ptr = pool
            .draw(ctx)
            .ok_or_else(|| PoolError::draw_failed(spec.name, size))?;

        // Register under the lock; the draw above and the unwind below both
        // happen outside it.
        let registered = {
            let mut tables = self.tables.lock();
            match tables[idx].as_mut() {
                Some(table) => table.register(ptr),
                None => Err(TrackError::GrowthFailed),
            }
        };

        match registered {
            Ok(reg) => {
                if reg.grew {
                    debug!(
                        class = spec.name,
                        capacity = reg.slot + 1,
                        "tracking table grown"
                    );
                }
                Ok(BlockGuard {
                    pools: self,
                    ptr,
                    class: idx,
                    slot: reg.slot,
                })
            }
            Err(_) => {
                // A block that cannot be tracked cannot be handed out; give
                // it back before failing.
                // SAFETY: `ptr` was drawn from `pool` just above and has not
                // been exposed to anyone.
                unsafe { pool.put(ptr) };
                let capacity = {
                    let tables = self.tables.lock();
                    tables[idx].as_ref().map_or(0, TrackTable::capacity)
                };
                Err(PoolError::untrackable(spec.name, capacity))
            }
        }
    }

    /// Release a block through its handle: O(1) owner resolution.
    ///
    /// Dropping the guard does the same thing; this form reports the outcome.
    pub fn release(&self, block: BlockGuard<'_>) -> bool {
        let released = block.pools.release_at(block.class, block.slot, block.ptr);
        mem::forget(block);
        released
    }

    /// Release by raw pointer: scan every class's table for the owner.
    ///
    /// This is the path for callers that no longer hold the handle (see
    /// [`BlockGuard::detach`]). A pointer not found in any table is reported
    /// as `false` with no state touched; it may simply belong to the general
    /// allocator, and the caller is expected to fall back there.
    pub fn release_ptr(&self, ptr: NonNull<u8>) -> bool {
        for (idx, class) in self.classes.iter().enumerate() {
            let Some(pool) = class.pool.as_ref() else {
                continue;
            };
            let found = {
                let mut tables = self.tables.lock();
                tables[idx]
                    .as_mut()
                    .and_then(|table| table.find_and_clear(ptr))
            };
            if found.is_some() {
                // SAFETY: the tracking slot proves `ptr` was drawn from this
                // class's pool and is still outstanding; clearing the slot
                // made this release the only one.
                unsafe { pool.put(ptr) };
                return true;
            }
        }
        debug!(address = ptr.as_ptr() as usize, "released pointer is not pool-tracked");
        false
    }

    fn release_at(&self, class: usize, slot: usize, ptr: NonNull<u8>) -> bool {
        let cleared = {
            let mut tables = self.tables.lock();
            tables[class]
                .as_mut()
                .is_some_and(|table| table.clear_at(slot, ptr))
        };
        if !cleared {
            return false;
        }
        match self.classes[class].pool.as_ref() {
            Some(pool) => {
                // SAFETY: the cleared slot proves `ptr` is an outstanding
                // block of this class; no other release can observe it now.
                unsafe { pool.put(ptr) };
                true
            }
            None => false,
        }
    }

    /// Report every block still on loan: its address, class and slot.
    ///
    /// Read-only; intended for a controlled checkpoint such as right before
    /// [`shutdown`](Self::shutdown), where anything outstanding is a leak.
    pub fn audit(&self) -> Vec<LeakReport> {
        let tables = self.tables.lock();
        let mut leaks = Vec::new();
        for (class, table) in self.classes.iter().zip(tables.iter()) {
            let Some(table) = table.as_ref() else {
                continue;
            };
            for (slot, ptr) in table.outstanding() {
                let leak = LeakReport {
                    address: ptr.as_ptr() as usize,
                    class: class.spec.name,
                    slot,
                };
                warn!(
                    address = leak.address,
                    class = leak.class,
                    slot = leak.slot,
                    "block not released"
                );
                leaks.push(leak);
            }
        }
        leaks
    }

    /// Tear down every pool and tracking table.
    ///
    /// Idempotent; also run on drop. Blocks still outstanding at this point
    /// are abandoned (run [`audit`](Self::audit) first to catch them).
    pub fn shutdown(&mut self) {
        for class in &mut self.classes {
            if let Some(pool) = class.pool.take() {
                info!(class = class.spec.name, "destroy reserve pool");
                drop(pool);
            }
        }
        for table in self.tables.get_mut() {
            *table = None;
        }
    }

    /// Snapshot of every configured class, usable for diagnostics.
    pub fn classes(&self) -> Vec<ClassInfo> {
        let tables = self.tables.lock();
        self.classes
            .iter()
            .zip(tables.iter())
            .map(|(class, table)| {
                let pool = class.pool.as_ref();
                ClassInfo {
                    name: class.spec.name,
                    size: pool.map_or(class.spec.size, ReservePool::block_size),
                    min_reserve: pool.map_or(class.spec.min_reserve, ReservePool::min_reserve),
                    reserve_len: pool.map(ReservePool::reserve_len),
                    table_capacity: table.as_ref().map(TrackTable::capacity),
                }
            })
            .collect()
    }
}

impl Drop for TieredPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for TieredPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TieredPool")
            .field("classes", &self.classes.len())
            .finish_non_exhaustive()
    }
}

/// A block on loan from a [`TieredPool`].
///
/// Carries the owning class and tracking slot, so releasing through the
/// handle is a single verified slot write rather than a table scan. Dropping
/// the guard returns the block; [`detach`](Self::detach) opts out of that and
/// leaves the block tracked until [`TieredPool::release_ptr`] finds it.
pub struct BlockGuard<'pool> {
    pools: &'pool TieredPool,
    ptr: NonNull<u8>,
    class: usize,
    slot: usize,
}

// SAFETY: the guard owns its block exclusively; the pool reference it carries
// is Sync (all shared state is behind the tracking lock or lock-free queues).
unsafe impl Send for BlockGuard<'_> {}
// SAFETY: shared references to the guard only expose the address and size.
unsafe impl Sync for BlockGuard<'_> {}

impl BlockGuard<'_> {
    /// Pointer to the block's first byte
    #[must_use]
    pub fn as_ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// The block's usable size: its class's block size
    #[must_use]
    pub fn size(&self) -> usize {
        self.pools.classes[self.class].spec.size
    }

    /// Name of the owning class
    #[must_use]
    pub fn class_name(&self) -> &'static str {
        self.pools.classes[self.class].spec.name
    }

    /// Give up the handle without releasing the block.
    ///
    /// The block stays registered in its tracking table; the raw pointer must
    /// eventually go back through [`TieredPool::release_ptr`], or the auditor
    /// will report it as leaked.
    #[must_use]
    pub fn detach(self) -> NonNull<u8> {
        let ptr = self.ptr;
        mem::forget(self);
        ptr
    }
}

impl fmt::Debug for BlockGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockGuard")
            .field("address", &self.ptr.as_ptr())
            .field("class", &self.class_name())
            .field("slot", &self.slot)
            .finish()
    }
}

impl Drop for BlockGuard<'_> {
    fn drop(&mut self) {
        self.pools.release_at(self.class, self.slot, self.ptr);
    }
}

/// One outstanding block observed by [`TieredPool::audit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeakReport {
    /// Address of the unreleased block
    pub address: usize,
    /// Name of the class it was drawn from
    pub class: &'static str,
    /// Tracking slot it occupies
    pub slot: usize,
}

/// Diagnostic snapshot of one class, see [`TieredPool::classes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassInfo {
    /// Class name
    pub name: &'static str,
    /// Block size in bytes
    pub size: usize,
    /// Configured reserve floor
    pub min_reserve: usize,
    /// Blocks currently in the reserve; `None` if the pool failed to build
    pub reserve_len: Option<usize>,
    /// Tracking-table capacity; `None` if the class is degraded
    pub table_capacity: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::size::KB;
    use crate::pool::tiers::ClassSpec;

    fn one_class(min: usize) -> PoolConfig {
        PoolConfig::with_tiers(vec![ClassSpec::new(KB, min, "test-1k")])
    }

    #[test]
    fn test_empty_tier_set_is_rejected() {
        assert!(TieredPool::new(PoolConfig::with_tiers(Vec::new())).is_err());
    }

    #[test]
    fn test_bypass_below_threshold() {
        let pools = TieredPool::new(one_class(2)).unwrap();
        assert!(pools.acquire(512).is_none());
        let err = pools.try_acquire_in(512, AllocContext::Blocking).unwrap_err();
        assert!(err.is_bypass());
    }

    #[test]
    fn test_oversized_request_has_no_class() {
        let pools = TieredPool::new(one_class(2)).unwrap();
        let err = pools
            .try_acquire_in(4 * KB, AllocContext::Blocking)
            .unwrap_err();
        assert_eq!(err, PoolError::no_matching_class(4 * KB));
    }

    #[test]
    fn test_acquire_release_roundtrip() {
        let pools = TieredPool::new(one_class(2)).unwrap();

        let block = pools.acquire(KB).expect("pool draw failed");
        assert_eq!(block.size(), KB);
        assert_eq!(block.class_name(), "test-1k");
        assert!(pools.release(block));
        assert!(pools.audit().is_empty());
    }

    #[test]
    fn test_guard_drop_releases() {
        let pools = TieredPool::new(one_class(2)).unwrap();
        {
            let _block = pools.acquire(KB).unwrap();
            assert_eq!(pools.audit().len(), 1);
        }
        assert!(pools.audit().is_empty());
    }

    #[test]
    fn test_degraded_class_refuses_draws_without_side_effects() {
        // A growth bound below the reserve floor makes the table unbuildable,
        // which degrades the class to forced-fail on draw.
        let config = one_class(4).max_tracked(2);
        let pools = TieredPool::new(config).unwrap();

        let before = pools.classes()[0].reserve_len;
        let err = pools.try_acquire_in(KB, AllocContext::Blocking).unwrap_err();
        assert_eq!(err, PoolError::tracking_unavailable("test-1k"));
        assert_eq!(pools.classes()[0].reserve_len, before);
        assert_eq!(pools.classes()[0].table_capacity, None);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let mut pools = TieredPool::new(one_class(2)).unwrap();
        pools.shutdown();
        pools.shutdown();

        assert!(pools.acquire(KB).is_none());
        assert!(pools.classes()[0].reserve_len.is_none());
        assert!(!pools.release_ptr(NonNull::dangling()));
        assert!(pools.audit().is_empty());
    }
}
