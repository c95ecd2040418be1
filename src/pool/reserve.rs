//! Reserve-backed pool primitive
//!
//! One `ReservePool` serves a single block size. A draw tries the backing
//! allocator first and falls back to the preallocated reserve only when that
//! attempt fails; a returned block refills the reserve up to its floor and is
//! handed back to the backing allocator beyond it. This mirrors the classic
//! mempool contract: as long as the reserve was primed, a draw can succeed
//! even while the general allocator is failing.
//!
//! # Safety
//!
//! - Blocks are untyped byte buffers allocated with a single layout per pool
//! - `put` requires the pointer to have come from `draw` on the same pool
//! - The reserve queue owns its blocks; `Drop` returns them to the backing
//!   allocator

use core::alloc::Layout;
use core::ptr::NonNull;
use std::sync::Arc;

use crossbeam_queue::ArrayQueue;
use tracing::debug;

use super::RawBlock;
use crate::allocator::BackingAlloc;
use crate::core::types::{AllocContext, alignment};
use crate::error::{PoolError, PoolResult};

/// A single-size pool with an emergency reserve.
pub(crate) struct ReservePool {
    layout: Layout,
    /// Reserve floor: the pool keeps up to this many blocks preallocated
    min: usize,
    zero_on_draw: bool,
    reserve: ArrayQueue<RawBlock>,
    backing: Arc<dyn BackingAlloc>,
}

impl ReservePool {
    /// Build a pool for `size`-byte blocks and prime its reserve with `min`
    /// blocks. Fails if the reserve cannot be fully primed; a pool that
    /// cannot honor its floor is worse than no pool, because callers count on
    /// the reserve under memory pressure.
    pub(crate) fn new(
        size: usize,
        min: usize,
        zero_on_draw: bool,
        backing: Arc<dyn BackingAlloc>,
    ) -> PoolResult<Self> {
        let layout = Layout::from_size_align(size, alignment::CACHE_LINE)
            .map_err(|_| PoolError::invalid_config(format!("unrepresentable block size {size}")))?;

        // ArrayQueue panics on zero capacity; a floor of zero still needs a
        // queue, it just never retains anything.
        let reserve = ArrayQueue::new(min.max(1));

        for primed in 0..min {
            match backing.allocate(layout, AllocContext::Blocking) {
                Some(ptr) => {
                    // Capacity is at least `min`, so this cannot be full.
                    let _ = reserve.push(RawBlock(ptr));
                }
                None => {
                    debug!(size, primed, min, "reserve priming failed");
                    while let Some(block) = reserve.pop() {
                        // SAFETY: every queued block came from `backing`
                        // with `layout` a few lines above.
                        unsafe { backing.deallocate(block.0, layout) };
                    }
                    return Err(PoolError::invalid_config(format!(
                        "could not prime {min} reserve blocks of {size} bytes"
                    )));
                }
            }
        }

        Ok(Self {
            layout,
            min,
            zero_on_draw,
            reserve,
            backing,
        })
    }

    /// Draw one block: backing allocator first, reserve fallback second.
    pub(crate) fn draw(&self, ctx: AllocContext) -> Option<NonNull<u8>> {
        let block = self
            .backing
            .allocate(self.layout, ctx)
            .or_else(|| self.reserve.pop().map(|b| b.0))?;

        if self.zero_on_draw {
            // SAFETY: `block` is valid for writes of `layout.size()` bytes,
            // whichever side it came from.
            unsafe { block.as_ptr().write_bytes(0, self.layout.size()) };
        }
        Some(block)
    }

    /// Return a block. Refills the reserve while it is below its floor,
    /// otherwise hands the block back to the backing allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`draw`](Self::draw) on this pool and
    /// must not be used after this call.
    pub(crate) unsafe fn put(&self, ptr: NonNull<u8>) {
        if self.reserve.len() < self.min {
            if let Err(block) = self.reserve.push(RawBlock(ptr)) {
                // Queue filled up concurrently; give the block back instead.
                // SAFETY: caller guarantees ptr came from this pool's layout.
                unsafe { self.backing.deallocate(block.0, self.layout) };
            }
        } else {
            // SAFETY: caller guarantees ptr came from this pool's layout.
            unsafe { self.backing.deallocate(ptr, self.layout) };
        }
    }

    /// Blocks currently sitting in the reserve
    pub(crate) fn reserve_len(&self) -> usize {
        self.reserve.len()
    }

    /// Reserve floor configured for this pool
    pub(crate) fn min_reserve(&self) -> usize {
        self.min
    }

    /// One block's size in bytes
    pub(crate) fn block_size(&self) -> usize {
        self.layout.size()
    }
}

impl Drop for ReservePool {
    fn drop(&mut self) {
        while let Some(block) = self.reserve.pop() {
            // SAFETY: every reserved block was allocated from `backing` with
            // `self.layout` and is owned by the queue.
            unsafe { self.backing.deallocate(block.0, self.layout) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::SystemAllocator;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backing that serves at most `quota` allocations, then fails.
    struct QuotaAlloc {
        quota: AtomicUsize,
        freed: AtomicUsize,
        inner: SystemAllocator,
    }

    impl QuotaAlloc {
        fn new(quota: usize) -> Self {
            Self {
                quota: AtomicUsize::new(quota),
                freed: AtomicUsize::new(0),
                inner: SystemAllocator::new(),
            }
        }
    }

    // SAFETY: delegates to the system allocator; the quota only gates whether
    // a call happens at all.
    unsafe impl BackingAlloc for QuotaAlloc {
        fn allocate(&self, layout: Layout, ctx: AllocContext) -> Option<NonNull<u8>> {
            let mut quota = self.quota.load(Ordering::Acquire);
            loop {
                if quota == 0 {
                    return None;
                }
                match self.quota.compare_exchange_weak(
                    quota,
                    quota - 1,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => return self.inner.allocate(layout, ctx),
                    Err(actual) => quota = actual,
                }
            }
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            self.freed.fetch_add(1, Ordering::AcqRel);
            // SAFETY: forwarded contract
            unsafe { self.inner.deallocate(ptr, layout) }
        }

        fn name(&self) -> &'static str {
            "quota"
        }
    }

    #[test]
    fn test_priming_fills_the_reserve() {
        let backing = Arc::new(QuotaAlloc::new(8));
        let pool = ReservePool::new(1024, 3, true, backing).unwrap();
        assert_eq!(pool.reserve_len(), 3);
        assert_eq!(pool.min_reserve(), 3);
        assert_eq!(pool.block_size(), 1024);
    }

    #[test]
    fn test_priming_failure_unwinds() {
        let backing = Arc::new(QuotaAlloc::new(2));
        let err = ReservePool::new(1024, 3, true, backing.clone());
        assert!(err.is_err());
        // The two blocks that did get primed were freed again.
        assert_eq!(backing.freed.load(Ordering::Acquire), 2);
    }

    #[test]
    fn test_draw_prefers_backing_then_reserve() {
        let backing = Arc::new(QuotaAlloc::new(3));
        let pool = ReservePool::new(512, 2, true, backing).unwrap();

        // Quota of 3 minus 2 primed: one backing draw left.
        let a = pool.draw(AllocContext::Blocking).unwrap();
        assert_eq!(pool.reserve_len(), 2);

        // Backing is dry now; the next draws eat the reserve.
        let b = pool.draw(AllocContext::Atomic).unwrap();
        let c = pool.draw(AllocContext::Atomic).unwrap();
        assert_eq!(pool.reserve_len(), 0);
        assert!(pool.draw(AllocContext::Atomic).is_none());

        // SAFETY: all three came from this pool.
        unsafe {
            pool.put(a);
            pool.put(b);
            pool.put(c);
        }
        // Returns refill the reserve up to the floor; the third block went
        // back to the backing allocator.
        assert_eq!(pool.reserve_len(), 2);
    }

    #[test]
    fn test_drawn_blocks_are_zeroed() {
        let backing = Arc::new(SystemAllocator::new());
        let pool = ReservePool::new(256, 1, true, backing).unwrap();

        let ptr = pool.draw(AllocContext::Blocking).unwrap();
        // SAFETY: block is 256 valid bytes; dirty it, return it, re-draw.
        unsafe {
            ptr.as_ptr().write_bytes(0xFF, 256);
            pool.put(ptr);
        }

        let again = pool.draw(AllocContext::Blocking).unwrap();
        // SAFETY: zeroed by draw, 256 readable bytes.
        let bytes = unsafe { core::slice::from_raw_parts(again.as_ptr(), 256) };
        assert!(bytes.iter().all(|&b| b == 0));
        // SAFETY: drawn from this pool above.
        unsafe { pool.put(again) };
    }

    #[test]
    fn test_drop_returns_reserve_to_backing() {
        let backing = Arc::new(QuotaAlloc::new(4));
        let pool = ReservePool::new(128, 4, false, backing.clone()).unwrap();
        drop(pool);
        assert_eq!(backing.freed.load(Ordering::Acquire), 4);
    }

    #[test]
    fn test_zero_floor_pool_never_retains() {
        let backing = Arc::new(QuotaAlloc::new(1));
        let pool = ReservePool::new(64, 0, true, backing.clone()).unwrap();

        let ptr = pool.draw(AllocContext::Blocking).unwrap();
        // SAFETY: drawn from this pool.
        unsafe { pool.put(ptr) };
        assert_eq!(pool.reserve_len(), 0);
        assert_eq!(backing.freed.load(Ordering::Acquire), 1);
    }
}
