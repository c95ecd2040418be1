//! System (global) backing allocator

use core::alloc::Layout;
use core::ptr::NonNull;

use super::BackingAlloc;
use crate::core::types::AllocContext;

/// The process global allocator as a pool backing.
///
/// Userland allocation does not sleep in any way this crate can observe, so
/// the allocation context is accepted and ignored here; it still matters to
/// backings that model memory pressure (see the test allocators in
/// `tests/pool_drain.rs`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl SystemAllocator {
    /// Creates a new system allocator handle
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

// SAFETY: delegates directly to the global allocator, which hands out valid,
// properly aligned blocks that live until deallocated with the same layout.
unsafe impl BackingAlloc for SystemAllocator {
    fn allocate(&self, layout: Layout, _ctx: AllocContext) -> Option<NonNull<u8>> {
        debug_assert!(layout.size() > 0);
        // SAFETY: layout has non-zero size; pool layouts are built from
        // non-zero class block sizes.
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: caller guarantees ptr came from `allocate` with `layout`
        // and is not used again.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }

    fn name(&self) -> &'static str {
        "system"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_roundtrip() {
        let alloc = SystemAllocator::new();
        let layout = Layout::from_size_align(4096, 64).unwrap();

        let ptr = alloc
            .allocate(layout, AllocContext::Blocking)
            .expect("system allocation failed");
        // SAFETY: freshly allocated block of 4096 bytes
        unsafe {
            ptr.as_ptr().write_bytes(0xA5, layout.size());
            alloc.deallocate(ptr, layout);
        }
    }
}
