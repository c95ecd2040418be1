//! Backing allocator abstraction
//!
//! Every pool draws from a backing allocator first and only falls back to its
//! reserve when that draw fails. The trait exists so the backing side can be
//! swapped out: production uses [`SystemAllocator`], tests inject allocators
//! that fail on demand to exercise the reserve and unwind paths.

mod system;

pub use system::SystemAllocator;

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::core::types::AllocContext;

/// A general-purpose allocator the pools draw from.
///
/// # Safety
///
/// Implementations must return pointers that are valid for reads and writes
/// of `layout.size()` bytes, aligned to `layout.align()`, and that stay valid
/// until passed to [`deallocate`](BackingAlloc::deallocate) with the same
/// layout.
pub unsafe trait BackingAlloc: Send + Sync {
    /// Allocate one block, or report that none is available right now.
    ///
    /// `ctx` states whether the caller tolerates blocking. Implementations
    /// that can wait for memory must not do so under
    /// [`AllocContext::Atomic`].
    fn allocate(&self, layout: Layout, ctx: AllocContext) -> Option<NonNull<u8>>;

    /// Return a block to the allocator.
    ///
    /// # Safety
    ///
    /// - `ptr` must have been returned by `allocate` on this allocator with
    ///   the same `layout`
    /// - `ptr` must not be used after this call
    /// - Must not be called more than once for the same pointer
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Allocator name for diagnostics
    fn name(&self) -> &'static str;
}
