//! Common types and constants for the pool subsystem

/// Memory alignment requirements
pub mod alignment {
    /// Minimum alignment for allocations
    pub const MIN_ALIGN: usize = 8;

    /// Cache line size; every pool block is aligned to this
    pub const CACHE_LINE: usize = 64;
}

/// Memory size constants
pub mod size {
    /// 1 Kilobyte
    pub const KB: usize = 1024;

    /// 1 Megabyte
    pub const MB: usize = 1024 * KB;
}

/// Execution context of an allocation request.
///
/// The pool itself never sleeps, but the backing allocator and the
/// tracking-table growth path may. Callers running where suspension is not an
/// option (interrupt handlers, spin-locked regions, read-side critical
/// sections) must pass [`AllocContext::Atomic`]; the pool then forbids any
/// downstream operation that could block, and table growth is allowed to fail
/// instead of waiting for memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllocContext {
    /// The caller may be suspended; downstream requests may block.
    #[default]
    Blocking,
    /// The caller cannot be suspended; every downstream request must either
    /// complete immediately or fail.
    Atomic,
}

impl AllocContext {
    /// Whether downstream requests made on behalf of this caller may block.
    #[inline]
    #[must_use]
    pub fn allows_blocking(self) -> bool {
        matches!(self, Self::Blocking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_blocking_policy() {
        assert!(AllocContext::Blocking.allows_blocking());
        assert!(!AllocContext::Atomic.allows_blocking());
        assert_eq!(AllocContext::default(), AllocContext::Blocking);
    }
}
