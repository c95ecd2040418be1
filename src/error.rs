//! Error types for the pool subsystem
//!
//! Uses thiserror for clean, idiomatic Rust error definitions. Every failure
//! is reported to the immediate caller; nothing in this crate panics or
//! terminates the process on an allocation failure.

use thiserror::Error;

/// Pool subsystem errors
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The request is smaller than the smallest configured tier. Not a
    /// failure of the pool: the caller is expected to use the general-purpose
    /// allocator directly.
    #[error("request of {size} bytes is below the pool threshold of {threshold} bytes")]
    BelowThreshold { size: usize, threshold: usize },

    /// No tier with a live pool handle can satisfy the request.
    #[error("no pool class can satisfy a request of {size} bytes")]
    NoMatchingClass { size: usize },

    /// The matched tier lost its tracking table at initialization and refuses
    /// to hand out blocks it cannot track.
    #[error("pool class '{class}' has no tracking table; draws are disabled")]
    TrackingUnavailable { class: &'static str },

    /// Both the backing allocator and the reserve came up empty.
    #[error("pool class '{class}' could not supply a block for {size} bytes")]
    DrawFailed { class: &'static str, size: usize },

    /// A block was drawn but could not be registered (table full and growth
    /// failed). The block has been returned to its pool.
    #[error("pool class '{class}' tracking table is full at {capacity} slots and could not grow")]
    Untrackable { class: &'static str, capacity: usize },

    /// A released pointer was not found in any tracking table. The pointer
    /// may belong to the general-purpose allocator; the caller should fall
    /// back to releasing it there.
    #[error("pointer {address:#x} is not tracked by any pool class")]
    UnknownBlock { address: usize },

    /// The pool configuration is unusable.
    #[error("invalid pool configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl PoolError {
    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::BelowThreshold { .. } => "POOL:BYPASS",
            Self::NoMatchingClass { .. } => "POOL:NO_CLASS",
            Self::TrackingUnavailable { .. } => "POOL:UNTRACKED_CLASS",
            Self::DrawFailed { .. } => "POOL:DRAW_FAILED",
            Self::Untrackable { .. } => "POOL:TABLE_FULL",
            Self::UnknownBlock { .. } => "POOL:UNKNOWN_BLOCK",
            Self::InvalidConfig { .. } => "POOL:CONFIG",
        }
    }

    /// A bypass is a routing signal, not a pool failure; callers use this to
    /// decide whether an acquire failure deserves a log line.
    #[must_use]
    pub fn is_bypass(&self) -> bool {
        matches!(self, Self::BelowThreshold { .. })
    }

    /// Create below-threshold (bypass) error
    #[must_use]
    pub fn below_threshold(size: usize, threshold: usize) -> Self {
        Self::BelowThreshold { size, threshold }
    }

    /// Create no-matching-class error
    #[must_use]
    pub fn no_matching_class(size: usize) -> Self {
        Self::NoMatchingClass { size }
    }

    /// Create tracking-unavailable error
    #[must_use]
    pub fn tracking_unavailable(class: &'static str) -> Self {
        Self::TrackingUnavailable { class }
    }

    /// Create draw-failed error
    #[must_use]
    pub fn draw_failed(class: &'static str, size: usize) -> Self {
        Self::DrawFailed { class, size }
    }

    /// Create untrackable-draw error
    #[must_use]
    pub fn untrackable(class: &'static str, capacity: usize) -> Self {
        Self::Untrackable { class, capacity }
    }

    /// Create unknown-block error
    #[must_use]
    pub fn unknown_block(address: usize) -> Self {
        Self::UnknownBlock { address }
    }

    /// Create invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// Result type for pool operations
pub type PoolResult<T> = core::result::Result<T, PoolError>;
