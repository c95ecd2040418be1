//! Per-class tracking table
//!
//! A growable array of slots recording every block currently on loan from one
//! size class. A block's presence means "outstanding, not yet released"; a
//! cleared slot is free for reuse by the table itself. Capacity only ever
//! grows, one slot at a time, and growth is fallible: callers in atomic
//! context would rather see a failed allocation than a blocking reallocation.
//!
//! All access happens under the pool set's global tracking lock; this type
//! itself is plain data.

use core::ptr::NonNull;

use super::RawBlock;

/// Why a registration could not be completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TrackError {
    /// The table is at its configured growth bound
    LimitReached,
    /// Growing by one slot failed to allocate
    GrowthFailed,
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Registered {
    /// Slot index now holding the block
    pub slot: usize,
    /// Whether the table had to grow to fit it
    pub grew: bool,
}

pub(crate) struct TrackTable {
    /// Length is the table capacity; `None` slots are free
    slots: Vec<Option<RawBlock>>,
    limit: Option<usize>,
}

impl TrackTable {
    /// Build a table with `initial` empty slots. Fails if the slot buffer
    /// cannot be allocated, or if the growth bound is below `initial` (such a
    /// table could never track its class's own reserve).
    pub(crate) fn new(initial: usize, limit: Option<usize>) -> Result<Self, TrackError> {
        if let Some(limit) = limit
            && limit < initial
        {
            return Err(TrackError::LimitReached);
        }
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(initial)
            .map_err(|_| TrackError::GrowthFailed)?;
        slots.resize(initial, None);
        Ok(Self { slots, limit })
    }

    /// Record an outstanding block in the first free slot, growing the table
    /// by exactly one slot if none is free.
    pub(crate) fn register(&mut self, ptr: NonNull<u8>) -> Result<Registered, TrackError> {
        if let Some(slot) = self.slots.iter().position(Option::is_none) {
            self.slots[slot] = Some(RawBlock(ptr));
            return Ok(Registered { slot, grew: false });
        }

        if let Some(limit) = self.limit
            && self.slots.len() >= limit
        {
            return Err(TrackError::LimitReached);
        }
        self.slots
            .try_reserve_exact(1)
            .map_err(|_| TrackError::GrowthFailed)?;
        self.slots.push(Some(RawBlock(ptr)));
        Ok(Registered {
            slot: self.slots.len() - 1,
            grew: true,
        })
    }

    /// Clear `slot` if it still holds `ptr`. Returns whether it did.
    pub(crate) fn clear_at(&mut self, slot: usize, ptr: NonNull<u8>) -> bool {
        match self.slots.get_mut(slot) {
            Some(entry) if *entry == Some(RawBlock(ptr)) => {
                *entry = None;
                true
            }
            _ => false,
        }
    }

    /// Scan for `ptr`; clear and return its slot index when found.
    pub(crate) fn find_and_clear(&mut self, ptr: NonNull<u8>) -> Option<usize> {
        let slot = self
            .slots
            .iter()
            .position(|entry| *entry == Some(RawBlock(ptr)))?;
        self.slots[slot] = None;
        Some(slot)
    }

    /// Current capacity in slots. Monotonically non-decreasing.
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Iterate over every outstanding block with its slot index.
    pub(crate) fn outstanding(&self) -> impl Iterator<Item = (usize, NonNull<u8>)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| entry.map(|block| (slot, block.0)))
    }
}
