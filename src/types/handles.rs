//! Identity handles for segments and synapses.
//!
//! Handles are small `Copy` index pairs, not references. A handle stays valid
//! for as long as the object it names has not been destroyed; after that its
//! slot may be handed out again by a later create call.

use super::{CellIdx, Overlap, SegmentIdx, SynapseIdx};

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A dendritic segment, addressed by its cell and its slot on that cell.
///
/// Segments order by `(cell, idx)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    /// The cell this segment grows on.
    pub cell: CellIdx,

    /// Slot index of the segment on its cell.
    pub idx: SegmentIdx,
}

impl Segment {
    /// Creates a segment handle.
    #[inline]
    pub const fn new(cell: CellIdx, idx: SegmentIdx) -> Self {
        Self { cell, idx }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Segment(cell={}, idx={})", self.cell, self.idx)
    }
}

/// A synapse, addressed by its segment and its slot on that segment.
///
/// Synapses order by `(segment, idx)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Synapse {
    /// The segment this synapse belongs to.
    pub segment: Segment,

    /// Slot index of the synapse on its segment.
    pub idx: SynapseIdx,
}

impl Synapse {
    /// Creates a synapse handle.
    #[inline]
    pub const fn new(segment: Segment, idx: SynapseIdx) -> Self {
        Self { segment, idx }
    }

    /// The cell that owns this synapse's segment.
    #[inline]
    pub const fn cell(&self) -> CellIdx {
        self.segment.cell
    }
}

impl fmt::Display for Synapse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Synapse(cell={}, segment={}, idx={})",
            self.segment.cell, self.segment.idx, self.idx
        )
    }
}

/// A segment paired with the number of its synapses that were active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentOverlap {
    /// The scored segment.
    pub segment: Segment,

    /// Number of synapses on the segment that passed the permanence threshold.
    pub overlap: Overlap,
}

impl SegmentOverlap {
    /// Creates a scored segment entry.
    #[inline]
    pub const fn new(segment: Segment, overlap: Overlap) -> Self {
        Self { segment, overlap }
    }
}
