//! Per-cell, per-segment and per-synapse records.
//!
//! Destroyed records are tombstoned in place (flagged, contents cleared) so
//! that the slot indices of their siblings never move.

use crate::types::{permanences_equal, CellIdx, FlatIdx, Permanence};

/// Data associated with a synapse slot.
#[derive(Debug, Clone)]
pub struct SynapseData {
    /// The presynaptic cell this synapse connects to.
    pub presynaptic_cell: CellIdx,

    /// The permanence strength of this synapse.
    pub permanence: Permanence,

    /// Tombstone flag; a destroyed slot may be reused by the next create.
    pub destroyed: bool,
}

impl SynapseData {
    pub(crate) fn new(presynaptic_cell: CellIdx, permanence: Permanence) -> Self {
        Self {
            presynaptic_cell,
            permanence,
            destroyed: false,
        }
    }
}

impl PartialEq for SynapseData {
    fn eq(&self, other: &Self) -> bool {
        self.presynaptic_cell == other.presynaptic_cell
            && permanences_equal(self.permanence, other.permanence)
            && self.destroyed == other.destroyed
    }
}

/// Data associated with a segment slot.
#[derive(Debug, Clone)]
pub struct SegmentData {
    /// Synapse slots, live and destroyed, in slot order.
    pub synapses: Vec<SynapseData>,

    /// Number of destroyed slots in `synapses`.
    pub num_destroyed_synapses: usize,

    /// Tombstone flag; a destroyed slot may be reused by the next create.
    pub destroyed: bool,

    /// Store-wide flat index. Assigned once when the slot is first
    /// allocated and kept across reuse.
    pub flat_idx: FlatIdx,

    /// Iteration at which the segment was created or last found active.
    pub last_used_iteration: u64,
}

impl SegmentData {
    pub(crate) fn new(flat_idx: FlatIdx, last_used_iteration: u64) -> Self {
        Self {
            synapses: Vec::new(),
            num_destroyed_synapses: 0,
            destroyed: false,
            flat_idx,
            last_used_iteration,
        }
    }

    /// Number of live synapses on this segment.
    #[inline]
    pub fn num_live_synapses(&self) -> usize {
        self.synapses.len() - self.num_destroyed_synapses
    }

    /// Iterates live synapse slots with their slot index.
    pub fn live_synapses(&self) -> impl Iterator<Item = (usize, &SynapseData)> {
        self.synapses
            .iter()
            .enumerate()
            .filter(|(_, synapse)| !synapse.destroyed)
    }
}

/// Flat indices are internal addressing and take no part in equality.
impl PartialEq for SegmentData {
    fn eq(&self, other: &Self) -> bool {
        self.destroyed == other.destroyed
            && self.last_used_iteration == other.last_used_iteration
            && self.synapses == other.synapses
    }
}

/// Data associated with a cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellData {
    /// Segment slots, live and destroyed, in slot order.
    pub segments: Vec<SegmentData>,

    /// Number of destroyed slots in `segments`.
    pub num_destroyed_segments: usize,
}

impl CellData {
    /// Number of live segments on this cell.
    #[inline]
    pub fn num_live_segments(&self) -> usize {
        self.segments.len() - self.num_destroyed_segments
    }

    /// Iterates live segment slots with their slot index.
    pub fn live_segments(&self) -> impl Iterator<Item = (usize, &SegmentData)> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, segment)| !segment.destroyed)
    }
}
