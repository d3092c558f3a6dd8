//! Presynaptic reverse index.
//!
//! Maps each presynaptic cell to the synapses that read from it, so activity
//! can be computed from the active input alone. A bucket exists only while it
//! holds at least one synapse.

use crate::types::{CellIdx, Synapse};

use ahash::AHashMap;
use smallvec::SmallVec;

/// Synapses sharing one presynaptic cell.
pub(crate) type Bucket = SmallVec<[Synapse; 4]>;

/// Presynaptic cell -> synapses lookup.
#[derive(Debug, Clone, Default)]
pub(crate) struct PresynapticIndex {
    buckets: AHashMap<CellIdx, Bucket>,
}

impl PresynapticIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends a synapse to the bucket for `cell`.
    pub(crate) fn insert(&mut self, cell: CellIdx, synapse: Synapse) {
        self.buckets.entry(cell).or_default().push(synapse);
    }

    /// Removes a synapse from the bucket for `cell`, dropping the bucket when
    /// it empties. Returns whether the synapse was present.
    pub(crate) fn remove(&mut self, cell: CellIdx, synapse: Synapse) -> bool {
        let Some(bucket) = self.buckets.get_mut(&cell) else {
            return false;
        };
        let Some(pos) = bucket.iter().position(|&s| s == synapse) else {
            return false;
        };
        bucket.swap_remove(pos);
        if bucket.is_empty() {
            self.buckets.remove(&cell);
        }
        true
    }

    /// Synapses reading from `cell`, in no particular order.
    #[inline]
    pub(crate) fn synapses_for(&self, cell: CellIdx) -> &[Synapse] {
        self.buckets.get(&cell).map_or(&[], |bucket| bucket.as_slice())
    }

    #[inline]
    pub(crate) fn contains_cell(&self, cell: CellIdx) -> bool {
        self.buckets.contains_key(&cell)
    }

    /// Number of presynaptic cells with at least one synapse.
    #[inline]
    pub(crate) fn num_cells(&self) -> usize {
        self.buckets.len()
    }

    /// Total number of indexed synapses.
    pub(crate) fn num_synapses(&self) -> usize {
        self.buckets.values().map(SmallVec::len).sum()
    }
}

/// Buckets compare as sets; their order depends on creation history.
impl PartialEq for PresynapticIndex {
    fn eq(&self, other: &Self) -> bool {
        if self.buckets.len() != other.buckets.len() {
            return false;
        }
        self.buckets.iter().all(|(cell, bucket)| {
            other.buckets.get(cell).is_some_and(|theirs| {
                if bucket.len() != theirs.len() {
                    return false;
                }
                let mut ours = bucket.clone();
                let mut theirs = theirs.clone();
                ours.sort_unstable();
                theirs.sort_unstable();
                ours == theirs
            })
        })
    }
}
