//! Persisted shape of a `Connections` store and its reconstruction.
//!
//! The persisted form keeps every segment and synapse slot, tombstones
//! included, so that handles held by a caller stay valid across a save and
//! load. Flat indices and the reverse index are derived data: they are
//! rebuilt on load, flat indices in cell-then-slot order.

use super::presynaptic::PresynapticIndex;
use super::records::{CellData, SegmentData, SynapseData};
use super::{Connections, ConnectionsParams, LOG_TARGET};

use crate::error::{DendriteError, Result};
use crate::types::{
    CellIdx, FlatIdx, Permanence, Segment, SegmentIdx, Synapse, SynapseIdx,
};

use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Persisted synapse slot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SynapseState {
    /// The presynaptic cell this synapse connects to.
    pub presynaptic_cell: CellIdx,
    /// The permanence strength of this synapse.
    pub permanence: Permanence,
    /// Tombstone flag.
    pub destroyed: bool,
}

/// Persisted segment slot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentState {
    /// Tombstone flag. Destroyed segments carry no synapses.
    pub destroyed: bool,
    /// Iteration at which the segment was created or last found active.
    pub last_used_iteration: u64,
    /// Synapse slots in slot order.
    pub synapses: Vec<SynapseState>,
}

/// Persisted cell.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellState {
    /// Segment slots in slot order.
    pub segments: Vec<SegmentState>,
}

/// Persisted `Connections` store.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConnectionsState {
    /// Per-cell segment capacity.
    pub max_segments_per_cell: SegmentIdx,
    /// Per-segment synapse capacity.
    pub max_synapses_per_segment: SynapseIdx,
    /// Iteration clock.
    pub iteration: u64,
    /// Recorded live segment count, checked against `cells` on load.
    pub num_segments: usize,
    /// Recorded live synapse count, checked against `cells` on load.
    pub num_synapses: usize,
    /// Every cell, in cell order.
    pub cells: Vec<CellState>,
}

impl Connections {
    /// Captures the full store as a [`ConnectionsState`].
    pub fn to_state(&self) -> ConnectionsState {
        let cells = self
            .cells
            .iter()
            .map(|cell| CellState {
                segments: cell
                    .segments
                    .iter()
                    .map(|segment| SegmentState {
                        destroyed: segment.destroyed,
                        last_used_iteration: segment.last_used_iteration,
                        synapses: segment
                            .synapses
                            .iter()
                            .map(|synapse| SynapseState {
                                presynaptic_cell: synapse.presynaptic_cell,
                                permanence: synapse.permanence,
                                destroyed: synapse.destroyed,
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        ConnectionsState {
            max_segments_per_cell: self.max_segments_per_cell,
            max_synapses_per_segment: self.max_synapses_per_segment,
            iteration: self.iteration,
            num_segments: self.num_segments,
            num_synapses: self.num_synapses,
            cells,
        }
    }

    /// Rebuilds a store from a [`ConnectionsState`].
    ///
    /// The result compares equal to the store the state was taken from.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for zero capacities and `NotFound` when the
    /// state contradicts itself: recorded counts that disagree with the
    /// slot lists, destroyed segments that still carry synapses, or cells
    /// and segments holding more live objects than their capacity.
    pub fn from_state(state: ConnectionsState) -> Result<Self> {
        let num_cells = CellIdx::try_from(state.cells.len()).map_err(|_| {
            DendriteError::NotFound(format!("{} cells exceed the cell index range", state.cells.len()))
        })?;

        let mut conn = Connections::new(ConnectionsParams {
            num_cells: 0,
            max_segments_per_cell: state.max_segments_per_cell,
            max_synapses_per_segment: state.max_synapses_per_segment,
        })?;
        conn.iteration = state.iteration;
        conn.cells.reserve_exact(num_cells as usize);

        let max_segments = usize::from(state.max_segments_per_cell);
        let max_synapses = usize::from(state.max_synapses_per_segment);
        let max_slots = usize::from(SegmentIdx::MAX) + 1;

        let mut presynaptic = PresynapticIndex::new();
        let mut segment_for_flat_idx = Vec::new();
        let mut num_segments = 0;
        let mut num_synapses = 0;

        for (cell_idx, cell_state) in state.cells.into_iter().enumerate() {
            let cell = cell_idx as CellIdx;
            if cell_state.segments.len() > max_slots {
                return Err(DendriteError::NotFound(format!(
                    "cell {cell} has {} segment slots",
                    cell_state.segments.len()
                )));
            }

            let mut cell_data = CellData::default();
            for (seg_idx, segment_state) in cell_state.segments.into_iter().enumerate() {
                let segment = Segment::new(cell, seg_idx as SegmentIdx);
                if segment_state.destroyed && !segment_state.synapses.is_empty() {
                    return Err(DendriteError::NotFound(format!(
                        "destroyed {segment} still lists {} synapses",
                        segment_state.synapses.len()
                    )));
                }
                if segment_state.synapses.len() > max_slots {
                    return Err(DendriteError::NotFound(format!(
                        "{segment} has {} synapse slots",
                        segment_state.synapses.len()
                    )));
                }

                let flat_idx = segment_for_flat_idx.len() as FlatIdx;
                segment_for_flat_idx.push(segment);

                let mut data = SegmentData::new(flat_idx, segment_state.last_used_iteration);
                data.destroyed = segment_state.destroyed;
                for (syn_idx, synapse_state) in segment_state.synapses.into_iter().enumerate() {
                    let mut synapse = SynapseData::new(
                        synapse_state.presynaptic_cell,
                        synapse_state.permanence,
                    );
                    synapse.destroyed = synapse_state.destroyed;
                    if synapse.destroyed {
                        data.num_destroyed_synapses += 1;
                    } else {
                        presynaptic.insert(
                            synapse.presynaptic_cell,
                            Synapse::new(segment, syn_idx as SynapseIdx),
                        );
                    }
                    data.synapses.push(synapse);
                }

                if data.num_live_synapses() > max_synapses {
                    return Err(DendriteError::NotFound(format!(
                        "{segment} holds {} live synapses, capacity is {max_synapses}",
                        data.num_live_synapses()
                    )));
                }

                if data.destroyed {
                    cell_data.num_destroyed_segments += 1;
                } else {
                    num_segments += 1;
                    num_synapses += data.num_live_synapses();
                }
                cell_data.segments.push(data);
            }

            if cell_data.num_live_segments() > max_segments {
                return Err(DendriteError::NotFound(format!(
                    "cell {cell} holds {} live segments, capacity is {max_segments}",
                    cell_data.num_live_segments()
                )));
            }
            conn.cells.push(cell_data);
        }

        if num_segments != state.num_segments {
            return Err(DendriteError::NotFound(format!(
                "recorded {} live segments, found {num_segments}",
                state.num_segments
            )));
        }
        if num_synapses != state.num_synapses {
            return Err(DendriteError::NotFound(format!(
                "recorded {} live synapses, found {num_synapses}",
                state.num_synapses
            )));
        }
        debug_assert_eq!(presynaptic.num_synapses(), num_synapses);

        conn.presynaptic = presynaptic;
        conn.segment_for_flat_idx = segment_for_flat_idx;
        conn.num_segments = num_segments;
        conn.num_synapses = num_synapses;

        debug!(
            target: LOG_TARGET,
            cells = num_cells,
            segments = num_segments,
            synapses = num_synapses,
            iteration = conn.iteration,
            "reconstructed connections"
        );
        Ok(conn)
    }
}

impl From<&Connections> for ConnectionsState {
    fn from(conn: &Connections) -> Self {
        conn.to_state()
    }
}

impl TryFrom<ConnectionsState> for Connections {
    type Error = DendriteError;

    fn try_from(state: ConnectionsState) -> Result<Self> {
        Connections::from_state(state)
    }
}

// Serialized through `ConnectionsState`; derived data is rebuilt on load.
#[cfg(feature = "serde")]
mod serde_impl {
    use super::{Connections, ConnectionsState};
    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for Connections {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            self.to_state().serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for Connections {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let state = ConnectionsState::deserialize(deserializer)?;
            Connections::from_state(state).map_err(D::Error::custom)
        }
    }
}
