//! Connections - the synaptic connectivity graph for Temporal Memory.
//!
//! `Connections` stores the segments grown on every cell and the synapses
//! grown on every segment. Objects are addressed by [`Segment`] and
//! [`Synapse`] handles built from slot indices. Destroyed slots are
//! tombstoned and reused, capacity limits are enforced by eviction, and a
//! presynaptic reverse index lets [`Connections::compute_activity`] score
//! every segment in one pass over the active input.
//!
//! Every segment also receives a store-wide flat index the first time its
//! slot is allocated. Flat indices are never reclaimed, so the scratch arrays
//! allocated by `compute_activity` grow with the number of segment slots ever
//! allocated, not with the number of live segments.

mod activity;
mod presynaptic;
mod records;
mod state;

pub use records::{CellData, SegmentData, SynapseData};
pub use state::{CellState, ConnectionsState, SegmentState, SynapseState};

use presynaptic::PresynapticIndex;

use crate::error::{DendriteError, Result};
use crate::types::{
    CellIdx, FlatIdx, Permanence, Segment, SegmentIdx, Synapse, SynapseIdx,
    DEFAULT_MAX_SEGMENTS_PER_CELL, DEFAULT_MAX_SYNAPSES_PER_SEGMENT,
};

use tracing::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub(crate) const LOG_TARGET: &str = "dendrite::connections";

/// Parameters for creating a Connections instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConnectionsParams {
    /// Number of cells in the connections graph.
    pub num_cells: CellIdx,

    /// Maximum number of live segments on a cell. Creating one more evicts
    /// the least recently used segment.
    pub max_segments_per_cell: SegmentIdx,

    /// Maximum number of live synapses on a segment. Creating one more
    /// evicts the synapse with the lowest permanence.
    pub max_synapses_per_segment: SynapseIdx,
}

impl Default for ConnectionsParams {
    fn default() -> Self {
        Self {
            num_cells: 0,
            max_segments_per_cell: DEFAULT_MAX_SEGMENTS_PER_CELL,
            max_synapses_per_segment: DEFAULT_MAX_SYNAPSES_PER_SEGMENT,
        }
    }
}

impl ConnectionsParams {
    /// Checks the capacity parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if either capacity is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_segments_per_cell == 0 {
            return Err(DendriteError::InvalidParameter {
                name: "max_segments_per_cell",
                message: "Must be greater than 0".to_string(),
            });
        }
        if self.max_synapses_per_segment == 0 {
            return Err(DendriteError::InvalidParameter {
                name: "max_synapses_per_segment",
                message: "Must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

/// The Connections store manages the segments and synapses of a fixed set of
/// cells.
///
/// # Example
///
/// ```rust
/// use dendrite::connections::{Connections, ConnectionsParams};
///
/// let mut conn = Connections::new(ConnectionsParams {
///     num_cells: 100,
///     max_segments_per_cell: 4,
///     max_synapses_per_segment: 16,
/// })
/// .unwrap();
///
/// let segment = conn.create_segment(10).unwrap();
/// let synapse = conn.create_synapse(segment, 42, 0.3).unwrap();
///
/// assert_eq!(conn.num_segments(), 1);
/// assert_eq!(conn.synapses_for_segment(segment).unwrap(), vec![synapse]);
/// assert_eq!(conn.synapses_for_presynaptic_cell(42), &[synapse]);
/// ```
#[derive(Debug, Clone)]
pub struct Connections {
    /// All cells in the connections graph.
    cells: Vec<CellData>,

    /// Flat index -> segment, for every segment slot ever allocated.
    segment_for_flat_idx: Vec<Segment>,

    /// Presynaptic cell -> live synapses.
    presynaptic: PresynapticIndex,

    max_segments_per_cell: SegmentIdx,
    max_synapses_per_segment: SynapseIdx,

    /// Live segment count.
    num_segments: usize,

    /// Live synapse count.
    num_synapses: usize,

    /// Iteration clock, advanced by `compute_activity` when recording.
    iteration: u64,
}

impl Connections {
    /// Creates a new Connections instance with the given parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if a capacity is zero.
    pub fn new(params: ConnectionsParams) -> Result<Self> {
        params.validate()?;

        Ok(Self {
            cells: vec![CellData::default(); params.num_cells as usize],
            segment_for_flat_idx: Vec::new(),
            presynaptic: PresynapticIndex::new(),
            max_segments_per_cell: params.max_segments_per_cell,
            max_synapses_per_segment: params.max_synapses_per_segment,
            num_segments: 0,
            num_synapses: 0,
            iteration: 0,
        })
    }

    /// Creates a Connections instance with default capacities.
    pub fn with_cells(num_cells: CellIdx) -> Self {
        Self {
            cells: vec![CellData::default(); num_cells as usize],
            segment_for_flat_idx: Vec::new(),
            presynaptic: PresynapticIndex::new(),
            max_segments_per_cell: DEFAULT_MAX_SEGMENTS_PER_CELL,
            max_synapses_per_segment: DEFAULT_MAX_SYNAPSES_PER_SEGMENT,
            num_segments: 0,
            num_synapses: 0,
            iteration: 0,
        }
    }

    /// Returns the number of cells.
    #[inline]
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Returns the per-cell segment capacity.
    #[inline]
    pub fn max_segments_per_cell(&self) -> SegmentIdx {
        self.max_segments_per_cell
    }

    /// Returns the per-segment synapse capacity.
    #[inline]
    pub fn max_synapses_per_segment(&self) -> SynapseIdx {
        self.max_synapses_per_segment
    }

    /// Returns the current iteration count.
    #[inline]
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Returns the number of live segments.
    #[inline]
    pub fn num_segments(&self) -> usize {
        self.num_segments
    }

    /// Returns the number of live segments on a specific cell.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` for an unknown cell.
    pub fn num_segments_on_cell(&self, cell: CellIdx) -> Result<usize> {
        Ok(self.data_for_cell(cell)?.num_live_segments())
    }

    /// Returns the number of live synapses.
    #[inline]
    pub fn num_synapses(&self) -> usize {
        self.num_synapses
    }

    /// Returns the number of live synapses on a specific segment.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` for an unknown segment.
    pub fn num_synapses_on_segment(&self, segment: Segment) -> Result<usize> {
        Ok(self.data_for_segment(segment)?.num_live_synapses())
    }

    /// Length of the flat segment list, i.e. the next flat index to assign.
    #[inline]
    pub fn segment_flat_list_length(&self) -> usize {
        self.segment_for_flat_idx.len()
    }

    // ========================================================================
    // Record lookup
    // ========================================================================

    /// Gets the cell data.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` for an unknown cell.
    #[inline]
    pub fn data_for_cell(&self, cell: CellIdx) -> Result<&CellData> {
        self.cells
            .get(cell as usize)
            .ok_or(DendriteError::IndexOutOfBounds {
                what: "cell",
                index: cell as usize,
                size: self.cells.len(),
            })
    }

    /// Gets the segment data. Destroyed segments are returned as tombstones.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if the handle addresses no slot.
    #[inline]
    pub fn data_for_segment(&self, segment: Segment) -> Result<&SegmentData> {
        let cell = self.data_for_cell(segment.cell)?;
        cell.segments
            .get(usize::from(segment.idx))
            .ok_or(DendriteError::IndexOutOfBounds {
                what: "segment",
                index: usize::from(segment.idx),
                size: cell.segments.len(),
            })
    }

    /// Gets the synapse data. Destroyed synapses are returned as tombstones.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if the handle addresses no slot, which is
    /// also the case for any synapse of a destroyed segment.
    #[inline]
    pub fn data_for_synapse(&self, synapse: Synapse) -> Result<&SynapseData> {
        let segment = self.data_for_segment(synapse.segment)?;
        segment
            .synapses
            .get(usize::from(synapse.idx))
            .ok_or(DendriteError::IndexOutOfBounds {
                what: "synapse",
                index: usize::from(synapse.idx),
                size: segment.synapses.len(),
            })
    }

    /// Gets the cell that owns a segment.
    #[inline]
    pub fn cell_for_segment(&self, segment: Segment) -> CellIdx {
        segment.cell
    }

    /// Gets the segment that owns a synapse.
    #[inline]
    pub fn segment_for_synapse(&self, synapse: Synapse) -> Segment {
        synapse.segment
    }

    /// Gets the segment that was assigned `flat_idx`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if no segment slot has that flat index.
    pub fn segment_for_flat_idx(&self, flat_idx: FlatIdx) -> Result<Segment> {
        self.segment_for_flat_idx
            .get(flat_idx as usize)
            .copied()
            .ok_or(DendriteError::IndexOutOfBounds {
                what: "flat segment",
                index: flat_idx as usize,
                size: self.segment_for_flat_idx.len(),
            })
    }

    /// Gets the live segments of a cell, in slot order.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` for an unknown cell.
    pub fn segments_for_cell(&self, cell: CellIdx) -> Result<Vec<Segment>> {
        Ok(self
            .data_for_cell(cell)?
            .live_segments()
            .map(|(idx, _)| Segment::new(cell, idx as SegmentIdx))
            .collect())
    }

    /// Gets the live synapses of a segment, in slot order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the segment has been destroyed and
    /// `IndexOutOfBounds` if the handle addresses no slot.
    pub fn synapses_for_segment(&self, segment: Segment) -> Result<Vec<Synapse>> {
        let data = self.data_for_segment(segment)?;
        if data.destroyed {
            return Err(DendriteError::InvalidState(format!(
                "{segment} has been destroyed"
            )));
        }
        Ok(data
            .live_synapses()
            .map(|(idx, _)| Synapse::new(segment, idx as SynapseIdx))
            .collect())
    }

    /// Gets the presynaptic cells of the live synapses on a segment.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if the handle addresses no slot.
    pub fn presynaptic_cells_for_segment(&self, segment: Segment) -> Result<Vec<CellIdx>> {
        Ok(self
            .data_for_segment(segment)?
            .live_synapses()
            .map(|(_, synapse)| synapse.presynaptic_cell)
            .collect())
    }

    /// Gets all live synapses reading from a presynaptic cell, in no
    /// particular order.
    #[inline]
    pub fn synapses_for_presynaptic_cell(&self, cell: CellIdx) -> &[Synapse] {
        self.presynaptic.synapses_for(cell)
    }

    /// Returns true if at least one live synapse reads from `cell`.
    #[inline]
    pub fn has_presynaptic_cell(&self, cell: CellIdx) -> bool {
        self.presynaptic.contains_cell(cell)
    }

    /// Number of distinct presynaptic cells with at least one live synapse.
    #[inline]
    pub fn num_presynaptic_cells(&self) -> usize {
        self.presynaptic.num_cells()
    }

    // ========================================================================
    // Segment operations
    // ========================================================================

    /// Creates a new segment on the specified cell.
    ///
    /// If the cell is at capacity, its least recently used segment is
    /// destroyed first (lowest slot wins ties). A destroyed slot is reused
    /// before a new one is appended; only new slots get a fresh flat index.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` for an unknown cell.
    pub fn create_segment(&mut self, cell: CellIdx) -> Result<Segment> {
        let max = usize::from(self.max_segments_per_cell);
        while self.data_for_cell(cell)?.num_live_segments() >= max {
            let Some(lru) = self.least_recently_used_segment(cell) else {
                break;
            };
            trace!(target: LOG_TARGET, %lru, "evicting least recently used segment");
            self.destroy_segment(lru)?;
        }

        let iteration = self.iteration;
        let cell_data = &mut self.cells[cell as usize];

        let idx = if let Some(pos) = cell_data.segments.iter().position(|s| s.destroyed) {
            let data = &mut cell_data.segments[pos];
            data.destroyed = false;
            data.last_used_iteration = iteration;
            cell_data.num_destroyed_segments -= 1;
            pos
        } else {
            let pos = cell_data.segments.len();
            let flat_idx = self.segment_for_flat_idx.len() as FlatIdx;
            cell_data.segments.push(SegmentData::new(flat_idx, iteration));
            self.segment_for_flat_idx
                .push(Segment::new(cell, pos as SegmentIdx));
            pos
        };

        self.num_segments += 1;
        let segment = Segment::new(cell, idx as SegmentIdx);
        trace!(target: LOG_TARGET, %segment, "created segment");
        Ok(segment)
    }

    /// Destroys a segment and all its synapses. Destroying an already
    /// destroyed segment does nothing.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if the handle addresses no slot.
    pub fn destroy_segment(&mut self, segment: Segment) -> Result<()> {
        if self.data_for_segment(segment)?.destroyed {
            return Ok(());
        }

        let cell_data = &mut self.cells[segment.cell as usize];
        let data = &mut cell_data.segments[usize::from(segment.idx)];

        for (idx, synapse) in data.live_synapses() {
            self.presynaptic.remove(
                synapse.presynaptic_cell,
                Synapse::new(segment, idx as SynapseIdx),
            );
            self.num_synapses -= 1;
        }

        data.synapses.clear();
        data.num_destroyed_synapses = 0;
        data.destroyed = true;
        cell_data.num_destroyed_segments += 1;
        self.num_segments -= 1;

        trace!(target: LOG_TARGET, %segment, "destroyed segment");
        Ok(())
    }

    /// Stamps a segment as used in the current iteration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for a destroyed segment and `IndexOutOfBounds`
    /// if the handle addresses no slot.
    pub fn record_segment_activity(&mut self, segment: Segment) -> Result<()> {
        if self.data_for_segment(segment)?.destroyed {
            return Err(DendriteError::InvalidState(format!(
                "{segment} has been destroyed"
            )));
        }
        let iteration = self.iteration;
        self.cells[segment.cell as usize].segments[usize::from(segment.idx)]
            .last_used_iteration = iteration;
        Ok(())
    }

    /// Advances the iteration clock by one.
    #[inline]
    pub fn start_new_iteration(&mut self) {
        self.iteration += 1;
    }

    /// Live segment on `cell` with the oldest `last_used_iteration`.
    fn least_recently_used_segment(&self, cell: CellIdx) -> Option<Segment> {
        self.cells[cell as usize]
            .live_segments()
            .min_by_key(|(_, data)| data.last_used_iteration)
            .map(|(idx, _)| Segment::new(cell, idx as SegmentIdx))
    }

    // ========================================================================
    // Synapse operations
    // ========================================================================

    /// Creates a new synapse on a segment.
    ///
    /// If the segment is at capacity, its live synapse with the lowest
    /// permanence is destroyed first (first found wins ties). A destroyed
    /// slot is reused before a new one is appended.
    ///
    /// # Arguments
    ///
    /// * `segment` - The segment to create the synapse on
    /// * `presynaptic_cell` - The presynaptic cell to connect to
    /// * `permanence` - The initial permanence value
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for a destroyed segment and `IndexOutOfBounds`
    /// if the handle addresses no slot.
    pub fn create_synapse(
        &mut self,
        segment: Segment,
        presynaptic_cell: CellIdx,
        permanence: Permanence,
    ) -> Result<Synapse> {
        if self.data_for_segment(segment)?.destroyed {
            return Err(DendriteError::InvalidState(format!(
                "cannot grow a synapse on {segment}: segment has been destroyed"
            )));
        }

        let max = usize::from(self.max_synapses_per_segment);
        while self.cells[segment.cell as usize].segments[usize::from(segment.idx)]
            .num_live_synapses()
            >= max
        {
            let Some(weakest) = self.min_permanence_synapse(segment) else {
                break;
            };
            trace!(target: LOG_TARGET, %weakest, "evicting minimum permanence synapse");
            self.destroy_synapse(weakest)?;
        }

        let data = &mut self.cells[segment.cell as usize].segments[usize::from(segment.idx)];
        let fresh = SynapseData::new(presynaptic_cell, permanence);

        let idx = if let Some(pos) = data.synapses.iter().position(|s| s.destroyed) {
            data.synapses[pos] = fresh;
            data.num_destroyed_synapses -= 1;
            pos
        } else {
            data.synapses.push(fresh);
            data.synapses.len() - 1
        };

        let synapse = Synapse::new(segment, idx as SynapseIdx);
        self.presynaptic.insert(presynaptic_cell, synapse);
        self.num_synapses += 1;

        trace!(target: LOG_TARGET, %synapse, presynaptic_cell, permanence, "created synapse");
        Ok(synapse)
    }

    /// Destroys a synapse. Destroying an already destroyed synapse, or one
    /// whose segment has been destroyed, does nothing.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if the handle addresses no slot.
    pub fn destroy_synapse(&mut self, synapse: Synapse) -> Result<()> {
        if self.data_for_segment(synapse.segment)?.destroyed {
            return Ok(());
        }
        let data = self.data_for_synapse(synapse)?;
        if data.destroyed {
            return Ok(());
        }
        let presynaptic_cell = data.presynaptic_cell;

        self.presynaptic.remove(presynaptic_cell, synapse);

        let segment_data =
            &mut self.cells[synapse.segment.cell as usize].segments[usize::from(synapse.segment.idx)];
        segment_data.synapses[usize::from(synapse.idx)].destroyed = true;
        segment_data.num_destroyed_synapses += 1;
        self.num_synapses -= 1;

        trace!(target: LOG_TARGET, %synapse, "destroyed synapse");
        Ok(())
    }

    /// Overwrites a synapse's permanence. The value is not range checked.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if the handle addresses no slot.
    pub fn update_synapse_permanence(
        &mut self,
        synapse: Synapse,
        permanence: Permanence,
    ) -> Result<()> {
        self.data_for_synapse(synapse)?;
        self.cells[synapse.segment.cell as usize].segments[usize::from(synapse.segment.idx)]
            .synapses[usize::from(synapse.idx)]
            .permanence = permanence;
        Ok(())
    }

    /// Live synapse on `segment` with the lowest permanence.
    fn min_permanence_synapse(&self, segment: Segment) -> Option<Synapse> {
        let data = &self.cells[segment.cell as usize].segments[usize::from(segment.idx)];
        let mut weakest: Option<(usize, Permanence)> = None;
        for (idx, synapse) in data.live_synapses() {
            if weakest.map_or(true, |(_, min)| synapse.permanence < min) {
                weakest = Some((idx, synapse.permanence));
            }
        }
        weakest.map(|(idx, _)| Synapse::new(segment, idx as SynapseIdx))
    }
}

impl PartialEq for Connections {
    fn eq(&self, other: &Self) -> bool {
        self.max_segments_per_cell == other.max_segments_per_cell
            && self.max_synapses_per_segment == other.max_synapses_per_segment
            && self.cells == other.cells
            && self.presynaptic == other.presynaptic
            && self.num_segments == other.num_segments
            && self.num_synapses == other.num_synapses
            && self.iteration == other.iteration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Connections {
        Connections::new(ConnectionsParams {
            num_cells: 3,
            max_segments_per_cell: 2,
            max_synapses_per_segment: 2,
        })
        .unwrap()
    }

    #[test]
    fn test_create_connections() {
        let conn = Connections::with_cells(100);
        assert_eq!(conn.num_cells(), 100);
        assert_eq!(conn.num_segments(), 0);
        assert_eq!(conn.num_synapses(), 0);
        assert_eq!(conn.max_segments_per_cell(), 255);
        assert_eq!(conn.max_synapses_per_segment(), 255);
        assert_eq!(conn.iteration(), 0);
    }

    #[test]
    fn test_invalid_params() {
        let err = Connections::new(ConnectionsParams {
            num_cells: 10,
            max_segments_per_cell: 0,
            ..Default::default()
        });
        assert!(matches!(
            err,
            Err(DendriteError::InvalidParameter {
                name: "max_segments_per_cell",
                ..
            })
        ));

        let err = Connections::new(ConnectionsParams {
            num_cells: 10,
            max_synapses_per_segment: 0,
            ..Default::default()
        });
        assert!(matches!(
            err,
            Err(DendriteError::InvalidParameter {
                name: "max_synapses_per_segment",
                ..
            })
        ));
    }

    #[test]
    fn test_create_segment() {
        let mut conn = Connections::with_cells(100);
        let seg = conn.create_segment(10).unwrap();

        assert_eq!(seg, Segment::new(10, 0));
        assert_eq!(conn.num_segments(), 1);
        assert_eq!(conn.cell_for_segment(seg), 10);
        assert_eq!(conn.segments_for_cell(10).unwrap(), vec![seg]);
        assert_eq!(conn.data_for_segment(seg).unwrap().flat_idx, 0);
        assert_eq!(conn.segment_flat_list_length(), 1);
    }

    #[test]
    fn test_create_segment_out_of_bounds() {
        let mut conn = Connections::with_cells(4);
        assert!(matches!(
            conn.create_segment(4),
            Err(DendriteError::IndexOutOfBounds { what: "cell", index: 4, size: 4 })
        ));
        assert_eq!(conn.num_segments(), 0);
    }

    #[test]
    fn test_create_synapse() {
        let mut conn = Connections::with_cells(100);
        let seg = conn.create_segment(10).unwrap();
        let syn = conn.create_synapse(seg, 50, 0.5).unwrap();

        assert_eq!(syn, Synapse::new(seg, 0));
        assert_eq!(conn.num_synapses(), 1);
        assert_eq!(conn.segment_for_synapse(syn), seg);
        assert_eq!(conn.data_for_synapse(syn).unwrap().presynaptic_cell, 50);
        assert!((conn.data_for_synapse(syn).unwrap().permanence - 0.5).abs() < 1e-6);
        assert_eq!(conn.synapses_for_presynaptic_cell(50), &[syn]);
    }

    #[test]
    fn test_update_permanence() {
        let mut conn = Connections::with_cells(100);
        let seg = conn.create_segment(10).unwrap();
        let syn = conn.create_synapse(seg, 50, 0.4).unwrap();

        conn.update_synapse_permanence(syn, 0.6).unwrap();
        assert!((conn.data_for_synapse(syn).unwrap().permanence - 0.6).abs() < 1e-6);

        // No range check.
        conn.update_synapse_permanence(syn, 1.5).unwrap();
        assert!((conn.data_for_synapse(syn).unwrap().permanence - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_destroy_synapse() {
        let mut conn = Connections::with_cells(100);
        let seg = conn.create_segment(10).unwrap();
        let syn = conn.create_synapse(seg, 50, 0.5).unwrap();

        conn.destroy_synapse(syn).unwrap();
        assert_eq!(conn.num_synapses(), 0);
        assert_eq!(conn.num_synapses_on_segment(seg).unwrap(), 0);
        assert!(conn.data_for_synapse(syn).unwrap().destroyed);
        assert!(!conn.has_presynaptic_cell(50));

        // Second destroy is a no-op.
        conn.destroy_synapse(syn).unwrap();
        assert_eq!(conn.num_synapses(), 0);
        assert_eq!(conn.data_for_segment(seg).unwrap().num_destroyed_synapses, 1);
    }

    #[test]
    fn test_destroy_segment() {
        let mut conn = Connections::with_cells(100);
        let seg = conn.create_segment(10).unwrap();
        conn.create_synapse(seg, 50, 0.5).unwrap();
        conn.create_synapse(seg, 51, 0.5).unwrap();

        assert_eq!(conn.num_segments(), 1);
        assert_eq!(conn.num_synapses(), 2);

        conn.destroy_segment(seg).unwrap();
        assert_eq!(conn.num_segments(), 0);
        assert_eq!(conn.num_synapses(), 0);
        assert!(conn.segments_for_cell(10).unwrap().is_empty());
        assert_eq!(conn.num_presynaptic_cells(), 0);

        let data = conn.data_for_segment(seg).unwrap();
        assert!(data.destroyed);
        assert!(data.synapses.is_empty());
        assert_eq!(data.num_destroyed_synapses, 0);

        // Second destroy is a no-op.
        conn.destroy_segment(seg).unwrap();
        assert_eq!(conn.num_segments(), 0);
        assert_eq!(conn.data_for_cell(10).unwrap().num_destroyed_segments, 1);
    }

    #[test]
    fn test_synapses_for_destroyed_segment() {
        let mut conn = Connections::with_cells(10);
        let seg = conn.create_segment(1).unwrap();
        conn.destroy_segment(seg).unwrap();

        assert!(matches!(
            conn.synapses_for_segment(seg),
            Err(DendriteError::InvalidState(_))
        ));
        assert!(matches!(
            conn.create_synapse(seg, 3, 0.5),
            Err(DendriteError::InvalidState(_))
        ));
        assert!(matches!(
            conn.record_segment_activity(seg),
            Err(DendriteError::InvalidState(_))
        ));
    }

    #[test]
    fn test_destroy_synapse_after_segment() {
        let mut conn = Connections::with_cells(10);
        let seg = conn.create_segment(1).unwrap();
        let syn = conn.create_synapse(seg, 3, 0.5).unwrap();
        conn.destroy_segment(seg).unwrap();

        conn.destroy_synapse(syn).unwrap();
        assert_eq!(conn.num_synapses(), 0);
        assert!(matches!(
            conn.data_for_synapse(syn),
            Err(DendriteError::IndexOutOfBounds { what: "synapse", .. })
        ));
    }

    #[test]
    fn test_segment_slot_reuse() {
        let mut conn = Connections::with_cells(10);
        let a = conn.create_segment(2).unwrap();
        let b = conn.create_segment(2).unwrap();
        conn.create_synapse(a, 5, 0.5).unwrap();
        assert_eq!((a.idx, b.idx), (0, 1));

        conn.destroy_segment(a).unwrap();
        let c = conn.create_segment(2).unwrap();

        assert_eq!(c, a);
        assert!(conn.synapses_for_segment(c).unwrap().is_empty());
        // Reused slots keep their flat index.
        assert_eq!(conn.data_for_segment(c).unwrap().flat_idx, 0);
        assert_eq!(conn.segment_flat_list_length(), 2);
        assert_eq!(conn.num_segments_on_cell(2).unwrap(), 2);
        assert_eq!(conn.data_for_cell(2).unwrap().num_destroyed_segments, 0);
    }

    #[test]
    fn test_synapse_slot_reuse() {
        let mut conn = Connections::with_cells(10);
        let seg = conn.create_segment(0).unwrap();
        let s0 = conn.create_synapse(seg, 1, 0.1).unwrap();
        let s1 = conn.create_synapse(seg, 2, 0.2).unwrap();

        conn.destroy_synapse(s0).unwrap();
        let s2 = conn.create_synapse(seg, 3, 0.3).unwrap();

        assert_eq!(s2, s0);
        assert_eq!(conn.synapses_for_segment(seg).unwrap(), vec![s0, s1]);
        assert_eq!(conn.presynaptic_cells_for_segment(seg).unwrap(), vec![3, 2]);
        assert!(!conn.has_presynaptic_cell(1));
        assert_eq!(conn.synapses_for_presynaptic_cell(3), &[s2]);
    }

    #[test]
    fn test_max_segments_per_cell_evicts_lru() {
        let mut conn = small();
        let a = conn.create_segment(0).unwrap();
        conn.start_new_iteration();
        let b = conn.create_segment(0).unwrap();
        conn.create_synapse(a, 1, 0.5).unwrap();

        // `a` is older, so it goes.
        let c = conn.create_segment(0).unwrap();
        assert_eq!(c, a);
        assert_eq!(conn.num_segments_on_cell(0).unwrap(), 2);
        assert_eq!(conn.segments_for_cell(0).unwrap(), vec![a, b]);
        assert_eq!(conn.num_synapses(), 0);
        assert!(!conn.has_presynaptic_cell(1));
    }

    #[test]
    fn test_lru_tie_breaks_on_lowest_slot() {
        let mut conn = small();
        let a = conn.create_segment(1).unwrap();
        let b = conn.create_segment(1).unwrap();
        assert_eq!(
            conn.data_for_segment(a).unwrap().last_used_iteration,
            conn.data_for_segment(b).unwrap().last_used_iteration
        );

        conn.create_segment(1).unwrap();
        assert!(!conn.data_for_segment(b).unwrap().destroyed);
        assert_eq!(conn.num_segments(), 2);
    }

    #[test]
    fn test_record_segment_activity_protects_from_eviction() {
        let mut conn = small();
        let a = conn.create_segment(0).unwrap();
        let b = conn.create_segment(0).unwrap();

        conn.start_new_iteration();
        conn.record_segment_activity(a).unwrap();
        assert_eq!(conn.data_for_segment(a).unwrap().last_used_iteration, 1);

        let c = conn.create_segment(0).unwrap();
        assert_eq!(c, b);
        assert_eq!(conn.data_for_segment(c).unwrap().last_used_iteration, 1);
    }

    #[test]
    fn test_max_synapses_per_segment_evicts_min_permanence() {
        let mut conn = small();
        let seg = conn.create_segment(0).unwrap();
        let strong = conn.create_synapse(seg, 1, 0.6).unwrap();
        let weak = conn.create_synapse(seg, 2, 0.2).unwrap();

        let fresh = conn.create_synapse(seg, 0, 0.4).unwrap();
        assert_eq!(fresh, weak);
        assert_eq!(conn.num_synapses_on_segment(seg).unwrap(), 2);
        assert_eq!(conn.num_synapses(), 2);
        assert!(!conn.has_presynaptic_cell(2));
        assert_eq!(conn.synapses_for_segment(seg).unwrap(), vec![strong, fresh]);
    }

    #[test]
    fn test_min_permanence_tie_breaks_on_first_found() {
        let mut conn = small();
        let seg = conn.create_segment(0).unwrap();
        let first = conn.create_synapse(seg, 1, 0.3).unwrap();
        conn.create_synapse(seg, 2, 0.3).unwrap();

        conn.create_synapse(seg, 0, 0.9).unwrap();
        assert_eq!(conn.data_for_synapse(first).unwrap().presynaptic_cell, 0);
        assert!(!conn.has_presynaptic_cell(1));
        assert!(conn.has_presynaptic_cell(2));
    }

    #[test]
    fn test_segment_for_flat_idx() {
        let mut conn = Connections::with_cells(10);
        let a = conn.create_segment(3).unwrap();
        let b = conn.create_segment(1).unwrap();

        assert_eq!(conn.segment_for_flat_idx(0).unwrap(), a);
        assert_eq!(conn.segment_for_flat_idx(1).unwrap(), b);
        assert!(conn.segment_for_flat_idx(2).is_err());
    }

    #[test]
    fn test_equality() {
        let mut a = small();
        let mut b = small();
        assert_eq!(a, b);

        let seg_a = a.create_segment(0).unwrap();
        a.create_synapse(seg_a, 1, 0.5).unwrap();
        assert_ne!(a, b);

        let seg_b = b.create_segment(0).unwrap();
        let syn_b = b.create_synapse(seg_b, 1, 0.500_000_5).unwrap();
        assert_eq!(a, b);

        b.update_synapse_permanence(syn_b, 0.6).unwrap();
        assert_ne!(a, b);

        b.update_synapse_permanence(syn_b, 0.5).unwrap();
        b.start_new_iteration();
        assert_ne!(a, b);
    }
}
