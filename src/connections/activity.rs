//! Batch activity queries.
//!
//! `compute_activity` walks the reverse index once per active input cell and
//! accumulates two counts per segment into dense scratch arrays addressed by
//! flat index. Cost is proportional to the number of synapses touched, plus
//! one linear scan over the flat segment list.

use super::{Connections, LOG_TARGET};

use crate::error::Result;
use crate::types::{
    CellIdx, Overlap, Permanence, Segment, SegmentIdx, SegmentOverlap, THRESHOLD_EPSILON,
};

use tracing::trace;

impl Connections {
    /// Computes segment activity given the active presynaptic cells.
    ///
    /// A synapse whose presynaptic cell is in `active_input` counts toward its
    /// segment's matching overlap when its permanence reaches
    /// `matching_permanence_threshold`, and additionally toward the active
    /// overlap when it reaches `active_permanence_threshold`. Both checks
    /// tolerate [`THRESHOLD_EPSILON`] of floating-point noise.
    ///
    /// # Arguments
    ///
    /// * `active_input` - The active presynaptic cells, without duplicates
    /// * `active_permanence_threshold` - Permanence needed to count as active
    /// * `active_synapse_threshold` - Overlap needed to report a segment as active
    /// * `matching_permanence_threshold` - Permanence needed to count as matching
    /// * `matching_synapse_threshold` - Overlap needed to report a segment as matching
    /// * `record_iteration` - Advance the iteration clock once and stamp every
    ///   active segment with the new iteration
    ///
    /// # Returns
    ///
    /// `(active_segments, matching_segments)`, each sorted by segment.
    pub fn compute_activity(
        &mut self,
        active_input: &[CellIdx],
        active_permanence_threshold: Permanence,
        active_synapse_threshold: Overlap,
        matching_permanence_threshold: Permanence,
        matching_synapse_threshold: Overlap,
        record_iteration: bool,
    ) -> (Vec<SegmentOverlap>, Vec<SegmentOverlap>) {
        let num_flat = self.segment_for_flat_idx.len();
        let mut num_active: Vec<Overlap> = vec![0; num_flat];
        let mut num_matching: Vec<Overlap> = vec![0; num_flat];

        for &cell in active_input {
            for synapse in self.presynaptic.synapses_for(cell) {
                let segment = &self.cells[synapse.segment.cell as usize].segments
                    [usize::from(synapse.segment.idx)];
                let permanence = segment.synapses[usize::from(synapse.idx)].permanence;

                if permanence - matching_permanence_threshold > -THRESHOLD_EPSILON {
                    let flat = segment.flat_idx as usize;
                    num_matching[flat] += 1;
                    if permanence - active_permanence_threshold > -THRESHOLD_EPSILON {
                        num_active[flat] += 1;
                    }
                }
            }
        }

        if record_iteration {
            self.iteration += 1;
        }
        let iteration = self.iteration;

        let mut active_segments = Vec::new();
        for (flat, &overlap) in num_active.iter().enumerate() {
            if overlap < active_synapse_threshold {
                continue;
            }
            let segment = self.segment_for_flat_idx[flat];
            let data = &mut self.cells[segment.cell as usize].segments[usize::from(segment.idx)];
            if data.destroyed {
                continue;
            }
            if record_iteration {
                data.last_used_iteration = iteration;
            }
            active_segments.push(SegmentOverlap::new(segment, overlap));
        }

        let mut matching_segments = Vec::new();
        for (flat, &overlap) in num_matching.iter().enumerate() {
            if overlap < matching_synapse_threshold {
                continue;
            }
            let segment = self.segment_for_flat_idx[flat];
            if self.cells[segment.cell as usize].segments[usize::from(segment.idx)].destroyed {
                continue;
            }
            matching_segments.push(SegmentOverlap::new(segment, overlap));
        }

        active_segments.sort_unstable_by_key(|entry| entry.segment);
        matching_segments.sort_unstable_by_key(|entry| entry.segment);

        trace!(
            target: LOG_TARGET,
            active_input = active_input.len(),
            active = active_segments.len(),
            matching = matching_segments.len(),
            iteration,
            "computed segment activity"
        );

        (active_segments, matching_segments)
    }

    /// Finds the segment on `cells` with the most live synapses reading from
    /// `input_cells` with a permanence above zero.
    ///
    /// Only segments with at least `synapse_threshold` such synapses qualify.
    /// Ties go to the segment visited last, iterating `cells` in the given
    /// order and each cell's segments in slot order.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if any of `cells` is unknown.
    pub fn most_active_segment_for_cells(
        &self,
        cells: &[CellIdx],
        input_cells: &[CellIdx],
        synapse_threshold: Overlap,
    ) -> Result<Option<Segment>> {
        let mut sorted_input = input_cells.to_vec();
        sorted_input.sort_unstable();

        let mut best = None;
        let mut max_synapses = synapse_threshold;

        for &cell in cells {
            for (idx, segment) in self.data_for_cell(cell)?.live_segments() {
                let num_active = segment
                    .live_synapses()
                    .filter(|(_, synapse)| {
                        synapse.permanence > 0.0
                            && sorted_input.binary_search(&synapse.presynaptic_cell).is_ok()
                    })
                    .count() as Overlap;

                if num_active >= max_synapses {
                    max_synapses = num_active;
                    best = Some(Segment::new(cell, idx as SegmentIdx));
                }
            }
        }

        Ok(best)
    }
}
