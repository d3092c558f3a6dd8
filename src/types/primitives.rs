//! Primitive type definitions for the connectivity store.
//!
//! Index widths follow the usual HTM layout: cells are addressed by 32-bit
//! indices, while segments per cell and synapses per segment are bounded by
//! 16-bit slot indices.

/// Index type for cells in the connections graph.
pub type CellIdx = u32;

/// Slot index of a segment on its cell.
pub type SegmentIdx = u16;

/// Slot index of a synapse on its segment.
pub type SynapseIdx = u16;

/// Store-wide flat index of a segment, used to address per-call scratch arrays.
pub type FlatIdx = u32;

/// Synapse permanence value (conceptually 0.0 to 1.0).
pub type Permanence = f32;

/// Number of active synapses counted on a segment.
pub type Overlap = u32;

/// Minimum permanence value.
pub const MIN_PERMANENCE: Permanence = 0.0;

/// Maximum permanence value.
pub const MAX_PERMANENCE: Permanence = 1.0;

/// Tolerance used when comparing two permanences for equality.
pub const PERMANENCE_EPSILON: Permanence = 1e-6;

/// Tolerance applied to permanence threshold checks in activity computation.
///
/// A permanence within this distance below a threshold still counts as
/// reaching it.
pub const THRESHOLD_EPSILON: Permanence = 1e-5;

/// Default cap on live segments per cell.
pub const DEFAULT_MAX_SEGMENTS_PER_CELL: SegmentIdx = 255;

/// Default cap on live synapses per segment.
pub const DEFAULT_MAX_SYNAPSES_PER_SEGMENT: SynapseIdx = 255;

/// Returns true if two permanences are equal within [`PERMANENCE_EPSILON`].
#[inline]
pub fn permanences_equal(a: Permanence, b: Permanence) -> bool {
    (a - b).abs() <= PERMANENCE_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_sizes() {
        assert_eq!(core::mem::size_of::<CellIdx>(), 4);
        assert_eq!(core::mem::size_of::<SegmentIdx>(), 2);
        assert_eq!(core::mem::size_of::<SynapseIdx>(), 2);
        assert_eq!(core::mem::size_of::<FlatIdx>(), 4);
        assert_eq!(core::mem::size_of::<Permanence>(), 4);
    }

    #[test]
    fn test_permanence_bounds() {
        assert!(MIN_PERMANENCE < MAX_PERMANENCE);
        assert!(PERMANENCE_EPSILON > 0.0);
        assert!(PERMANENCE_EPSILON < THRESHOLD_EPSILON);
    }

    #[test]
    fn test_permanences_equal() {
        assert!(permanences_equal(0.5, 0.500_000_5));
        assert!(!permanences_equal(0.5, 0.501));
    }
}
