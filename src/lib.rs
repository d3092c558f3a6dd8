//! # Dendrite - the connectivity store behind HTM Temporal Memory
//!
//! Dendrite keeps the growable graph of cells, dendritic segments and synapses
//! that a Temporal Memory learning loop grows and prunes on every time step.
//!
//! ## Overview
//!
//! - **Handles**: [`Segment`](types::Segment) and [`Synapse`](types::Synapse) are
//!   plain index pairs. They stay valid until the object they name is destroyed.
//! - **Records**: per-cell, per-segment and per-synapse data, tombstoned in place
//!   on destruction so that sibling indices never shift.
//! - **Reverse index**: presynaptic cell to synapses, so that activity is driven
//!   by the active input rather than by the size of the graph.
//! - **[`Connections`](connections::Connections)**: the facade. Growth, pruning,
//!   capacity eviction and the batch `compute_activity` query.
//!
//! ## Quick Start
//!
//! ```rust
//! use dendrite::prelude::*;
//!
//! let mut conn = Connections::new(ConnectionsParams {
//!     num_cells: 3,
//!     max_segments_per_cell: 2,
//!     max_synapses_per_segment: 2,
//! })
//! .unwrap();
//!
//! let segment = conn.create_segment(0).unwrap();
//! conn.create_synapse(segment, 1, 0.5).unwrap();
//!
//! let (active, matching) = conn.compute_activity(&[1], 0.3, 1, 0.1, 1, true);
//! assert_eq!(active, vec![SegmentOverlap::new(segment, 1)]);
//! assert_eq!(matching, vec![SegmentOverlap::new(segment, 1)]);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): persistence through serde, bincode and JSON

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]

pub mod connections;
pub mod types;

#[cfg(feature = "serde")]
pub mod serialization;

/// Re-export of commonly used types and traits for convenience.
pub mod prelude {
    pub use crate::connections::{
        CellData, CellState, Connections, ConnectionsParams, ConnectionsState, SegmentData,
        SegmentState, SynapseData, SynapseState,
    };
    pub use crate::types::{
        CellIdx, FlatIdx, Overlap, Permanence, Segment, SegmentIdx, SegmentOverlap, Synapse,
        SynapseIdx,
    };

    #[cfg(feature = "serde")]
    pub use crate::serialization::{Serializable, SerializableFormat};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for the library.
pub mod error {
    use thiserror::Error;

    /// Main error type for dendrite operations.
    #[derive(Error, Debug)]
    pub enum DendriteError {
        /// The operation needs a live object but found a destroyed one.
        #[error("Invalid state: {0}")]
        InvalidState(String),

        /// A handle or index does not address anything in this store.
        #[error("{what} index {index} out of bounds (size: {size})")]
        IndexOutOfBounds {
            /// Kind of index that was out of range.
            what: &'static str,
            /// The invalid index.
            index: usize,
            /// The valid size.
            size: usize,
        },

        /// Invalid parameter value.
        #[error("Invalid parameter '{name}': {message}")]
        InvalidParameter {
            /// Name of the invalid parameter.
            name: &'static str,
            /// Description of the error.
            message: String,
        },

        /// Persisted state is missing something or contradicts itself.
        #[error("Malformed persisted state: {0}")]
        NotFound(String),

        /// Serialization error.
        #[cfg(feature = "serde")]
        #[error("Serialization error: {message}")]
        SerializationError {
            /// Description of the serialization error.
            message: String,
        },

        /// I/O error.
        #[error("I/O error: {message}")]
        IoError {
            /// Description of the I/O error.
            message: String,
        },
    }

    /// Result type alias using `DendriteError`.
    pub type Result<T> = std::result::Result<T, DendriteError>;
}

pub use error::{DendriteError, Result};
