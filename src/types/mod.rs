//! Core types for the connectivity store.
//!
//! This module contains the primitive index aliases and the identity handles
//! that every other part of the crate passes around.

mod handles;
mod primitives;

pub use handles::*;
pub use primitives::*;
