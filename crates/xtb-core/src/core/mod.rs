//! # Core Module
//!
//! Plain data passed into and out of the engine: the validated
//! [`MolecularInput`](molecule::MolecularInput) and the
//! [`SinglePoint`](results::SinglePoint) output. Nothing here touches the
//! native library.

pub mod molecule;
pub mod results;
