//! # xtb-model
//!
//! A safe Rust driver for single-point GFN-xTB calculations through the native
//! xtb calculation API.
//!
//! ## Architecture
//!
//! - **[`core`]: The Data.** The validated molecular input and the single-point output.
//!
//! - **[`engine`]: The Seam.** The [`XtbApi`](engine::api::XtbApi) trait over the
//!   native entry points, RAII owners for the four engine handles, configuration
//!   and errors. With the `libxtb` feature, [`LibXtb`](engine::native::LibXtb)
//!   links the real library.
//!
//! - **[`workflows`]: The Public API.** [`calculate_energy_and_gradient`] performs
//!   one complete evaluation; [`XtbModel`] keeps a session alive across geometries.
//!
//! All quantities are in atomic units: Bohr, Hartree, Hartree/Bohr and e·Bohr.

pub mod core;
pub mod engine;
pub mod workflows;

pub use crate::core::molecule::MolecularInput;
pub use crate::core::results::SinglePoint;
pub use crate::engine::config::{Method, Verbosity, XtbParameters};
pub use crate::engine::error::{Phase, XtbError};
pub use crate::workflows::single_point::{
    XtbModel, calculate_energy_and_gradient, calculate_with, check_api_version,
};

#[cfg(feature = "libxtb")]
pub use crate::engine::native::LibXtb;
