//! C ABI for the xtb single-point adapter.
//!
//! ```c
//! int xtb_calculate_energy_and_gradient(const double coord[], const int attyp[],
//!                                       int natoms, double charge, int uhf,
//!                                       double *energy, double gradient[],
//!                                       double dipole[3]);
//! int xtb_ffi_init_logging(unsigned char verbosity, bool quiet, const char *log_file);
//! ```
//!
//! The calculation returns 0 on success, 1-5 for the phase that failed
//! (molecule construction, verbosity, parametrization, single point, result
//! extraction) and -1 when the arguments are rejected before the engine is
//! called. Output buffers are written only on success.

#![allow(clippy::missing_safety_doc)]

mod calculate;
mod logging;

pub use calculate::{STATUS_INVALID_ARGUMENT, STATUS_SUCCESS, calculate_into};

#[cfg(feature = "libxtb")]
pub use calculate::xtb_calculate_energy_and_gradient;
pub use logging::{build_subscriber, setup_logging, xtb_ffi_init_logging};
