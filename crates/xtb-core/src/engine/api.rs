//! The native calculation interface, one trait method per xtb C entry point.
//!
//! Handles are opaque pointers owned by the engine. Safe ownership lives in
//! [`handles`](super::handles); this layer only mirrors the C contract.

use super::config::{Method, Verbosity};
use std::fmt;
use std::os::raw::c_int;

/// Interface version this crate was written against, in the engine's compact
/// `major * 10000 + minor * 100 + patch` encoding.
pub const XTB_API_VERSION: c_int = 60701;

macro_rules! opaque_handle {
    ($data:ident, $handle:ident) => {
        #[repr(C)]
        pub struct $data {
            _private: [u8; 0],
        }

        pub type $handle = *mut $data;
    };
}

opaque_handle!(EnvironmentData, EnvironmentHandle);
opaque_handle!(MoleculeData, MoleculeHandle);
opaque_handle!(CalculatorData, CalculatorHandle);
opaque_handle!(ResultsData, ResultsHandle);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ApiVersion(pub c_int);

impl ApiVersion {
    pub fn major(self) -> c_int {
        self.0 / 10000
    }

    pub fn minor(self) -> c_int {
        (self.0 / 100) % 100
    }

    pub fn patch(self) -> c_int {
        self.0 % 100
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}

/// Entry points of the xtb calculation API.
///
/// Every `unsafe` method requires that the handles passed in were produced by
/// the same implementation and have not been destroyed. Errors are never
/// returned directly; they are recorded on the environment and must be
/// queried with [`check_environment`](XtbApi::check_environment).
pub trait XtbApi {
    fn api_version(&self) -> c_int;

    fn new_environment(&self) -> EnvironmentHandle;
    fn new_calculator(&self) -> CalculatorHandle;
    fn new_results(&self) -> ResultsHandle;

    /// Builds an isolated molecule. `positions` is row-major `N x 3` in Bohr.
    unsafe fn new_molecule(
        &self,
        env: EnvironmentHandle,
        numbers: &[c_int],
        positions: &[f64],
        charge: f64,
        uhf: c_int,
    ) -> MoleculeHandle;

    unsafe fn update_molecule(&self, env: EnvironmentHandle, mol: MoleculeHandle, positions: &[f64]);

    /// Destroys the handle and nulls it.
    unsafe fn del_environment(&self, env: &mut EnvironmentHandle);
    unsafe fn del_molecule(&self, mol: &mut MoleculeHandle);
    unsafe fn del_calculator(&self, calc: &mut CalculatorHandle);
    unsafe fn del_results(&self, res: &mut ResultsHandle);

    /// Non-zero when an error is pending.
    unsafe fn check_environment(&self, env: EnvironmentHandle) -> c_int;

    /// Dumps the pending errors to the engine's default channel and clears them.
    unsafe fn show_environment(&self, env: EnvironmentHandle);

    /// Copies the pending error message, NUL-terminated, into `buffer`.
    unsafe fn get_error(&self, env: EnvironmentHandle, buffer: &mut [u8]);

    unsafe fn set_verbosity(&self, env: EnvironmentHandle, verbosity: Verbosity);

    unsafe fn load_method(
        &self,
        env: EnvironmentHandle,
        mol: MoleculeHandle,
        calc: CalculatorHandle,
        method: Method,
    );

    unsafe fn set_accuracy(&self, env: EnvironmentHandle, calc: CalculatorHandle, accuracy: f64);
    unsafe fn set_max_iterations(
        &self,
        env: EnvironmentHandle,
        calc: CalculatorHandle,
        iterations: c_int,
    );
    unsafe fn set_electronic_temperature(
        &self,
        env: EnvironmentHandle,
        calc: CalculatorHandle,
        temperature: f64,
    );

    unsafe fn singlepoint(
        &self,
        env: EnvironmentHandle,
        mol: MoleculeHandle,
        calc: CalculatorHandle,
        res: ResultsHandle,
    );

    unsafe fn get_energy(&self, env: EnvironmentHandle, res: ResultsHandle, energy: &mut f64);
    unsafe fn get_dipole(&self, env: EnvironmentHandle, res: ResultsHandle, dipole: &mut [f64; 3]);
    /// `gradient` must hold `3 * N` values.
    unsafe fn get_gradient(&self, env: EnvironmentHandle, res: ResultsHandle, gradient: &mut [f64]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_version_decodes_compact_encoding() {
        let version = ApiVersion(XTB_API_VERSION);
        assert_eq!(version.major(), 6);
        assert_eq!(version.minor(), 7);
        assert_eq!(version.patch(), 1);
        assert_eq!(version.to_string(), "6.7.1");
    }

    #[test]
    fn api_versions_order_numerically() {
        assert!(ApiVersion(60500) < ApiVersion(60701));
    }
}
