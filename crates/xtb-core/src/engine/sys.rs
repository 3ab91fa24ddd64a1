//! Raw declarations of the libxtb C API (`xtb.h`).

#![allow(non_snake_case)]

use super::api::{CalculatorHandle, EnvironmentHandle, MoleculeHandle, ResultsHandle};
use std::os::raw::{c_char, c_int};

pub const XTB_VERBOSITY_FULL: c_int = 2;
pub const XTB_VERBOSITY_MINIMAL: c_int = 1;
pub const XTB_VERBOSITY_MUTED: c_int = 0;

#[link(name = "xtb")]
unsafe extern "C" {
    pub fn xtb_getAPIVersion() -> c_int;

    pub fn xtb_newEnvironment() -> EnvironmentHandle;
    pub fn xtb_delEnvironment(env: *mut EnvironmentHandle);
    pub fn xtb_checkEnvironment(env: EnvironmentHandle) -> c_int;
    pub fn xtb_showEnvironment(env: EnvironmentHandle, message: *const c_char);
    pub fn xtb_getError(env: EnvironmentHandle, buffer: *mut c_char, buffersize: *const c_int);
    pub fn xtb_setVerbosity(env: EnvironmentHandle, verbosity: c_int);

    pub fn xtb_newMolecule(
        env: EnvironmentHandle,
        natoms: *const c_int,
        numbers: *const c_int,
        positions: *const f64,
        charge: *const f64,
        uhf: *const c_int,
        lattice: *const f64,
        periodic: *const bool,
    ) -> MoleculeHandle;
    pub fn xtb_delMolecule(mol: *mut MoleculeHandle);
    pub fn xtb_updateMolecule(
        env: EnvironmentHandle,
        mol: MoleculeHandle,
        positions: *const f64,
        lattice: *const f64,
    );

    pub fn xtb_newCalculator() -> CalculatorHandle;
    pub fn xtb_delCalculator(calc: *mut CalculatorHandle);
    pub fn xtb_loadGFNFF(
        env: EnvironmentHandle,
        mol: MoleculeHandle,
        calc: CalculatorHandle,
        filename: *mut c_char,
    );
    pub fn xtb_loadGFN0xTB(
        env: EnvironmentHandle,
        mol: MoleculeHandle,
        calc: CalculatorHandle,
        filename: *mut c_char,
    );
    pub fn xtb_loadGFN1xTB(
        env: EnvironmentHandle,
        mol: MoleculeHandle,
        calc: CalculatorHandle,
        filename: *mut c_char,
    );
    pub fn xtb_loadGFN2xTB(
        env: EnvironmentHandle,
        mol: MoleculeHandle,
        calc: CalculatorHandle,
        filename: *mut c_char,
    );
    pub fn xtb_setAccuracy(env: EnvironmentHandle, calc: CalculatorHandle, accuracy: f64);
    pub fn xtb_setMaxIter(env: EnvironmentHandle, calc: CalculatorHandle, iterations: c_int);
    pub fn xtb_setElectronicTemp(env: EnvironmentHandle, calc: CalculatorHandle, temperature: f64);

    pub fn xtb_singlepoint(
        env: EnvironmentHandle,
        mol: MoleculeHandle,
        calc: CalculatorHandle,
        res: ResultsHandle,
    );

    pub fn xtb_newResults() -> ResultsHandle;
    pub fn xtb_delResults(res: *mut ResultsHandle);
    pub fn xtb_getEnergy(env: EnvironmentHandle, res: ResultsHandle, energy: *mut f64);
    pub fn xtb_getDipole(env: EnvironmentHandle, res: ResultsHandle, dipole: *mut f64);
    pub fn xtb_getGradient(env: EnvironmentHandle, res: ResultsHandle, gradient: *mut f64);
}
