use super::api::{
    CalculatorHandle, EnvironmentHandle, MoleculeHandle, ResultsHandle, XtbApi,
};
use super::config::{Method, Verbosity};
use super::sys;
use std::os::raw::{c_char, c_int};
use std::ptr::{null, null_mut};

/// The linked libxtb engine.
///
/// Molecules are always built without lattice or periodicity, and GFN-FF is
/// loaded without a parameter file.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibXtb;

impl XtbApi for LibXtb {
    fn api_version(&self) -> c_int {
        unsafe { sys::xtb_getAPIVersion() }
    }

    fn new_environment(&self) -> EnvironmentHandle {
        unsafe { sys::xtb_newEnvironment() }
    }

    fn new_calculator(&self) -> CalculatorHandle {
        unsafe { sys::xtb_newCalculator() }
    }

    fn new_results(&self) -> ResultsHandle {
        unsafe { sys::xtb_newResults() }
    }

    unsafe fn new_molecule(
        &self,
        env: EnvironmentHandle,
        numbers: &[c_int],
        positions: &[f64],
        charge: f64,
        uhf: c_int,
    ) -> MoleculeHandle {
        let natoms = numbers.len() as c_int;
        unsafe {
            sys::xtb_newMolecule(
                env,
                &natoms,
                numbers.as_ptr(),
                positions.as_ptr(),
                &charge,
                &uhf,
                null(),
                null(),
            )
        }
    }

    unsafe fn update_molecule(&self, env: EnvironmentHandle, mol: MoleculeHandle, positions: &[f64]) {
        unsafe { sys::xtb_updateMolecule(env, mol, positions.as_ptr(), null()) }
    }

    unsafe fn del_environment(&self, env: &mut EnvironmentHandle) {
        unsafe { sys::xtb_delEnvironment(env) }
    }

    unsafe fn del_molecule(&self, mol: &mut MoleculeHandle) {
        unsafe { sys::xtb_delMolecule(mol) }
    }

    unsafe fn del_calculator(&self, calc: &mut CalculatorHandle) {
        unsafe { sys::xtb_delCalculator(calc) }
    }

    unsafe fn del_results(&self, res: &mut ResultsHandle) {
        unsafe { sys::xtb_delResults(res) }
    }

    unsafe fn check_environment(&self, env: EnvironmentHandle) -> c_int {
        unsafe { sys::xtb_checkEnvironment(env) }
    }

    unsafe fn show_environment(&self, env: EnvironmentHandle) {
        unsafe { sys::xtb_showEnvironment(env, null()) }
    }

    unsafe fn get_error(&self, env: EnvironmentHandle, buffer: &mut [u8]) {
        let size = buffer.len().min(c_int::MAX as usize) as c_int;
        unsafe { sys::xtb_getError(env, buffer.as_mut_ptr() as *mut c_char, &size) }
    }

    unsafe fn set_verbosity(&self, env: EnvironmentHandle, verbosity: Verbosity) {
        unsafe { sys::xtb_setVerbosity(env, raw_verbosity(verbosity)) }
    }

    unsafe fn load_method(
        &self,
        env: EnvironmentHandle,
        mol: MoleculeHandle,
        calc: CalculatorHandle,
        method: Method,
    ) {
        unsafe {
            match method {
                Method::Gfn2Xtb => sys::xtb_loadGFN2xTB(env, mol, calc, null_mut()),
                Method::Gfn1Xtb => sys::xtb_loadGFN1xTB(env, mol, calc, null_mut()),
                Method::Gfn0Xtb => sys::xtb_loadGFN0xTB(env, mol, calc, null_mut()),
                Method::GfnFF => sys::xtb_loadGFNFF(env, mol, calc, null_mut()),
            }
        }
    }

    unsafe fn set_accuracy(&self, env: EnvironmentHandle, calc: CalculatorHandle, accuracy: f64) {
        unsafe { sys::xtb_setAccuracy(env, calc, accuracy) }
    }

    unsafe fn set_max_iterations(
        &self,
        env: EnvironmentHandle,
        calc: CalculatorHandle,
        iterations: c_int,
    ) {
        unsafe { sys::xtb_setMaxIter(env, calc, iterations) }
    }

    unsafe fn set_electronic_temperature(
        &self,
        env: EnvironmentHandle,
        calc: CalculatorHandle,
        temperature: f64,
    ) {
        unsafe { sys::xtb_setElectronicTemp(env, calc, temperature) }
    }

    unsafe fn singlepoint(
        &self,
        env: EnvironmentHandle,
        mol: MoleculeHandle,
        calc: CalculatorHandle,
        res: ResultsHandle,
    ) {
        unsafe { sys::xtb_singlepoint(env, mol, calc, res) }
    }

    unsafe fn get_energy(&self, env: EnvironmentHandle, res: ResultsHandle, energy: &mut f64) {
        unsafe { sys::xtb_getEnergy(env, res, energy) }
    }

    unsafe fn get_dipole(&self, env: EnvironmentHandle, res: ResultsHandle, dipole: &mut [f64; 3]) {
        unsafe { sys::xtb_getDipole(env, res, dipole.as_mut_ptr()) }
    }

    unsafe fn get_gradient(&self, env: EnvironmentHandle, res: ResultsHandle, gradient: &mut [f64]) {
        unsafe { sys::xtb_getGradient(env, res, gradient.as_mut_ptr()) }
    }
}

fn raw_verbosity(verbosity: Verbosity) -> c_int {
    match verbosity {
        Verbosity::Muted => sys::XTB_VERBOSITY_MUTED,
        Verbosity::Minimal => sys::XTB_VERBOSITY_MINIMAL,
        Verbosity::Full => sys::XTB_VERBOSITY_FULL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels_map_to_engine_constants() {
        assert_eq!(raw_verbosity(Verbosity::Muted), 0);
        assert_eq!(raw_verbosity(Verbosity::Minimal), 1);
        assert_eq!(raw_verbosity(Verbosity::Full), 2);
    }
}
