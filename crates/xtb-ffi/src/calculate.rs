use std::os::raw::c_int;
use std::slice;
use tracing::warn;
use xtb_model::engine::api::XtbApi;
use xtb_model::{MolecularInput, XtbError, calculate_energy_and_gradient};

pub const STATUS_SUCCESS: c_int = 0;
pub const STATUS_INVALID_ARGUMENT: c_int = -1;

/// Runs the single-point workflow on raw C buffers and returns its status code.
///
/// Output buffers are written only when the status is [`STATUS_SUCCESS`].
/// A version mismatch between this crate and `api` is returned as `Err`; it
/// is a build or link inconsistency and has no status code.
///
/// # Safety
///
/// Non-null pointers must be valid for `3 * natoms` (`coord`, `gradient`),
/// `natoms` (`attyp`), one (`energy`) and three (`dipole`) values.
#[allow(clippy::too_many_arguments)]
pub unsafe fn calculate_into<A: XtbApi>(
    api: &A,
    coord: *const f64,
    attyp: *const c_int,
    natoms: c_int,
    charge: f64,
    uhf: c_int,
    energy: *mut f64,
    gradient: *mut f64,
    dipole: *mut f64,
) -> Result<c_int, XtbError> {
    if coord.is_null() || attyp.is_null() || energy.is_null() || gradient.is_null() || dipole.is_null() {
        warn!("Rejected single-point request with a null buffer.");
        return Ok(STATUS_INVALID_ARGUMENT);
    }
    if natoms <= 0 || uhf < 0 {
        warn!(natoms, uhf, "Rejected single-point request with invalid counts.");
        return Ok(STATUS_INVALID_ARGUMENT);
    }
    let natoms = natoms as usize;

    let (numbers, coords) = unsafe {
        (
            slice::from_raw_parts(attyp, natoms),
            slice::from_raw_parts(coord, 3 * natoms),
        )
    };
    let input = match MolecularInput::from_flat(numbers, coords, charge, uhf as u32) {
        Ok(input) => input,
        Err(e) => {
            warn!("Rejected single-point request: {}", e);
            return Ok(STATUS_INVALID_ARGUMENT);
        }
    };

    match calculate_energy_and_gradient(api, &input) {
        Ok(output) => {
            unsafe {
                *energy = output.energy;
                slice::from_raw_parts_mut(gradient, 3 * natoms)
                    .copy_from_slice(&output.flat_gradient());
                slice::from_raw_parts_mut(dipole, 3).copy_from_slice(&output.dipole_array());
            }
            Ok(STATUS_SUCCESS)
        }
        Err(e @ XtbError::ApiVersionMismatch { .. }) => Err(e),
        Err(XtbError::InvalidInput(message)) => {
            warn!("Rejected single-point request: {}", message);
            Ok(STATUS_INVALID_ARGUMENT)
        }
        Err(XtbError::Engine { phase, .. }) => Ok(phase.status_code()),
    }
}

/// Single-point GFN2-xTB energy, gradient and dipole through the linked libxtb.
///
/// Aborts the process if the linked library implements a different API version.
#[cfg(feature = "libxtb")]
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn xtb_calculate_energy_and_gradient(
    coord: *const f64,
    attyp: *const c_int,
    natoms: c_int,
    charge: f64,
    uhf: c_int,
    energy: *mut f64,
    gradient: *mut f64,
    dipole: *mut f64,
) -> c_int {
    let api = xtb_model::LibXtb;
    match unsafe { calculate_into(&api, coord, attyp, natoms, charge, uhf, energy, gradient, dipole) } {
        Ok(status) => status,
        Err(e) => fatal(&e),
    }
}

#[cfg(feature = "libxtb")]
fn fatal(err: &XtbError) -> ! {
    tracing::error!("Fatal: {}", err);
    eprintln!("xtb-ffi: fatal: {err}");
    std::process::abort()
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtb_model::engine::api::XTB_API_VERSION;
    use xtb_model::engine::mock::{MockCall, MockEngine};

    const WATER_NUMBERS: [c_int; 3] = [8, 1, 1];
    const WATER_COORDS: [f64; 9] = [0.0, 0.0, -0.7, 0.0, 1.4, 0.4, 0.0, -1.4, 0.4];
    const SENTINEL: f64 = 12345.0;

    struct Outputs {
        energy: f64,
        gradient: [f64; 9],
        dipole: [f64; 3],
    }

    impl Outputs {
        fn new() -> Self {
            Self {
                energy: SENTINEL,
                gradient: [SENTINEL; 9],
                dipole: [SENTINEL; 3],
            }
        }

        fn untouched(&self) -> bool {
            self.energy == SENTINEL
                && self.gradient.iter().all(|&g| g == SENTINEL)
                && self.dipole.iter().all(|&d| d == SENTINEL)
        }
    }

    fn run(engine: &MockEngine, natoms: c_int, uhf: c_int, out: &mut Outputs) -> Result<c_int, XtbError> {
        unsafe {
            calculate_into(
                engine,
                WATER_COORDS.as_ptr(),
                WATER_NUMBERS.as_ptr(),
                natoms,
                0.0,
                uhf,
                &mut out.energy,
                out.gradient.as_mut_ptr(),
                out.dipole.as_mut_ptr(),
            )
        }
    }

    #[test]
    fn success_fills_all_output_buffers() {
        let engine = MockEngine::new();
        let mut out = Outputs::new();

        let status = run(&engine, 3, 0, &mut out).unwrap();

        assert_eq!(status, STATUS_SUCCESS);
        assert!((out.energy - (-4.99527)).abs() < 1e-12);
        assert!((out.gradient[4] - 2.8e-3).abs() < 1e-12);
        assert!(out.dipole.iter().all(|&d| d != SENTINEL));
        assert_eq!(engine.live_handles(), 0);
    }

    #[test]
    fn matches_safe_api_output() {
        let engine = MockEngine::new();
        let mut out = Outputs::new();
        run(&engine, 3, 0, &mut out).unwrap();

        let input = MolecularInput::from_flat(&WATER_NUMBERS, &WATER_COORDS, 0.0, 0).unwrap();
        let expected = calculate_energy_and_gradient(&engine, &input).unwrap();

        assert_eq!(out.energy, expected.energy);
        assert_eq!(out.gradient.to_vec(), expected.flat_gradient());
        assert_eq!(out.dipole, expected.dipole_array());
    }

    #[test]
    fn failing_phase_returns_status_and_leaves_buffers_untouched() {
        let cases = [
            (MockCall::NewMolecule, 1),
            (MockCall::SetVerbosity, 2),
            (MockCall::LoadMethod, 3),
            (MockCall::Singlepoint, 4),
            (MockCall::GetGradient, 5),
        ];
        for (call, expected) in cases {
            let engine = MockEngine::new().fail_on(call);
            let mut out = Outputs::new();

            let status = run(&engine, 3, 0, &mut out).unwrap();

            assert_eq!(status, expected, "failing call {call:?}");
            assert!(out.untouched(), "outputs written after failing {call:?}");
            assert_eq!(engine.live_handles(), 0);
        }
    }

    #[test]
    fn invalid_counts_are_rejected_before_engine_call() {
        for (natoms, uhf) in [(0, 0), (-3, 0), (3, -1)] {
            let engine = MockEngine::new();
            let mut out = Outputs::new();

            let status = run(&engine, natoms, uhf, &mut out).unwrap();

            assert_eq!(status, STATUS_INVALID_ARGUMENT);
            assert!(out.untouched());
            assert!(engine.calls().is_empty());
        }
    }

    #[test]
    fn null_buffers_are_rejected() {
        let engine = MockEngine::new();
        let mut energy = SENTINEL;
        let mut dipole = [SENTINEL; 3];

        let status = unsafe {
            calculate_into(
                &engine,
                WATER_COORDS.as_ptr(),
                WATER_NUMBERS.as_ptr(),
                3,
                0.0,
                0,
                &mut energy,
                std::ptr::null_mut(),
                dipole.as_mut_ptr(),
            )
        }
        .unwrap();

        assert_eq!(status, STATUS_INVALID_ARGUMENT);
        assert_eq!(energy, SENTINEL);
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn unsupported_element_fails_molecule_construction() {
        let engine = MockEngine::new();
        let numbers = [8, 1, 0];
        let mut out = Outputs::new();

        let status = unsafe {
            calculate_into(
                &engine,
                WATER_COORDS.as_ptr(),
                numbers.as_ptr(),
                3,
                0.0,
                0,
                &mut out.energy,
                out.gradient.as_mut_ptr(),
                out.dipole.as_mut_ptr(),
            )
        }
        .unwrap();

        assert_eq!(status, 1);
        assert!(out.untouched());
        assert!(engine.calls().contains(&MockCall::NewMolecule));
        assert!(!engine.calls().contains(&MockCall::SetVerbosity));
        assert_eq!(engine.reports_shown(), 1);
        assert_eq!(engine.live_handles(), 0);
    }

    #[test]
    fn version_mismatch_is_not_a_status_code() {
        let engine = MockEngine::new().with_api_version(XTB_API_VERSION + 1);
        let mut out = Outputs::new();

        let result = run(&engine, 3, 0, &mut out);

        assert!(matches!(result, Err(XtbError::ApiVersionMismatch { .. })));
        assert!(out.untouched());
        assert_eq!(engine.total_allocations(), 0);
    }
}
