//! Owned wrappers around the four engine handles.
//!
//! Each wrapper destroys its handle when dropped, so every exit path of a
//! workflow, including early error returns, releases what was acquired.

use super::api::{CalculatorHandle, EnvironmentHandle, MoleculeHandle, ResultsHandle, XtbApi};
use super::config::{Method, Verbosity, XtbParameters};
use super::error::{Phase, XtbError};
use crate::core::molecule::MolecularInput;
use crate::core::results::SinglePoint;
use std::os::raw::c_int;
use tracing::{error, trace};

const ERROR_BUFFER_SIZE: usize = 512;

pub struct Environment<'a, A: XtbApi> {
    api: &'a A,
    raw: EnvironmentHandle,
}

impl<'a, A: XtbApi> Environment<'a, A> {
    pub fn new(api: &'a A) -> Self {
        let raw = api.new_environment();
        trace!("Acquired xtb environment handle.");
        Self { api, raw }
    }

    pub fn api(&self) -> &'a A {
        self.api
    }

    pub(crate) fn raw(&self) -> EnvironmentHandle {
        self.raw
    }

    pub fn has_error(&self) -> bool {
        self.raw.is_null() || unsafe { self.api.check_environment(self.raw) } != 0
    }

    /// The pending error message, without clearing it.
    pub fn error_message(&self) -> String {
        if self.raw.is_null() {
            return "xtb environment is not allocated".to_string();
        }
        let mut buffer = [0u8; ERROR_BUFFER_SIZE];
        unsafe { self.api.get_error(self.raw, &mut buffer) };
        let len = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
        String::from_utf8_lossy(&buffer[..len]).trim().to_string()
    }

    /// Converts a pending engine error into an [`XtbError`] for `phase`.
    ///
    /// The engine's diagnostic dump is emitted to its default channel, which
    /// also empties the error stack.
    pub fn check(&self, phase: Phase) -> Result<(), XtbError> {
        if !self.has_error() {
            return Ok(());
        }
        let mut message = self.error_message();
        if !self.raw.is_null() {
            unsafe { self.api.show_environment(self.raw) };
        }
        if message.is_empty() {
            message = "unspecified engine error".to_string();
        }
        error!(phase = %phase, code = phase.status_code(), "xtb reported an error: {}", message);
        Err(XtbError::Engine { phase, message })
    }

    pub fn set_verbosity(&self, verbosity: Verbosity) -> Result<(), XtbError> {
        unsafe { self.api.set_verbosity(self.raw, verbosity) };
        self.check(Phase::VerbosityConfiguration)
    }
}

pub struct Molecule<'a, A: XtbApi> {
    api: &'a A,
    raw: MoleculeHandle,
    num_atoms: usize,
}

impl<'a, A: XtbApi> Molecule<'a, A> {
    /// Builds an isolated (non-periodic) molecule from `input`.
    pub fn new(env: &Environment<'a, A>, input: &MolecularInput) -> Result<Self, XtbError> {
        let uhf = c_int::try_from(input.unpaired_electrons()).map_err(|_| {
            XtbError::InvalidInput(format!(
                "{} unpaired electrons exceed the engine's integer range",
                input.unpaired_electrons()
            ))
        })?;
        let positions = input.flat_positions();
        let api = env.api();
        let raw = unsafe {
            api.new_molecule(env.raw(), input.numbers(), &positions, input.charge(), uhf)
        };
        // Owned before checking so a handle returned alongside an error is released.
        let molecule = Self {
            api,
            raw,
            num_atoms: input.num_atoms(),
        };
        env.check(Phase::MoleculeConstruction)?;
        if molecule.raw.is_null() {
            error!("xtb returned no molecule without reporting an error.");
            return Err(XtbError::Engine {
                phase: Phase::MoleculeConstruction,
                message: "engine returned a null molecule".to_string(),
            });
        }
        trace!(num_atoms = molecule.num_atoms, "Acquired xtb molecule handle.");
        Ok(molecule)
    }

    pub fn num_atoms(&self) -> usize {
        self.num_atoms
    }

    pub(crate) fn raw(&self) -> MoleculeHandle {
        self.raw
    }

    /// Moves the atoms to `positions` (row-major `N x 3`, Bohr).
    pub fn update(&mut self, env: &Environment<'a, A>, positions: &[f64]) -> Result<(), XtbError> {
        if positions.len() != 3 * self.num_atoms {
            return Err(XtbError::InvalidInput(format!(
                "expected {} coordinates for {} atoms, got {}",
                3 * self.num_atoms,
                self.num_atoms,
                positions.len()
            )));
        }
        unsafe { self.api.update_molecule(env.raw(), self.raw, positions) };
        env.check(Phase::MoleculeConstruction)
    }
}

pub struct Calculator<'a, A: XtbApi> {
    api: &'a A,
    raw: CalculatorHandle,
    method: Option<Method>,
}

impl<'a, A: XtbApi> Calculator<'a, A> {
    pub fn new(api: &'a A) -> Self {
        let raw = api.new_calculator();
        trace!("Acquired xtb calculator handle.");
        Self {
            api,
            raw,
            method: None,
        }
    }

    pub fn method(&self) -> Option<Method> {
        self.method
    }

    pub fn load(
        &mut self,
        env: &Environment<'a, A>,
        molecule: &Molecule<'a, A>,
        method: Method,
    ) -> Result<(), XtbError> {
        unsafe { self.api.load_method(env.raw(), molecule.raw(), self.raw, method) };
        env.check(Phase::Parametrization)?;
        self.method = Some(method);
        Ok(())
    }

    /// Applies the optional calculator settings of `params`; unset ones keep
    /// the engine defaults. Must follow [`load`](Self::load).
    pub fn configure(&mut self, env: &Environment<'a, A>, params: &XtbParameters) -> Result<(), XtbError> {
        if let Some(accuracy) = params.accuracy {
            unsafe { self.api.set_accuracy(env.raw(), self.raw, accuracy) };
            env.check(Phase::Parametrization)?;
        }
        if let Some(iterations) = params.max_iterations {
            let iterations = c_int::try_from(iterations).map_err(|_| {
                XtbError::InvalidInput(format!("{iterations} iterations exceed the engine limit"))
            })?;
            unsafe { self.api.set_max_iterations(env.raw(), self.raw, iterations) };
            env.check(Phase::Parametrization)?;
        }
        if let Some(temperature) = params.electronic_temperature {
            unsafe { self.api.set_electronic_temperature(env.raw(), self.raw, temperature) };
            env.check(Phase::Parametrization)?;
        }
        Ok(())
    }

    pub fn singlepoint(
        &self,
        env: &Environment<'a, A>,
        molecule: &Molecule<'a, A>,
        results: &mut Results<'a, A>,
    ) -> Result<(), XtbError> {
        unsafe {
            self.api
                .singlepoint(env.raw(), molecule.raw(), self.raw, results.raw)
        };
        env.check(Phase::SinglePoint)
    }
}

pub struct Results<'a, A: XtbApi> {
    api: &'a A,
    raw: ResultsHandle,
}

impl<'a, A: XtbApi> Results<'a, A> {
    pub fn new(api: &'a A) -> Self {
        let raw = api.new_results();
        trace!("Acquired xtb results handle.");
        Self { api, raw }
    }

    /// Reads energy, dipole and gradient, in that order, checking the
    /// environment once after all three reads.
    pub fn extract(&self, env: &Environment<'a, A>, num_atoms: usize) -> Result<SinglePoint, XtbError> {
        let mut energy = f64::NAN;
        let mut dipole = [f64::NAN; 3];
        let mut gradient = vec![f64::NAN; 3 * num_atoms];
        unsafe {
            self.api.get_energy(env.raw(), self.raw, &mut energy);
            self.api.get_dipole(env.raw(), self.raw, &mut dipole);
            self.api.get_gradient(env.raw(), self.raw, &mut gradient);
        }
        env.check(Phase::ResultExtraction)?;
        Ok(SinglePoint::from_flat(energy, &gradient, dipole))
    }
}

macro_rules! impl_handle_drop {
    ($owner:ident, $del:ident, $kind:literal) => {
        impl<A: XtbApi> Drop for $owner<'_, A> {
            fn drop(&mut self) {
                if !self.raw.is_null() {
                    unsafe { self.api.$del(&mut self.raw) };
                    trace!(kind = $kind, "Released xtb handle.");
                }
                debug_assert!(self.raw.is_null());
            }
        }
    };
}

impl_handle_drop!(Environment, del_environment, "environment");
impl_handle_drop!(Molecule, del_molecule, "molecule");
impl_handle_drop!(Calculator, del_calculator, "calculator");
impl_handle_drop!(Results, del_results, "results");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::{HandleKind, MockCall, MockEngine};

    fn water() -> MolecularInput {
        MolecularInput::from_flat(
            &[8, 1, 1],
            &[0.0, 0.0, -0.7, 0.0, 1.4, 0.4, 0.0, -1.4, 0.4],
            0.0,
            0,
        )
        .unwrap()
    }

    #[test]
    fn check_passes_on_clean_environment() {
        let engine = MockEngine::new();
        let env = Environment::new(&engine);
        assert!(!env.has_error());
        assert!(env.check(Phase::SinglePoint).is_ok());
        assert_eq!(engine.reports_shown(), 0);
    }

    #[test]
    fn check_reports_and_clears_engine_error() {
        let engine = MockEngine::new().fail_on(MockCall::SetVerbosity);
        let env = Environment::new(&engine);

        let err = env.set_verbosity(Verbosity::Full).unwrap_err();

        match err {
            XtbError::Engine { phase, message } => {
                assert_eq!(phase, Phase::VerbosityConfiguration);
                assert_eq!(message, "injected failure in SetVerbosity");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(engine.reports_shown(), 1);
        assert!(!env.has_error());
    }

    #[test]
    fn failed_molecule_construction_still_releases_handle() {
        let engine = MockEngine::new().fail_on(MockCall::NewMolecule);
        {
            let env = Environment::new(&engine);
            let result = Molecule::new(&env, &water());
            assert!(matches!(
                result,
                Err(XtbError::Engine { phase: Phase::MoleculeConstruction, .. })
            ));
        }
        assert_eq!(engine.live_handles(), 0);
        assert_eq!(
            engine.release_log(),
            vec![HandleKind::Molecule, HandleKind::Environment]
        );
    }

    #[test]
    fn update_rejects_wrong_coordinate_count_before_engine_call() {
        let engine = MockEngine::new();
        let env = Environment::new(&engine);
        let mut molecule = Molecule::new(&env, &water()).unwrap();

        let result = molecule.update(&env, &[0.0; 6]);

        assert!(matches!(result, Err(XtbError::InvalidInput(_))));
        assert!(!engine.calls().contains(&MockCall::UpdateMolecule));
    }

    #[test]
    fn configure_applies_only_set_options() {
        let engine = MockEngine::new();
        let env = Environment::new(&engine);
        let molecule = Molecule::new(&env, &water()).unwrap();
        let mut calculator = Calculator::new(&engine);
        calculator.load(&env, &molecule, Method::Gfn1Xtb).unwrap();

        let params = XtbParameters::builder()
            .accuracy(0.1)
            .electronic_temperature(300.0)
            .build()
            .unwrap();
        calculator.configure(&env, &params).unwrap();

        let settings = engine.settings();
        assert_eq!(settings.accuracy, Some(0.1));
        assert_eq!(settings.max_iterations, None);
        assert_eq!(settings.electronic_temperature, Some(300.0));
        assert_eq!(calculator.method(), Some(Method::Gfn1Xtb));
    }

    #[test]
    fn configure_rejects_iteration_limit_beyond_c_int() {
        let engine = MockEngine::new();
        let env = Environment::new(&engine);
        let molecule = Molecule::new(&env, &water()).unwrap();
        let mut calculator = Calculator::new(&engine);
        calculator.load(&env, &molecule, Method::Gfn2Xtb).unwrap();

        let params = XtbParameters {
            max_iterations: Some(u32::MAX),
            ..XtbParameters::default()
        };
        let result = calculator.configure(&env, &params);

        assert!(matches!(result, Err(XtbError::InvalidInput(_))));
        assert!(!engine.calls().contains(&MockCall::SetMaxIterations));
        assert_eq!(engine.settings().max_iterations, None);
    }

    #[test]
    fn extract_reads_energy_dipole_gradient_in_order() {
        let engine = MockEngine::new();
        let env = Environment::new(&engine);
        let molecule = Molecule::new(&env, &water()).unwrap();
        let mut calculator = Calculator::new(&engine);
        let mut results = Results::new(&engine);
        calculator.load(&env, &molecule, Method::Gfn2Xtb).unwrap();
        calculator.singlepoint(&env, &molecule, &mut results).unwrap();

        let output = results.extract(&env, molecule.num_atoms()).unwrap();

        let reads: Vec<MockCall> = engine
            .calls()
            .into_iter()
            .filter(|c| matches!(c, MockCall::GetEnergy | MockCall::GetDipole | MockCall::GetGradient))
            .collect();
        assert_eq!(
            reads,
            vec![MockCall::GetEnergy, MockCall::GetDipole, MockCall::GetGradient]
        );
        assert_eq!(output.num_atoms(), 3);
        assert!(output.energy.is_finite());
    }

    #[test]
    fn extract_checks_once_after_all_reads() {
        let engine = MockEngine::new().fail_on(MockCall::GetEnergy);
        let env = Environment::new(&engine);
        let molecule = Molecule::new(&env, &water()).unwrap();
        let mut calculator = Calculator::new(&engine);
        let mut results = Results::new(&engine);
        calculator.load(&env, &molecule, Method::Gfn2Xtb).unwrap();
        calculator.singlepoint(&env, &molecule, &mut results).unwrap();

        let err = results.extract(&env, molecule.num_atoms()).unwrap_err();

        assert_eq!(err.status_code(), Some(5));
        assert!(engine.calls().ends_with(&[
            MockCall::GetEnergy,
            MockCall::GetDipole,
            MockCall::GetGradient
        ]));
        assert_eq!(engine.reports_shown(), 1);
    }
}
