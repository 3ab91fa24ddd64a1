use crate::core::molecule::MolecularInput;
use crate::core::results::SinglePoint;
use crate::engine::api::{ApiVersion, XTB_API_VERSION, XtbApi};
use crate::engine::config::XtbParameters;
use crate::engine::error::XtbError;
use crate::engine::handles::{Calculator, Environment, Molecule, Results};
use nalgebra::{Point3, Vector3};
use tracing::{debug, error, info, instrument};

/// Fails unless the engine implements the interface version this crate targets.
pub fn check_api_version<A: XtbApi>(api: &A) -> Result<(), XtbError> {
    let found = api.api_version();
    if found != XTB_API_VERSION {
        error!(
            expected = %ApiVersion(XTB_API_VERSION),
            found = %ApiVersion(found),
            "xtb API version mismatch."
        );
        return Err(XtbError::ApiVersionMismatch {
            expected: XTB_API_VERSION,
            found,
        });
    }
    Ok(())
}

/// Single-point GFN2-xTB energy, gradient and dipole of `input`, with full engine output.
///
/// All engine resources are acquired for this call only and released before it returns.
pub fn calculate_energy_and_gradient<A: XtbApi>(
    api: &A,
    input: &MolecularInput,
) -> Result<SinglePoint, XtbError> {
    calculate_with(api, input, &XtbParameters::verbose_gfn2())
}

#[instrument(skip_all, name = "single_point_workflow", fields(num_atoms = input.num_atoms(), method = %params.method))]
pub fn calculate_with<A: XtbApi>(
    api: &A,
    input: &MolecularInput,
    params: &XtbParameters,
) -> Result<SinglePoint, XtbError> {
    let mut model = XtbModel::create(api, input.clone(), *params)?;
    model.calculate()
}

/// A live engine session for one molecule.
///
/// Keeps the environment, molecule, calculator and results handles alive so
/// the same system can be evaluated repeatedly, e.g. along a trajectory.
pub struct XtbModel<'a, A: XtbApi> {
    // Fields drop in declaration order: results, calculator, molecule, environment.
    results: Results<'a, A>,
    calculator: Calculator<'a, A>,
    molecule: Molecule<'a, A>,
    environment: Environment<'a, A>,
    input: MolecularInput,
    params: XtbParameters,
    last: Option<SinglePoint>,
}

impl<'a, A: XtbApi> XtbModel<'a, A> {
    /// Acquires the engine handles, builds the molecule, sets the verbosity and
    /// loads the parametrization.
    ///
    /// # Errors
    ///
    /// [`XtbError::ApiVersionMismatch`] before any handle is created, or an
    /// [`XtbError::Engine`] tagged with the failing phase. Handles acquired
    /// before the failure are released.
    #[instrument(skip_all, name = "xtb_model_create", fields(num_atoms = input.num_atoms()))]
    pub fn create(api: &'a A, input: MolecularInput, params: XtbParameters) -> Result<Self, XtbError> {
        check_api_version(api)?;

        // Declaration order fixes release order on early return.
        let environment = Environment::new(api);
        let molecule;
        let mut calculator = Calculator::new(api);
        let results = Results::new(api);

        debug!(charge = input.charge(), uhf = input.unpaired_electrons(), "Building molecule.");
        molecule = Molecule::new(&environment, &input)?;

        debug!(verbosity = ?params.verbosity, "Setting engine verbosity.");
        environment.set_verbosity(params.verbosity)?;

        debug!(method = %params.method, "Loading parametrization.");
        calculator.load(&environment, &molecule, params.method)?;
        calculator.configure(&environment, &params)?;

        Ok(Self {
            results,
            calculator,
            molecule,
            environment,
            input,
            params,
            last: None,
        })
    }

    /// Runs a single-point evaluation at the current geometry.
    #[instrument(skip_all, name = "xtb_single_point", fields(num_atoms = self.input.num_atoms()))]
    pub fn calculate(&mut self) -> Result<SinglePoint, XtbError> {
        self.last = None;

        debug!("Running single-point calculation.");
        self.calculator
            .singlepoint(&self.environment, &self.molecule, &mut self.results)?;

        debug!("Extracting energy, dipole and gradient.");
        let output = self
            .results
            .extract(&self.environment, self.molecule.num_atoms())?;

        info!(
            energy = output.energy,
            max_gradient = output.gradient_norm(),
            "Single-point calculation finished."
        );
        self.last = Some(output.clone());
        Ok(output)
    }

    /// Moves the atoms without rebuilding the molecule. Cached results are discarded.
    pub fn update_positions(&mut self, positions: &[Point3<f64>]) -> Result<(), XtbError> {
        let moved = self.input.with_positions(positions.to_vec())?;
        self.last = None;
        self.molecule
            .update(&self.environment, &moved.flat_positions())?;
        self.input = moved;
        Ok(())
    }

    pub fn input(&self) -> &MolecularInput {
        &self.input
    }

    pub fn parameters(&self) -> &XtbParameters {
        &self.params
    }

    pub fn last_result(&self) -> Option<&SinglePoint> {
        self.last.as_ref()
    }

    pub fn energy(&self) -> Option<f64> {
        self.last.as_ref().map(|sp| sp.energy)
    }

    pub fn dipole(&self) -> Option<Vector3<f64>> {
        self.last.as_ref().map(|sp| sp.dipole)
    }
}
