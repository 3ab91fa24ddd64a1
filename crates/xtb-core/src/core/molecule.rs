use crate::engine::error::XtbError;
use nalgebra::Point3;

/// Atoms, charge and spin of an isolated molecule.
///
/// Positions are in Bohr and the charge in units of the elementary charge.
/// Only the shape of the input is checked here; whether the engine can treat
/// the elements and geometry is reported by the engine itself.
#[derive(Debug, Clone, PartialEq)]
pub struct MolecularInput {
    numbers: Vec<i32>,
    positions: Vec<Point3<f64>>,
    charge: f64,
    unpaired_electrons: u32,
}

impl MolecularInput {
    /// Creates a validated molecular input.
    ///
    /// # Errors
    ///
    /// Returns [`XtbError::InvalidInput`] if there are no atoms or if the number
    /// of positions differs from the number of atomic numbers.
    pub fn new(
        numbers: Vec<i32>,
        positions: Vec<Point3<f64>>,
        charge: f64,
        unpaired_electrons: u32,
    ) -> Result<Self, XtbError> {
        if numbers.is_empty() {
            return Err(XtbError::InvalidInput(
                "at least one atom is required".to_string(),
            ));
        }
        if positions.len() != numbers.len() {
            return Err(XtbError::InvalidInput(format!(
                "{} atomic numbers but {} positions",
                numbers.len(),
                positions.len()
            )));
        }

        Ok(Self {
            numbers,
            positions,
            charge,
            unpaired_electrons,
        })
    }

    /// Creates a molecular input from a flattened, row-major `N x 3` coordinate slice.
    pub fn from_flat(
        numbers: &[i32],
        coords: &[f64],
        charge: f64,
        unpaired_electrons: u32,
    ) -> Result<Self, XtbError> {
        if coords.len() != 3 * numbers.len() {
            return Err(XtbError::InvalidInput(format!(
                "expected {} coordinates for {} atoms, got {}",
                3 * numbers.len(),
                numbers.len(),
                coords.len()
            )));
        }
        let positions = coords
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();
        Self::new(numbers.to_vec(), positions, charge, unpaired_electrons)
    }

    pub fn num_atoms(&self) -> usize {
        self.numbers.len()
    }

    pub fn numbers(&self) -> &[i32] {
        &self.numbers
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn charge(&self) -> f64 {
        self.charge
    }

    pub fn unpaired_electrons(&self) -> u32 {
        self.unpaired_electrons
    }

    pub fn flat_positions(&self) -> Vec<f64> {
        self.positions.iter().flat_map(|p| [p.x, p.y, p.z]).collect()
    }

    /// Returns a copy with the same atoms moved to `positions`.
    pub fn with_positions(&self, positions: Vec<Point3<f64>>) -> Result<Self, XtbError> {
        if positions.len() != self.num_atoms() {
            return Err(XtbError::InvalidInput(format!(
                "geometry has {} atoms, molecule has {}",
                positions.len(),
                self.num_atoms()
            )));
        }
        Self::new(
            self.numbers.clone(),
            positions,
            self.charge,
            self.unpaired_electrons,
        )
    }
}
