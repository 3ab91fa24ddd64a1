use nalgebra::Vector3;

/// Output of one single-point evaluation.
///
/// Energy in Hartree, gradient in Hartree/Bohr (one vector per atom, in input
/// order) and dipole moment in e·Bohr.
#[derive(Debug, Clone, PartialEq)]
pub struct SinglePoint {
    pub energy: f64,
    pub gradient: Vec<Vector3<f64>>,
    pub dipole: Vector3<f64>,
}

impl SinglePoint {
    pub(crate) fn from_flat(energy: f64, gradient: &[f64], dipole: [f64; 3]) -> Self {
        Self {
            energy,
            gradient: gradient
                .chunks_exact(3)
                .map(|g| Vector3::new(g[0], g[1], g[2]))
                .collect(),
            dipole: Vector3::from(dipole),
        }
    }

    pub fn num_atoms(&self) -> usize {
        self.gradient.len()
    }

    /// Row-major `N x 3` gradient.
    pub fn flat_gradient(&self) -> Vec<f64> {
        self.gradient.iter().flat_map(|g| [g.x, g.y, g.z]).collect()
    }

    pub fn dipole_array(&self) -> [f64; 3] {
        [self.dipole.x, self.dipole.y, self.dipole.z]
    }

    /// Largest absolute gradient component.
    pub fn gradient_norm(&self) -> f64 {
        self.gradient
            .iter()
            .map(|g| g.amax())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_flat_splits_gradient_per_atom() {
        let sp = SinglePoint::from_flat(-5.0, &[0.1, -0.2, 0.3, 0.0, 0.0, -0.4], [1.0, 2.0, 3.0]);

        assert_eq!(sp.num_atoms(), 2);
        assert_eq!(sp.gradient[0], Vector3::new(0.1, -0.2, 0.3));
        assert_eq!(sp.flat_gradient(), vec![0.1, -0.2, 0.3, 0.0, 0.0, -0.4]);
        assert_eq!(sp.dipole_array(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn gradient_norm_is_max_absolute_component() {
        let sp = SinglePoint::from_flat(0.0, &[0.1, -0.7, 0.3, 0.0, 0.5, 0.0], [0.0; 3]);
        assert!((sp.gradient_norm() - 0.7).abs() < 1e-12);
    }
}
