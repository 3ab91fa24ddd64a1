#![cfg(feature = "libxtb")]

use xtb_model::{
    LibXtb, Method, MolecularInput, Verbosity, XtbModel, XtbParameters,
    calculate_energy_and_gradient, calculate_with,
};

const PROPYNE_NUMBERS: [i32; 7] = [6, 6, 6, 1, 1, 1, 1];
const PROPYNE_COORDS: [f64; 21] = [
    0.00000000000000, 0.00000000000000, -1.79755622305860,
    0.00000000000000, 0.00000000000000, 0.95338756106749,
    0.00000000000000, 0.00000000000000, 3.22281255790261,
    -0.96412815539807, -1.66991895015711, -2.53624948351102,
    -0.96412815539807, 1.66991895015711, -2.53624948351102,
    1.92825631079613, 0.00000000000000, -2.53624948351102,
    0.00000000000000, 0.00000000000000, 5.23010455462158,
];

const GFN2_ENERGY: f64 = -8.3824793849585;
const GFN2_DIPOLE_Z: f64 = -0.298279305689518;
const GFN1_ENERGY: f64 = -8.424757953815186;

fn propyne() -> MolecularInput {
    MolecularInput::from_flat(&PROPYNE_NUMBERS, &PROPYNE_COORDS, 0.0, 0).unwrap()
}

#[test]
fn gfn2_single_point_matches_reference() {
    let output = calculate_energy_and_gradient(&LibXtb, &propyne()).unwrap();

    assert!((output.energy - GFN2_ENERGY).abs() < 1e-9);
    assert!((output.dipole.z - GFN2_DIPOLE_Z).abs() < 1e-6);
    assert_eq!(output.flat_gradient().len(), 3 * PROPYNE_NUMBERS.len());
}

#[test]
fn gfn1_single_point_matches_reference() {
    let params = XtbParameters::builder()
        .method(Method::Gfn1Xtb)
        .verbosity(Verbosity::Muted)
        .build()
        .unwrap();

    let output = calculate_with(&LibXtb, &propyne(), &params).unwrap();

    assert!((output.energy - GFN1_ENERGY).abs() < 1e-9);
}

#[test]
fn repeated_single_points_are_identical() {
    let first = calculate_energy_and_gradient(&LibXtb, &propyne()).unwrap();
    let second = calculate_energy_and_gradient(&LibXtb, &propyne()).unwrap();

    assert_eq!(first.energy, second.energy);
    assert_eq!(first.flat_gradient(), second.flat_gradient());
    assert_eq!(first.dipole, second.dipole);
}

#[test]
fn model_matches_one_shot_calculation() {
    let mut model = XtbModel::create(&LibXtb, propyne(), XtbParameters::verbose_gfn2()).unwrap();
    let output = model.calculate().unwrap();
    assert!((output.energy - GFN2_ENERGY).abs() < 1e-9);

    let positions = model.input().positions().to_vec();
    model.update_positions(&positions).unwrap();
    let again = model.calculate().unwrap();
    assert!((again.energy - GFN2_ENERGY).abs() < 1e-9);
}
