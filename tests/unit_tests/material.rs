use nalgebra::{Matrix3, Matrix6, Vector3};
use polyxtal::material::{ElasticCrystal, ElasticMaterial, SlipCrystal, SlipMaterial, ThermalCrystal, ThermalMaterial};

#[test]
fn elastic_crystal_requires_symmetric_stiffness() {
    let mut stiffness = Matrix6::identity();
    stiffness[(0, 1)] = 0.5;
    assert!(ElasticCrystal::from_mandel(stiffness).is_err());
    stiffness[(1, 0)] = 0.5;
    assert!(ElasticCrystal::from_mandel(stiffness).is_ok());
}

#[test]
fn young_poisson_matches_bulk_and_shear_moduli() {
    let material = ElasticCrystal::from_young_poisson(3.0, 0.25).unwrap();
    // k = 2, g = 1.2
    let c = material.stiffness();
    assert!((c[(0, 0)] - (2.0 + 1.6)).abs() < 1e-12);
    assert!((c[(0, 1)] - (2.0 - 0.8)).abs() < 1e-12);
    assert!((c[(5, 5)] - 2.4).abs() < 1e-12);
    assert!(ElasticCrystal::from_young_poisson(1.0, 0.5).is_err());
}

#[test]
fn cte_is_symmetrized() {
    let mut cte = Matrix3::zeros();
    cte[(0, 1)] = 2.0;
    let material = ElasticCrystal::isotropic(1.0, 1.0).with_cte(cte);
    assert_eq!(material.cte()[(0, 1)], 1.0);
    assert_eq!(material.cte()[(1, 0)], 1.0);
    assert_eq!(ElasticCrystal::isotropic(1.0, 1.0).with_linear_cte(3.0).cte(), Matrix3::from_diagonal_element(3.0));
}

#[test]
fn thermal_crystal_requires_spd_conductivity() {
    assert!(ThermalCrystal::isotropic(-1.0).is_err());
    let mut k = Matrix3::identity();
    k[(0, 2)] = 0.1;
    assert!(ThermalCrystal::from_conductivity(k).is_err());
    let crystal = ThermalCrystal::orthotropic([1.0, 2.0, 3.0]).unwrap();
    assert_eq!(*crystal.conductivity(), Matrix3::from_diagonal(&Vector3::new(1.0, 2.0, 3.0)));
}

#[test]
fn slip_crystal_hardens_towards_saturation() {
    let crystal = SlipCrystal::fcc(1e-3, 2.0, 100.0, 200.0).unwrap();
    assert_eq!(crystal.num_slip_systems(), 12);
    assert_eq!(crystal.num_state_variables(), 1);

    let stress = Matrix3::from_diagonal(&Vector3::new(0.0, 0.0, 100.0));
    let mut rate = [0.0];
    crystal.state_derivative(&stress, &[50.0], &mut rate);
    assert!(rate[0] > 0.0);

    crystal.state_derivative(&stress, &[200.0], &mut rate);
    assert!(rate[0].abs() < 1e-14);

    crystal.state_derivative(&Matrix3::zeros(), &[50.0], &mut rate);
    assert_eq!(rate[0], 0.0);
}

#[test]
fn hydrostatic_stress_resolves_to_zero_shear() {
    let crystal = SlipCrystal::fcc(1e-3, 2.0, 100.0, 200.0).unwrap();
    let taus = crystal.resolved_shear_stresses(&Matrix3::from_diagonal_element(50.0));
    assert!(taus.iter().all(|tau| tau.abs() < 1e-12));
}
