use crate::box_grains;
use nalgebra::{DVector, Matrix3, Point3, Vector3};
use polyxtal::comm::run_threaded;
use polyxtal::connectivity::Hex8Connectivity;
use polyxtal::function::{FunctionInput, Interpolant};
use polyxtal::input::SlipDeformationInput;
use polyxtal::material::{SlipCrystal, SlipMaterial};
use polyxtal::mesh::procedural::create_box_hex_mesh;
use polyxtal::microstructure::{LayeredPolycrystal, SingleCrystal};
use polyxtal::orientation::Orientation;
use polyxtal::partition::{partition, CellDistribution};
use polyxtal::process::slip::{check_supported, integrate_cells, SlipIntegrator, SlipPhase};
use polyxtal::reduction::{grain_averages_components, grain_integrals_components, grain_volumes, CellComponents};
use polyxtal::Error;

const UNIT_CUBE: [[f64; 2]; 3] = [[0.0, 1.0], [0.0, 1.0], [0.0, 1.0]];

/// Every state variable grows at a fixed rate, independent of stress.
#[derive(Debug)]
struct ConstantRate(Vec<f64>);

impl SlipMaterial for ConstantRate {
    fn num_state_variables(&self) -> usize {
        self.0.len()
    }

    fn state_derivative(&self, _stress_c: &Matrix3<f64>, _state: &[f64], derivative: &mut [f64]) {
        derivative.copy_from_slice(&self.0);
    }
}

/// The single state variable grows at the rate of the normal stress along z.
#[derive(Debug)]
struct StressRate;

impl SlipMaterial for StressRate {
    fn num_state_variables(&self) -> usize {
        1
    }

    fn state_derivative(&self, stress_c: &Matrix3<f64>, _state: &[f64], derivative: &mut [f64]) {
        derivative[0] = stress_c[(2, 2)];
    }
}

fn uniaxial_z(value: f64) -> Matrix3<f64> {
    Matrix3::from_diagonal(&Vector3::new(0.0, 0.0, value))
}

/// Uniaxial stress along z that grows linearly with the z coordinate.
fn uniaxial_z_ramp(slope: f64) -> FunctionInput {
    FunctionInput::Interpolation(Interpolant::new(9, move |x| {
        let mut values = DVector::zeros(9);
        values[8] = slope * x.z;
        values
    }))
}

#[test]
fn integrator_walks_through_its_phases() {
    let material = ConstantRate(vec![1.0, -2.0]);
    let mut integrator =
        SlipIntegrator::new(&material, vec![10.0, 10.0], Matrix3::zeros(), Matrix3::zeros(), 0.25, 3).unwrap();
    assert_eq!(integrator.phase(), SlipPhase::Initialized);

    assert!(integrator.step());
    assert_eq!(integrator.phase(), SlipPhase::Stepping(1));
    assert!(integrator.step());
    assert_eq!(integrator.phase(), SlipPhase::Stepping(2));
    assert!(integrator.step());
    assert_eq!(integrator.phase(), SlipPhase::Finalized);
    assert_eq!(integrator.state(), &[10.75, 8.5]);

    // Finalized integrators no longer change
    assert!(!integrator.step());
    assert_eq!(integrator.state(), &[10.75, 8.5]);
}

#[test]
fn single_step_integration_finalizes_immediately() {
    let material = ConstantRate(vec![3.0]);
    let mut integrator = SlipIntegrator::new(&material, vec![0.0], Matrix3::zeros(), uniaxial_z(1.0), 2.0, 1).unwrap();
    assert!(integrator.step());
    assert_eq!(integrator.phase(), SlipPhase::Finalized);
    assert_eq!(integrator.state(), &[6.0]);
    assert_eq!(integrator.stress(), &uniaxial_z(1.0));
}

#[test]
fn stress_is_ramped_linearly_and_used_before_the_increment() {
    let integrator = SlipIntegrator::new(&StressRate, vec![0.0], Matrix3::zeros(), uniaxial_z(100.0), 0.5, 4).unwrap();
    // Stresses 0, 25, 50 and 75 act for half a time unit each
    let state = integrator.run();
    assert!((state[0] - 75.0).abs() < 1e-12);

    let mut integrator =
        SlipIntegrator::new(&StressRate, vec![0.0], uniaxial_z(20.0), uniaxial_z(100.0), 1.0, 4).unwrap();
    integrator.step();
    assert!((integrator.stress()[(2, 2)] - 40.0).abs() < 1e-12);
    while integrator.step() {}
    assert!((integrator.stress()[(2, 2)] - 100.0).abs() < 1e-12);
}

#[test]
fn integrator_validates_its_input() {
    let material = ConstantRate(vec![1.0, 1.0]);
    assert!(matches!(
        SlipIntegrator::new(&material, vec![1.0], Matrix3::zeros(), Matrix3::zeros(), 1.0, 1),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        SlipIntegrator::new(&material, vec![1.0, 1.0], Matrix3::zeros(), Matrix3::zeros(), 1.0, 0),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn slip_deformation_input_validation() {
    let zero = Matrix3::zeros();
    assert!(SlipDeformationInput::uniform("ok", &[1.0], &zero, &zero, 1.0, 1).is_ok());
    assert!(matches!(
        SlipDeformationInput::uniform("no-steps", &[1.0], &zero, &zero, 1.0, 0),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        SlipDeformationInput::uniform("bad-dt", &[1.0], &zero, &zero, -1.0, 2),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        SlipDeformationInput::uniform("no-state", &[], &zero, &zero, 1.0, 2),
        Err(Error::MissingField { field: "s0", .. })
    ));
    assert!(matches!(
        SlipDeformationInput::new(
            "vector-stress",
            FunctionInput::constant(&[1.0]),
            FunctionInput::constant(&[0.0; 3]),
            uniaxial_z_ramp(1.0),
            1.0,
            1
        ),
        Err(Error::InvalidInput(_))
    ));

    let deformation = SlipDeformationInput::uniform("s", &[5.0], &zero, &zero, 1.0, 1).unwrap();
    assert_eq!(deformation.initial_state(&[5.0], 3).unwrap(), vec![5.0; 3]);
    assert_eq!(deformation.initial_state(&[1.0, 2.0], 2).unwrap(), vec![1.0, 2.0]);
    assert!(deformation.initial_state(&[1.0, 2.0], 3).is_err());
}

#[test]
fn fcc_hardening_approaches_saturation() {
    let material = SlipCrystal::fcc(1e-3, 10.0, 100.0, 200.0).unwrap();
    assert_eq!(material.num_slip_systems(), 12);

    let mut derivative = [0.0];
    material.state_derivative(&uniaxial_z(100.0), &[50.0], &mut derivative);
    assert!(derivative[0] > 0.0);
    material.state_derivative(&uniaxial_z(100.0), &[200.0], &mut derivative);
    assert_eq!(derivative[0], 0.0);
    material.state_derivative(&Matrix3::zeros(), &[50.0], &mut derivative);
    assert_eq!(derivative[0], 0.0);

    let integrator = SlipIntegrator::new(&material, vec![50.0], Matrix3::zeros(), uniaxial_z(100.0), 1.0, 20).unwrap();
    let state = integrator.run();
    assert!(state[0] > 50.0 && state[0] <= 200.0);
}

#[test]
fn grains_are_integrated_in_their_own_frame() {
    // A quarter turn about x maps the sample z axis onto the crystal y axis
    let quarter_turn = Orientation::from_axis_angle(&Vector3::x(), std::f64::consts::FRAC_PI_2).unwrap();
    let layered =
        LayeredPolycrystal::new(0, vec![0.5], vec![Orientation::identity(), quarter_turn], None).unwrap();
    let grain_cells = partition(&[0, 1, 1], 2).unwrap();
    let centroids = [
        Point3::new(0.25, 0.5, 0.5),
        Point3::new(0.75, 0.25, 0.5),
        Point3::new(0.75, 0.75, 0.5),
    ];
    let deformation = SlipDeformationInput::uniform("uniaxial-z", &[0.0], &Matrix3::zeros(), &uniaxial_z(100.0), 0.5, 4)
        .unwrap();
    let states = integrate_cells(&layered, &[StressRate], &grain_cells, &centroids, &deformation).unwrap();
    assert_eq!(states.len(), 3);
    assert!((states[0][0] - 75.0).abs() < 1e-12);
    assert!(states[1][0].abs() < 1e-12);
    assert!(states[2][0].abs() < 1e-12);

    assert!(matches!(
        integrate_cells(&layered, &[StressRate], &grain_cells, &centroids[..2], &deformation),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn cells_follow_a_spatially_varying_stress() {
    let layered = LayeredPolycrystal::new(2, vec![0.5], vec![Orientation::identity(); 2], None).unwrap();
    let deformation = SlipDeformationInput::new(
        "ramp-z",
        FunctionInput::constant(&[0.0]),
        FunctionInput::constant_tensor(&Matrix3::zeros()),
        uniaxial_z_ramp(100.0),
        0.5,
        4,
    )
    .unwrap();

    let averages = run_threaded(2, |ctx| {
        let mesh = create_box_hex_mesh(&UNIT_CUBE, [1, 1, 4]).unwrap();
        let distribution = CellDistribution::from_context(&ctx, mesh.num_cells());
        let centroids = mesh.cell_centroids(distribution.owned_cells());
        let (quadratures, grain_cells) = box_grains::<Hex8Connectivity>(&ctx, &UNIT_CUBE, [1, 1, 4], &layered);
        let states = integrate_cells(&layered, &[StressRate], &grain_cells, &centroids, &deformation).unwrap();

        // Every cell sees the final stress 100 z at its centroid
        for (state, x) in states.values().iter().zip(&centroids) {
            assert!((state[0] - 75.0 * x.z).abs() < 1e-12);
        }
        let integrand = CellComponents {
            num_components: 1,
            field: &states,
        };
        let volumes = grain_volumes(&ctx, &quadratures, &grain_cells).unwrap();
        let integrals = grain_integrals_components(&ctx, &quadratures, &grain_cells, &integrand).unwrap();
        grain_averages_components(&integrals, &volumes)
    });
    for rank_averages in averages {
        assert!((rank_averages[0][0] - 18.75).abs() < 1e-12);
        assert!((rank_averages[1][0] - 56.25).abs() < 1e-12);
    }
}

#[test]
fn multiphase_microstructures_are_rejected() {
    assert!(check_supported(&SingleCrystal::new(Orientation::identity())).is_ok());

    let two_phases = LayeredPolycrystal::new(
        2,
        vec![0.5],
        vec![Orientation::identity(); 2],
        Some(vec![0, 1]),
    )
    .unwrap();
    assert!(matches!(check_supported(&two_phases), Err(Error::NotImplemented(_))));

    let deformation =
        SlipDeformationInput::uniform("s", &[1.0], &Matrix3::zeros(), &Matrix3::zeros(), 1.0, 1).unwrap();
    let grain_cells = partition(&[0, 1], 2).unwrap();
    let centroids = [Point3::new(0.5, 0.5, 0.25), Point3::new(0.5, 0.5, 0.75)];
    assert!(matches!(
        integrate_cells(&two_phases, &[StressRate, StressRate], &grain_cells, &centroids, &deformation),
        Err(Error::NotImplemented(_))
    ));
}
