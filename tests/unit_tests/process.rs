use crate::scratch_dir;
use matrixcompare::assert_matrix_eq;
use nalgebra::{Matrix3, Point3, Vector3};
use polyxtal::boundary::BoundaryCondition;
use polyxtal::comm::{run_threaded, ExecutionContext};
use polyxtal::function::{FunctionInput, Interpolant};
use polyxtal::input::{
    CellType, ElasticDeformationInput, HeatDeformationInput, Job, MaterialInput, MeshInput, MeshSource, Options,
    PolycrystalInput, ProcessInput, SlipDeformationInput,
};
use polyxtal::material::{ElasticCrystal, SlipCrystal, ThermalCrystal};
use polyxtal::microstructure::{LayeredPolycrystal, Microstructure, SingleCrystal};
use polyxtal::orientation::Orientation;
use polyxtal::process::{run_job, JobReport, ProcessKind};
use polyxtal::suite::{applied_gradient, identity_iso, jobs, run_suite, HEAT_POLYCRYSTAL, SLIP_POLYCRYSTAL};
use polyxtal::Error;

const UNIT_CUBE: [[f64; 2]; 3] = [[0.0, 1.0], [0.0, 1.0], [0.0, 1.0]];

fn cube_mesh(cell_type: CellType) -> MeshInput {
    MeshInput::builder("cube", MeshSource::Box)
        .with_extents(UNIT_CUBE)
        .with_divisions(2)
        .with_cell_type(cell_type)
        .build()
        .unwrap()
}

fn rotated() -> Orientation {
    Orientation::from_axis_angle(&Vector3::new(1.0, 1.0, 1.0), 0.4).unwrap()
}

fn grain_tensor(report: &JobReport, quantity: &str, grain: usize) -> Matrix3<f64> {
    let values = &report.grain_averages.quantity(quantity).unwrap()[grain];
    Matrix3::from_row_slice(values)
}

fn elasticity_job(name: &str, cell_type: CellType, deformation: ElasticDeformationInput) -> Job {
    Job::new(
        name,
        cube_mesh(cell_type),
        PolycrystalInput::new("rotated", SingleCrystal::new(rotated())),
        ProcessInput::LinearElasticity {
            material: MaterialInput::single("identity-iso", identity_iso()),
            deformation,
        },
    )
}

#[test]
fn uniform_gradients_are_reproduced_in_grain_averages() {
    let root = scratch_dir("uniform_gradients_are_reproduced_in_grain_averages");
    let ctx = ExecutionContext::serial();
    let a = applied_gradient();
    let sym_a = 0.5 * (a + a.transpose());
    let reports = run_suite(&ctx, polyxtal::suite::LINEAR_SINGLE_CRYSTAL, &root, None).unwrap();
    let jobs = jobs(polyxtal::suite::LINEAR_SINGLE_CRYSTAL).unwrap();
    assert_eq!(reports.len(), jobs.len());

    for (job, report) in jobs.iter().zip(&reports) {
        assert_eq!(report.process, ProcessKind::LinearElasticity);
        assert!(report.solver.unwrap().converged);
        assert_eq!(report.output_directory, job.output_directory(&root));
        assert!((report.grain_averages.volume[0] - 6.0).abs() < 1e-12);

        // Partial tractions do not reproduce the applied gradient
        if !["full", "zmax-traction"].contains(&job.process.deformation_name()) {
            continue;
        }
        let strain = grain_tensor(report, "strain", 0);
        assert_matrix_eq!(strain, sym_a, comp = abs, tol = 1e-9);
        if job.process.material_name() == "identity-iso" {
            let stress = grain_tensor(report, "stress", 0);
            assert_matrix_eq!(stress, sym_a, comp = abs, tol = 1e-9);
        }
    }
}

#[test]
fn eigenstrains_compatible_with_the_displacement_are_stress_free() {
    let root = scratch_dir("eigenstrains_compatible_with_the_displacement_are_stress_free");
    let ctx = ExecutionContext::serial();
    let expansion = 1e-3;
    let b = Matrix3::new(0.0, 2e-3, 0.0, 2e-3, 0.0, 0.0, 0.0, 0.0, -1e-3);
    let displacement = Interpolant::linear(expansion * Matrix3::identity() + b, None);
    let deformation = ElasticDeformationInput::new("eigenstrain")
        .with_thermal_expansion(FunctionInput::constant_tensor(&(expansion * Matrix3::identity())))
        .with_plastic_distortion(FunctionInput::constant_tensor(&b))
        .with_displacement_bc(BoundaryCondition::new("boundary", FunctionInput::Interpolation(displacement)));

    for cell_type in [CellType::Tetrahedron, CellType::Hexahedron] {
        let job = elasticity_job("eigenstrain", cell_type, deformation.clone());
        let report = run_job(&ctx, &job, &root).unwrap();
        let strain = grain_tensor(&report, "strain", 0);
        assert_matrix_eq!(strain, expansion * Matrix3::identity() + b, comp = abs, tol = 1e-9);
        let stress = grain_tensor(&report, "stress", 0);
        assert_matrix_eq!(stress, Matrix3::zeros(), comp = abs, tol = 1e-9);
    }
}

#[test]
fn body_force_must_be_a_vector() {
    let root = scratch_dir("body_force_must_be_a_vector");
    let deformation = ElasticDeformationInput::new("gravity")
        .with_force_density(FunctionInput::constant(&[0.0, -9.81]))
        .with_displacement_bc(BoundaryCondition::new("zmin", FunctionInput::constant(&[0.0, 0.0, 0.0])));
    let job = elasticity_job("gravity", CellType::Hexahedron, deformation);
    let err = run_job(&ExecutionContext::serial(), &job, &root).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::InvalidInput(_))));
}

#[test]
fn linear_temperature_in_a_single_crystal() {
    let root = scratch_dir("linear_temperature_in_a_single_crystal");
    let deformation = HeatDeformationInput::new("gradient-x")
        .with_temperature_bc(BoundaryCondition::new("xmin", FunctionInput::constant(&[0.0])))
        .with_temperature_bc(BoundaryCondition::new("xmax", FunctionInput::constant(&[1.0])));
    let job = Job::new(
        "heat",
        cube_mesh(CellType::Hexahedron),
        PolycrystalInput::new("identity", SingleCrystal::new(Orientation::identity())),
        ProcessInput::HeatTransfer {
            material: MaterialInput::single("ortho-123", ThermalCrystal::orthotropic([1.0, 2.0, 3.0]).unwrap()),
            deformation,
        },
    );
    let report = run_job(&ExecutionContext::serial(), &job, &root).unwrap();
    assert_eq!(report.process, ProcessKind::HeatTransfer);

    let temperature = &report.grain_averages.quantity("temperature").unwrap()[0];
    assert!((temperature[0] - 0.5).abs() < 1e-9);
    let flux = &report.grain_averages.quantity("flux").unwrap()[0];
    assert!((Vector3::from_column_slice(flux) - Vector3::new(-1.0, 0.0, 0.0)).norm() < 1e-8);
}

#[test]
fn heat_suite_respects_the_maximum_principle() {
    let root = scratch_dir("heat_suite_respects_the_maximum_principle");
    let reports = run_suite(&ExecutionContext::serial(), HEAT_POLYCRYSTAL, &root, None).unwrap();
    assert_eq!(reports.len(), 2);
    for report in &reports {
        assert!(report.solver.unwrap().converged);
        let total: f64 = report.grain_averages.volume.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    let gradient = &reports[0];
    for temperature in gradient.grain_averages.quantity("temperature").unwrap() {
        assert!(temperature[0] > 0.0 && temperature[0] < 1.0);
    }

    // A heat source with a cold bottom heats up the domain
    let source = &reports[1];
    for temperature in source.grain_averages.quantity("temperature").unwrap() {
        assert!(temperature[0] > 0.0);
    }
}

fn assert_reports_close(a: &JobReport, b: &JobReport) {
    assert_eq!(a.output_directory, b.output_directory);
    assert_eq!(a.grain_averages.quantities.len(), b.grain_averages.quantities.len());
    for (x, y) in a.grain_averages.volume.iter().zip(&b.grain_averages.volume) {
        assert!((x - y).abs() < 1e-12);
    }
    for (name, values) in &a.grain_averages.quantities {
        let other = b.grain_averages.quantity(name).unwrap();
        for (x, y) in values.iter().flatten().zip(other.iter().flatten()) {
            assert!((x - y).abs() < 1e-9, "{name}: {x} != {y}");
        }
    }
}

#[test]
fn threaded_runs_match_serial_runs() {
    let root = scratch_dir("threaded_runs_match_serial_runs");
    let ctx = ExecutionContext::serial();
    for suite in [HEAT_POLYCRYSTAL, SLIP_POLYCRYSTAL] {
        let serial = run_suite(&ctx, suite, &root, None).unwrap();
        let threaded = run_threaded(3, |ctx| run_suite(&ctx, suite, &root, None).unwrap());
        for reports in &threaded {
            assert_eq!(reports.len(), serial.len());
            for (a, b) in serial.iter().zip(reports) {
                assert_reports_close(a, b);
            }
        }
    }
}

#[test]
fn slip_suite_hardens_every_grain() {
    let root = scratch_dir("slip_suite_hardens_every_grain");
    let reports = run_suite(&ExecutionContext::serial(), SLIP_POLYCRYSTAL, &root, None).unwrap();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.process, ProcessKind::Slip);
    assert!(report.solver.is_none());
    assert_eq!(report.grain_averages.volume.len(), 2);
    let states = report.grain_averages.quantity("state").unwrap();
    assert_eq!(states.len(), 2);
    for state in states {
        assert_eq!(state.len(), 1);
        assert!(state[0] > 50.0 && state[0] < 200.0);
    }
}

#[test]
fn jobs_write_fields_and_archives() {
    let root = scratch_dir("jobs_write_fields_and_archives");
    let reports = run_suite(&ExecutionContext::serial(), HEAT_POLYCRYSTAL, &root, None).unwrap();
    for report in &reports {
        let fields_file = report.fields_file.as_ref().unwrap();
        assert!(fields_file.starts_with(&report.output_directory));
        assert!(fields_file.is_file());

        let archive = std::fs::read_to_string(&report.archive_file).unwrap();
        let archive: serde_json::Value = serde_json::from_str(&archive).unwrap();
        for key in ["volume", "temperature", "flux"] {
            assert!(archive.get(key).is_some(), "archive misses {key}");
        }
        assert_eq!(archive["volume"].as_array().unwrap().len(), 2);
    }
}

#[test]
fn field_output_can_be_disabled() {
    let root = scratch_dir("field_output_can_be_disabled");
    let options = Options {
        name: "no-fields".to_string(),
        write_fields: false,
        ..Options::default()
    };
    let job = jobs(SLIP_POLYCRYSTAL).unwrap().remove(0).with_options(options);
    let report = run_job(&ExecutionContext::serial(), &job, &root).unwrap();
    assert!(report.fields_file.is_none());
    assert!(report.output_directory.ends_with("fcc-cube-hex-voronoi-2-uniaxial-z-no-fields"));
    assert!(!report.output_directory.join("fields.vtk").exists());
    assert!(report.archive_file.is_file());
}

#[test]
fn process_filter_selects_jobs() {
    let root = scratch_dir("process_filter_selects_jobs");
    let reports = run_suite(&ExecutionContext::serial(), HEAT_POLYCRYSTAL, &root, Some(ProcessKind::Slip)).unwrap();
    assert!(reports.is_empty());
}

#[test]
fn multiphase_slip_fails_before_creating_outputs() {
    let root = scratch_dir("multiphase_slip_fails_before_creating_outputs");
    let two_phases = LayeredPolycrystal::new(2, vec![0.5], vec![Orientation::identity(); 2], Some(vec![0, 1])).unwrap();
    let material = SlipCrystal::fcc(1e-3, 10.0, 100.0, 200.0).unwrap();
    let deformation = SlipDeformationInput::uniform("ramp", &[50.0], &Matrix3::zeros(), &Matrix3::identity(), 1.0, 2).unwrap();
    let job = Job::new(
        "multiphase",
        cube_mesh(CellType::Hexahedron),
        PolycrystalInput::new("two-phases", two_phases),
        ProcessInput::Slip {
            material: MaterialInput::new("fcc", vec![material.clone(), material]).unwrap(),
            deformation,
        },
    );
    let err = run_job(&ExecutionContext::serial(), &job, &root).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotImplemented(_))));
    assert!(!root.join("Outputs").exists());
}

#[test]
fn elasticity_needs_a_material_for_every_phase() {
    let root = scratch_dir("elasticity_needs_a_material_for_every_phase");
    let two_phases = LayeredPolycrystal::new(2, vec![0.5], vec![Orientation::identity(); 2], Some(vec![0, 1])).unwrap();
    let job = Job::new(
        "phases",
        cube_mesh(CellType::Hexahedron),
        PolycrystalInput::new("two-phases", two_phases),
        ProcessInput::LinearElasticity {
            material: MaterialInput::single("one", ElasticCrystal::isotropic(1.0, 1.0)),
            deformation: ElasticDeformationInput::new("free"),
        },
    );
    let err = run_job(&ExecutionContext::serial(), &job, &root).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::UnknownMaterial { phase: 1 })));
}

/// A single crystal that reports an unknown grain for points in the upper corner octant.
#[derive(Debug)]
struct UnknownCorner(Orientation);

impl Microstructure for UnknownCorner {
    fn num_grains(&self) -> usize {
        1
    }

    fn num_phases(&self) -> usize {
        1
    }

    fn phase_of(&self, _grain: usize) -> usize {
        0
    }

    fn orientation_of(&self, _grain: usize) -> &Orientation {
        &self.0
    }

    fn grain_of(&self, points: &[Point3<f64>]) -> Vec<usize> {
        points
            .iter()
            .map(|x| usize::from(x.x > 0.5 && x.y > 0.5 && x.z > 0.5))
            .collect()
    }
}

#[test]
fn missing_phase_material_fails_on_every_rank() {
    let root = scratch_dir("missing_phase_material_fails_on_every_rank");
    let two_phases = LayeredPolycrystal::new(2, vec![0.5], vec![Orientation::identity(); 2], Some(vec![0, 1])).unwrap();
    let polycrystal = PolycrystalInput::new("two-phases", two_phases);
    let elasticity = Job::new(
        "elasticity",
        cube_mesh(CellType::Hexahedron),
        polycrystal.clone(),
        ProcessInput::LinearElasticity {
            material: MaterialInput::single("one", ElasticCrystal::isotropic(1.0, 1.0)),
            deformation: ElasticDeformationInput::new("free"),
        },
    );
    let heat = Job::new(
        "heat",
        cube_mesh(CellType::Hexahedron),
        polycrystal,
        ProcessInput::HeatTransfer {
            material: MaterialInput::single("one", ThermalCrystal::isotropic(1.0).unwrap()),
            deformation: HeatDeformationInput::new("insulated"),
        },
    );

    for job in [&elasticity, &heat] {
        let results = run_threaded(2, |ctx| {
            run_job(&ctx, job, &root)
                .err()
                .and_then(|err| err.downcast::<Error>().ok())
        });
        for result in results {
            assert!(matches!(result, Some(Error::UnknownMaterial { phase: 1 })), "{result:?}");
        }
    }
}

#[test]
fn grain_assignment_failure_on_one_rank_stops_all_ranks() {
    let root = scratch_dir("grain_assignment_failure_on_one_rank_stops_all_ranks");
    let job = Job::new(
        "corner",
        cube_mesh(CellType::Hexahedron),
        PolycrystalInput::new("unknown-corner", UnknownCorner(Orientation::identity())),
        ProcessInput::LinearElasticity {
            material: MaterialInput::single("identity-iso", identity_iso()),
            deformation: ElasticDeformationInput::new("free"),
        },
    );
    // Only the rank owning the corner cell sees the bad grain ID
    let results = run_threaded(2, |ctx| {
        run_job(&ctx, &job, &root)
            .err()
            .and_then(|err| err.downcast::<Error>().ok())
    });
    let out_of_range = results
        .iter()
        .filter(|result| matches!(result, Some(Error::GrainIdOutOfRange { grain: 1, num_grains: 1 })))
        .count();
    let peer_failed = results
        .iter()
        .filter(|result| matches!(result, Some(Error::PeerFailed(_))))
        .count();
    assert_eq!((out_of_range, peer_failed), (1, 1), "{results:?}");
}
