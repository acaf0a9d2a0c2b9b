use nalgebra::{Matrix3, Point3, Vector3};
use polyxtal::field::{check_materials, orientation_field, stiffness_field};
use polyxtal::material::ElasticCrystal;
use polyxtal::microstructure::{LayeredPolycrystal, Microstructure, SingleCrystal, VoronoiPolycrystal};
use polyxtal::orientation::Orientation;
use polyxtal::partition::partition;
use polyxtal::Error;
use std::f64::consts::FRAC_PI_2;

#[test]
fn orientation_rejects_improper_rotations() {
    let reflection = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, -1.0));
    assert!(matches!(Orientation::try_from_matrix(reflection), Err(Error::InvalidOrientation)));
    assert!(matches!(
        Orientation::try_from_matrix(2.0 * Matrix3::identity()),
        Err(Error::InvalidOrientation)
    ));
    assert!(Orientation::from_axis_angle(&Vector3::zeros(), 1.0).is_err());
}

#[test]
fn orientation_from_axis_angle() {
    let r = Orientation::from_axis_angle(&Vector3::new(0.0, 0.0, 2.0), FRAC_PI_2).unwrap();
    let rotated = r.matrix() * Vector3::x();
    assert!((rotated - Vector3::y()).norm() < 1e-14);
    assert!(Orientation::try_from_matrix(*r.matrix()).is_ok());
}

#[test]
fn single_crystal_has_one_grain() {
    let crystal = SingleCrystal::new(Orientation::identity());
    assert_eq!(crystal.num_grains(), 1);
    assert_eq!(crystal.num_phases(), 1);
    assert_eq!(crystal.grain_of(&[Point3::origin(), Point3::new(5.0, 1.0, 2.0)]), vec![0, 0]);
}

#[test]
fn voronoi_nearest_seed_with_ties_to_lowest_id() {
    let seeds = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
    let voronoi = VoronoiPolycrystal::new(seeds, vec![Orientation::identity(); 2], Some(vec![0, 1])).unwrap();
    let points = [
        Point3::new(0.1, 0.3, 0.0),
        Point3::new(0.9, -0.2, 0.4),
        Point3::new(0.5, 0.0, 0.0),
    ];
    assert_eq!(voronoi.grain_of(&points), vec![0, 1, 0]);
    assert_eq!(voronoi.num_phases(), 2);
    assert_eq!(voronoi.phase_of(1), 1);
}

#[test]
fn layers_put_interface_points_above() {
    let layers = LayeredPolycrystal::new(1, vec![0.0, 1.0], vec![Orientation::identity(); 3], None).unwrap();
    let points = [
        Point3::new(0.0, -1.0, 0.0),
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(0.0, 0.5, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    ];
    assert_eq!(layers.grain_of(&points), vec![0, 1, 1, 2]);
}

#[test]
fn microstructures_validate_grain_tables() {
    let seeds = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
    assert!(matches!(
        VoronoiPolycrystal::new(seeds.clone(), vec![Orientation::identity()], None),
        Err(Error::OrientationCount { expected: 2, actual: 1 })
    ));
    assert!(matches!(
        VoronoiPolycrystal::new(seeds, vec![Orientation::identity(); 2], Some(vec![0])),
        Err(Error::InvalidInput(_))
    ));
    assert!(LayeredPolycrystal::new(2, vec![1.0, 0.5], vec![Orientation::identity(); 3], None).is_err());
    assert!(LayeredPolycrystal::new(3, vec![], vec![Orientation::identity()], None).is_err());
}

#[test]
fn cell_fields_need_one_grain_partition_per_microstructure_grain() {
    let layers = LayeredPolycrystal::new(2, vec![0.5], vec![Orientation::identity(); 2], None).unwrap();
    let one_grain = partition(&[0, 0], 1).unwrap();
    assert!(matches!(
        orientation_field(&one_grain, &layers),
        Err(Error::OrientationCount { expected: 2, actual: 1 })
    ));
    assert!(matches!(
        stiffness_field(&one_grain, &layers, &[ElasticCrystal::isotropic(1.0, 1.0)]),
        Err(Error::OrientationCount { expected: 2, actual: 1 })
    ));

    let two_grains = partition(&[0, 1], 2).unwrap();
    let orientations = orientation_field(&two_grains, &layers).unwrap();
    assert_eq!(orientations.len(), 2);
}

#[test]
fn materials_are_checked_for_grains_without_local_cells() {
    let phases = LayeredPolycrystal::new(2, vec![0.5], vec![Orientation::identity(); 2], Some(vec![0, 1])).unwrap();
    let material = ElasticCrystal::isotropic(1.0, 1.0);
    assert!(check_materials(&phases, &[material.clone(), material.clone()]).is_ok());
    assert!(matches!(
        check_materials(&phases, &[material.clone()]),
        Err(Error::UnknownMaterial { phase: 1 })
    ));
    // Grain 1 owns no local cells, but its phase still needs a material
    let grain_cells = partition(&[0, 0], 2).unwrap();
    assert!(matches!(
        stiffness_field(&grain_cells, &phases, &[material]),
        Err(Error::UnknownMaterial { phase: 1 })
    ));
}
