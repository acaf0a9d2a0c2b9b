use polyxtal::connectivity::Hex8Connectivity;
use polyxtal::mesh::procedural::create_box_hex_mesh;
use polyxtal::microstructure::{LayeredPolycrystal, SingleCrystal};
use polyxtal::orientation::Orientation;
use polyxtal::partition::{assign_grains, partition, CellDistribution};
use polyxtal::Error;
use proptest::collection::vec;
use proptest::prelude::*;

#[test]
fn cell_distribution_gives_extra_cells_to_first_ranks() {
    let owned: Vec<_> = (0..3)
        .map(|rank| CellDistribution::new(10, rank, 3).owned_cells())
        .collect();
    assert_eq!(owned, vec![0..4, 4..7, 7..10]);

    let distribution = CellDistribution::new(10, 1, 3);
    assert_eq!(distribution.num_owned_cells(), 3);
    assert_eq!(distribution.global_cell(0), 4);
    assert_eq!(distribution.local_cell(6), Some(2));
    assert_eq!(distribution.local_cell(7), None);
    assert_eq!(distribution.owner_of(3), 0);
    assert_eq!(distribution.owner_of(9), 2);
}

#[test]
fn cell_distribution_with_more_ranks_than_cells() {
    let distribution = CellDistribution::new(2, 3, 4);
    assert_eq!(distribution.num_owned_cells(), 0);
    assert!(distribution.owned_cells().is_empty());
}

#[test]
fn partition_keeps_empty_grains() {
    let grain_cells = partition(&[2, 0, 2, 2], 4).unwrap();
    assert_eq!(grain_cells.num_grains(), 4);
    assert_eq!(grain_cells.cells(0), &[1]);
    assert!(grain_cells.cells(1).is_empty());
    assert_eq!(grain_cells.cells(2), &[0, 2, 3]);
    assert!(grain_cells.cells(3).is_empty());
    assert_eq!(grain_cells.cell_tags(), vec![2, 0, 2, 2]);
}

#[test]
fn partition_rejects_out_of_range_grain() {
    let result = partition(&[0, 3], 2);
    assert!(matches!(result, Err(Error::GrainIdOutOfRange { grain: 3, num_grains: 2 })));
}

#[test]
fn assign_grains_evaluates_microstructure_at_centroids() {
    let mesh = create_box_hex_mesh(&[[0.0, 1.0], [0.0, 1.0], [0.0, 1.0]], [1, 1, 4]).unwrap();
    let layers = LayeredPolycrystal::new(2, vec![0.5], vec![Orientation::identity(); 2], None).unwrap();

    let distribution = CellDistribution::new(mesh.num_cells(), 0, 1);
    let tags = assign_grains(&mesh, &distribution, &layers, false, None).unwrap();
    assert_eq!(tags, vec![0, 0, 1, 1]);

    // The second of two ranks only sees its own cells
    let distribution = CellDistribution::new(mesh.num_cells(), 1, 2);
    let tags = assign_grains(&mesh, &distribution, &layers, false, None).unwrap();
    assert_eq!(tags, vec![1, 1]);
}

#[test]
fn assign_grains_from_mesh_tags() {
    let mesh = create_box_hex_mesh(&[[0.0, 1.0], [0.0, 1.0], [0.0, 1.0]], [2, 1, 1]).unwrap();
    let layers = LayeredPolycrystal::new(0, vec![0.5], vec![Orientation::identity(); 2], None).unwrap();
    let distribution = CellDistribution::new(mesh.num_cells(), 0, 1);

    let tags = assign_grains(&mesh, &distribution, &layers, true, Some(&[1, 0][..])).unwrap();
    assert_eq!(tags, vec![1, 0]);

    assert!(matches!(
        assign_grains::<Hex8Connectivity>(&mesh, &distribution, &layers, true, None),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        assign_grains(&mesh, &distribution, &layers, true, Some(&[0, 2][..])),
        Err(Error::GrainIdOutOfRange { grain: 2, num_grains: 2 })
    ));

    let single = SingleCrystal::new(Orientation::identity());
    assert!(matches!(
        assign_grains(&mesh, &distribution, &single, true, Some(&[0, 1][..])),
        Err(Error::GrainIdOutOfRange { grain: 1, num_grains: 1 })
    ));
}

proptest! {
    #[test]
    fn partition_covers_every_cell_exactly_once(tags in vec(0..5usize, 0..50)) {
        let grain_cells = partition(&tags, 5).unwrap();
        prop_assert_eq!(grain_cells.num_cells(), tags.len());
        let mut seen = vec![0; tags.len()];
        for (grain, cells) in grain_cells.iter() {
            prop_assert!(cells.windows(2).all(|w| w[0] < w[1]));
            for &cell in cells {
                prop_assert_eq!(tags[cell], grain);
                seen[cell] += 1;
            }
        }
        prop_assert!(seen.iter().all(|&count| count == 1));
    }

    #[test]
    fn cell_distribution_covers_all_cells(num_cells in 0..100usize, size in 1..8usize) {
        let mut next = 0;
        for rank in 0..size {
            let owned = CellDistribution::new(num_cells, rank, size).owned_cells();
            prop_assert_eq!(owned.start, next);
            next = owned.end;
        }
        prop_assert_eq!(next, num_cells);
    }
}
