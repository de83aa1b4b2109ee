use {
    super::*,
    crate::{constants::EARTH_RADIUS, utils::assert_approx_eq_slice},
    approx::assert_abs_diff_eq,
    insta::assert_snapshot,
};

fn box_config(nx: usize, ny: usize, nz: usize) -> GridConfig {
    GridConfig {
        geometry: Geometry::Rectilinear,
        size: (nx, ny, nz),
        topology: (Topology::Periodic, Topology::Bounded, Topology::Bounded),
        x: (0.0, 4.0),
        y: (-1.0, 1.0),
        z: VerticalCoordinate::Uniform {
            extent: (-10.0, 0.0),
        },
    }
}

#[test]
fn cell_count_matches_resolution() {
    for &(nx, ny, nz) in &[(1, 1, 1), (4, 3, 2), (7, 5, 11)] {
        let grid = Grid::new(&box_config(nx, ny, nz)).unwrap();

        assert_eq!(grid.cell_count(), nx * ny * nz);
        assert_eq!(grid.volumes().len(), nx * ny * nz);
        assert_eq!(grid.x().centers().len(), nx);
        assert_eq!(grid.y().centers().len(), ny);
        assert_eq!(grid.z().centers().len(), nz);
    }
}

#[test]
fn face_counts_follow_topology() {
    let grid = Grid::new(&box_config(4, 3, 2)).unwrap();

    // periodic x drops the duplicated last face
    assert_eq!(grid.x().faces().len(), 4);
    assert_eq!(grid.y().faces().len(), 4);
    assert_eq!(grid.z().faces().len(), 3);
}

#[test]
fn uniform_coordinates() {
    let grid = Grid::new(&box_config(4, 2, 5)).unwrap();

    assert_approx_eq_slice(
        grid.x().centers().as_slice().unwrap(),
        &[0.5, 1.5, 2.5, 3.5],
    );
    assert_approx_eq_slice(grid.y().faces().as_slice().unwrap(), &[-1.0, 0.0, 1.0]);
    assert_approx_eq_slice(
        grid.z().faces().as_slice().unwrap(),
        &[-10.0, -8.0, -6.0, -4.0, -2.0, 0.0],
    );
    assert_abs_diff_eq!(grid.volumes().sum(), 4.0 * 2.0 * 10.0, epsilon = 1.0E-12);
}

#[test]
fn stretched_vertical_faces() {
    let mut config = box_config(2, 2, 3);
    config.z = VerticalCoordinate::Faces(vec![-100.0, -30.0, -10.0, 0.0]);
    let grid = Grid::new(&config).unwrap();

    assert_approx_eq_slice(
        grid.z().spacings().as_slice().unwrap(),
        &[70.0, 20.0, 10.0],
    );
    assert_approx_eq_slice(grid.z().centers().as_slice().unwrap(), &[-65.0, -20.0, -5.0]);
}

#[test]
fn identical_inputs_give_identical_grids() {
    let config = box_config(6, 5, 4);

    assert_eq!(Grid::new(&config).unwrap(), Grid::new(&config).unwrap());
}

#[test]
fn flat_axis_collapses() {
    let mut config = box_config(8, 0, 4);
    config.topology.1 = Topology::Flat;
    let grid = Grid::new(&config).unwrap();

    assert_eq!(grid.size(), (8, 1, 4));
    assert!(grid.has_horizontal_extent());
}

#[test]
fn rejects_zero_resolution() {
    assert_eq!(
        Grid::new(&box_config(0, 2, 2)),
        Err(ConfigError::NonPositiveResolution { axis: 'x', size: 0 })
    );
}

#[test]
fn rejects_degenerate_extent() {
    let mut config = box_config(2, 2, 2);
    config.x = (1.0, 1.0);
    assert!(matches!(
        Grid::new(&config),
        Err(ConfigError::DegenerateExtent { axis: 'x', .. })
    ));

    config.x = (0.0, 1.0);
    config.z = VerticalCoordinate::Uniform {
        extent: (0.0, -10.0),
    };
    assert!(matches!(
        Grid::new(&config),
        Err(ConfigError::DegenerateExtent { axis: 'z', .. })
    ));
}

#[test]
fn rejects_bad_vertical_faces() {
    let mut config = box_config(2, 2, 3);
    config.z = VerticalCoordinate::Faces(vec![-10.0, -5.0, 0.0]);
    assert_eq!(
        Grid::new(&config),
        Err(ConfigError::InvalidVerticalFaces {
            expected: 4,
            found: 3
        })
    );

    config.z = VerticalCoordinate::Faces(vec![-10.0, -5.0, -5.0, 0.0]);
    assert!(Grid::new(&config).is_err());
}

fn sphere_config() -> GridConfig {
    GridConfig {
        geometry: Geometry::LatitudeLongitude {
            radius: EARTH_RADIUS,
        },
        size: (36, 18, 1),
        topology: (Topology::Periodic, Topology::Bounded, Topology::Bounded),
        x: (0.0, 360.0),
        y: (-90.0, 90.0),
        z: VerticalCoordinate::Uniform {
            extent: (-1.0, 0.0),
        },
    }
}

#[test]
fn spherical_volume_is_shell_volume() {
    let grid = Grid::new(&sphere_config()).unwrap();
    let shell = 4.0 * core::f64::consts::PI * EARTH_RADIUS * EARTH_RADIUS;

    assert_abs_diff_eq!(grid.volumes().sum() / shell, 1.0, epsilon = 1.0E-12);
}

#[test]
fn spherical_spacing_shrinks_poleward() {
    let grid = Grid::new(&sphere_config()).unwrap();

    assert!(grid.spacing_x(0, 0) < grid.spacing_x(0, 9));
    assert_abs_diff_eq!(
        grid.spacing_y(3),
        EARTH_RADIUS * 10.0 * crate::constants::DEG_TO_RAD,
        epsilon = 1.0E-6
    );
}

#[test]
fn spherical_rejects_bad_latitude() {
    let mut config = sphere_config();
    config.y = (-95.0, 90.0);
    assert_eq!(
        Grid::new(&config),
        Err(ConfigError::LatitudeOutOfRange(-95.0))
    );

    let mut config = sphere_config();
    config.topology.1 = Topology::Periodic;
    assert!(matches!(
        Grid::new(&config),
        Err(ConfigError::Incompatible(_))
    ));

    let mut config = sphere_config();
    config.geometry = Geometry::LatitudeLongitude { radius: 0.0 };
    assert_eq!(Grid::new(&config), Err(ConfigError::NonPositiveRadius(0.0)));
}

#[test]
fn bottom_marks_solid_cells() {
    let grid = Grid::new(&box_config(4, 2, 5))
        .unwrap()
        .with_bottom_fn(|x, _| if x < 2.0 { -6.0 } else { -10.0 })
        .unwrap();

    // centres at -9, -7, -5, -3, -1; -9 and -7 lie below -6
    let ib = grid.immersed_boundary().unwrap();
    assert_eq!(ib.solid_count(), 2 * 2 * 2);
    assert!(grid.is_immersed(0, 0, 0));
    assert!(grid.is_immersed(1, 1, 1));
    assert!(!grid.is_immersed(1, 1, 2));
    assert!(!grid.is_immersed(3, 0, 0));
    assert_eq!(ib.fluid_depth_cells()[[0, 0]], 3);
    assert_eq!(ib.fluid_depth_cells()[[3, 1]], 5);
}

#[test]
fn bottom_shape_mismatch() {
    let grid = Grid::new(&box_config(4, 2, 5)).unwrap();

    assert!(matches!(
        grid.with_bottom(Array2::zeros((2, 4))),
        Err(ConfigError::ShapeMismatch { .. })
    ));
}

#[test]
fn summaries() {
    let grid = Grid::new(&box_config(4, 3, 2)).unwrap();
    assert_snapshot!(grid.summary(), @"RectilinearGrid 4×3×2 (Periodic, Bounded, Bounded)");

    let grid = Grid::new(&sphere_config()).unwrap();
    assert_snapshot!(grid.summary(), @"LatitudeLongitudeGrid 36×18×1 (Periodic, Bounded, Bounded)");

    let grid = Grid::new(&box_config(4, 2, 5))
        .unwrap()
        .with_bottom(Array2::from_elem((4, 2), -8.0))
        .unwrap();
    assert_snapshot!(grid.summary(), @"RectilinearGrid 4×2×5 (Periodic, Bounded, Bounded) with 8 immersed cells");
}
