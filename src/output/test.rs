use {
    super::*,
    crate::{
        grid::{Grid, GridConfig, Topology, VerticalCoordinate},
        model::{Equations, FreeSurface, ModelConfig},
        utils::ramp3d,
    },
    approx::assert_abs_diff_eq,
    insta::assert_snapshot,
    tempdir::TempDir,
};

fn model() -> Model {
    let grid = Grid::new(&GridConfig {
        size: (4, 3, 2),
        x: (0.0, 4.0),
        y: (0.0, 3.0),
        z: VerticalCoordinate::Uniform {
            extent: (-2.0, 0.0),
        },
        ..GridConfig::default()
    })
    .unwrap();
    let mut model = Model::new(grid, ModelConfig::default()).unwrap();
    model.set_array("b", ramp3d(4, 3, 2)).unwrap();
    model
}

fn clock(iteration: u64, time: f64) -> Clock {
    Clock {
        iteration,
        time,
        last_dt: 0.0,
    }
}

fn writer(path: &Path, fields: &[&str], config: OutputConfig) -> OutputWriter {
    OutputWriter::new(
        path,
        fields.iter().map(|&f| f.to_owned()).collect(),
        Schedule::IterationInterval(1),
        config,
    )
}

#[test]
fn readback_is_exact() {
    let td = TempDir::new("output").unwrap();
    let path = td.path().join("snapshots.bin");
    let mut model = model();

    let mut w = writer(&path, &["b", "u"], OutputConfig::default());
    w.validate(&model).unwrap();
    w.write(&model, &clock(0, 0.0)).unwrap();

    model.set("u", |x, y, z| x.sin() * y.exp() + z / 3.0).unwrap();
    w.write(&model, &clock(7, 0.1 + 0.2)).unwrap();
    assert_eq!(w.records_written(), 2);

    let reader = SnapshotReader::open(&path).unwrap();
    assert_eq!(reader.fields(), &["b".to_owned(), "u".to_owned()]);
    assert_eq!(reader.header().grid_size, (4, 3, 2));
    assert_eq!(reader.iterations(), vec![0, 7]);
    assert_eq!(reader.times(), vec![0.0, 0.1 + 0.2]);

    assert_eq!(reader.read_field("b", 0).unwrap(), ramp3d(4, 3, 2));
    assert_eq!(reader.read_field("u", 0).unwrap(), Array3::<f64>::zeros((4, 3, 2)));
    assert_eq!(&reader.read_field("u", 1).unwrap(), model.field("u").unwrap());
}

#[test]
fn derived_quantities() {
    let td = TempDir::new("output").unwrap();
    let path = td.path().join("energy.bin");
    let mut model = model();
    model.set("u", |_, _, _| 1.0).unwrap();
    model.set("v", |_, _, _| 2.0).unwrap();
    model.set("w", |_, _, _| -2.0).unwrap();

    let mut w = writer(&path, &[SPEED, KINETIC_ENERGY], OutputConfig::default());
    w.validate(&model).unwrap();
    w.write(&model, &clock(0, 0.0)).unwrap();

    let reader = SnapshotReader::open(&path).unwrap();
    for &s in reader.read_field(SPEED, 0).unwrap().iter() {
        assert_abs_diff_eq!(s, 3.0);
    }
    for &e in reader.read_field(KINETIC_ENERGY, 0).unwrap().iter() {
        assert_abs_diff_eq!(e, 4.5);
    }
}

#[test]
fn replace_truncates_existing_file() {
    let td = TempDir::new("output").unwrap();
    let path = td.path().join("snapshots.bin");
    let model = model();

    let mut first = writer(&path, &["b"], OutputConfig::default());
    first.write(&model, &clock(0, 0.0)).unwrap();
    first.write(&model, &clock(1, 1.0)).unwrap();

    let mut second = writer(&path, &["b"], OutputConfig::default());
    second.write(&model, &clock(5, 5.0)).unwrap();

    assert_eq!(SnapshotReader::open(&path).unwrap().iterations(), vec![5]);
}

#[test]
fn append_keeps_existing_records() {
    let td = TempDir::new("output").unwrap();
    let path = td.path().join("snapshots.bin");
    let model = model();
    let append = OutputConfig {
        overwrite_existing: false,
        ..OutputConfig::default()
    };

    let mut first = writer(&path, &["b"], append);
    first.write(&model, &clock(0, 0.0)).unwrap();
    first.write(&model, &clock(1, 1.0)).unwrap();
    drop(first);

    let mut second = writer(&path, &["b"], append);
    second.write(&model, &clock(2, 2.0)).unwrap();

    let reader = SnapshotReader::open(&path).unwrap();
    assert_eq!(reader.times(), vec![0.0, 1.0, 2.0]);
    assert_eq!(reader.read_field("b", 2).unwrap(), ramp3d(4, 3, 2));

    // appending different fields is refused
    let mut mismatched = writer(&path, &["u"], append);
    assert!(matches!(
        mismatched.write(&model, &clock(3, 3.0)),
        Err(Error::InvalidSnapshot { .. })
    ));
}

#[test]
fn append_to_missing_file_creates_it() {
    let td = TempDir::new("output").unwrap();
    let path = td.path().join("nested").join("snapshots.bin");
    let model = model();

    let mut w = writer(
        &path,
        &["b"],
        OutputConfig {
            overwrite_existing: false,
            ..OutputConfig::default()
        },
    );
    w.write(&model, &clock(0, 0.0)).unwrap();

    assert_eq!(SnapshotReader::open(&path).unwrap().len(), 1);
}

#[test]
fn index_slices() {
    let td = TempDir::new("output").unwrap();
    let path = td.path().join("slice.bin");
    let model = model();

    let mut w = writer(
        &path,
        &["b"],
        OutputConfig {
            indices: Some(Indices {
                x: Some((1, 3)),
                y: None,
                z: Some((1, 2)),
            }),
            ..OutputConfig::default()
        },
    );
    w.validate(&model).unwrap();
    w.write(&model, &clock(0, 0.0)).unwrap();

    let b = SnapshotReader::open(&path).unwrap().read_field("b", 0).unwrap();
    assert_eq!(b.dim(), (2, 3, 1));
    assert_eq!(b, ramp3d(4, 3, 2).slice(s![1..3, .., 1..2]));
}

#[test]
fn surface_field_ignores_vertical_slice() {
    let td = TempDir::new("output").unwrap();
    let path = td.path().join("eta.bin");

    let grid = Grid::new(&GridConfig {
        size: (4, 3, 2),
        topology: (Topology::Periodic, Topology::Bounded, Topology::Bounded),
        ..GridConfig::default()
    })
    .unwrap();
    let mut model = Model::new(
        grid,
        ModelConfig {
            equations: Equations::HydrostaticFreeSurface,
            free_surface: Some(FreeSurface::default()),
            ..ModelConfig::default()
        },
    )
    .unwrap();
    model.set("eta", |x, _, _| x).unwrap();

    let mut w = writer(
        &path,
        &["eta", "b"],
        OutputConfig {
            indices: Some(Indices {
                z: Some((1, 2)),
                ..Indices::default()
            }),
            ..OutputConfig::default()
        },
    );
    w.validate(&model).unwrap();
    w.write(&model, &clock(0, 0.0)).unwrap();

    let reader = SnapshotReader::open(&path).unwrap();
    assert_eq!(reader.read_field("eta", 0).unwrap().dim(), (4, 3, 1));
    assert_eq!(&reader.read_field("eta", 0).unwrap(), model.field("eta").unwrap());
    assert_eq!(reader.read_field("b", 0).unwrap().dim(), (4, 3, 1));
}

#[test]
fn invalid_selections() {
    let model = model();
    let path = Path::new("unused.bin");

    assert_eq!(
        writer(path, &["b", "q"], OutputConfig::default()).validate(&model),
        Err(ConfigError::UnknownField("q".to_owned()))
    );
    assert_eq!(
        writer(path, &["b", "b"], OutputConfig::default()).validate(&model),
        Err(ConfigError::DuplicateField("b".to_owned()))
    );
    assert!(writer(path, &[], OutputConfig::default()).validate(&model).is_err());

    let sliced = |x| OutputConfig {
        indices: Some(Indices {
            x: Some(x),
            ..Indices::default()
        }),
        ..OutputConfig::default()
    };
    assert_eq!(
        writer(path, &["b"], sliced((2, 5))).validate(&model),
        Err(ConfigError::IndexOutOfRange {
            axis: 'x',
            start: 2,
            end: 5,
            size: 4
        })
    );
    assert!(writer(path, &["b"], sliced((2, 2))).validate(&model).is_err());
    assert!(!path.exists());
}

#[test]
fn reader_errors() {
    let td = TempDir::new("output").unwrap();
    let path = td.path().join("snapshots.bin");
    let model = model();

    let mut w = writer(&path, &["b"], OutputConfig::default());
    w.write(&model, &clock(0, 0.0)).unwrap();

    let reader = SnapshotReader::open(&path).unwrap();
    assert!(matches!(
        reader.read_field("b", 1),
        Err(Error::NoSuchRecord { index: 1, count: 1 })
    ));
    assert!(matches!(
        reader.read_field("u", 0),
        Err(Error::Config(ConfigError::UnknownField(_)))
    ));

    let bytes = fs::read(&path).unwrap();

    let truncated = td.path().join("truncated.bin");
    fs::write(&truncated, &bytes[..bytes.len() - 3]).unwrap();
    assert!(matches!(
        SnapshotReader::open(&truncated),
        Err(Error::InvalidSnapshot { .. })
    ));

    let foreign = td.path().join("foreign.bin");
    fs::write(&foreign, b"NOTASNAPSHOT").unwrap();
    assert!(matches!(
        SnapshotReader::open(&foreign),
        Err(Error::InvalidSnapshot { .. })
    ));
}

#[test]
fn header_is_read_without_records() {
    let td = TempDir::new("output").unwrap();
    let path = td.path().join("snapshots.bin");
    let model = model();

    let mut w = writer(&path, &["b", "u"], OutputConfig::default());
    w.write(&model, &clock(0, 0.0)).unwrap();
    drop(w);

    // a damaged trailing record does not affect the header
    let mut bytes = fs::read(&path).unwrap();
    bytes.extend_from_slice(&[0xff; 5]);
    fs::write(&path, &bytes).unwrap();

    let header = snapshot::read_header(&path).unwrap();
    assert_eq!(header.fields, vec!["b".to_owned(), "u".to_owned()]);
    assert_eq!(header.grid_size, (4, 3, 2));
    assert!(SnapshotReader::open(&path).is_err());

    let short = td.path().join("short.bin");
    fs::write(&short, &bytes[..12]).unwrap();
    assert!(matches!(
        snapshot::read_header(&short),
        Err(Error::InvalidSnapshot { .. })
    ));
}

#[test]
fn reader_summary() {
    let td = TempDir::new("output").unwrap();
    let path = td.path().join("snapshots.bin");
    let mut model = model();

    let mut w = writer(&path, &["b", "u"], OutputConfig::default());
    w.write(&model, &clock(0, 0.0)).unwrap();
    model.set("u", |_, _, _| 1.5).unwrap();
    w.write(&model, &clock(7, 0.5)).unwrap();

    assert_snapshot!(SnapshotReader::open(&path).unwrap().summary(), @r###"
    2 records of [b, u] on a 4×3×2 grid
    iteration 0, t = 0: b in [0, 61.5] u in [0, 0]
    iteration 7, t = 0.5: b in [0, 61.5] u in [1.5, 1.5]
    "###);
}
