//! Scheduled snapshot output of model and derived fields.

mod snapshot;

#[cfg(test)]
mod test;

pub use snapshot::{SnapshotHeader, SnapshotReader, MAGIC};

use {
    crate::{
        error::{ConfigError, Error, Result},
        model::Model,
        simulation::{Clock, Schedule},
    },
    log::{debug, info},
    ndarray::{s, Array3, ArrayView3, Zip},
    serde::{Deserialize, Serialize},
    snapshot::{FieldRecord, Record},
    std::{
        fs::{self, File, OpenOptions},
        io::{BufWriter, Write},
        path::{Path, PathBuf},
    },
};

/// Magnitude of the velocity vector
pub const SPEED: &str = "speed";
/// Half the squared magnitude of the velocity vector
pub const KINETIC_ENERGY: &str = "kinetic_energy";

/// Half-open cell index ranges restricting the written region, per axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Indices {
    pub x: Option<(usize, usize)>,
    pub y: Option<(usize, usize)>,
    pub z: Option<(usize, usize)>,
}

impl Indices {
    fn validate(&self, (nx, ny, nz): (usize, usize, usize)) -> std::result::Result<(), ConfigError> {
        for &(axis, range, size) in [('x', self.x, nx), ('y', self.y, ny), ('z', self.z, nz)].iter() {
            if let Some((start, end)) = range {
                if start >= end || end > size {
                    return Err(ConfigError::IndexOutOfRange {
                        axis,
                        start,
                        end,
                        size,
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct OutputConfig {
    pub indices: Option<Indices>,
    /// Truncate an existing file instead of appending to it
    pub overwrite_existing: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            indices: None,
            overwrite_existing: true,
        }
    }
}

/// Writes the selected fields to a snapshot file each time its schedule fires
#[derive(Debug)]
pub struct OutputWriter {
    path: PathBuf,
    fields: Vec<String>,
    schedule: Schedule,
    config: OutputConfig,
    file: Option<BufWriter<File>>,
    records: usize,
}

impl OutputWriter {
    /// The file is not touched until the first write
    pub fn new<P: Into<PathBuf>>(
        path: P,
        fields: Vec<String>,
        schedule: Schedule,
        config: OutputConfig,
    ) -> Self {
        Self {
            path: path.into(),
            fields,
            schedule,
            config,
            file: None,
            records: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    /// Records written by this writer since it was created
    pub fn records_written(&self) -> usize {
        self.records
    }

    /// Checks the field selection and indices against `model`
    pub fn validate(&self, model: &Model) -> std::result::Result<(), ConfigError> {
        if self.fields.is_empty() {
            return Err(ConfigError::Incompatible(format!(
                "output to {} selects no fields",
                self.path.display()
            )));
        }

        for (i, name) in self.fields.iter().enumerate() {
            if self.fields[..i].contains(name) {
                return Err(ConfigError::DuplicateField(name.clone()));
            }
            let derived = name == SPEED || name == KINETIC_ENERGY;
            if !derived && !model.state().contains(name) {
                return Err(ConfigError::UnknownField(name.clone()));
            }
        }

        if let Some(indices) = &self.config.indices {
            indices.validate(model.grid().size())?;
        }

        Ok(())
    }

    /// Appends one record holding every selected field at the clock's time
    pub fn write(&mut self, model: &Model, clock: &Clock) -> Result<()> {
        let fields = self
            .fields
            .iter()
            .map(|name| self.extract(model, name))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let record = Record {
            iteration: clock.iteration,
            time: clock.time,
            fields,
        };

        if self.file.is_none() {
            self.file = Some(self.open(model.grid().size())?);
        }
        if let Some(file) = &mut self.file {
            snapshot::write_chunk(file, &record)?;
            file.flush()?;
        }
        self.records += 1;

        debug!(
            "wrote {} at iteration {}, t = {}",
            self.path.display(),
            clock.iteration,
            clock.time
        );

        Ok(())
    }

    fn open(&self, grid_size: (usize, usize, usize)) -> Result<BufWriter<File>> {
        let header = SnapshotHeader {
            fields: self.fields.clone(),
            grid_size,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let existing = !self.config.overwrite_existing
            && self.path.exists()
            && fs::metadata(&self.path)?.len() > 0;

        if existing {
            let found = snapshot::read_header(&self.path)?;
            if found != header {
                return Err(Error::InvalidSnapshot {
                    path: self.path.display().to_string(),
                    reason: format!(
                        "cannot append: file holds {:?} on a {:?} grid, writer expects {:?} on {:?}",
                        found.fields, found.grid_size, header.fields, header.grid_size
                    ),
                });
            }
            info!("appending to {}", self.path.display());
            Ok(BufWriter::new(OpenOptions::new().append(true).open(&self.path)?))
        } else {
            info!("writing {}", self.path.display());
            let mut file = BufWriter::new(File::create(&self.path)?);
            snapshot::write_preamble(&mut file, &header)?;
            Ok(file)
        }
    }

    fn extract(&self, model: &Model, name: &str) -> std::result::Result<FieldRecord, ConfigError> {
        let indices = self.config.indices.unwrap_or_default();
        let size = model.grid().size();

        match name {
            SPEED => {
                let speed = velocity_squared(model)?.mapv_into(f64::sqrt);
                Ok(select(speed.view(), &indices, size))
            }
            KINETIC_ENERGY => {
                let energy = velocity_squared(model)?.mapv_into(|s| 0.5 * s);
                Ok(select(energy.view(), &indices, size))
            }
            _ => model
                .field(name)
                .map(|field| select(field.view(), &indices, size))
                .ok_or_else(|| ConfigError::UnknownField(name.to_owned())),
        }
    }
}

/// `u² + v² + w²` at each cell
fn velocity_squared(model: &Model) -> std::result::Result<Array3<f64>, ConfigError> {
    let get = |name: &str| {
        model
            .field(name)
            .ok_or_else(|| ConfigError::UnknownField(name.to_owned()))
    };
    let (u, v, w) = (get("u")?, get("v")?, get("w")?);

    let mut out = Array3::zeros(u.dim());
    Zip::from(&mut out)
        .and(u)
        .and(v)
        .and(w)
        .par_apply(|s, &u, &v, &w| *s = u * u + v * v + w * w);
    Ok(out)
}

/// Restricts `field` to `indices`. Axes along which the field is not
/// grid-sized, as for the free surface in z, are written whole.
fn select(
    field: ArrayView3<f64>,
    indices: &Indices,
    (nx, ny, nz): (usize, usize, usize),
) -> FieldRecord {
    let (fx, fy, fz) = field.dim();
    let range = |r: Option<(usize, usize)>, n: usize, grid_n: usize| match r {
        Some((start, end)) if n == grid_n => start..end,
        _ => 0..n,
    };

    let view = field.slice(s![
        range(indices.x, fx, nx),
        range(indices.y, fy, ny),
        range(indices.z, fz, nz)
    ]);
    let (sx, sy, sz) = view.dim();

    FieldRecord {
        shape: [sx, sy, sz],
        data: view.iter().cloned().collect(),
    }
}
