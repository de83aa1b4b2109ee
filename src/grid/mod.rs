//! Discretised spatial domains: rectilinear and latitude-longitude grids with
//! per-axis topology, uniform or stretched vertical coordinates and an
//! optional immersed bottom.

mod axis;
mod immersed;

#[cfg(test)]
mod test;

pub use {
    axis::{AxisCoordinates, Topology},
    immersed::ImmersedBoundary,
};

use {
    crate::{constants::DEG_TO_RAD, error::ConfigError},
    ndarray::{Array2, Array3},
    serde::{Deserialize, Serialize},
};

/// Horizontal geometry of a grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    /// Cartesian coordinates in metres
    Rectilinear,
    /// Longitude and latitude in degrees on a sphere of the given radius
    LatitudeLongitude { radius: f64 },
}

/// Vertical coordinate specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VerticalCoordinate {
    /// Evenly spaced levels between bottom and top
    Uniform { extent: (f64, f64) },
    /// Explicit face positions from bottom to top (`nz + 1` values)
    Faces(Vec<f64>),
}

/// Grid builder input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    pub geometry: Geometry,
    /// Number of cells in x, y and z (ignored for Flat axes)
    pub size: (usize, usize, usize),
    pub topology: (Topology, Topology, Topology),
    /// Extent in x, or longitude range for latitude-longitude grids
    pub x: (f64, f64),
    /// Extent in y, or latitude range for latitude-longitude grids
    pub y: (f64, f64),
    pub z: VerticalCoordinate,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            geometry: Geometry::Rectilinear,
            size: (16, 16, 8),
            topology: (Topology::Periodic, Topology::Periodic, Topology::Bounded),
            x: (0.0, 1000.0),
            y: (0.0, 1000.0),
            z: VerticalCoordinate::Uniform {
                extent: (-100.0, 0.0),
            },
        }
    }
}

/// Immutable description of the discretised domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    geometry: Geometry,
    x: AxisCoordinates,
    y: AxisCoordinates,
    z: AxisCoordinates,
    volumes: Array3<f64>,
    immersed: Option<ImmersedBoundary>,
}

impl Grid {
    pub fn new(config: &GridConfig) -> Result<Self, ConfigError> {
        let (nx, ny, nz) = config.size;
        let (tx, ty, tz) = config.topology;

        if let Geometry::LatitudeLongitude { radius } = config.geometry {
            if !(radius.is_finite() && radius > 0.0) {
                return Err(ConfigError::NonPositiveRadius(radius));
            }
            if ty == Topology::Periodic {
                return Err(ConfigError::Incompatible(
                    "latitude cannot be periodic".to_owned(),
                ));
            }
            if ty != Topology::Flat {
                for &lat in &[config.y.0, config.y.1] {
                    if !(-90.0..=90.0).contains(&lat) {
                        return Err(ConfigError::LatitudeOutOfRange(lat));
                    }
                }
            }
        }

        let x = AxisCoordinates::uniform('x', tx, nx, config.x)?;
        let y = AxisCoordinates::uniform('y', ty, ny, config.y)?;
        let z = match &config.z {
            VerticalCoordinate::Uniform { extent } => {
                AxisCoordinates::uniform('z', tz, nz, *extent)?
            }
            VerticalCoordinate::Faces(faces) => AxisCoordinates::stretched('z', tz, nz, faces)?,
        };

        let mut grid = Grid {
            geometry: config.geometry,
            x,
            y,
            z,
            volumes: Array3::zeros((0, 0, 0)),
            immersed: None,
        };
        grid.volumes = grid.compute_volumes();

        Ok(grid)
    }

    /// Attaches a grid-fitted bottom; cells whose centre lies at or below the
    /// bottom height of their column become solid.
    pub fn with_bottom(mut self, bottom_height: Array2<f64>) -> Result<Self, ConfigError> {
        self.immersed = Some(ImmersedBoundary::grid_fitted(&self, bottom_height)?);
        Ok(self)
    }

    /// As [`Grid::with_bottom`], evaluating `f(x, y)` at each column centre
    pub fn with_bottom_fn<F: Fn(f64, f64) -> f64>(self, f: F) -> Result<Self, ConfigError> {
        let (nx, ny, _) = self.size();
        let bottom = Array2::from_shape_fn((nx, ny), |(i, j)| {
            f(self.x.centers()[i], self.y.centers()[j])
        });
        self.with_bottom(bottom)
    }

    fn compute_volumes(&self) -> Array3<f64> {
        let shape = self.size();

        match self.geometry {
            Geometry::Rectilinear => Array3::from_shape_fn(shape, |(i, j, k)| {
                self.x.spacings()[i] * self.y.spacings()[j] * self.z.spacings()[k]
            }),
            Geometry::LatitudeLongitude { radius } => {
                // Exact area of a spherical cell: R^2 dlambda (sin phi_n - sin phi_s)
                let lat_faces = self.y.faces();
                Array3::from_shape_fn(shape, |(i, j, k)| {
                    let dlambda = if self.x.topology() == Topology::Flat {
                        1.0
                    } else {
                        self.x.spacings()[i] * DEG_TO_RAD
                    };
                    let band = if self.y.topology() == Topology::Flat {
                        1.0
                    } else {
                        (lat_faces[j + 1] * DEG_TO_RAD).sin() - (lat_faces[j] * DEG_TO_RAD).sin()
                    };
                    radius * radius * dlambda * band * self.z.spacings()[k]
                })
            }
        }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn size(&self) -> (usize, usize, usize) {
        (self.x.len(), self.y.len(), self.z.len())
    }

    pub fn cell_count(&self) -> usize {
        self.x.len() * self.y.len() * self.z.len()
    }

    pub fn topology(&self) -> (Topology, Topology, Topology) {
        (self.x.topology(), self.y.topology(), self.z.topology())
    }

    pub fn x(&self) -> &AxisCoordinates {
        &self.x
    }

    pub fn y(&self) -> &AxisCoordinates {
        &self.y
    }

    pub fn z(&self) -> &AxisCoordinates {
        &self.z
    }

    pub fn volumes(&self) -> &Array3<f64> {
        &self.volumes
    }

    pub fn immersed_boundary(&self) -> Option<&ImmersedBoundary> {
        self.immersed.as_ref()
    }

    pub fn is_immersed(&self, i: usize, j: usize, k: usize) -> bool {
        self.immersed
            .as_ref()
            .map_or(false, |ib| ib.mask()[[i, j, k]])
    }

    /// Whether the grid varies in at least one horizontal direction
    pub fn has_horizontal_extent(&self) -> bool {
        self.x.topology() != Topology::Flat || self.y.topology() != Topology::Flat
    }

    /// Physical position of the centre of cell (i, j, k)
    pub fn node(&self, i: usize, j: usize, k: usize) -> (f64, f64, f64) {
        (
            self.x.centers()[i],
            self.y.centers()[j],
            self.z.centers()[k],
        )
    }

    /// Cell width in x at (i, j), in metres
    pub fn spacing_x(&self, i: usize, j: usize) -> f64 {
        match self.geometry {
            Geometry::Rectilinear => self.x.spacings()[i],
            Geometry::LatitudeLongitude { radius } => {
                radius
                    * (self.y.centers()[j] * DEG_TO_RAD).cos()
                    * self.x.spacings()[i]
                    * DEG_TO_RAD
            }
        }
    }

    /// Cell width in y at row j, in metres
    pub fn spacing_y(&self, j: usize) -> f64 {
        match self.geometry {
            Geometry::Rectilinear => self.y.spacings()[j],
            Geometry::LatitudeLongitude { radius } => radius * self.y.spacings()[j] * DEG_TO_RAD,
        }
    }

    pub fn spacing_z(&self, k: usize) -> f64 {
        self.z.spacings()[k]
    }

    /// One-line description, e.g. `RectilinearGrid 4×4×2 (Periodic, Periodic, Bounded)`
    pub fn summary(&self) -> String {
        let name = match self.geometry {
            Geometry::Rectilinear => "RectilinearGrid",
            Geometry::LatitudeLongitude { .. } => "LatitudeLongitudeGrid",
        };
        let (nx, ny, nz) = self.size();
        let (tx, ty, tz) = self.topology();
        let mut s = format!("{} {}×{}×{} ({}, {}, {})", name, nx, ny, nz, tx, ty, tz);

        if let Some(ib) = &self.immersed {
            s += &format!(" with {} immersed cells", ib.solid_count());
        }

        s
    }
}
