use {
    super::Grid,
    crate::error::ConfigError,
    ndarray::{Array2, Array3, Axis},
    serde::{Deserialize, Serialize},
};

/// Solid cells carved out of the grid by a bottom height per column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImmersedBoundary {
    bottom_height: Array2<f64>,
    mask: Array3<bool>,
}

impl ImmersedBoundary {
    pub(super) fn grid_fitted(grid: &Grid, bottom_height: Array2<f64>) -> Result<Self, ConfigError> {
        let (nx, ny, nz) = grid.size();

        if bottom_height.dim() != (nx, ny) {
            let (bx, by) = bottom_height.dim();
            return Err(ConfigError::ShapeMismatch {
                name: "bottom height".to_owned(),
                expected: vec![nx, ny],
                found: vec![bx, by],
            });
        }

        if let Some(h) = bottom_height.iter().find(|h| !h.is_finite()) {
            return Err(ConfigError::OutOfRange {
                name: "bottom height",
                requirement: "finite",
                value: *h,
            });
        }

        let zc = grid.z().centers();
        let mask = Array3::from_shape_fn((nx, ny, nz), |(i, j, k)| zc[k] <= bottom_height[[i, j]]);

        Ok(Self {
            bottom_height,
            mask,
        })
    }

    pub fn bottom_height(&self) -> &Array2<f64> {
        &self.bottom_height
    }

    /// `true` where the cell is solid
    pub fn mask(&self) -> &Array3<bool> {
        &self.mask
    }

    pub fn solid_count(&self) -> usize {
        self.mask.iter().filter(|&&solid| solid).count()
    }

    /// Number of fluid cells in each column
    pub fn fluid_depth_cells(&self) -> Array2<usize> {
        self.mask
            .map(|&solid| if solid { 0 } else { 1 })
            .sum_axis(Axis(2))
    }
}
