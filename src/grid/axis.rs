use {
    crate::error::ConfigError,
    ndarray::{s, Array1, ArrayView1},
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Boundary topology of a single grid axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topology {
    Periodic,
    Bounded,
    /// The axis collapses to a single cell and carries no variation
    Flat,
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Topology::Periodic => "Periodic",
            Topology::Bounded => "Bounded",
            Topology::Flat => "Flat",
        };
        f.write_str(s)
    }
}

/// Cell centre and face coordinates along one axis.
///
/// Faces are stored as `n + 1` values regardless of topology; periodic axes
/// expose only the first `n` through [`AxisCoordinates::faces`] since the last
/// face coincides with the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisCoordinates {
    topology: Topology,
    centers: Array1<f64>,
    faces: Array1<f64>,
    spacings: Array1<f64>,
}

impl AxisCoordinates {
    /// Evenly spaced cells between `start` and `end`
    pub fn uniform(
        axis: char,
        topology: Topology,
        n: usize,
        (start, end): (f64, f64),
    ) -> Result<Self, ConfigError> {
        if topology == Topology::Flat {
            return Ok(Self::flat());
        }

        if n == 0 {
            return Err(ConfigError::NonPositiveResolution { axis, size: n });
        }

        if !start.is_finite() || !end.is_finite() || end <= start {
            return Err(ConfigError::DegenerateExtent { axis, start, end });
        }

        let delta = (end - start) / n as f64;
        let faces = Array1::from_shape_fn(n + 1, |i| start + i as f64 * delta);

        Ok(Self::from_faces_unchecked(topology, faces))
    }

    /// Cells bounded by explicitly given faces, which must be strictly increasing
    pub fn stretched(
        axis: char,
        topology: Topology,
        n: usize,
        faces: &[f64],
    ) -> Result<Self, ConfigError> {
        if topology == Topology::Flat {
            return Ok(Self::flat());
        }

        if n == 0 {
            return Err(ConfigError::NonPositiveResolution { axis, size: n });
        }

        let increasing = faces
            .windows(2)
            .all(|w| w[0].is_finite() && w[1].is_finite() && w[1] > w[0]);

        if faces.len() != n + 1 || !increasing {
            return Err(ConfigError::InvalidVerticalFaces {
                expected: n + 1,
                found: faces.len(),
            });
        }

        Ok(Self::from_faces_unchecked(
            topology,
            Array1::from(faces.to_vec()),
        ))
    }

    fn flat() -> Self {
        Self {
            topology: Topology::Flat,
            centers: Array1::zeros(1),
            faces: Array1::from(vec![-0.5, 0.5]),
            spacings: Array1::ones(1),
        }
    }

    fn from_faces_unchecked(topology: Topology, faces: Array1<f64>) -> Self {
        let n = faces.len() - 1;
        let centers = Array1::from_shape_fn(n, |i| 0.5 * (faces[i] + faces[i + 1]));
        let spacings = Array1::from_shape_fn(n, |i| faces[i + 1] - faces[i]);

        Self {
            topology,
            centers,
            faces,
            spacings,
        }
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    pub fn centers(&self) -> ArrayView1<f64> {
        self.centers.view()
    }

    pub fn faces(&self) -> ArrayView1<f64> {
        match self.topology {
            Topology::Periodic => self.faces.slice(s![..self.len()]),
            _ => self.faces.view(),
        }
    }

    pub fn spacings(&self) -> ArrayView1<f64> {
        self.spacings.view()
    }

    /// Position of the first and last face
    pub fn extent(&self) -> (f64, f64) {
        (self.faces[0], self.faces[self.faces.len() - 1])
    }
}
