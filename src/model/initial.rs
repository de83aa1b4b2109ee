use serde::{Deserialize, Serialize};

/// Analytic initial condition for a single field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InitialCondition {
    Constant(f64),
    /// `surface + gradient * z`
    LinearZ { surface: f64, gradient: f64 },
    Gaussian {
        background: f64,
        amplitude: f64,
        center: (f64, f64, f64),
        width: f64,
    },
}

impl InitialCondition {
    pub fn evaluate(&self, x: f64, y: f64, z: f64) -> f64 {
        match *self {
            InitialCondition::Constant(c) => c,
            InitialCondition::LinearZ { surface, gradient } => surface + gradient * z,
            InitialCondition::Gaussian {
                background,
                amplitude,
                center: (x0, y0, z0),
                width,
            } => {
                let r2 = (x - x0).powi(2) + (y - y0).powi(2) + (z - z0).powi(2);
                background + amplitude * (-r2 / (2.0 * width * width)).exp()
            }
        }
    }
}
