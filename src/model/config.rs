use {
    super::boundary::FieldBoundaryCondition,
    crate::constants::GRAVITY,
    serde::{Deserialize, Serialize},
};

/// Equation set solved by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Equations {
    Nonhydrostatic,
    HydrostaticFreeSurface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Advection {
    Upwind,
    Centered { order: usize },
    Weno { order: usize },
}

/// Subgrid-scale closure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Closure {
    ScalarDiffusivity { viscosity: f64, diffusivity: f64 },
    Catke,
    GentMcWilliams { diffusivity: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Buoyancy {
    /// Buoyancy is carried directly by the tracer `b`
    BuoyancyTracer,
    /// Buoyancy from temperature `T` and salinity `S` through a linear
    /// equation of state
    Seawater {
        thermal_expansion: f64,
        haline_contraction: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Coriolis {
    FPlane { f: f64 },
    BetaPlane { f0: f64, beta: f64 },
}

impl Coriolis {
    /// Coriolis parameter at meridional position `y`
    pub fn parameter(&self, y: f64) -> f64 {
        match *self {
            Coriolis::FPlane { f } => f,
            Coriolis::BetaPlane { f0, beta } => f0 + beta * y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FreeSurface {
    Explicit { gravity: f64 },
    SplitExplicit { gravity: f64, substeps: usize },
}

impl FreeSurface {
    pub fn gravity(&self) -> f64 {
        match *self {
            FreeSurface::Explicit { gravity } | FreeSurface::SplitExplicit { gravity, .. } => {
                gravity
            }
        }
    }
}

impl Default for FreeSurface {
    fn default() -> Self {
        FreeSurface::SplitExplicit {
            gravity: GRAVITY,
            substeps: 30,
        }
    }
}

/// Descriptors of external components coupled at the ocean surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Coupling {
    /// Constant surface wind stress (N m^-2) and heat flux (W m^-2, positive upward)
    PrescribedAtmosphere {
        wind_stress: (f64, f64),
        heat_flux: f64,
    },
    Radiation { albedo: f64, emissivity: f64 },
}

/// Every recognised model option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    pub equations: Equations,
    pub advection: Advection,
    #[serde(default)]
    pub closure: Option<Closure>,
    #[serde(default)]
    pub buoyancy: Option<Buoyancy>,
    #[serde(default)]
    pub coriolis: Option<Coriolis>,
    #[serde(default)]
    pub free_surface: Option<FreeSurface>,
    #[serde(default)]
    pub tracers: Vec<String>,
    #[serde(default)]
    pub boundary_conditions: Vec<FieldBoundaryCondition>,
    #[serde(default)]
    pub coupling: Vec<Coupling>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            equations: Equations::Nonhydrostatic,
            advection: Advection::Upwind,
            closure: None,
            buoyancy: Some(Buoyancy::BuoyancyTracer),
            coriolis: None,
            free_surface: None,
            tracers: vec!["b".to_owned()],
            boundary_conditions: vec![],
            coupling: vec![],
        }
    }
}
