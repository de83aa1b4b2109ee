//! Model assembly: binds a grid to an explicit configuration and allocates
//! the prognostic fields.

mod boundary;
mod config;
mod fields;
mod initial;


pub use {
    boundary::{BoundaryCondition, BoundaryConditions, FieldBoundaryCondition, Side},
    config::{Advection, Buoyancy, Closure, Coriolis, Coupling, Equations, FreeSurface, ModelConfig},
    fields::ModelState,
    initial::InitialCondition,
};

use {
    crate::{
        constants::{FREE_SURFACE_NAME, VELOCITY_NAMES},
        error::ConfigError,
        grid::{Geometry, Grid, Topology},
    },
    log::debug,
    ndarray::Array3,
};

/// A grid, its configuration and the field storage sized to it
#[derive(Debug, Clone)]
pub struct Model {
    grid: Grid,
    config: ModelConfig,
    boundary_conditions: BoundaryConditions,
    state: ModelState,
}

/// Simultaneous access to the immutable model description and mutable state
pub struct ModelParts<'a> {
    pub grid: &'a Grid,
    pub config: &'a ModelConfig,
    pub boundary_conditions: &'a BoundaryConditions,
    pub state: &'a mut ModelState,
}

impl Model {
    /// Validates `config` against `grid` and allocates zeroed fields
    pub fn new(grid: Grid, config: ModelConfig) -> Result<Self, ConfigError> {
        validate(&grid, &config)?;

        let (nx, ny, nz) = grid.size();
        let mut state = ModelState::default();

        for name in VELOCITY_NAMES.iter() {
            state.insert(name, Array3::zeros((nx, ny, nz)));
        }
        for name in &config.tracers {
            state.insert(name, Array3::zeros((nx, ny, nz)));
        }
        if config.free_surface.is_some() {
            state.insert(FREE_SURFACE_NAME, Array3::zeros((nx, ny, 1)));
        }

        let mut boundary_conditions = BoundaryConditions::default();
        for bc in &config.boundary_conditions {
            boundary_conditions.insert(&bc.field, bc.side, bc.condition);
        }

        debug!(
            "Assembled {:?} model with fields {:?} on {}",
            config.equations,
            state.names().collect::<Vec<_>>(),
            grid.summary()
        );

        Ok(Model {
            grid,
            config,
            boundary_conditions,
            state,
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn boundary_conditions(&self) -> &BoundaryConditions {
        &self.boundary_conditions
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn field(&self, name: &str) -> Option<&Array3<f64>> {
        self.state.get(name)
    }

    pub fn parts_mut(&mut self) -> ModelParts<'_> {
        ModelParts {
            grid: &self.grid,
            config: &self.config,
            boundary_conditions: &self.boundary_conditions,
            state: &mut self.state,
        }
    }

    /// Sets a field from a function of the cell centre position.
    ///
    /// The free surface is evaluated at the top face of the grid.
    pub fn set<F: Fn(f64, f64, f64) -> f64>(&mut self, name: &str, f: F) -> Result<(), ConfigError> {
        let grid = &self.grid;
        let field = self
            .state
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownField(name.to_owned()))?;

        let (nx, ny, nz) = field.dim();
        let top = grid.z().extent().1;
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    let (x, y, z) = grid.node(i, j, k);
                    let z = if name == FREE_SURFACE_NAME { top } else { z };
                    field[[i, j, k]] = f(x, y, z);
                }
            }
        }

        Ok(())
    }

    pub fn set_array(&mut self, name: &str, values: Array3<f64>) -> Result<(), ConfigError> {
        let field = self
            .state
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownField(name.to_owned()))?;

        if field.dim() != values.dim() {
            return Err(ConfigError::ShapeMismatch {
                name: name.to_owned(),
                expected: field.shape().to_vec(),
                found: values.shape().to_vec(),
            });
        }

        *field = values;
        Ok(())
    }

    pub fn set_initial_condition(
        &mut self,
        name: &str,
        condition: &InitialCondition,
    ) -> Result<(), ConfigError> {
        self.set(name, |x, y, z| condition.evaluate(x, y, z))
    }
}

fn incompatible<T>(msg: &str) -> Result<T, ConfigError> {
    Err(ConfigError::Incompatible(msg.to_owned()))
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            requirement: "finite and non-negative",
            value,
        })
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            requirement: "finite and positive",
            value,
        })
    }
}

fn unit_interval(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            requirement: "within [0, 1]",
            value,
        })
    }
}

fn validate(grid: &Grid, config: &ModelConfig) -> Result<(), ConfigError> {
    let has_tracer = |name: &str| config.tracers.iter().any(|t| t == name);

    for (i, tracer) in config.tracers.iter().enumerate() {
        if VELOCITY_NAMES.contains(&tracer.as_str()) || tracer == FREE_SURFACE_NAME {
            return Err(ConfigError::Incompatible(format!(
                "tracer name \"{}\" is reserved",
                tracer
            )));
        }
        if config.tracers[..i].contains(tracer) {
            return Err(ConfigError::DuplicateField(tracer.clone()));
        }
    }

    match config.equations {
        Equations::Nonhydrostatic => {
            if grid.geometry() != Geometry::Rectilinear {
                return incompatible("nonhydrostatic models require a rectilinear grid");
            }
            if config.free_surface.is_some() {
                return incompatible("nonhydrostatic models do not support a free surface");
            }
            if let Some(Closure::Catke) | Some(Closure::GentMcWilliams { .. }) = config.closure {
                return incompatible(
                    "CATKE and Gent-McWilliams closures require the hydrostatic free-surface equations",
                );
            }
        }
        Equations::HydrostaticFreeSurface => {
            if config.free_surface.is_none() {
                return incompatible("hydrostatic free-surface models require a free surface");
            }
        }
    }

    if let Some(free_surface) = &config.free_surface {
        if !grid.has_horizontal_extent() {
            return incompatible("a free surface requires a horizontal grid");
        }
        if grid.z().topology() != Topology::Bounded {
            return incompatible("a free surface requires a bounded vertical axis");
        }
        positive("free surface gravity", free_surface.gravity())?;
        if let FreeSurface::SplitExplicit { substeps: 0, .. } = free_surface {
            return incompatible("split-explicit free surface needs at least one substep");
        }
    }

    match config.advection {
        Advection::Upwind => {}
        Advection::Centered { order } => {
            if order == 0 || order % 2 != 0 {
                return Err(ConfigError::OutOfRange {
                    name: "centered advection order",
                    requirement: "positive and even",
                    value: order as f64,
                });
            }
        }
        Advection::Weno { order } => {
            if order < 3 || order % 2 == 0 {
                return Err(ConfigError::OutOfRange {
                    name: "WENO advection order",
                    requirement: "odd and at least 3",
                    value: order as f64,
                });
            }
        }
    }

    match config.closure {
        Some(Closure::ScalarDiffusivity {
            viscosity,
            diffusivity,
        }) => {
            non_negative("viscosity", viscosity)?;
            non_negative("diffusivity", diffusivity)?;
        }
        Some(Closure::GentMcWilliams { diffusivity }) => {
            non_negative("diffusivity", diffusivity)?;
        }
        Some(Closure::Catke) | None => {}
    }

    match config.buoyancy {
        Some(Buoyancy::BuoyancyTracer) if !has_tracer("b") => {
            return incompatible("buoyancy tracer requires a tracer named \"b\"");
        }
        Some(Buoyancy::Seawater {
            thermal_expansion,
            haline_contraction,
        }) => {
            if !has_tracer("T") || !has_tracer("S") {
                return incompatible("seawater buoyancy requires tracers \"T\" and \"S\"");
            }
            non_negative("thermal expansion", thermal_expansion)?;
            non_negative("haline contraction", haline_contraction)?;
        }
        _ => {}
    }

    if let Some(coriolis) = &config.coriolis {
        let finite = match *coriolis {
            Coriolis::FPlane { f } => f.is_finite(),
            Coriolis::BetaPlane { f0, beta } => f0.is_finite() && beta.is_finite(),
        };
        if !finite {
            return incompatible("Coriolis parameters must be finite");
        }
    }

    let topology = grid.topology();
    for (i, bc) in config.boundary_conditions.iter().enumerate() {
        let repeated = config.boundary_conditions[..i]
            .iter()
            .any(|other| other.field == bc.field && other.side == bc.side);
        if repeated {
            return Err(ConfigError::Incompatible(format!(
                "boundary condition on {} side of \"{}\" is given more than once",
                bc.side, bc.field
            )));
        }

        let known = VELOCITY_NAMES.contains(&bc.field.as_str()) || has_tracer(&bc.field);
        if !known {
            return Err(ConfigError::UnknownField(bc.field.clone()));
        }

        let axis_topology = [topology.0, topology.1, topology.2][bc.side.axis()];
        if axis_topology != Topology::Bounded {
            return Err(ConfigError::Incompatible(format!(
                "boundary condition on {} side of \"{}\" requires a bounded axis, found {}",
                bc.side, bc.field, axis_topology
            )));
        }
    }

    for coupling in &config.coupling {
        if config.equations != Equations::HydrostaticFreeSurface {
            return incompatible("coupling requires the hydrostatic free-surface equations");
        }
        if !has_tracer("T") || !has_tracer("S") {
            return incompatible("coupling requires tracers \"T\" and \"S\"");
        }
        match *coupling {
            Coupling::PrescribedAtmosphere {
                wind_stress: (tx, ty),
                heat_flux,
            } => {
                if !(tx.is_finite() && ty.is_finite() && heat_flux.is_finite()) {
                    return incompatible("atmospheric forcing must be finite");
                }
            }
            Coupling::Radiation { albedo, emissivity } => {
                unit_interval("albedo", albedo)?;
                unit_interval("emissivity", emissivity)?;
            }
        }
    }

    Ok(())
}
