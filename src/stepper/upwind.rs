//! First-order upwind transport of tracers with explicit Laplacian diffusion,
//! exact Coriolis rotation of horizontal velocity, surface wind stress and a
//! linear free surface driven by the depth-integrated flow divergence.
//!
//! All terms use cell-centred values; face velocities are the mean of the two
//! adjacent cells. Fluxes through faces touching an immersed cell vanish.

use {
    super::TimeStepper,
    crate::{
        constants::{FREE_SURFACE_NAME, HEAT_CAPACITY, REFERENCE_DENSITY},
        error::{Error, Result},
        grid::{Grid, Topology},
        model::{
            Advection, BoundaryCondition, BoundaryConditions, Closure, Coupling, Model,
            ModelConfig, Side,
        },
    },
    log::warn,
    ndarray::{Array2, Array3, Axis, Zip},
};

const SIDES: [[Side; 2]; 3] = [
    [Side::West, Side::East],
    [Side::South, Side::North],
    [Side::Bottom, Side::Top],
];

#[derive(Debug, Clone, Default)]
pub struct UpwindStepper {
    warned: bool,
}

impl UpwindStepper {
    pub fn new() -> Self {
        Self::default()
    }

    fn warn_unsupported(&mut self, config: &ModelConfig) {
        if self.warned {
            return;
        }
        self.warned = true;

        if config.advection != Advection::Upwind {
            warn!(
                "{:?} advection is not available in the upwind stepper, using first-order upwind",
                config.advection
            );
        }
        match config.closure {
            Some(Closure::Catke) | Some(Closure::GentMcWilliams { .. }) => {
                warn!("{:?} closure is ignored by the upwind stepper", config.closure)
            }
            _ => {}
        }
        if config
            .coupling
            .iter()
            .any(|c| matches!(c, Coupling::Radiation { .. }))
        {
            warn!("radiation coupling is ignored by the upwind stepper");
        }
    }
}

impl TimeStepper for UpwindStepper {
    fn name(&self) -> &str {
        "upwind"
    }

    fn step(&mut self, model: &mut Model, t: f64, dt: f64) -> Result<()> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(Error::Step(format!("invalid time step {} at t = {}", dt, t)));
        }

        let parts = model.parts_mut();
        self.warn_unsupported(parts.config);

        let grid = parts.grid;
        let config = parts.config;
        let bcs = parts.boundary_conditions;
        let state = parts.state;

        let (viscosity, diffusivity) = match config.closure {
            Some(Closure::ScalarDiffusivity {
                viscosity,
                diffusivity,
            }) => (viscosity, diffusivity),
            _ => (0.0, 0.0),
        };

        let (wind_stress, heat_flux) = config
            .coupling
            .iter()
            .find_map(|c| match *c {
                Coupling::PrescribedAtmosphere {
                    wind_stress,
                    heat_flux,
                } => Some((wind_stress, heat_flux)),
                _ => None,
            })
            .unwrap_or(((0.0, 0.0), 0.0));

        let velocities = [
            field(state, "u")?.clone(),
            field(state, "v")?.clone(),
            field(state, "w")?.clone(),
        ];

        // Tracers are transported by the velocity at the start of the step
        for name in &config.tracers {
            let surface_flux = if name == "T" {
                heat_flux / (REFERENCE_DENSITY * HEAT_CAPACITY)
            } else {
                0.0
            };
            let c = field(state, name)?;
            let g = tendency(
                grid,
                c,
                Some(&velocities),
                diffusivity,
                bcs,
                name,
                surface_flux,
            );
            let c = field_mut(state, name)?;
            Zip::from(c).and(&g).par_apply(|c, &g| *c += dt * g);
        }

        if viscosity > 0.0 {
            for (a, name) in ["u", "v", "w"].iter().enumerate() {
                let g = tendency(grid, &velocities[a], None, viscosity, bcs, name, 0.0);
                let vel = field_mut(state, name)?;
                Zip::from(vel).and(&g).par_apply(|v, &g| *v += dt * g);
            }
        }

        let (nx, ny, nz) = grid.size();

        if let Some(coriolis) = config.coriolis {
            let mut u = field(state, "u")?.clone();
            let mut v = field(state, "v")?.clone();
            for j in 0..ny {
                let theta = coriolis.parameter(grid.y().centers()[j]) * dt;
                let (sin, cos) = theta.sin_cos();
                Zip::from(u.index_axis_mut(Axis(1), j))
                    .and(v.index_axis_mut(Axis(1), j))
                    .apply(|u, v| {
                        let (u0, v0) = (*u, *v);
                        *u = u0 * cos + v0 * sin;
                        *v = -u0 * sin + v0 * cos;
                    });
            }
            *field_mut(state, "u")? = u;
            *field_mut(state, "v")? = v;
        }

        if wind_stress != (0.0, 0.0) {
            let top = nz - 1;
            let scale = dt / (REFERENCE_DENSITY * grid.spacing_z(top));
            for (name, tau) in [("u", wind_stress.0), ("v", wind_stress.1)].iter() {
                let vel = field_mut(state, name)?;
                for i in 0..nx {
                    for j in 0..ny {
                        if !grid.is_immersed(i, j, top) {
                            vel[[i, j, top]] += scale * tau;
                        }
                    }
                }
            }
        }

        if let Some(mask) = grid.immersed_boundary().map(|ib| ib.mask()) {
            for name in ["u", "v", "w"].iter() {
                let vel = field_mut(state, name)?;
                Zip::from(vel).and(mask).apply(|v, &solid| {
                    if solid {
                        *v = 0.0
                    }
                });
            }
        }

        if state.contains(FREE_SURFACE_NAME) {
            let deta = free_surface_tendency(grid, &velocities[0], &velocities[1]);
            let eta = field_mut(state, FREE_SURFACE_NAME)?;
            Zip::from(eta.index_axis_mut(Axis(2), 0))
                .and(&deta)
                .apply(|eta, &d| *eta += dt * d);
        }

        Ok(())
    }
}

fn field<'a>(state: &'a crate::model::ModelState, name: &str) -> Result<&'a Array3<f64>> {
    state
        .get(name)
        .ok_or_else(|| Error::Step(format!("model has no field \"{}\"", name)))
}

fn field_mut<'a>(
    state: &'a mut crate::model::ModelState,
    name: &str,
) -> Result<&'a mut Array3<f64>> {
    state
        .get_mut(name)
        .ok_or_else(|| Error::Step(format!("model has no field \"{}\"", name)))
}

/// Width of cell `idx` along `axis`, in metres
fn spacing(grid: &Grid, idx: [usize; 3], axis: usize) -> f64 {
    match axis {
        0 => grid.spacing_x(idx[0], idx[1]),
        1 => grid.spacing_y(idx[1]),
        _ => grid.spacing_z(idx[2]),
    }
}

/// Neighbour of `idx` in the positive direction along `axis`
fn upper_neighbour(idx: [usize; 3], axis: usize, n: usize, topology: Topology) -> Option<[usize; 3]> {
    let mut next = idx;
    if idx[axis] + 1 < n {
        next[axis] += 1;
        Some(next)
    } else if topology == Topology::Periodic && n > 1 {
        next[axis] = 0;
        Some(next)
    } else {
        None
    }
}

/// Flux through a domain boundary in the direction of increasing coordinate
fn boundary_flux(condition: BoundaryCondition, kappa: f64, c: f64, delta: f64, upper: bool) -> f64 {
    match condition {
        BoundaryCondition::Flux(f) => f,
        BoundaryCondition::Gradient(g) => -kappa * g,
        BoundaryCondition::Value(v) => {
            let difference = if upper { v - c } else { c - v };
            let gradient = difference / (0.5 * delta);
            -kappa * gradient
        }
    }
}

/// Rate of change of `c` due to advection by `velocities` (if given),
/// diffusion with `kappa` and boundary fluxes
fn tendency(
    grid: &Grid,
    c: &Array3<f64>,
    velocities: Option<&[Array3<f64>; 3]>,
    kappa: f64,
    bcs: &BoundaryConditions,
    name: &str,
    surface_flux: f64,
) -> Array3<f64> {
    let (nx, ny, nz) = grid.size();
    let n = [nx, ny, nz];
    let (tx, ty, tz) = grid.topology();
    let topology = [tx, ty, tz];
    let mut g = Array3::<f64>::zeros((nx, ny, nz));

    for i in 0..nx {
        for j in 0..ny {
            for k in 0..nz {
                let idx = [i, j, k];
                if grid.is_immersed(i, j, k) {
                    continue;
                }

                for axis in 0..3 {
                    if topology[axis] == Topology::Flat {
                        continue;
                    }
                    let delta = spacing(grid, idx, axis);

                    if let Some(nb) = upper_neighbour(idx, axis, n[axis], topology[axis]) {
                        if !grid.is_immersed(nb[0], nb[1], nb[2]) {
                            let delta_nb = spacing(grid, nb, axis);
                            let mut flux = 0.0;

                            if let Some(vel) = velocities {
                                let face_velocity = 0.5 * (vel[axis][idx] + vel[axis][nb]);
                                let upwind = if face_velocity > 0.0 { c[idx] } else { c[nb] };
                                flux += face_velocity * upwind;
                            }
                            flux -= kappa * (c[nb] - c[idx]) / (0.5 * (delta + delta_nb));

                            g[idx] -= flux / delta;
                            g[nb] += flux / delta_nb;
                        }
                    }

                    if topology[axis] != Topology::Bounded {
                        continue;
                    }

                    if idx[axis] == 0 {
                        let bc = bcs.get(name, SIDES[axis][0]);
                        g[idx] += boundary_flux(bc, kappa, c[idx], delta, false) / delta;
                    }
                    if idx[axis] == n[axis] - 1 {
                        let side = SIDES[axis][1];
                        let mut flux = boundary_flux(bcs.get(name, side), kappa, c[idx], delta, true);
                        if side == Side::Top {
                            flux += surface_flux;
                        }
                        g[idx] -= flux / delta;
                    }
                }
            }
        }
    }

    g
}

/// Linear free surface tendency, -div of the depth-integrated horizontal flow
fn free_surface_tendency(grid: &Grid, u: &Array3<f64>, v: &Array3<f64>) -> Array2<f64> {
    let (nx, ny, nz) = grid.size();
    let (tx, ty, _) = grid.topology();

    let mut transport_u = Array2::<f64>::zeros((nx, ny));
    let mut transport_v = Array2::<f64>::zeros((nx, ny));
    for i in 0..nx {
        for j in 0..ny {
            for k in 0..nz {
                if !grid.is_immersed(i, j, k) {
                    transport_u[[i, j]] += u[[i, j, k]] * grid.spacing_z(k);
                    transport_v[[i, j]] += v[[i, j, k]] * grid.spacing_z(k);
                }
            }
        }
    }

    let mut deta = Array2::<f64>::zeros((nx, ny));
    for (axis, transport, topology, n) in [(0, &transport_u, tx, nx), (1, &transport_v, ty, ny)].iter() {
        if *topology == Topology::Flat {
            continue;
        }
        for i in 0..nx {
            for j in 0..ny {
                let idx = [i, j, 0];
                if let Some(nb) = upper_neighbour(idx, *axis, *n, *topology) {
                    let (a, b) = ([i, j], [nb[0], nb[1]]);
                    let flux = 0.5 * (transport[a] + transport[b]);
                    deta[a] -= flux / spacing(grid, idx, *axis);
                    deta[b] += flux / spacing(grid, nb, *axis);
                }
            }
        }
    }

    deta
}
