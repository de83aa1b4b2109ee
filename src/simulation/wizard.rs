//! Adaptive time step control from advective and diffusive stability limits.

use {
    crate::{
        error::ConfigError,
        grid::Topology,
        model::{Closure, Model},
    },
    serde::{Deserialize, Serialize},
};

/// Adjusts the time step so the CFL number stays near a target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TimeStepWizard {
    /// Target advective CFL number
    pub cfl: f64,
    /// Target diffusive CFL number, if diffusion should limit the step
    pub diffusive_cfl: Option<f64>,
    /// Largest factor by which the step may grow per update
    pub max_change: f64,
    /// Smallest factor by which the step may shrink per update
    pub min_change: f64,
    pub max_dt: f64,
    /// Defaults to a millionth of the initial time step when unset
    pub min_dt: Option<f64>,
}

impl Default for TimeStepWizard {
    fn default() -> Self {
        TimeStepWizard {
            cfl: 0.2,
            diffusive_cfl: None,
            max_change: 1.1,
            min_change: 0.5,
            max_dt: f64::INFINITY,
            min_dt: None,
        }
    }
}

impl TimeStepWizard {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let check = |name, value: f64, ok: bool, requirement| {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::OutOfRange {
                    name,
                    requirement,
                    value,
                })
            }
        };

        check("cfl", self.cfl, self.cfl > 0.0 && self.cfl.is_finite(), "finite and positive")?;
        if let Some(c) = self.diffusive_cfl {
            check("diffusive cfl", c, c > 0.0 && c.is_finite(), "finite and positive")?;
        }
        check("max change", self.max_change, self.max_change >= 1.0, "at least 1")?;
        check(
            "min change",
            self.min_change,
            self.min_change > 0.0 && self.min_change <= 1.0,
            "within (0, 1]",
        )?;
        check("max dt", self.max_dt, self.max_dt > 0.0, "positive")?;
        if let Some(min_dt) = self.min_dt {
            check(
                "min dt",
                min_dt,
                min_dt > 0.0 && min_dt <= self.max_dt,
                "positive and no larger than max dt",
            )?;
        }

        Ok(())
    }

    /// New time step given the current one and the model state
    pub fn new_dt(&self, model: &Model, dt: f64, min_dt: f64) -> f64 {
        let advective = advective_cfl(model, 1.0);
        let mut limit = self.cfl / advective;

        if let Some(target) = self.diffusive_cfl {
            limit = limit.min(target / diffusive_cfl(model, 1.0));
        }

        let new = if limit.is_finite() { limit } else { dt };

        new.min(self.max_change * dt)
            .max(self.min_change * dt)
            .min(self.max_dt)
            .max(min_dt)
    }
}

/// Largest advective CFL number over fluid cells: `dt * (|u|/dx + |v|/dy + |w|/dz)`
pub fn advective_cfl(model: &Model, dt: f64) -> f64 {
    let grid = model.grid();
    let state = model.state();
    let (nx, ny, nz) = grid.size();
    let (tx, ty, tz) = grid.topology();

    let (u, v, w) = match (state.get("u"), state.get("v"), state.get("w")) {
        (Some(u), Some(v), Some(w)) => (u, v, w),
        _ => return 0.0,
    };

    let mut max = 0.0_f64;
    for i in 0..nx {
        for j in 0..ny {
            for k in 0..nz {
                if grid.is_immersed(i, j, k) {
                    continue;
                }
                let mut rate = 0.0;
                if tx != Topology::Flat {
                    rate += u[[i, j, k]].abs() / grid.spacing_x(i, j);
                }
                if ty != Topology::Flat {
                    rate += v[[i, j, k]].abs() / grid.spacing_y(j);
                }
                if tz != Topology::Flat {
                    rate += w[[i, j, k]].abs() / grid.spacing_z(k);
                }
                max = max.max(rate);
            }
        }
    }

    dt * max
}

/// Largest diffusive CFL number: `dt * kappa * (1/dx^2 + 1/dy^2 + 1/dz^2)`
pub fn diffusive_cfl(model: &Model, dt: f64) -> f64 {
    let kappa = match model.config().closure {
        Some(Closure::ScalarDiffusivity {
            viscosity,
            diffusivity,
        }) => viscosity.max(diffusivity),
        Some(Closure::GentMcWilliams { diffusivity }) => diffusivity,
        _ => 0.0,
    };
    if kappa == 0.0 {
        return 0.0;
    }

    let grid = model.grid();
    let (nx, ny, nz) = grid.size();
    let (tx, ty, tz) = grid.topology();

    let mut max = 0.0_f64;
    for i in 0..nx {
        for j in 0..ny {
            for k in 0..nz {
                let mut rate = 0.0;
                if tx != Topology::Flat {
                    rate += grid.spacing_x(i, j).powi(-2);
                }
                if ty != Topology::Flat {
                    rate += grid.spacing_y(j).powi(-2);
                }
                if tz != Topology::Flat {
                    rate += grid.spacing_z(k).powi(-2);
                }
                max = max.max(rate);
            }
        }
    }

    dt * kappa * max
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{
            constants::{DEG_TO_RAD, EARTH_RADIUS},
            grid::{Geometry, Grid, GridConfig},
            model::{Equations, FreeSurface, ModelConfig},
        },
        approx::assert_abs_diff_eq,
    };

    fn model() -> Model {
        let grid = Grid::new(&GridConfig {
            size: (4, 4, 2),
            x: (0.0, 4.0),
            y: (0.0, 8.0),
            z: crate::grid::VerticalCoordinate::Uniform {
                extent: (-1.0, 0.0),
            },
            ..GridConfig::default()
        })
        .unwrap();
        Model::new(grid, ModelConfig::default()).unwrap()
    }

    #[test]
    fn cfl_sums_directions() {
        let mut model = model();
        model.set("u", |_, _, _| 0.5).unwrap();
        model.set("v", |_, _, _| -1.0).unwrap();
        model.set("w", |_, _, _| 0.1).unwrap();

        // 0.5/1 + 1/2 + 0.1/0.5
        assert_abs_diff_eq!(advective_cfl(&model, 2.0), 2.0 * 1.2, epsilon = 1.0E-12);
    }

    #[test]
    fn cfl_on_sphere_peaks_at_high_latitude() {
        let grid = Grid::new(&GridConfig {
            geometry: Geometry::LatitudeLongitude {
                radius: EARTH_RADIUS,
            },
            size: (36, 4, 1),
            topology: (Topology::Periodic, Topology::Bounded, Topology::Bounded),
            x: (0.0, 360.0),
            y: (-60.0, 60.0),
            z: crate::grid::VerticalCoordinate::Uniform {
                extent: (-100.0, 0.0),
            },
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
        model.set("u", |_, _, _| 10.0).unwrap();

        // rows centred at +-45 degrees have the narrowest cells
        let dx = EARTH_RADIUS * (45.0 * DEG_TO_RAD).cos() * 10.0 * DEG_TO_RAD;
        let expected = 3600.0 * 10.0 / dx;
        assert_abs_diff_eq!(advective_cfl(&model, 3600.0), expected, epsilon = 1.0E-12 * expected);

        let wizard = TimeStepWizard {
            cfl: 0.5,
            max_change: 100.0,
            ..TimeStepWizard::default()
        };
        assert_abs_diff_eq!(
            wizard.new_dt(&model, 3600.0, 1.0),
            0.5 * dx / 10.0,
            epsilon = 1.0E-6
        );
    }

    #[test]
    fn wizard_limits_growth_and_shrinkage() {
        let mut model = model();
        let wizard = TimeStepWizard::default();

        // still water keeps the current step
        assert_abs_diff_eq!(wizard.new_dt(&model, 1.0, 1.0E-6), 1.0);

        model.set("u", |_, _, _| 1.0e-3).unwrap();
        // limit 200 but growth capped at 10 %
        assert_abs_diff_eq!(wizard.new_dt(&model, 1.0, 1.0E-6), 1.1);

        model.set("u", |_, _, _| 10.0).unwrap();
        // limit 0.02 but shrinkage capped at half
        assert_abs_diff_eq!(wizard.new_dt(&model, 1.0, 1.0E-6), 0.5);
        assert_abs_diff_eq!(wizard.new_dt(&model, 0.03, 1.0E-6), 0.02, epsilon = 1.0E-15);
    }

    #[test]
    fn wizard_respects_bounds() {
        let mut model = model();
        model.set("u", |_, _, _| 1.0e-3).unwrap();
        let wizard = TimeStepWizard {
            max_dt: 1.05,
            ..TimeStepWizard::default()
        };
        assert_abs_diff_eq!(wizard.new_dt(&model, 1.0, 1.0E-6), 1.05);

        model.set("u", |_, _, _| 1.0e6).unwrap();
        assert_abs_diff_eq!(wizard.new_dt(&model, 1.0E-6, 1.0E-6), 1.0E-6);
    }

    #[test]
    fn diffusive_limit() {
        let grid = Grid::new(&GridConfig {
            size: (2, 2, 2),
            x: (0.0, 2.0),
            y: (0.0, 2.0),
            z: crate::grid::VerticalCoordinate::Uniform {
                extent: (-2.0, 0.0),
            },
            ..GridConfig::default()
        })
        .unwrap();
        let model = Model::new(
            grid,
            ModelConfig {
                closure: Some(Closure::ScalarDiffusivity {
                    viscosity: 0.1,
                    diffusivity: 0.01,
                }),
                ..ModelConfig::default()
            },
        )
        .unwrap();

        assert_abs_diff_eq!(diffusive_cfl(&model, 1.0), 0.3, epsilon = 1.0E-12);

        let wizard = TimeStepWizard {
            diffusive_cfl: Some(0.15),
            max_change: 10.0,
            ..TimeStepWizard::default()
        };
        assert_abs_diff_eq!(wizard.new_dt(&model, 1.0, 1.0E-6), 0.5, epsilon = 1.0E-12);
    }

    #[test]
    fn validation() {
        assert!(TimeStepWizard::default().validate().is_ok());
        assert!(TimeStepWizard {
            cfl: 0.0,
            ..TimeStepWizard::default()
        }
        .validate()
        .is_err());
        assert!(TimeStepWizard {
            min_change: 1.5,
            ..TimeStepWizard::default()
        }
        .validate()
        .is_err());
        assert!(TimeStepWizard {
            min_dt: Some(2.0),
            max_dt: 1.0,
            ..TimeStepWizard::default()
        }
        .validate()
        .is_err());
    }
}
