use {
    crate::{
        error::{ConfigError, Result},
        grid::{Grid, GridConfig},
        model::{InitialCondition, Model, ModelConfig},
        output::{Indices, OutputConfig, OutputWriter},
        simulation::{
            NanChecker, ProgressLogger, Schedule, Simulation, SimulationConfig, TimeStepWizard,
        },
        stepper::TimeStepper,
        utils::read_r8_2d,
    },
    log::info,
    serde::{Deserialize, Serialize},
    std::{
        collections::BTreeMap,
        path::{Path, PathBuf},
        time::Duration,
    },
};

/// Simulation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Parameters {
    pub environment: Environment,
    pub grid: GridConfig,
    /// Immersed bottom, if any
    pub bottom: Option<BottomHeight>,
    pub model: ModelConfig,
    pub simulation: SimulationParameters,
    /// Initial values per field; unlisted fields start at zero
    pub initial_conditions: BTreeMap<String, InitialCondition>,
    pub outputs: Vec<OutputParameters>,
}

impl Default for Parameters {
    fn default() -> Self {
        let mut initial_conditions = BTreeMap::new();
        initial_conditions.insert(
            "b".to_owned(),
            InitialCondition::LinearZ {
                surface: 0.0,
                gradient: 1.0e-5,
            },
        );

        Parameters {
            environment: Environment::default(),
            grid: GridConfig::default(),
            bottom: None,
            model: ModelConfig::default(),
            simulation: SimulationParameters::default(),
            initial_conditions,
            outputs: vec![OutputParameters::default()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Environment {
    /// Directory output files are written to
    pub output_directory: PathBuf,
}

impl Default for Environment {
    fn default() -> Self {
        Environment {
            output_directory: PathBuf::from("output"),
        }
    }
}

/// Source of the bottom height in metres, one value per (x, y) column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BottomHeight {
    Constant(f64),
    /// `.r8` file holding an (Nx, Ny) array in Fortran order
    File(PathBuf),
    /// Gaussian seamount of the given height rising from a flat floor at `-depth`
    Seamount {
        depth: f64,
        height: f64,
        center: (f64, f64),
        width: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SimulationParameters {
    /// Initial time step size
    pub dt: f64,
    pub stop_time: Option<f64>,
    pub stop_iteration: Option<u64>,
    /// Wall-clock budget in seconds
    pub wall_time_limit: Option<f64>,
    /// Shorten steps to land on output times and the stop time
    pub align_time_step: bool,
    /// Iterations between progress log lines
    pub progress_interval: Option<u64>,
    /// Iterations between checks for NaN or infinite values
    pub nan_check_interval: Option<u64>,
    /// Adaptive time stepping, disabled when absent
    pub wizard: Option<TimeStepWizard>,
    /// Iterations between time step updates by the wizard
    pub wizard_interval: u64,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        SimulationParameters {
            dt: 10.0,
            stop_time: Some(3600.0),
            stop_iteration: None,
            wall_time_limit: None,
            align_time_step: true,
            progress_interval: Some(10),
            nan_check_interval: Some(100),
            wizard: None,
            wizard_interval: 10,
        }
    }
}

impl SimulationParameters {
    pub fn config(&self) -> std::result::Result<SimulationConfig, ConfigError> {
        let wall_time_limit = match self.wall_time_limit {
            Some(seconds) if !(seconds.is_finite() && seconds >= 0.0) => {
                return Err(ConfigError::OutOfRange {
                    name: "wall time limit",
                    requirement: "finite and non-negative",
                    value: seconds,
                })
            }
            Some(seconds) => Some(Duration::try_from_secs_f64(seconds).map_err(|_| {
                ConfigError::OutOfRange {
                    name: "wall time limit",
                    requirement: "representable as a duration",
                    value: seconds,
                }
            })?),
            None => None,
        };

        let config = SimulationConfig {
            dt: self.dt,
            stop_time: self.stop_time,
            stop_iteration: self.stop_iteration,
            wall_time_limit,
            align_time_step: self.align_time_step,
        };
        config.validate()?;
        Ok(config)
    }
}

/// One output writer; `filename` is relative to the output directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputParameters {
    pub filename: PathBuf,
    pub fields: Vec<String>,
    pub schedule: Schedule,
    #[serde(default)]
    pub indices: Option<Indices>,
    #[serde(default = "overwrite_by_default")]
    pub overwrite_existing: bool,
}

fn overwrite_by_default() -> bool {
    OutputConfig::default().overwrite_existing
}

impl Default for OutputParameters {
    fn default() -> Self {
        OutputParameters {
            filename: PathBuf::from("snapshots.bin"),
            fields: ["u", "v", "w", "b"].iter().map(|&f| f.to_owned()).collect(),
            schedule: Schedule::TimeInterval(600.0),
            indices: None,
            overwrite_existing: true,
        }
    }
}

impl OutputParameters {
    pub fn writer<P: AsRef<Path>>(&self, output_directory: P) -> OutputWriter {
        OutputWriter::new(
            output_directory.as_ref().join(&self.filename),
            self.fields.clone(),
            self.schedule,
            OutputConfig {
                indices: self.indices,
                overwrite_existing: self.overwrite_existing,
            },
        )
    }
}

impl Parameters {
    pub fn build_grid(&self) -> Result<Grid> {
        let grid = Grid::new(&self.grid)?;

        let grid = match &self.bottom {
            None => grid,
            Some(BottomHeight::Constant(height)) => grid.with_bottom_fn(|_, _| *height)?,
            Some(BottomHeight::File(path)) => {
                let (nx, ny, _) = grid.size();
                let height = read_r8_2d(path, nx, ny)?;
                info!("Read bottom height from \"{}\"", path.display());
                grid.with_bottom(height)?
            }
            Some(BottomHeight::Seamount {
                depth,
                height,
                center: (x0, y0),
                width,
            }) => grid.with_bottom_fn(|x, y| {
                let r2 = (x - x0).powi(2) + (y - y0).powi(2);
                -depth + height * (-r2 / (2.0 * width * width)).exp()
            })?,
        };

        Ok(grid)
    }

    /// Builds the grid and model and applies the initial conditions
    pub fn build_model(&self) -> Result<Model> {
        let mut model = Model::new(self.build_grid()?, self.model.clone())?;
        for (name, condition) in &self.initial_conditions {
            model.set_initial_condition(name, condition)?;
        }
        Ok(model)
    }

    /// Assembles a complete simulation around `stepper`, with the progress
    /// logger, NaN checker, wizard and output writers the parameters request
    pub fn build_simulation<S: TimeStepper>(&self, stepper: S) -> Result<Simulation<S>> {
        let params = &self.simulation;
        let mut sim = Simulation::new(self.build_model()?, stepper, params.config()?)?;

        if let Some(n) = params.progress_interval {
            sim.add_callback("progress", Schedule::IterationInterval(n), ProgressLogger::new())?;
        }
        if let Some(n) = params.nan_check_interval {
            sim.add_callback("nan_checker", Schedule::IterationInterval(n), NanChecker)?;
        }
        if let Some(wizard) = params.wizard {
            sim.set_wizard(wizard, Schedule::IterationInterval(params.wizard_interval))?;
        }
        for output in &self.outputs {
            sim.add_output_writer(output.writer(&self.environment.output_directory))?;
        }

        Ok(sim)
    }
}
