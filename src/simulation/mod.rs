//! The time-stepping driver.
//!
//! A [`Simulation`] owns a [`Model`] and a [`TimeStepper`] and advances the
//! model until a stop criterion is met, invoking callbacks and output writers
//! on their schedules after each step.

mod callbacks;
mod schedule;
mod wizard;


pub use {
    callbacks::{Callback, CallbackContext, NanChecker, ProgressLogger},
    schedule::Schedule,
    wizard::{advective_cfl, diffusive_cfl, TimeStepWizard},
};

use {
    crate::{
        constants::TIME_TOLERANCE,
        error::{ConfigError, Result},
        model::Model,
        output::OutputWriter,
        stepper::TimeStepper,
    },
    log::{debug, info},
    schedule::Scheduled,
    std::{
        fmt,
        time::{Duration, Instant},
    },
};

/// Fraction of the initial time step used as the wizard's floor when none is given
const DEFAULT_MIN_DT_FRACTION: f64 = 1.0e-6;

/// Iteration count and model time
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Clock {
    pub iteration: u64,
    pub time: f64,
    /// Size of the most recent step, zero before the first
    pub last_dt: f64,
}

impl Clock {
    fn tick(&mut self, dt: f64, snap_to: Option<f64>) {
        self.iteration += 1;
        self.time = match snap_to {
            Some(target) => target,
            None => self.time + dt,
        };
        self.last_dt = dt;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Stepping,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    StopTime,
    StopIteration,
    WallTime,
    /// A stepper, callback or writer returned an error
    Aborted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::StopTime => "stop time reached",
            StopReason::StopIteration => "stop iteration reached",
            StopReason::WallTime => "wall time limit exceeded",
            StopReason::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Outcome of a call to [`Simulation::run`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// Iterations taken during this call
    pub iterations: u64,
    pub final_time: f64,
    pub wall_time: Duration,
    pub reason: StopReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Initial time step
    pub dt: f64,
    pub stop_time: Option<f64>,
    pub stop_iteration: Option<u64>,
    /// Wall-clock budget for a single call to `run`
    pub wall_time_limit: Option<Duration>,
    /// Shorten steps to land exactly on time-scheduled actuations and the stop time
    pub align_time_step: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            dt: 1.0,
            stop_time: None,
            stop_iteration: None,
            wall_time_limit: None,
            align_time_step: true,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "dt",
                requirement: "finite and positive",
                value: self.dt,
            });
        }
        if let Some(t) = self.stop_time {
            validate_stop_time(t)?;
        }
        if self.stop_time.is_none() && self.stop_iteration.is_none() && self.wall_time_limit.is_none() {
            return Err(ConfigError::NoStopCriterion);
        }
        Ok(())
    }
}

fn validate_stop_time(t: f64) -> std::result::Result<(), ConfigError> {
    if t.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name: "stop time",
            requirement: "finite",
            value: t,
        })
    }
}

struct CallbackEntry {
    name: String,
    scheduled: Scheduled,
    initialized: bool,
    callback: Box<dyn Callback>,
}

struct WriterEntry {
    scheduled: Scheduled,
    initialized: bool,
    writer: OutputWriter,
}

struct WizardEntry {
    scheduled: Scheduled,
    initialized: bool,
    wizard: TimeStepWizard,
    min_dt: f64,
}

pub struct Simulation<S: TimeStepper> {
    model: Model,
    stepper: S,
    config: SimulationConfig,
    clock: Clock,
    dt: f64,
    state: RunState,
    last_reason: Option<StopReason>,
    callbacks: Vec<CallbackEntry>,
    writers: Vec<WriterEntry>,
    wizard: Option<WizardEntry>,
}

impl<S: TimeStepper> Simulation<S> {
    pub fn new(model: Model, stepper: S, config: SimulationConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            model,
            stepper,
            dt: config.dt,
            config,
            clock: Clock::default(),
            state: RunState::Idle,
            last_reason: None,
            callbacks: vec![],
            writers: vec![],
            wizard: None,
        })
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Mutable model access, for setting initial conditions between runs
    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    pub fn stepper(&self) -> &S {
        &self.stepper
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Time step that will be attempted next, before alignment
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Registers a callback; callbacks run in registration order
    pub fn add_callback<C: Callback + 'static>(
        &mut self,
        name: &str,
        schedule: Schedule,
        callback: C,
    ) -> std::result::Result<(), ConfigError> {
        self.callbacks.push(CallbackEntry {
            name: name.to_owned(),
            scheduled: Scheduled::new(schedule)?,
            initialized: false,
            callback: Box::new(callback),
        });
        Ok(())
    }

    pub fn callback_names(&self) -> impl Iterator<Item = &str> {
        self.callbacks.iter().map(|c| c.name.as_str())
    }

    /// Checks the writer's fields and indices against the model and registers it
    pub fn add_output_writer(&mut self, writer: OutputWriter) -> std::result::Result<(), ConfigError> {
        writer.validate(&self.model)?;
        self.writers.push(WriterEntry {
            scheduled: Scheduled::new(writer.schedule())?,
            initialized: false,
            writer,
        });
        Ok(())
    }

    pub fn output_writers(&self) -> impl Iterator<Item = &OutputWriter> {
        self.writers.iter().map(|w| &w.writer)
    }

    /// Attaches an adaptive time step controller, replacing any existing one
    pub fn set_wizard(&mut self, wizard: TimeStepWizard, schedule: Schedule) -> std::result::Result<(), ConfigError> {
        wizard.validate()?;
        let min_dt = wizard.min_dt.unwrap_or(DEFAULT_MIN_DT_FRACTION * self.config.dt);
        self.wizard = Some(WizardEntry {
            scheduled: Scheduled::new(schedule)?,
            initialized: false,
            wizard,
            min_dt,
        });
        Ok(())
    }

    /// Changes the stop time; a terminated simulation becomes runnable again
    pub fn set_stop_time(&mut self, stop_time: f64) -> std::result::Result<(), ConfigError> {
        validate_stop_time(stop_time)?;
        self.config.stop_time = Some(stop_time);
        self.rearm();
        Ok(())
    }

    pub fn set_stop_iteration(&mut self, stop_iteration: u64) {
        self.config.stop_iteration = Some(stop_iteration);
        self.rearm();
    }

    /// Changes the wall-clock budget of each call to `run`; a terminated
    /// simulation becomes runnable again
    pub fn set_wall_time_limit(
        &mut self,
        limit: Option<Duration>,
    ) -> std::result::Result<(), ConfigError> {
        if limit.is_none() && self.config.stop_time.is_none() && self.config.stop_iteration.is_none() {
            return Err(ConfigError::NoStopCriterion);
        }
        self.config.wall_time_limit = limit;
        self.rearm();
        Ok(())
    }

    fn rearm(&mut self) {
        if self.state == RunState::Terminated {
            self.state = RunState::Idle;
        }
    }

    /// Steps until a stop criterion is met. Returns immediately if the
    /// simulation has already terminated.
    pub fn run(&mut self) -> Result<RunSummary> {
        let start = Instant::now();

        if self.state == RunState::Terminated {
            debug!("simulation already terminated, nothing to run");
            return Ok(RunSummary {
                iterations: 0,
                final_time: self.clock.time,
                wall_time: start.elapsed(),
                reason: self.last_reason.unwrap_or(StopReason::Aborted),
            });
        }

        self.state = RunState::Stepping;
        let first_iteration = self.clock.iteration;

        info!(
            "running {} from iteration {}, t = {}, dt = {}",
            self.stepper.name(),
            self.clock.iteration,
            self.clock.time,
            self.dt
        );

        let result = self.run_loop(start);
        self.state = RunState::Terminated;
        self.last_reason = Some(*result.as_ref().unwrap_or(&StopReason::Aborted));

        let reason = result?;
        let summary = RunSummary {
            iterations: self.clock.iteration - first_iteration,
            final_time: self.clock.time,
            wall_time: start.elapsed(),
            reason,
        };

        info!(
            "{} after {} iterations: iteration {}, t = {}, wall time {:.2?}",
            reason, summary.iterations, self.clock.iteration, self.clock.time, summary.wall_time
        );

        Ok(summary)
    }

    fn run_loop(&mut self, start: Instant) -> Result<StopReason> {
        self.initialize(start)?;

        loop {
            if let Some(reason) = self.stop_reason(start.elapsed()) {
                return Ok(reason);
            }
            self.time_step(start)?;
        }
    }

    /// Fires schedules due at the start of the run for entries that have not yet run
    fn initialize(&mut self, start: Instant) -> Result<()> {
        if let Some(entry) = &mut self.wizard {
            if !entry.initialized {
                entry.scheduled.initialize(&self.clock);
                entry.initialized = true;
            }
        }

        let ctx = CallbackContext {
            clock: &self.clock,
            model: &self.model,
            dt: self.dt,
            wall_time: start.elapsed(),
            stepper: self.stepper.name(),
        };
        for entry in &mut self.callbacks {
            if !entry.initialized {
                entry.initialized = true;
                if entry.scheduled.initialize(ctx.clock) {
                    entry.callback.call(&ctx)?;
                }
            }
        }

        for entry in &mut self.writers {
            if !entry.initialized {
                entry.initialized = true;
                entry.scheduled.initialize(&self.clock);
                if entry.writer.records_written() == 0 {
                    entry.writer.write(&self.model, &self.clock)?;
                }
            }
        }

        Ok(())
    }

    fn stop_reason(&self, elapsed: Duration) -> Option<StopReason> {
        if let Some(n) = self.config.stop_iteration {
            if self.clock.iteration >= n {
                return Some(StopReason::StopIteration);
            }
        }
        if let Some(t) = self.config.stop_time {
            if self.clock.time >= t - TIME_TOLERANCE * self.dt {
                return Some(StopReason::StopTime);
            }
        }
        if let Some(limit) = self.config.wall_time_limit {
            if elapsed >= limit {
                return Some(StopReason::WallTime);
            }
        }
        None
    }

    fn time_step(&mut self, start: Instant) -> Result<()> {
        if let Some(entry) = &mut self.wizard {
            if entry.scheduled.fires(&self.clock) {
                let dt = entry.wizard.new_dt(&self.model, self.dt, entry.min_dt);
                if dt != self.dt {
                    debug!("wizard changed dt from {} to {}", self.dt, dt);
                }
                self.dt = dt;
            }
        }

        let (dt, snap_to) = if self.config.align_time_step {
            self.aligned_dt()
        } else {
            (self.dt, None)
        };

        self.stepper.step(&mut self.model, self.clock.time, dt)?;
        self.clock.tick(dt, snap_to);

        let ctx = CallbackContext {
            clock: &self.clock,
            model: &self.model,
            dt,
            wall_time: start.elapsed(),
            stepper: self.stepper.name(),
        };
        for entry in &mut self.callbacks {
            if entry.scheduled.fires(ctx.clock) {
                entry.callback.call(&ctx)?;
            }
        }

        for entry in &mut self.writers {
            if entry.scheduled.fires(&self.clock) {
                entry.writer.write(&self.model, &self.clock)?;
            }
        }

        Ok(())
    }

    /// Step size reaching the nearest time-scheduled actuation or the stop
    /// time, if the nominal step would reach or pass it, with the time to snap to
    fn aligned_dt(&self) -> (f64, Option<f64>) {
        let time = self.clock.time;
        let target = self
            .callbacks
            .iter()
            .map(|c| &c.scheduled)
            .chain(self.writers.iter().map(|w| &w.scheduled))
            .filter_map(Scheduled::next_actuation_time)
            .chain(self.config.stop_time)
            .filter(|&t| t > time)
            .fold(f64::INFINITY, f64::min);

        if time + self.dt >= target - TIME_TOLERANCE * self.dt {
            debug!("aligning step to t = {}", target);
            (target - time, Some(target))
        } else {
            (self.dt, None)
        }
    }
}
