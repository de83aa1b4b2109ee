use {
    super::{wizard::advective_cfl, Clock},
    crate::{
        error::{Error, Result},
        model::Model,
    },
    log::info,
    std::time::Duration,
};

/// Everything a callback may inspect, passed explicitly at each invocation
pub struct CallbackContext<'a> {
    pub clock: &'a Clock,
    pub model: &'a Model,
    /// Time step most recently taken
    pub dt: f64,
    /// Wall-clock time elapsed since the current run started
    pub wall_time: Duration,
    pub stepper: &'a str,
}

/// Work run synchronously after a completed time step
pub trait Callback {
    fn call(&mut self, ctx: &CallbackContext<'_>) -> Result<()>;
}

impl<F> Callback for F
where
    F: FnMut(&CallbackContext<'_>) -> Result<()>,
{
    fn call(&mut self, ctx: &CallbackContext<'_>) -> Result<()> {
        self(ctx)
    }
}

/// Logs iteration, time, step size, wall time, CFL number and peak velocities
#[derive(Debug, Clone, Default)]
pub struct ProgressLogger {
    last_wall_time: Duration,
}

impl ProgressLogger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Callback for ProgressLogger {
    fn call(&mut self, ctx: &CallbackContext<'_>) -> Result<()> {
        let state = ctx.model.state();
        let max = |name: &str| state.max_abs(name).unwrap_or(0.0);
        let since_last = ctx.wall_time.checked_sub(self.last_wall_time).unwrap_or_default();
        self.last_wall_time = ctx.wall_time;

        info!(
            "iteration {}, t = {:.4e}, dt = {:.4e}, wall time {:.2?} (+{:.2?}), CFL = {:.3}, max |u| = ({:.3e}, {:.3e}, {:.3e})",
            ctx.clock.iteration,
            ctx.clock.time,
            ctx.dt,
            ctx.wall_time,
            since_last,
            advective_cfl(ctx.model, ctx.dt),
            max("u"),
            max("v"),
            max("w"),
        );

        Ok(())
    }
}

/// Aborts the run once any field holds a NaN or infinite value
#[derive(Debug, Clone, Copy, Default)]
pub struct NanChecker;

impl Callback for NanChecker {
    fn call(&mut self, ctx: &CallbackContext<'_>) -> Result<()> {
        match ctx.model.state().first_non_finite() {
            Some(field) => Err(Error::Diverged {
                field: field.to_owned(),
                iteration: ctx.clock.iteration,
                time: ctx.clock.time,
            }),
            None => Ok(()),
        }
    }
}
