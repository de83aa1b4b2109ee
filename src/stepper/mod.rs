//! The seam between the driver and a numerical engine.
//!
//! The driver never touches field values itself; each step is delegated to a
//! [`TimeStepper`]. [`UpwindStepper`] is a small built-in engine used by the
//! command line tool and the tests.

mod upwind;

pub use upwind::UpwindStepper;

use crate::{error::Result, model::Model};

/// Advances a model's state by one time step
pub trait TimeStepper {
    fn name(&self) -> &str;

    /// Mutates the model state from time `t` to `t + dt`
    fn step(&mut self, model: &mut Model, t: f64, dt: f64) -> Result<()>;
}

impl<T: TimeStepper + ?Sized> TimeStepper for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn step(&mut self, model: &mut Model, t: f64, dt: f64) -> Result<()> {
        (**self).step(model, t, dt)
    }
}
