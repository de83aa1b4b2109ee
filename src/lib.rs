pub mod constants;
pub mod error;
pub mod utils;

pub mod grid;
pub mod model;
pub mod output;
pub mod simulation;
pub mod stepper;

pub mod parameters;
