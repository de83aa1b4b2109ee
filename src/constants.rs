/// Mean radius of the Earth in metres
pub const EARTH_RADIUS: f64 = 6_371_000.0;
/// Standard gravitational acceleration in m s^-2
pub const GRAVITY: f64 = 9.806_65;
/// Rotation rate of the Earth in rad s^-1
pub const EARTH_ROTATION_RATE: f64 = 7.292_115e-5;

/// Reference seawater density in kg m^-3
pub const REFERENCE_DENSITY: f64 = 1025.0;
/// Specific heat capacity of seawater in J kg^-1 K^-1
pub const HEAT_CAPACITY: f64 = 3991.0;

pub const DEG_TO_RAD: f64 = core::f64::consts::PI / 180.0;

/// Relative tolerance used when matching clock times against schedule times
pub const TIME_TOLERANCE: f64 = 1.0e-9;

/// Names reserved for the prognostic velocity components and free surface
pub const VELOCITY_NAMES: [&str; 3] = ["u", "v", "w"];
pub const FREE_SURFACE_NAME: &str = "eta";
