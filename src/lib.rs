//! Track Rally - simulation core of an arcade driving game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (track geometry, vehicle integrator, race progress)
//! - `settings`: Data-driven tuning, loadable from JSON
//!
//! Rendering, audio, camera and input devices live outside this crate. They
//! read snapshots from [`sim::Simulation`] and feed it a [`sim::TickInput`].

pub mod settings;
pub mod sim;

pub use settings::Settings;
pub use sim::{GameEvent, Simulation, TickInput};

use glam::Vec3;

/// Default tuning constants
pub mod consts {
    /// Largest timestep a single tick will integrate (seconds)
    pub const MAX_DT: f32 = 0.033;
    /// Fixed timestep of the headless demo loop
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Undrained game events kept before the oldest are dropped
    pub const MAX_QUEUED_EVENTS: usize = 256;
    /// Demo gives up after this many simulated seconds
    pub const DEMO_TIMEOUT_SECS: f32 = 180.0;

    /// Track outline: rounded rectangle half extents and corner radius
    pub const TRACK_HALF_W: f32 = 36.0;
    pub const TRACK_HALF_H: f32 = 24.0;
    pub const TRACK_CORNER_R: f32 = 11.0;
    pub const TRACK_SEGMENTS_PER_CORNER: usize = 18;
    /// Catmull-Rom tension used for the centerline
    pub const TRACK_TENSION: f32 = 0.08;
    /// Full drivable width of the ribbon
    pub const TRACK_WIDTH: f32 = 7.5;
    /// Nearest-point sample table size
    pub const TRACK_SAMPLES: usize = 320;
    /// Ribbon strip resolution (renderer data only)
    pub const TRACK_RIBBON_STEPS: usize = 900;
    /// Fraction of the half width counted as on-track
    pub const ON_TRACK_FACTOR: f32 = 0.55;
    /// Parameter step for finite-difference tangents
    pub const TANGENT_EPSILON: f32 = 1.0e-3;

    /// Vehicle defaults
    pub const MAX_SPEED: f32 = 26.0;
    pub const ACCEL: f32 = 28.0;
    pub const BRAKE: f32 = 36.0;
    pub const TURN_RATE: f32 = 2.4;
    pub const DRAG: f32 = 2.2;
    pub const OFF_TRACK_DRAG: f32 = 5.2;
    /// Speed at which steering reaches full authority
    pub const STEER_FULL_SPEED: f32 = 10.0;
    pub const CAR_RADIUS: f32 = 0.95;
    /// Velocity kick per unit of penetration on obstacle contact
    pub const COLLISION_BOUNCE: f32 = 8.0;
    /// Obstacle displacement per unit of penetration
    pub const OBSTACLE_NUDGE: f32 = 0.3;
    /// World is clamped to +/- this extent on X and Z
    pub const WORLD_HALF_EXTENT: f32 = 180.0;

    /// Obstacle defaults (traffic cones)
    pub const OBSTACLE_RADIUS: f32 = 0.55;
    pub const OBSTACLE_HEIGHT: f32 = 0.6;

    /// Race defaults
    pub const LAPS_TOTAL: u32 = 3;
    pub const START_RADIUS: f32 = 4.0;
    pub const CHECKPOINT_RADIUS: f32 = 4.2;
    /// Distance the car starts behind the start line
    pub const START_SETBACK: f32 = 2.6;
    pub const LAP_BASE_SCORE: u64 = 250;
    /// Bonus = round(numerator / max(floor, lap_time))
    pub const LAP_BONUS_NUMERATOR: f64 = 2400.0;
    pub const LAP_BONUS_FLOOR_SECS: f64 = 8.0;
    pub const COLLISION_PENALTY: u64 = 25;

    /// HUD speed readout multiplier
    pub const SPEED_READOUT_SCALE: f32 = 6.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Project a point onto the ground plane (Y = 0)
#[inline]
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Planar (X, Z) distance between two points
#[inline]
pub fn dist_xz(a: Vec3, b: Vec3) -> f32 {
    (a.x - b.x).hypot(a.z - b.z)
}

/// Unit forward vector for a heading angle (heading 0 faces +Z)
#[inline]
pub fn heading_forward(heading: f32) -> Vec3 {
    Vec3::new(heading.sin(), 0.0, heading.cos())
}

/// Heading angle that faces along `dir` in the ground plane
#[inline]
pub fn heading_from_direction(dir: Vec3) -> f32 {
    dir.x.atan2(dir.z)
}
