//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-supplied timestep only, no clocks
//! - Seeded RNG only
//! - Stable iteration order (obstacles by index)
//! - No rendering, audio or input-device dependencies

pub mod autopilot;
pub mod curve;
pub mod geometry;
pub mod obstacles;
pub mod race;
pub mod state;
pub mod tick;
pub mod vehicle;

pub use autopilot::Autopilot;
pub use curve::{TrackCurve, rounded_rect_points, wrap_param};
pub use geometry::{Bounds, RibbonEdge, Surface, TrackGeometry, TrackSample};
pub use obstacles::{Obstacle, ObstacleField, ObstaclePlacement};
pub use race::{LapResult, RacePhase, RaceProgress, RaceSnapshot, RaceUpdate, lap_bonus};
pub use state::{GameEvent, Simulation};
pub use tick::{Contact, TickInput, integrate};
pub use vehicle::{StartPose, VehicleSnapshot, VehicleState};
