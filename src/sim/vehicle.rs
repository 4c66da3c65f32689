//! Vehicle state
//!
//! Plain kinematic state of the car. Only the integrator mutates it during a
//! tick; reset puts it back on the start pose.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::curve::TrackCurve;
use crate::consts::SPEED_READOUT_SCALE;
use crate::{flatten, heading_forward, heading_from_direction};

/// Where and which way the car starts a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartPose {
    pub position: Vec3,
    pub heading: f32,
}

impl StartPose {
    /// Pose `setback` units behind the curve point at `t`, facing along the curve
    pub fn behind_line(curve: &TrackCurve, t: f32, setback: f32) -> Self {
        let tangent = curve.tangent_at(t);
        Self {
            position: flatten(curve.point_at(t) - tangent * setback),
            heading: heading_from_direction(tangent),
        }
    }
}

/// Car position, velocity and heading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub position: Vec3,
    /// Always on the ground plane (y = 0)
    pub velocity: Vec3,
    /// Radians, 0 faces +Z
    pub heading: f32,
}

impl VehicleState {
    pub fn at_pose(pose: StartPose) -> Self {
        Self {
            position: pose.position,
            velocity: Vec3::ZERO,
            heading: pose.heading,
        }
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Unit vector the car is pointing along
    pub fn forward(&self) -> Vec3 {
        heading_forward(self.heading)
    }

    pub fn snapshot(&self) -> VehicleSnapshot {
        VehicleSnapshot {
            position: self.position,
            heading: self.heading,
            speed: self.speed(),
        }
    }
}

/// Read-only view for rendering and camera framing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub position: Vec3,
    pub heading: f32,
    pub speed: f32,
}

impl VehicleSnapshot {
    /// Speed figure shown on the HUD
    pub fn speed_readout(&self) -> u32 {
        (self.speed * SPEED_READOUT_SCALE).round() as u32
    }
}
