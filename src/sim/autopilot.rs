//! Demo driver
//!
//! Pure-pursuit on the centerline for attract mode and the headless demo.
//! It reads the same snapshots a human player's HUD would and produces the
//! same [`TickInput`] a keyboard mapping would.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::state::Simulation;
use super::tick::TickInput;
use crate::{dist_xz, heading_from_direction, normalize_angle};

/// Lateral offset under which an obstacle counts as sitting on the centerline
const CENTERED: f32 = 0.5;

/// Tuning for the demo driver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Autopilot {
    /// Distance ahead along the centerline to aim at
    pub lookahead: f32,
    /// Steer per radian of heading error
    pub steer_gain: f32,
    /// Heading error above which the driver lifts off
    pub lift_angle: f32,
    /// How far ahead obstacles are considered
    pub avoid_range: f32,
    /// Extra gap kept from an obstacle's edge
    pub avoid_margin: f32,
    /// Closer than this the driver stops aiming beside the obstacle and
    /// returns to the lookahead point
    pub pass_distance: f32,
}

impl Default for Autopilot {
    fn default() -> Self {
        Self {
            lookahead: 7.0,
            steer_gain: 3.0,
            lift_angle: 1.0,
            avoid_range: 20.0,
            avoid_margin: 0.45,
            pass_distance: 4.0,
        }
    }
}

impl Autopilot {
    /// Input for the next tick
    pub fn drive(&self, sim: &Simulation) -> TickInput {
        let car = sim.vehicle();
        let target = self.target_point(sim, car.position);

        let desired = heading_from_direction(target - car.position);
        let error = normalize_angle(desired - car.heading);
        let steer = (error * self.steer_gain).clamp(-1.0, 1.0);
        let throttle = if error.abs() > self.lift_angle { 0.3 } else { 1.0 };

        TickInput::new(steer, throttle)
    }

    /// Aim point: `lookahead` ahead on the centerline, shifted around the
    /// nearest obstacle in range
    ///
    /// While an obstacle is still more than `pass_distance` away the driver
    /// aims straight at the gap beside it, so it is lined up before arriving.
    pub fn target_point(&self, sim: &Simulation, position: Vec3) -> Vec3 {
        let geometry = sim.geometry();
        let samples = geometry.samples();
        let n = samples.len();
        if n == 0 {
            return position;
        }
        let spacing = geometry.length() / n as f32;
        // Collapsed curve: nowhere to aim
        if !(spacing > 0.0) {
            return position;
        }
        let here = nearest_index(samples.iter().map(|s| s.point), position);

        let ahead = ((self.lookahead / spacing).round() as usize).max(1);
        let aim = &samples[(here + ahead) % n];
        let curve = sim.curve();

        let car_radius = sim.settings().vehicle.car_radius;
        let range = ((self.avoid_range / spacing).round() as isize).max(1);
        // Keep dodging until the car is clear of the obstacle's tail
        let behind = ((2.0 * car_radius / spacing).round() as isize).max(1);

        // (samples ahead, lateral offset, sample index, radius) per obstacle in range
        let mut upcoming: Vec<(isize, f32, usize, f32)> = sim
            .obstacles()
            .iter()
            .filter_map(|obstacle| {
                let index = nearest_index(samples.iter().map(|s| s.point), obstacle.position);
                let gap = ((index + n - here) % n) as isize;
                let gap = if gap > n as isize / 2 { gap - n as isize } else { gap };
                if gap < -behind || gap > range {
                    return None;
                }
                let at = &samples[index];
                let lateral = (obstacle.position - at.point).dot(curve.right_at(at.t));
                Some((gap, lateral, index, obstacle.radius))
            })
            .collect();
        upcoming.sort_by_key(|&(gap, ..)| gap);

        let Some(&(gap, lateral, index, radius)) = upcoming.first() else {
            return aim.point;
        };
        let clearance = car_radius + radius + self.avoid_margin;
        // A cone sitting on the centerline gets passed on the side away
        // from whatever comes next
        let side = match upcoming.get(1) {
            Some(&(_, next, ..)) if lateral.abs() < CENTERED => next,
            _ => lateral,
        };
        let offset = if side > 0.0 {
            lateral - clearance
        } else {
            lateral + clearance
        };
        let offset = offset.clamp(-geometry.half_width(), geometry.half_width());

        let base = if gap as f32 * spacing > self.pass_distance {
            &samples[index]
        } else {
            aim
        };
        base.point + curve.right_at(base.t) * offset
    }
}

fn nearest_index(points: impl Iterator<Item = Vec3>, p: Vec3) -> usize {
    points
        .enumerate()
        .map(|(i, q)| (i, dist_xz(p, q)))
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    #[test]
    fn test_aims_ahead_along_track() {
        let mut settings = Settings::default();
        settings.obstacles.layout.clear();
        let sim = Simulation::new(settings);
        let car = sim.vehicle();

        let target = Autopilot::default().target_point(&sim, car.position);
        let along = (target - car.position).dot(crate::heading_forward(car.heading));
        assert!(along > 5.0);

        let input = Autopilot::default().drive(&sim);
        assert_eq!(input.throttle, 1.0);
        assert!(input.steer.abs() < 0.5);
    }

    #[test]
    fn test_steers_around_obstacle_ahead() {
        let mut settings = Settings::default();
        settings.obstacles.layout = vec![(0.03, 0.0)];
        let sim = Simulation::new(settings);
        let car = sim.vehicle();
        let cone = sim.obstacles().get(0).unwrap().position;

        let target = Autopilot::default().target_point(&sim, car.position);
        let t = sim.geometry().closest_parameter(target);
        let centerline = sim.curve().point_at(t);
        // Aim point sits a full car width plus cone radius off the cone's line
        assert!(dist_xz(target, centerline) > 1.5);
        assert!(dist_xz(target, cone) > 1.5);
    }

    #[test]
    fn test_collapsed_curve_does_not_panic() {
        let curve = crate::sim::TrackCurve::new(vec![Vec3::new(5.0, 0.0, 5.0); 4], 0.08);
        let sim = Simulation::with_curve(Settings::default(), curve);
        let car = sim.vehicle();

        assert_eq!(Autopilot::default().target_point(&sim, car.position), car.position);
        let input = Autopilot::default().drive(&sim);
        assert!(input.steer.is_finite() && input.throttle.is_finite());
    }
}
