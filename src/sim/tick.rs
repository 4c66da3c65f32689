//! Per-tick vehicle integrator
//!
//! Advances the car by one timestep. The steps run in a fixed order and
//! each one sees the velocity/position left by the one before it:
//! forces, steering, speed cap, drag, position, obstacle contacts, world
//! bounds.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::geometry::Surface;
use super::obstacles::ObstacleField;
use super::vehicle::VehicleState;
use crate::settings::VehicleSettings;
use crate::{dist_xz, flatten};

/// Below this separation the push direction is taken from the heading
const MIN_PUSH_LEN: f32 = 1.0e-4;

/// Driver input for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TickInput {
    /// Positive turns left (increases heading), in [-1, 1]
    pub steer: f32,
    /// Positive accelerates, negative brakes, in [-1, 1]
    pub throttle: f32,
}

impl TickInput {
    pub fn new(steer: f32, throttle: f32) -> Self {
        Self { steer, throttle }
    }

    /// Clamp both axes to [-1, 1]; NaN reads as released
    pub fn sanitized(&self) -> Self {
        debug_assert!(!self.steer.is_nan(), "steer is NaN");
        debug_assert!(!self.throttle.is_nan(), "throttle is NaN");
        let axis = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) };
        Self {
            steer: axis(self.steer),
            throttle: axis(self.throttle),
        }
    }
}

/// One resolved car/obstacle overlap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Obstacle index in the field
    pub obstacle: usize,
    /// Unit push direction, from obstacle toward car
    pub normal: Vec3,
    /// Overlap removed from the car's position
    pub depth: f32,
}

/// Advance `vehicle` by `dt` and resolve obstacle overlaps
///
/// Returns the contacts in obstacle order; the caller books hits and score.
pub fn integrate<S: Surface + ?Sized>(
    vehicle: &mut VehicleState,
    obstacles: &mut ObstacleField,
    surface: &S,
    params: &VehicleSettings,
    input: &TickInput,
    dt: f32,
) -> Vec<Contact> {
    let input = input.sanitized();

    // Forces
    let forward = vehicle.forward();
    if input.throttle > 0.0 {
        vehicle.velocity += forward * params.accel * input.throttle * dt;
    } else if input.throttle < 0.0 {
        vehicle.velocity += forward * params.brake * input.throttle * dt;
    }

    // Steering authority grows with speed, so a stopped car cannot spin
    let authority = (vehicle.speed() / params.steer_full_speed).clamp(0.0, 1.0);
    vehicle.heading += input.steer * params.turn_rate * authority * dt;

    vehicle.velocity = vehicle.velocity.clamp_length_max(params.max_speed);

    // Leaving the track costs speed
    let drag = if surface.is_on_track(vehicle.position) {
        params.drag
    } else {
        params.off_track_drag
    };
    vehicle.velocity *= (1.0 - drag * dt).max(0.0);

    vehicle.position += vehicle.velocity * dt;

    let contacts = resolve_contacts(vehicle, obstacles, params);

    // Bounce impulses must not break the speed cap
    vehicle.velocity = vehicle.velocity.clamp_length_max(params.max_speed);

    let extent = params.world_half_extent;
    vehicle.position.x = vehicle.position.x.clamp(-extent, extent);
    vehicle.position.z = vehicle.position.z.clamp(-extent, extent);

    contacts
}

/// Push the car out of every overlapping obstacle, one at a time in index order
fn resolve_contacts(
    vehicle: &mut VehicleState,
    obstacles: &mut ObstacleField,
    params: &VehicleSettings,
) -> Vec<Contact> {
    let mut contacts = Vec::new();

    for index in 0..obstacles.len() {
        let Some(obstacle) = obstacles.get(index).copied() else {
            continue;
        };

        let reach = params.car_radius + obstacle.radius;
        let dist = dist_xz(vehicle.position, obstacle.position);
        if dist >= reach {
            continue;
        }

        let offset = flatten(vehicle.position - obstacle.position);
        let normal = if dist > MIN_PUSH_LEN {
            offset / dist
        } else {
            // Dead center: back the car out the way it came
            -vehicle.forward()
        };
        let depth = reach - dist;

        vehicle.position += normal * depth;
        vehicle.velocity += normal * depth * params.bounce;
        // Away from the car, so the nudge never re-opens the overlap
        obstacles.nudge(index, -normal * depth * params.obstacle_nudge);

        log::debug!("Obstacle {} hit, depth={:.3}", index, depth);
        contacts.push(Contact {
            obstacle: index,
            normal,
            depth,
        });
    }

    contacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct OpenRoad;

    impl Surface for OpenRoad {
        fn is_on_track(&self, _p: Vec3) -> bool {
            true
        }
    }

    struct Grass;

    impl Surface for Grass {
        fn is_on_track(&self, _p: Vec3) -> bool {
            false
        }
    }

    const DT: f32 = 1.0 / 60.0;

    fn parked() -> VehicleState {
        VehicleState {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            heading: 0.0,
        }
    }

    fn single_cone(position: Vec3) -> ObstacleField {
        let curve = crate::sim::TrackCurve::rounded_rect(36.0, 24.0, 11.0, 18, 0.08);
        let mut field = ObstacleField::from_placements(
            &curve,
            &[crate::sim::ObstaclePlacement { t: 0.0, offset: 0.0, height: 0.0 }],
            0.55,
        );
        let current = field.get(0).unwrap().position;
        field.nudge(0, position - current);
        field
    }

    #[test]
    fn test_straight_line_settles_below_max_speed() {
        let params = VehicleSettings::default();
        let mut vehicle = parked();
        let mut field = ObstacleField::default();
        let full = TickInput::new(0.0, 1.0);

        let mut last_speed = 0.0;
        for _ in 0..60 {
            integrate(&mut vehicle, &mut field, &OpenRoad, &params, &full, DT);
            assert!(vehicle.speed() > last_speed);
            last_speed = vehicle.speed();
        }

        // v' = (v + a dt)(1 - d dt) settles at a (1 - d dt) / d
        let keep = 1.0 - params.drag * DT;
        let steady = params.accel * keep / params.drag;
        let expected = steady * (1.0 - keep.powi(60));
        assert!((vehicle.speed() - expected).abs() < 1e-2, "{} vs {}", vehicle.speed(), expected);
        assert!(steady < params.max_speed);

        for _ in 0..600 {
            integrate(&mut vehicle, &mut field, &OpenRoad, &params, &full, DT);
        }
        assert!((vehicle.speed() - steady).abs() < 0.05);
        assert!(vehicle.speed() < params.max_speed);
        // Heading 0 drives along +Z
        assert!(vehicle.position.z > 0.0 && vehicle.position.x.abs() < 1e-3);
    }

    #[test]
    fn test_off_track_is_slower() {
        let params = VehicleSettings::default();
        let full = TickInput::new(0.0, 1.0);
        let (mut road, mut grass) = (parked(), parked());
        let mut field = ObstacleField::default();
        for _ in 0..120 {
            integrate(&mut road, &mut field, &OpenRoad, &params, &full, DT);
            integrate(&mut grass, &mut field, &Grass, &params, &full, DT);
        }
        assert!(grass.speed() < road.speed());
    }

    #[test]
    fn test_no_steering_at_standstill() {
        let params = VehicleSettings::default();
        let mut vehicle = parked();
        let mut field = ObstacleField::default();
        integrate(&mut vehicle, &mut field, &OpenRoad, &params, &TickInput::new(1.0, 0.0), DT);
        assert_eq!(vehicle.heading, 0.0);
    }

    #[test]
    fn test_braking_reverses() {
        let params = VehicleSettings::default();
        let mut vehicle = parked();
        let mut field = ObstacleField::default();
        for _ in 0..30 {
            integrate(&mut vehicle, &mut field, &OpenRoad, &params, &TickInput::new(0.0, -1.0), DT);
        }
        assert!(vehicle.velocity.z < 0.0);
    }

    #[test]
    fn test_collision_at_obstacle_center() {
        let params = VehicleSettings::default();
        let mut vehicle = parked();
        let mut field = single_cone(Vec3::ZERO);
        let radius = field.get(0).unwrap().radius;

        let contacts =
            integrate(&mut vehicle, &mut field, &OpenRoad, &params, &TickInput::default(), DT);

        assert_eq!(contacts.len(), 1);
        assert!(vehicle.position.length() > 0.0);
        let cone = field.get(0).unwrap().position;
        assert!(dist_xz(vehicle.position, cone) >= params.car_radius + radius);
        // Pushed back against the heading, with a bounce the same way
        assert!(vehicle.position.z < 0.0);
        assert!(vehicle.velocity.z < 0.0);
    }

    #[test]
    fn test_collision_pushes_exactly_out() {
        let params = VehicleSettings::default();
        let mut vehicle = parked();
        vehicle.position = Vec3::new(1.0, 0.0, 0.0);
        let mut field = single_cone(Vec3::ZERO);

        let contacts =
            integrate(&mut vehicle, &mut field, &OpenRoad, &params, &TickInput::default(), DT);

        assert_eq!(contacts.len(), 1);
        let contact = contacts[0];
        assert!((contact.depth - 0.5).abs() < 1e-5);
        assert!((contact.normal - Vec3::X).length() < 1e-5);
        assert!((vehicle.position.x - 1.5).abs() < 1e-5);
        // The cone slides away from the car
        assert!(field.get(0).unwrap().position.x < 0.0);
    }

    #[test]
    fn test_world_bounds() {
        let params = VehicleSettings::default();
        let mut vehicle = parked();
        vehicle.position = Vec3::new(500.0, 0.0, -500.0);
        let mut field = ObstacleField::default();
        integrate(&mut vehicle, &mut field, &OpenRoad, &params, &TickInput::default(), DT);
        assert_eq!(vehicle.position.x, params.world_half_extent);
        assert_eq!(vehicle.position.z, -params.world_half_extent);
    }

    #[test]
    fn test_input_sanitized() {
        let input = TickInput::new(3.0, -7.0).sanitized();
        assert_eq!(input, TickInput::new(1.0, -1.0));
    }

    proptest! {
        #[test]
        fn prop_speed_never_exceeds_cap(
            inputs in proptest::collection::vec((-1.0f32..=1.0, -1.0f32..=1.0), 1..200),
            cone_x in -3.0f32..3.0,
        ) {
            let params = VehicleSettings::default();
            let mut vehicle = parked();
            vehicle.velocity = Vec3::new(0.0, 0.0, params.max_speed);
            let mut field = single_cone(Vec3::new(cone_x, 0.0, 1.0));
            for (steer, throttle) in inputs {
                integrate(&mut vehicle, &mut field, &OpenRoad, &params, &TickInput::new(steer, throttle), DT);
                prop_assert!(vehicle.speed() <= params.max_speed + 1e-3);
            }
        }
    }
}
