//! Obstacles placed along the track
//!
//! Each obstacle is resolved once from a curve parameter and a lateral
//! offset. Its index in the field is its identity for the whole run.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::curve::TrackCurve;

/// Where to put an obstacle relative to the centerline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstaclePlacement {
    /// Curve parameter
    pub t: f32,
    /// Lateral offset, positive to the right of travel
    pub offset: f32,
    /// Render height of the obstacle origin
    pub height: f32,
}

/// A circular obstacle (traffic cone)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub position: Vec3,
    pub radius: f32,
}

/// Fixed-size set of obstacles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObstacleField {
    obstacles: Vec<Obstacle>,
    /// Positions at placement time, restored on reset
    home: Vec<Vec3>,
}

impl ObstacleField {
    /// Resolve each placement through the curve and its right vector
    pub fn from_placements(curve: &TrackCurve, placements: &[ObstaclePlacement], radius: f32) -> Self {
        let obstacles: Vec<Obstacle> = placements
            .iter()
            .map(|pl| {
                let mut position = curve.offset_point(pl.t, pl.offset);
                position.y = pl.height;
                Obstacle { position, radius }
            })
            .collect();
        let home = obstacles.iter().map(|o| o.position).collect();
        Self { obstacles, home }
    }

    /// Seeded random layout: `count` obstacles spread around the loop
    ///
    /// Each obstacle gets its own slot of the parameter range so they never
    /// bunch up; the position within the slot and the lateral offset are
    /// drawn from the seed.
    pub fn scatter(
        curve: &TrackCurve,
        count: usize,
        seed: u64,
        max_offset: f32,
        radius: f32,
        height: f32,
    ) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let slot = 1.0 / count.max(1) as f32;
        let max_offset = max_offset.abs();

        let placements: Vec<ObstaclePlacement> = (0..count)
            .map(|i| {
                // Keep the first 5% of the loop clear for the start grid
                let lo = 0.05 + i as f32 * slot * 0.95;
                let t = lo + rng.random::<f32>() * slot * 0.95 * 0.8;
                let offset = if max_offset > 0.0 {
                    rng.random_range(-max_offset..=max_offset)
                } else {
                    0.0
                };
                ObstaclePlacement { t, offset, height }
            })
            .collect();

        log::info!("Scattered {} obstacles from seed {}", count, seed);
        Self::from_placements(curve, &placements, radius)
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Obstacle> {
        self.obstacles.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    /// Current positions, in index order
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.obstacles.iter().map(|o| o.position)
    }

    /// Move one obstacle; only collision response calls this
    pub(crate) fn nudge(&mut self, index: usize, delta: Vec3) {
        debug_assert!(index < self.obstacles.len(), "obstacle {} out of range", index);
        if let Some(obstacle) = self.obstacles.get_mut(index) {
            obstacle.position += Vec3::new(delta.x, 0.0, delta.z);
        }
    }

    /// Put every obstacle back where it was placed
    pub fn restore(&mut self) {
        for (obstacle, home) in self.obstacles.iter_mut().zip(&self.home) {
            obstacle.position = *home;
        }
    }
}
