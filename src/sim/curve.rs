//! Closed centerline curve
//!
//! The track centerline is a closed Catmull-Rom spline through an ordered
//! list of control points on the ground plane. A parameter `t` in [0, 1)
//! walks the loop once; each control segment owns an equal slice of `t`.
//!
//! Tangents are taken by finite difference over [`TANGENT_EPSILON`]. Every
//! lateral offset in the crate (ribbon edges, posts, obstacle placement)
//! goes through [`TrackCurve::right_at`] so those offsets agree.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::TANGENT_EPSILON;
use crate::flatten;

const UP: Vec3 = Vec3::Y;

/// A closed, smooth centerline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackCurve {
    points: Vec<Vec3>,
    tension: f32,
}

impl TrackCurve {
    /// Build a closed curve through `points` (projected to Y = 0)
    pub fn new(points: Vec<Vec3>, tension: f32) -> Self {
        debug_assert!(points.len() >= 3, "closed curve needs at least 3 points");
        Self {
            points: points.into_iter().map(flatten).collect(),
            tension,
        }
    }

    /// Curve through the stock rounded-rectangle outline
    pub fn rounded_rect(
        half_w: f32,
        half_h: f32,
        corner_radius: f32,
        segments_per_corner: usize,
        tension: f32,
    ) -> Self {
        Self::new(
            rounded_rect_points(half_w, half_h, corner_radius, segments_per_corner),
            tension,
        )
    }

    pub fn control_points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn tension(&self) -> f32 {
        self.tension
    }

    /// Position at parameter `t`; periodic with period 1
    pub fn point_at(&self, t: f32) -> Vec3 {
        let n = self.points.len();
        if n == 0 {
            return Vec3::ZERO;
        }

        let t = wrap_param(t);
        let p = n as f32 * t;
        // `t < 1` but `n * t` can still round up to `n`
        let seg = (p.floor() as usize).min(n - 1);
        let weight = (p - seg as f32).clamp(0.0, 1.0);

        let p0 = self.points[(seg + n - 1) % n];
        let p1 = self.points[seg];
        let p2 = self.points[(seg + 1) % n];
        let p3 = self.points[(seg + 2) % n];

        catmull_rom(p0, p1, p2, p3, self.tension, weight)
    }

    /// Unit tangent at `t` by forward difference
    pub fn tangent_at(&self, t: f32) -> Vec3 {
        let a = self.point_at(t);
        let b = self.point_at(t + TANGENT_EPSILON);
        flatten(b - a).normalize_or_zero()
    }

    /// Unit lateral vector to the right of the direction of travel
    pub fn right_at(&self, t: f32) -> Vec3 {
        UP.cross(self.tangent_at(t)).normalize_or_zero()
    }

    /// Point offset sideways from the centerline (positive = right)
    pub fn offset_point(&self, t: f32, lateral: f32) -> Vec3 {
        self.point_at(t) + self.right_at(t) * lateral
    }
}

/// Wrap any parameter into [0, 1)
#[inline]
pub fn wrap_param(t: f32) -> f32 {
    let w = t.rem_euclid(1.0);
    // rem_euclid can return exactly 1.0 for tiny negative inputs
    if w >= 1.0 { 0.0 } else { w }
}

/// Cubic Hermite segment with Catmull-Rom tangents scaled by `tension`
fn catmull_rom(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, tension: f32, w: f32) -> Vec3 {
    let t0 = (p2 - p0) * tension;
    let t1 = (p3 - p1) * tension;

    let c0 = p1;
    let c1 = t0;
    let c2 = p1 * -3.0 + p2 * 3.0 - t0 * 2.0 - t1;
    let c3 = p1 * 2.0 - p2 * 2.0 + t0 + t1;

    let w2 = w * w;
    let w3 = w2 * w;
    c0 + c1 * w + c2 * w2 + c3 * w3
}

/// Control points for a rounded rectangle on the XZ plane
///
/// Four quarter-circle corners, each sampled with `segments_per_corner + 1`
/// points; the straights are left to the spline between corners.
pub fn rounded_rect_points(
    half_w: f32,
    half_h: f32,
    corner_radius: f32,
    segments_per_corner: usize,
) -> Vec<Vec3> {
    use std::f32::consts::{FRAC_PI_2, PI, TAU};

    let r = corner_radius;
    let corners = [
        (half_w - r, half_h - r, 0.0, FRAC_PI_2),
        (-half_w + r, half_h - r, FRAC_PI_2, PI),
        (-half_w + r, -half_h + r, PI, 3.0 * FRAC_PI_2),
        (half_w - r, -half_h + r, 3.0 * FRAC_PI_2, TAU),
    ];

    let segments = segments_per_corner.max(1);
    let mut pts = Vec::with_capacity(4 * (segments + 1));
    for &(cx, cz, a0, a1) in &corners {
        for j in 0..=segments {
            let f = j as f32 / segments as f32;
            let a = a0 + (a1 - a0) * f;
            pts.push(Vec3::new(cx + a.cos() * r, 0.0, cz + a.sin() * r));
        }
    }
    pts
}
