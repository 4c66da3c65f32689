//! Derived track geometry
//!
//! Built once from a [`TrackCurve`]: a nearest-point sample table spaced
//! evenly by arc length, the ribbon edges and the edge-post positions.
//! Queries are brute force over the sample table. With a few hundred
//! samples that is cheap enough to run every tick.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::curve::TrackCurve;
use crate::dist_xz;
use crate::settings::TrackSettings;

/// Fine steps per control segment when measuring arc length
const LENGTH_STEPS_PER_SEGMENT: usize = 64;

/// Anything that can classify a point as drivable surface
pub trait Surface {
    fn is_on_track(&self, p: Vec3) -> bool;
}

/// One entry of the nearest-point table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackSample {
    /// Curve parameter in [0, 1)
    pub t: f32,
    pub point: Vec3,
}

/// Left and right ribbon edge at one step along the curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RibbonEdge {
    pub t: f32,
    pub left: Vec3,
    pub right: Vec3,
}

/// Planar bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn contains_xz(&self, p: Vec3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.z >= self.min.z && p.z <= self.max.z
    }
}

/// Spatial structure answering on-track and nearest-parameter queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackGeometry {
    half_width: f32,
    on_track_factor: f32,
    length: f32,
    /// Largest gap between consecutive samples
    max_spacing: f32,
    samples: Vec<TrackSample>,
    ribbon: Vec<RibbonEdge>,
    edge_posts: Vec<Vec3>,
    bounds: Bounds,
}

impl TrackGeometry {
    /// Build the geometry for `curve` using the sizes in `settings`
    pub fn build(curve: &TrackCurve, settings: &TrackSettings) -> Self {
        let half_width = settings.half_width();
        let (params, lengths) = arc_length_table(curve);
        let length = lengths.last().copied().unwrap_or(0.0);

        let count = settings.samples.max(1);
        let samples: Vec<TrackSample> = (0..count)
            .map(|i| {
                let s = length * i as f32 / count as f32;
                let t = param_at_length(&params, &lengths, s);
                TrackSample {
                    t,
                    point: curve.point_at(t),
                }
            })
            .collect();

        let max_spacing = samples
            .iter()
            .zip(samples.iter().cycle().skip(1))
            .map(|(a, b)| dist_xz(a.point, b.point))
            .fold(0.0_f32, f32::max);

        let steps = settings.ribbon_steps.max(1);
        let ribbon: Vec<RibbonEdge> = (0..=steps)
            .map(|i| {
                let t = (i % steps) as f32 / steps as f32;
                RibbonEdge {
                    t,
                    left: curve.offset_point(t, -half_width),
                    right: curve.offset_point(t, half_width),
                }
            })
            .collect();

        let post_offset = half_width + settings.edge_post_outset;
        let mut edge_posts = Vec::with_capacity(settings.edge_posts * 2);
        for i in 0..settings.edge_posts {
            let t = i as f32 / settings.edge_posts as f32;
            edge_posts.push(curve.offset_point(t, -post_offset));
            edge_posts.push(curve.offset_point(t, post_offset));
        }

        let bounds = ribbon.iter().flat_map(|e| [e.left, e.right]).fold(
            Bounds {
                min: Vec3::splat(f32::INFINITY),
                max: Vec3::splat(f32::NEG_INFINITY),
            },
            |b, p| Bounds {
                min: b.min.min(p),
                max: b.max.max(p),
            },
        );

        log::info!(
            "Track built: length={:.1}, samples={}, tolerance={:.3}",
            length,
            samples.len(),
            max_spacing * 0.5
        );

        Self {
            half_width,
            on_track_factor: settings.on_track_factor,
            length,
            max_spacing,
            samples,
            ribbon,
            edge_posts,
            bounds,
        }
    }

    pub fn half_width(&self) -> f32 {
        self.half_width
    }

    /// Centerline length
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Worst-case excess of nearest-sample distance over true curve distance
    pub fn sample_tolerance(&self) -> f32 {
        self.max_spacing * 0.5
    }

    /// Distance below which a point counts as on the drivable surface
    pub fn on_track_radius(&self) -> f32 {
        self.half_width * self.on_track_factor
    }

    pub fn samples(&self) -> &[TrackSample] {
        &self.samples
    }

    /// Edge pairs; the last entry repeats the first to close the strip
    pub fn ribbon(&self) -> &[RibbonEdge] {
        &self.ribbon
    }

    /// Post positions, alternating left and right
    pub fn edge_posts(&self) -> &[Vec3] {
        &self.edge_posts
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Nearest sample and its planar distance, `None` for non-finite input
    pub fn nearest_sample(&self, p: Vec3) -> Option<(&TrackSample, f32)> {
        if !p.x.is_finite() || !p.z.is_finite() {
            return None;
        }

        let mut best: Option<(&TrackSample, f32)> = None;
        for sample in &self.samples {
            let d = dist_xz(p, sample.point);
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((sample, d)),
            }
        }
        best
    }

    /// Planar distance to the nearest sample (infinite for bad input)
    pub fn distance_to_centerline(&self, p: Vec3) -> f32 {
        self.nearest_sample(p)
            .map(|(_, d)| d)
            .unwrap_or(f32::INFINITY)
    }

    /// True when `p` is within the on-track radius of the nearest sample
    pub fn is_on_track(&self, p: Vec3) -> bool {
        self.distance_to_centerline(p) < self.on_track_radius()
    }

    /// Parameter of the sample closest to `p` (0 for bad input)
    pub fn closest_parameter(&self, p: Vec3) -> f32 {
        self.nearest_sample(p).map(|(s, _)| s.t).unwrap_or(0.0)
    }
}

impl Surface for TrackGeometry {
    fn is_on_track(&self, p: Vec3) -> bool {
        TrackGeometry::is_on_track(self, p)
    }
}

/// Cumulative arc length at evenly spaced parameters, closing back to t = 1
fn arc_length_table(curve: &TrackCurve) -> (Vec<f32>, Vec<f32>) {
    let steps = curve.control_points().len() * LENGTH_STEPS_PER_SEGMENT;
    let mut params = Vec::with_capacity(steps + 1);
    let mut lengths = Vec::with_capacity(steps + 1);

    let mut prev = curve.point_at(0.0);
    let mut total = 0.0;
    params.push(0.0);
    lengths.push(0.0);
    for i in 1..=steps {
        let t = i as f32 / steps as f32;
        let p = curve.point_at(t);
        total += dist_xz(prev, p);
        params.push(t);
        lengths.push(total);
        prev = p;
    }
    (params, lengths)
}

/// Invert the arc length table by binary search and linear interpolation
fn param_at_length(params: &[f32], lengths: &[f32], s: f32) -> f32 {
    let i = lengths.partition_point(|&l| l < s);
    if i == 0 {
        return params[0];
    }
    if i >= lengths.len() {
        return 0.0;
    }

    let (l0, l1) = (lengths[i - 1], lengths[i]);
    let f = if l1 > l0 { (s - l0) / (l1 - l0) } else { 0.0 };
    let t = params[i - 1] + (params[i] - params[i - 1]) * f;
    if t >= 1.0 { 0.0 } else { t }
}
