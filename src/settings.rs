//! Tuning settings
//!
//! Everything that shapes the track, the car and the race lives here so a
//! host application can ship it as JSON. Missing fields fall back to the
//! defaults in [`crate::consts`].

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Track construction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackSettings {
    /// Rounded-rectangle outline half extents
    pub half_w: f32,
    pub half_h: f32,
    pub corner_radius: f32,
    pub segments_per_corner: usize,
    /// Catmull-Rom tension
    pub tension: f32,
    /// Full ribbon width
    pub width: f32,
    /// Nearest-point sample count
    pub samples: usize,
    /// Ribbon strip resolution
    pub ribbon_steps: usize,
    /// Fraction of the half width counted as on-track (0, 1)
    pub on_track_factor: f32,
    /// Edge posts per side
    pub edge_posts: usize,
    /// How far posts stand outside the ribbon edge
    pub edge_post_outset: f32,
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self {
            half_w: TRACK_HALF_W,
            half_h: TRACK_HALF_H,
            corner_radius: TRACK_CORNER_R,
            segments_per_corner: TRACK_SEGMENTS_PER_CORNER,
            tension: TRACK_TENSION,
            width: TRACK_WIDTH,
            samples: TRACK_SAMPLES,
            ribbon_steps: TRACK_RIBBON_STEPS,
            on_track_factor: ON_TRACK_FACTOR,
            edge_posts: 90,
            edge_post_outset: 0.7,
        }
    }
}

impl TrackSettings {
    pub fn half_width(&self) -> f32 {
        self.width * 0.5
    }
}

/// Car handling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleSettings {
    pub max_speed: f32,
    pub accel: f32,
    /// Braking rate (stronger than `accel`)
    pub brake: f32,
    /// Heading change at full steer and full authority (rad/s)
    pub turn_rate: f32,
    pub drag: f32,
    pub off_track_drag: f32,
    /// Speed at which steering saturates
    pub steer_full_speed: f32,
    pub car_radius: f32,
    pub bounce: f32,
    pub obstacle_nudge: f32,
    pub world_half_extent: f32,
    /// Largest dt integrated in one tick
    pub max_dt: f32,
}

impl Default for VehicleSettings {
    fn default() -> Self {
        Self {
            max_speed: MAX_SPEED,
            accel: ACCEL,
            brake: BRAKE,
            turn_rate: TURN_RATE,
            drag: DRAG,
            off_track_drag: OFF_TRACK_DRAG,
            steer_full_speed: STEER_FULL_SPEED,
            car_radius: CAR_RADIUS,
            bounce: COLLISION_BOUNCE,
            obstacle_nudge: OBSTACLE_NUDGE,
            world_half_extent: WORLD_HALF_EXTENT,
            max_dt: MAX_DT,
        }
    }
}

/// Lap, checkpoint and scoring rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceSettings {
    pub laps_total: u32,
    /// Curve parameter of the start/finish line
    pub start_param: f32,
    /// Curve parameter of the checkpoint
    pub checkpoint_param: f32,
    pub start_radius: f32,
    pub checkpoint_radius: f32,
    pub start_setback: f32,
    pub lap_base_score: u64,
    pub lap_bonus_numerator: f64,
    pub lap_bonus_floor_secs: f64,
    pub collision_penalty: u64,
    /// Keep integrating the car after the race is finished
    pub drive_after_finish: bool,
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            laps_total: LAPS_TOTAL,
            start_param: 0.0,
            checkpoint_param: 0.5,
            start_radius: START_RADIUS,
            checkpoint_radius: CHECKPOINT_RADIUS,
            start_setback: START_SETBACK,
            lap_base_score: LAP_BASE_SCORE,
            lap_bonus_numerator: LAP_BONUS_NUMERATOR,
            lap_bonus_floor_secs: LAP_BONUS_FLOOR_SECS,
            collision_penalty: COLLISION_PENALTY,
            drive_after_finish: false,
        }
    }
}

/// Obstacle layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleSettings {
    /// (curve parameter, lateral offset) pairs, positive offset is to the right
    pub layout: Vec<(f32, f32)>,
    pub radius: f32,
    pub height: f32,
    /// When set, ignore `layout` and scatter `scatter_count` obstacles from this seed
    pub scatter_seed: Option<u64>,
    pub scatter_count: usize,
}

/// Cone layout of the stock track
pub const DEFAULT_OBSTACLE_LAYOUT: [(f32, f32); 10] = [
    (0.08, 0.0),
    (0.14, 1.6),
    (0.20, -1.9),
    (0.31, 1.3),
    (0.38, -1.2),
    (0.52, 0.0),
    (0.61, 1.8),
    (0.69, -1.6),
    (0.77, 0.0),
    (0.87, -1.8),
];

impl Default for ObstacleSettings {
    fn default() -> Self {
        Self {
            layout: DEFAULT_OBSTACLE_LAYOUT.to_vec(),
            radius: OBSTACLE_RADIUS,
            height: OBSTACLE_HEIGHT,
            scatter_seed: None,
            scatter_count: DEFAULT_OBSTACLE_LAYOUT.len(),
        }
    }
}

/// Complete simulation settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub track: TrackSettings,
    pub vehicle: VehicleSettings,
    pub race: RaceSettings,
    pub obstacles: ObstacleSettings,
}

impl Settings {
    /// Parse settings from JSON; absent fields take their defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse settings if a document is given, otherwise use defaults
    pub fn load_or_default(json: Option<&str>) -> Self {
        if let Some(json) = json {
            match Self::from_json(json) {
                Ok(settings) => {
                    log::info!("Loaded settings from JSON");
                    return settings.sanitized();
                }
                Err(e) => log::warn!("Invalid settings JSON ({}), using defaults", e),
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Replace values the simulation cannot work with by their defaults
    pub fn sanitized(mut self) -> Self {
        let track_defaults = TrackSettings::default();
        let vehicle_defaults = VehicleSettings::default();

        if !(self.track.width > 0.0) {
            log::warn!("Track width {} rejected", self.track.width);
            self.track.width = track_defaults.width;
        }
        if !(self.track.corner_radius > 0.0)
            || self.track.corner_radius >= self.track.half_w.min(self.track.half_h)
        {
            log::warn!("Track outline rejected, using the stock outline");
            self.track.half_w = track_defaults.half_w;
            self.track.half_h = track_defaults.half_h;
            self.track.corner_radius = track_defaults.corner_radius;
        }
        self.track.segments_per_corner = self.track.segments_per_corner.max(2);
        self.track.samples = self.track.samples.max(16);
        self.track.ribbon_steps = self.track.ribbon_steps.max(4);
        if !(self.track.on_track_factor > 0.0 && self.track.on_track_factor < 1.0) {
            log::warn!("On-track factor {} rejected", self.track.on_track_factor);
            self.track.on_track_factor = track_defaults.on_track_factor;
        }

        if !(self.vehicle.max_speed > 0.0) {
            self.vehicle.max_speed = vehicle_defaults.max_speed;
        }
        if !(self.vehicle.max_dt > 0.0) {
            self.vehicle.max_dt = vehicle_defaults.max_dt;
        }
        if !(self.vehicle.steer_full_speed > 0.0) {
            self.vehicle.steer_full_speed = vehicle_defaults.steer_full_speed;
        }
        if !(self.vehicle.world_half_extent > 0.0) {
            self.vehicle.world_half_extent = vehicle_defaults.world_half_extent;
        }

        self.race.laps_total = self.race.laps_total.max(1);
        self.race.start_param = self.race.start_param.rem_euclid(1.0);
        self.race.checkpoint_param = self.race.checkpoint_param.rem_euclid(1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = Settings::from_json(r#"{ "race": { "laps_total": 5 } }"#).unwrap();
        assert_eq!(settings.race.laps_total, 5);
        assert_eq!(settings.race.start_radius, START_RADIUS);
        assert_eq!(settings.track, TrackSettings::default());
        assert_eq!(settings.obstacles.layout.len(), 10);
    }

    #[test]
    fn test_json_round_trip() {
        let mut settings = Settings::default();
        settings.obstacles.scatter_seed = Some(7);
        let json = settings.to_json().unwrap();
        assert_eq!(Settings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_invalid_json_falls_back() {
        let settings = Settings::load_or_default(Some("{ not json"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_sanitize_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.track.width = -1.0;
        settings.track.on_track_factor = 1.5;
        settings.track.samples = 0;
        settings.race.laps_total = 0;
        settings.race.checkpoint_param = 1.25;
        let settings = settings.sanitized();
        assert_eq!(settings.track.width, TRACK_WIDTH);
        assert_eq!(settings.track.on_track_factor, ON_TRACK_FACTOR);
        assert!(settings.track.samples >= 16);
        assert_eq!(settings.race.laps_total, 1);
        assert!((settings.race.checkpoint_param - 0.25).abs() < 1e-6);
    }
}
