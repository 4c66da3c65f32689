//! Simulation context
//!
//! Owns every piece of game state: curve, geometry, obstacles, car and race.
//! The host calls [`Simulation::tick`] once per frame with its own clamped
//! dt and reads snapshots back; [`Simulation::reset`] is the only other
//! mutator.

use std::collections::VecDeque;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::curve::TrackCurve;
use super::geometry::TrackGeometry;
use super::obstacles::{ObstacleField, ObstaclePlacement};
use super::race::{RacePhase, RaceProgress, RaceSnapshot, RaceUpdate};
use super::tick::{TickInput, integrate};
use super::vehicle::{StartPose, VehicleSnapshot, VehicleState};
use crate::consts::MAX_QUEUED_EVENTS;
use crate::settings::Settings;

/// Things that happened during a tick or reset, for UI and audio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A run began (construction or reset)
    RaceStarted,
    ObstacleHit { obstacle: usize, hits: u32, score: u64 },
    CheckpointPassed,
    LapCompleted {
        lap: u32,
        lap_time: f64,
        best_lap: f64,
        score: u64,
    },
    RaceFinished { score: u64, best_lap: Option<f64> },
}

/// The whole game simulation
#[derive(Debug, Clone)]
pub struct Simulation {
    settings: Settings,
    curve: TrackCurve,
    geometry: TrackGeometry,
    obstacles: ObstacleField,
    start_pose: StartPose,
    vehicle: VehicleState,
    race: RaceProgress,
    /// Simulated seconds since construction
    clock: f64,
    time_ticks: u64,
    /// Best lap across resets
    session_best_lap: Option<f64>,
    /// Undrained events, oldest first, capped at [`MAX_QUEUED_EVENTS`]
    events: VecDeque<GameEvent>,
}

impl Simulation {
    /// Build the track and start a race
    pub fn new(settings: Settings) -> Self {
        let settings = settings.sanitized();
        let track = &settings.track;
        let curve = TrackCurve::rounded_rect(
            track.half_w,
            track.half_h,
            track.corner_radius,
            track.segments_per_corner,
            track.tension,
        );
        Self::with_curve(settings, curve)
    }

    /// Start a race on an arbitrary closed curve
    pub fn with_curve(settings: Settings, curve: TrackCurve) -> Self {
        let settings = settings.sanitized();
        let geometry = TrackGeometry::build(&curve, &settings.track);

        let obs = &settings.obstacles;
        let obstacles = match obs.scatter_seed {
            Some(seed) => ObstacleField::scatter(
                &curve,
                obs.scatter_count,
                seed,
                geometry.on_track_radius(),
                obs.radius,
                obs.height,
            ),
            None => {
                let placements: Vec<ObstaclePlacement> = obs
                    .layout
                    .iter()
                    .map(|&(t, offset)| ObstaclePlacement {
                        t,
                        offset,
                        height: obs.height,
                    })
                    .collect();
                ObstacleField::from_placements(&curve, &placements, obs.radius)
            }
        };

        let rules = settings.race.clone();
        let start_pose = StartPose::behind_line(&curve, rules.start_param, rules.start_setback);
        let race = RaceProgress::new(
            rules.clone(),
            curve.point_at(rules.start_param),
            curve.point_at(rules.checkpoint_param),
            0.0,
        );

        log::info!(
            "Race ready: {} laps, {} obstacles",
            race.laps_total(),
            obstacles.len()
        );

        Self {
            settings,
            curve,
            geometry,
            obstacles,
            start_pose,
            vehicle: VehicleState::at_pose(start_pose),
            race,
            clock: 0.0,
            time_ticks: 0,
            session_best_lap: None,
            events: VecDeque::from([GameEvent::RaceStarted]),
        }
    }

    /// Abort or restart: car back on the start pose, race zeroed
    pub fn reset(&mut self) {
        self.vehicle = VehicleState::at_pose(self.start_pose);
        self.obstacles.restore();
        self.race.reset(self.clock);
        self.push_event(GameEvent::RaceStarted);
        log::info!("Race reset");
    }

    /// Advance the simulation by `dt` seconds
    pub fn tick(&mut self, dt: f32, input: TickInput) {
        debug_assert!(dt.is_finite() && dt > 0.0, "tick needs a positive dt, got {}", dt);
        if !(dt > 0.0) {
            return;
        }
        let dt = dt.min(self.settings.vehicle.max_dt);

        self.time_ticks += 1;
        self.clock += f64::from(dt);

        if !self.race.is_running() && !self.settings.race.drive_after_finish {
            return;
        }

        let contacts = integrate(
            &mut self.vehicle,
            &mut self.obstacles,
            &self.geometry,
            &self.settings.vehicle,
            &input,
            dt,
        );
        for contact in contacts {
            self.race.register_hit();
            self.push_event(GameEvent::ObstacleHit {
                obstacle: contact.obstacle,
                hits: self.race.hits(),
                score: self.race.score(),
            });
        }

        match self.race.update(self.vehicle.position, self.clock) {
            RaceUpdate::Nothing => {}
            RaceUpdate::CheckpointPassed => self.push_event(GameEvent::CheckpointPassed),
            RaceUpdate::LapCompleted(result) => {
                if self.session_best_lap.is_none_or(|best| result.lap_time < best) {
                    self.session_best_lap = Some(result.lap_time);
                }
                self.push_event(GameEvent::LapCompleted {
                    lap: result.lap,
                    lap_time: result.lap_time,
                    best_lap: self.race.best_lap().unwrap_or(result.lap_time),
                    score: self.race.score(),
                });
                if result.finished {
                    self.push_event(GameEvent::RaceFinished {
                        score: self.race.score(),
                        best_lap: self.race.best_lap(),
                    });
                }
            }
        }
    }

    /// Take every event queued since the last drain
    ///
    /// Hosts that never drain lose the oldest events once the queue is full.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain(..).collect()
    }

    /// Events waiting to be drained
    pub fn queued_events(&self) -> usize {
        self.events.len()
    }

    fn push_event(&mut self, event: GameEvent) {
        if self.events.len() >= MAX_QUEUED_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn vehicle(&self) -> VehicleSnapshot {
        self.vehicle.snapshot()
    }

    pub fn vehicle_state(&self) -> &VehicleState {
        &self.vehicle
    }

    pub fn race(&self) -> RaceSnapshot {
        self.race.snapshot(self.clock)
    }

    pub fn race_phase(&self) -> RacePhase {
        self.race.phase()
    }

    pub fn race_progress(&self) -> &RaceProgress {
        &self.race
    }

    pub fn curve(&self) -> &TrackCurve {
        &self.curve
    }

    pub fn geometry(&self) -> &TrackGeometry {
        &self.geometry
    }

    pub fn obstacles(&self) -> &ObstacleField {
        &self.obstacles
    }

    pub fn obstacle_positions(&self) -> Vec<Vec3> {
        self.obstacles.positions().collect()
    }

    pub fn start_pose(&self) -> StartPose {
        self.start_pose
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// True when the car is on the drivable surface right now
    pub fn on_track(&self) -> bool {
        self.geometry.is_on_track(self.vehicle.position)
    }

    pub fn session_best_lap(&self) -> Option<f64> {
        self.session_best_lap
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
