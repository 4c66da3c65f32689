//! Lap and checkpoint progression
//!
//! A lap only counts when the car reaches the start line after passing the
//! checkpoint. Crossing the start line twice in a row (reversing through
//! it) scores nothing.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::dist_xz;
use crate::settings::RaceSettings;

/// Race state machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacePhase {
    Racing,
    /// Terminal until reset
    Finished,
}

/// Result of feeding one position into the race
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RaceUpdate {
    Nothing,
    CheckpointPassed,
    LapCompleted(LapResult),
}

/// A completed lap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LapResult {
    /// 1-based lap number
    pub lap: u32,
    /// Seconds
    pub lap_time: f64,
    pub score_delta: u64,
    pub new_best: bool,
    /// True when this lap ended the race
    pub finished: bool,
}

/// Lap count, timing and score for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceProgress {
    rules: RaceSettings,
    start_point: Vec3,
    checkpoint_point: Vec3,
    phase: RacePhase,
    lap: u32,
    hits: u32,
    score: u64,
    best_lap: Option<f64>,
    start_time: f64,
    lap_start_time: f64,
    checkpoint_passed: bool,
}

impl RaceProgress {
    /// New race starting at time `now`
    pub fn new(rules: RaceSettings, start_point: Vec3, checkpoint_point: Vec3, now: f64) -> Self {
        debug_assert!(rules.laps_total > 0, "race needs at least one lap");
        Self {
            rules,
            start_point,
            checkpoint_point,
            phase: RacePhase::Racing,
            lap: 0,
            hits: 0,
            score: 0,
            best_lap: None,
            start_time: now,
            lap_start_time: now,
            checkpoint_passed: false,
        }
    }

    /// Back to the initial state, timing from `now`
    pub fn reset(&mut self, now: f64) {
        self.phase = RacePhase::Racing;
        self.lap = 0;
        self.hits = 0;
        self.score = 0;
        self.best_lap = None;
        self.start_time = now;
        self.lap_start_time = now;
        self.checkpoint_passed = false;
    }

    /// Check line crossings for the car at `position` at time `now`
    pub fn update(&mut self, position: Vec3, now: f64) -> RaceUpdate {
        if self.phase == RacePhase::Finished {
            return RaceUpdate::Nothing;
        }

        let mut update = RaceUpdate::Nothing;
        if !self.checkpoint_passed
            && dist_xz(position, self.checkpoint_point) < self.rules.checkpoint_radius
        {
            self.checkpoint_passed = true;
            update = RaceUpdate::CheckpointPassed;
        }

        if self.checkpoint_passed && dist_xz(position, self.start_point) < self.rules.start_radius {
            update = RaceUpdate::LapCompleted(self.complete_lap(now));
        }

        update
    }

    fn complete_lap(&mut self, now: f64) -> LapResult {
        self.checkpoint_passed = false;
        let lap_time = (now - self.lap_start_time).max(0.0);
        self.lap_start_time = now;
        self.lap += 1;

        let new_best = self.best_lap.is_none_or(|best| lap_time < best);
        if new_best {
            self.best_lap = Some(lap_time);
        }

        let score_delta = self.rules.lap_base_score + lap_bonus(&self.rules, lap_time);
        self.score += score_delta;

        let finished = self.lap >= self.rules.laps_total;
        if finished {
            self.phase = RacePhase::Finished;
            log::info!("Race finished: score={}, best={:?}", self.score, self.best_lap);
        } else {
            log::info!("Lap {} in {:.2}s", self.lap, lap_time);
        }

        LapResult {
            lap: self.lap,
            lap_time,
            score_delta,
            new_best,
            finished,
        }
    }

    /// Book an obstacle hit; the score never drops below zero
    ///
    /// Counts in every phase: a car still driving after the finish pays
    /// for the cones it touches.
    pub fn register_hit(&mut self) {
        self.hits += 1;
        self.score = self.score.saturating_sub(self.rules.collision_penalty);
    }

    pub fn phase(&self) -> RacePhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == RacePhase::Racing
    }

    pub fn lap(&self) -> u32 {
        self.lap
    }

    pub fn laps_total(&self) -> u32 {
        self.rules.laps_total
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn best_lap(&self) -> Option<f64> {
        self.best_lap
    }

    pub fn checkpoint_passed(&self) -> bool {
        self.checkpoint_passed
    }

    pub fn start_point(&self) -> Vec3 {
        self.start_point
    }

    pub fn checkpoint_point(&self) -> Vec3 {
        self.checkpoint_point
    }

    pub fn snapshot(&self, now: f64) -> RaceSnapshot {
        RaceSnapshot {
            lap: self.lap,
            laps_total: self.rules.laps_total,
            hits: self.hits,
            score: self.score,
            elapsed: (now - self.start_time).max(0.0),
            current_lap_time: (now - self.lap_start_time).max(0.0),
            best_lap: self.best_lap,
            running: self.is_running(),
        }
    }
}

/// Speed bonus for a lap: shorter laps earn more, never below zero
pub fn lap_bonus(rules: &RaceSettings, lap_time: f64) -> u64 {
    let secs = lap_time.max(rules.lap_bonus_floor_secs);
    if !(secs > 0.0) {
        return 0;
    }
    (rules.lap_bonus_numerator / secs).round().max(0.0) as u64
}

/// Read-only view for the HUD
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub lap: u32,
    pub laps_total: u32,
    pub hits: u32,
    pub score: u64,
    /// Seconds since the race started
    pub elapsed: f64,
    pub current_lap_time: f64,
    pub best_lap: Option<f64>,
    pub running: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const START: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    const CHECKPOINT: Vec3 = Vec3::new(50.0, 0.0, 0.0);
    const FAR: Vec3 = Vec3::new(25.0, 0.0, 25.0);

    fn race(laps_total: u32) -> RaceProgress {
        let rules = RaceSettings {
            laps_total,
            ..Default::default()
        };
        RaceProgress::new(rules, START, CHECKPOINT, 0.0)
    }

    /// Drive out to the checkpoint and back to the line
    fn lap(race: &mut RaceProgress, now: f64) -> RaceUpdate {
        race.update(FAR, now - 2.0);
        race.update(CHECKPOINT, now - 1.0);
        race.update(FAR, now - 0.5);
        race.update(START, now)
    }

    #[test]
    fn test_start_line_without_checkpoint_is_ignored() {
        let mut race = race(3);
        assert_eq!(race.update(START, 1.0), RaceUpdate::Nothing);
        race.update(FAR, 2.0);
        assert_eq!(race.update(START, 3.0), RaceUpdate::Nothing);
        assert_eq!(race.lap(), 0);
    }

    #[test]
    fn test_second_start_crossing_needs_new_checkpoint() {
        let mut race = race(3);
        assert!(matches!(lap(&mut race, 20.0), RaceUpdate::LapCompleted(_)));
        assert_eq!(race.lap(), 1);
        assert!(!race.checkpoint_passed());

        // Back off the line and over it again
        race.update(FAR, 21.0);
        assert_eq!(race.update(START, 22.0), RaceUpdate::Nothing);
        assert_eq!(race.lap(), 1);
    }

    #[test]
    fn test_checkpoint_is_idempotent() {
        let mut race = race(3);
        assert_eq!(race.update(CHECKPOINT, 1.0), RaceUpdate::CheckpointPassed);
        assert_eq!(race.update(CHECKPOINT, 1.1), RaceUpdate::Nothing);
        assert!(race.checkpoint_passed());
    }

    #[test]
    fn test_finishes_exactly_on_last_lap() {
        let mut race = race(3);
        for (i, now) in [20.0, 38.0, 57.0].into_iter().enumerate() {
            assert!(race.is_running());
            let RaceUpdate::LapCompleted(result) = lap(&mut race, now) else {
                panic!("lap {} not counted", i + 1);
            };
            assert_eq!(result.lap, i as u32 + 1);
            assert_eq!(result.finished, i == 2);
            assert_eq!(race.is_running(), i < 2);
        }
        assert_eq!(race.phase(), RacePhase::Finished);
        assert_eq!(race.best_lap(), Some(18.0));

        // Terminal: further crossings are ignored
        assert_eq!(lap(&mut race, 80.0), RaceUpdate::Nothing);
        assert_eq!(race.lap(), 3);
    }

    #[test]
    fn test_lap_scoring() {
        let mut race = race(3);
        let RaceUpdate::LapCompleted(result) = lap(&mut race, 20.0) else {
            panic!("lap not counted");
        };
        assert_eq!(result.lap_time, 20.0);
        assert!(result.new_best);
        assert_eq!(result.score_delta, 250 + 120);
        assert_eq!(race.score(), 370);

        let RaceUpdate::LapCompleted(slower) = lap(&mut race, 50.0) else {
            panic!("lap not counted");
        };
        assert!(!slower.new_best);
        assert_eq!(race.best_lap(), Some(20.0));
    }

    #[test]
    fn test_lap_bonus_monotonic() {
        let rules = RaceSettings::default();
        assert_eq!(lap_bonus(&rules, 1.0), 300);
        assert_eq!(lap_bonus(&rules, 8.0), 300);
        let mut last = u64::MAX;
        for i in 0..200 {
            let bonus = lap_bonus(&rules, 5.0 + i as f64 * 0.5);
            assert!(bonus <= last);
            last = bonus;
        }
        assert_eq!(lap_bonus(&rules, 1.0e12), 0);
    }

    #[test]
    fn test_hits_and_penalty() {
        let mut race = race(3);
        race.register_hit();
        assert_eq!((race.hits(), race.score()), (1, 0));

        lap(&mut race, 20.0);
        assert_eq!(race.score(), 370);
        race.register_hit();
        assert_eq!((race.hits(), race.score()), (2, 345));
    }

    #[test]
    fn test_hits_count_after_finish() {
        let mut race = race(1);
        lap(&mut race, 20.0);
        assert_eq!(race.phase(), RacePhase::Finished);

        race.register_hit();
        assert_eq!((race.hits(), race.score()), (1, 345));
        assert_eq!(race.phase(), RacePhase::Finished);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut race = race(1);
        race.register_hit();
        lap(&mut race, 20.0);
        assert!(!race.is_running());

        race.reset(30.0);
        let snapshot = race.snapshot(30.0);
        assert_eq!(
            snapshot,
            RaceSnapshot {
                lap: 0,
                laps_total: 1,
                hits: 0,
                score: 0,
                elapsed: 0.0,
                current_lap_time: 0.0,
                best_lap: None,
                running: true,
            }
        );
        assert!(!race.checkpoint_passed());
    }

    proptest! {
        #[test]
        fn prop_score_never_negative(events in proptest::collection::vec(any::<bool>(), 0..100)) {
            let mut race = race(u32::MAX);
            let mut now = 0.0;
            for is_lap in events {
                if is_lap {
                    now += 15.0;
                    lap(&mut race, now);
                } else {
                    let before = race.score();
                    race.register_hit();
                    prop_assert_eq!(race.score(), before.saturating_sub(25));
                }
            }
        }
    }
}
