//! Track Rally headless demo
//!
//! Runs one race with the autopilot at a fixed timestep and logs every game
//! event. Pass a settings JSON file as the first argument to override the
//! defaults. Set `RUST_LOG=debug` to see individual obstacle contacts.

use track_rally::consts::{DEMO_TIMEOUT_SECS, SIM_DT};
use track_rally::sim::Autopilot;
use track_rally::{GameEvent, Settings, Simulation};

fn main() {
    env_logger::init();
    log::info!("Track Rally (headless) starting...");

    let json = std::env::args().nth(1).and_then(|path| match std::fs::read_to_string(&path) {
        Ok(text) => Some(text),
        Err(e) => {
            log::warn!("Cannot read {}: {}", path, e);
            None
        }
    });
    let settings = Settings::load_or_default(json.as_deref());

    let mut sim = Simulation::new(settings);
    let autopilot = Autopilot::default();
    let max_ticks = (DEMO_TIMEOUT_SECS / SIM_DT).ceil() as u64;

    while sim.race().running && sim.time_ticks() < max_ticks {
        let input = autopilot.drive(&sim);
        sim.tick(SIM_DT, input);

        for event in sim.drain_events() {
            report(&event, sim.clock());
        }
    }

    let race = sim.race();
    if race.running {
        log::warn!("Demo timed out after {:.0}s on lap {}", race.elapsed, race.lap + 1);
    }
    println!(
        "laps {}/{}  score {}  hits {}  best {}  time {:.2}s",
        race.lap,
        race.laps_total,
        race.score,
        race.hits,
        race.best_lap.map_or_else(|| "-".to_string(), |b| format!("{:.2}s", b)),
        race.elapsed
    );
}

fn report(event: &GameEvent, clock: f64) {
    match *event {
        GameEvent::RaceStarted => log::info!("[{:7.2}] Race started", clock),
        GameEvent::ObstacleHit { obstacle, hits, score } => {
            log::debug!("[{:7.2}] Hit cone {} (hits={}, score={})", clock, obstacle, hits, score)
        }
        GameEvent::CheckpointPassed => log::info!("[{:7.2}] Checkpoint", clock),
        GameEvent::LapCompleted {
            lap,
            lap_time,
            best_lap,
            score,
        } => log::info!(
            "[{:7.2}] Lap {} {:.2}s (best {:.2}s) score={}",
            clock,
            lap,
            lap_time,
            best_lap,
            score
        ),
        GameEvent::RaceFinished { score, best_lap } => {
            log::info!("[{:7.2}] Finished: score={} best={:?}", clock, score, best_lap)
        }
    }
}
