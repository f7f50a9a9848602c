use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::audio::assets::CallBank;
use crate::audio::render::{JobSender, RenderJob};
use crate::audio::spatial::SpatialMixer;
use crate::config::AppConfig;
use crate::sim::clock::SimClock;
use crate::sim::dayphase::DayPhase;
use crate::sim::population::{Population, RoosterView};

/// Read-only state published once per tick for display consumers. Nothing
/// flows back.
#[derive(Debug, Clone)]
pub struct WorldFrame {
    pub elapsed: f64,
    pub tod_sec: f32,
    pub tod_multiplier: f32,
    pub roosters: Vec<RoosterView>,
}

/// Counters shared between the simulation thread and the status logger.
#[derive(Debug, Default)]
pub struct RunStats {
    total_calls: AtomicU64,
    proximity_replies: AtomicU64,
    total_moves: AtomicU64,
    dropped_assets: AtomicU64,
    rejected_jobs: AtomicU64,
}

impl RunStats {
    pub fn record_call(&self, is_reply: bool) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        if is_reply {
            self.proximity_replies.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn add_moves(&self, n: u32) {
        self.total_moves.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_dropped_asset(&self) {
        self.dropped_assets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_job(&self) {
        self.rejected_jobs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_calls(&self) -> u64 {
        self.total_calls.load(Ordering::Relaxed)
    }

    pub fn proximity_replies(&self) -> u64 {
        self.proximity_replies.load(Ordering::Relaxed)
    }

    pub fn total_moves(&self) -> u64 {
        self.total_moves.load(Ordering::Relaxed)
    }

    pub fn dropped_assets(&self) -> u64 {
        self.dropped_assets.load(Ordering::Relaxed)
    }

    pub fn rejected_jobs(&self) -> u64 {
        self.rejected_jobs.load(Ordering::Relaxed)
    }
}

/// Spawn the simulation loop on its own thread.
///
/// Each tick sleeps for the jittered cadence, advances the accelerated
/// clock, runs the decision pass, and hands call events to the render queue.
/// The loop never touches audio I/O; a full render pool or a missing asset
/// is logged and counted, and the tick goes on.
#[allow(clippy::too_many_arguments)]
pub fn spawn_sim(
    cfg: AppConfig,
    day_phase: DayPhase,
    start_tod: f32,
    bank: Arc<CallBank>,
    mixer: SpatialMixer,
    mut jobs: JobSender,
    snapshots: Sender<WorldFrame>,
    stats: Arc<RunStats>,
    stop: Arc<AtomicBool>,
    seed: Option<u64>,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("sim".into())
        .spawn(move || {
            let mut rng = match seed {
                Some(seed) => SmallRng::seed_from_u64(seed),
                None => SmallRng::from_rng(&mut rand::rng()),
            };
            let clock = SimClock::new(start_tod, cfg.simulation_time.time_scale);
            let available = bank.names();
            let mut population = Population::new(&cfg, &available, &mut rng);
            let started = Instant::now();

            while !stop.load(Ordering::Acquire) {
                let dt = jittered_tick(cfg.time_unit, cfg.time_randomization, &mut rng);
                std::thread::sleep(Duration::from_secs_f32(dt));

                let now = started.elapsed().as_secs_f64();
                let tod = clock.time_of_day();
                let tod_multiplier = day_phase.multiplier(tod);
                let outcome = population.tick(now, dt, tod_multiplier, &cfg, &available, &mut rng);
                stats.add_moves(outcome.moved);

                for event in outcome.calls {
                    stats.record_call(event.is_reply);
                    debug!(
                        rooster = event.rooster,
                        asset = %event.asset,
                        quadrant = ?event.position.quadrant(),
                        distance = event.position.distance(),
                        reply = event.is_reply,
                        "calling"
                    );
                    // The agent's calling state has already transitioned;
                    // audio trouble must not change behavior.
                    let Some(samples) = bank.get(&event.asset) else {
                        warn!("call asset {:?} not in bank, dropping sound", event.asset);
                        stats.record_dropped_asset();
                        continue;
                    };
                    let gains = mixer.place(event.position);
                    if jobs.try_enqueue(RenderJob::new(samples, gains)).is_err() {
                        warn!(
                            "render pool full, dropping call from rooster {}",
                            event.rooster
                        );
                        stats.record_rejected_job();
                    }
                }

                let _ = snapshots.try_send(WorldFrame {
                    elapsed: now,
                    tod_sec: tod,
                    tod_multiplier,
                    roosters: population.snapshot(),
                });
            }
        })
        .expect("spawn sim thread")
}

/// Tick length with cadence jitter: `time_unit * (1 +/- time_randomization)`.
fn jittered_tick<R: Rng + ?Sized>(time_unit: f32, randomization: f32, rng: &mut R) -> f32 {
    let jitter = if randomization > 0.0 {
        rng.random_range(-randomization..randomization)
    } else {
        0.0
    };
    (time_unit * (1.0 + jitter)).max(1e-3)
}
