use std::time::Instant;

use crate::sim::dayphase::SECONDS_PER_DAY;

/// Accelerated simulation clock.
///
/// The time of day is always recomputed from the real-time epoch instead of
/// being accumulated tick by tick, so cadence jitter can never drift it.
#[derive(Debug, Clone)]
pub struct SimClock {
    epoch: Instant,
    start_tod: f32,
    time_scale: f32,
}

impl SimClock {
    pub fn new(start_tod: f32, time_scale: f32) -> Self {
        Self {
            epoch: Instant::now(),
            start_tod,
            time_scale,
        }
    }

    /// Time of day in simulated seconds, wrapped to one day.
    pub fn time_of_day(&self) -> f32 {
        self.at(self.epoch.elapsed().as_secs_f64())
    }

    /// Pure mapping from elapsed real seconds to simulated time of day.
    pub fn at(&self, elapsed_real: f64) -> f32 {
        let tod = self.start_tod as f64 + elapsed_real * self.time_scale as f64;
        tod.rem_euclid(SECONDS_PER_DAY as f64) as f32
    }
}
