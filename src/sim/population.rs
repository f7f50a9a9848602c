use rand::Rng;
use tracing::debug;

use crate::config::AppConfig;
use crate::sim::position::Position;
use crate::sim::rooster::{CallEvent, Rooster, RoosterId, TickCtx};

/// Read-only view of one agent, published per tick for display consumers.
#[derive(Debug, Clone, Copy)]
pub struct RoosterView {
    pub id: RoosterId,
    pub angle: f32,
    pub distance: f32,
    pub calling: bool,
}

#[derive(Debug, Default)]
pub struct TickOutcome {
    pub calls: Vec<CallEvent>,
    pub moved: u32,
}

/// Owns every agent for the lifetime of the run; the population size is
/// fixed and ids are never reused.
pub struct Population {
    pub roosters: Vec<Rooster>,
}

impl Population {
    pub fn new<R: Rng + ?Sized>(cfg: &AppConfig, available: &[String], rng: &mut R) -> Self {
        let roosters: Vec<Rooster> = (0..cfg.num_roosters)
            .map(|i| Rooster::spawn(i as RoosterId, cfg, available, rng))
            .collect();
        for r in &roosters {
            debug!(
                id = r.traits.id,
                angle = r.position.angle(),
                distance = r.position.distance(),
                quadrant = ?r.position.quadrant(),
                curiosity = r.traits.curiosity,
                sticky = r.traits.sticky,
                "spawned rooster"
            );
        }
        Self { roosters }
    }

    pub fn len(&self) -> usize {
        self.roosters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roosters.is_empty()
    }

    /// One decision pass over every agent.
    ///
    /// Pass order matters: call expiry first, then movement, then a snapshot
    /// of who is (still) calling, then decisions. Calls started on this tick
    /// do not trigger same-tick replies.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        now: f64,
        dt: f32,
        tod_multiplier: f32,
        cfg: &AppConfig,
        available: &[String],
        rng: &mut R,
    ) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        for r in &mut self.roosters {
            r.expire_call(now, cfg.calling.call_duration);
        }

        for i in 0..self.roosters.len() {
            let ctx = TickCtx {
                now,
                dt,
                tod_multiplier,
                neighbor_calling: false,
            };
            if self.roosters[i].decide_move(&ctx, cfg, rng) {
                outcome.moved += 1;
            }
        }

        let calling_positions: Vec<(RoosterId, Position)> = self
            .roosters
            .iter()
            .filter(|r| r.is_calling())
            .map(|r| (r.traits.id, r.position))
            .collect();

        let trigger_distance = cfg.calling.proximity_response.trigger_distance;
        for i in 0..self.roosters.len() {
            let id = self.roosters[i].traits.id;
            let position = self.roosters[i].position;
            let neighbor_calling = calling_positions
                .iter()
                .any(|(other, pos)| *other != id && position.distance_to(pos) <= trigger_distance);
            let ctx = TickCtx {
                now,
                dt,
                tod_multiplier,
                neighbor_calling,
            };
            if let Some(event) = self.roosters[i].decide_call(&ctx, cfg, available, rng) {
                outcome.calls.push(event);
            }
        }

        outcome
    }

    pub fn snapshot(&self) -> Vec<RoosterView> {
        self.roosters
            .iter()
            .map(|r| RoosterView {
                id: r.traits.id,
                angle: r.position.angle(),
                distance: r.position.distance(),
                calling: r.is_calling(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::rooster::CallingState;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn quiet_cfg() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.num_roosters = 4;
        cfg.movement.frequency = 0.0;
        cfg.calling.frequency = 0.0;
        cfg.calling.time_of_day.enabled = false;
        cfg.calling.proximity_response.randomization = 0.0;
        cfg
    }

    #[test]
    fn population_size_is_fixed() {
        let cfg = quiet_cfg();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut pop = Population::new(&cfg, &[], &mut rng);
        assert_eq!(pop.len(), 4);
        for _ in 0..20 {
            pop.tick(0.0, 1.0, 1.0, &cfg, &[], &mut rng);
        }
        assert_eq!(pop.len(), 4);
    }

    #[test]
    fn ids_are_unique_and_stable() {
        let cfg = quiet_cfg();
        let mut rng = SmallRng::seed_from_u64(2);
        let pop = Population::new(&cfg, &[], &mut rng);
        let mut ids: Vec<_> = pop.roosters.iter().map(|r| r.traits.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn guaranteed_reply_cascades_from_a_calling_neighbor() {
        let mut cfg = quiet_cfg();
        cfg.calling.proximity_response.reply_likelihood = 1.0;
        cfg.calling.proximity_response.trigger_distance = 1000.0;
        let mut rng = SmallRng::seed_from_u64(3);
        let mut pop = Population::new(&cfg, &[], &mut rng);
        pop.roosters[0].calling = CallingState::Calling { started_at: 0.0 };

        let outcome = pop.tick(0.1, 1.0, 1.0, &cfg, &[], &mut rng);
        // Everyone except the already-calling agent replies.
        assert_eq!(outcome.calls.len(), 3);
        assert!(outcome.calls.iter().all(|c| c.is_reply));
        assert!(outcome.calls.iter().all(|c| c.rooster != 0));
    }

    #[test]
    fn out_of_range_caller_triggers_nobody() {
        let mut cfg = quiet_cfg();
        cfg.calling.proximity_response.reply_likelihood = 1.0;
        cfg.calling.proximity_response.trigger_distance = 0.0;
        let mut rng = SmallRng::seed_from_u64(4);
        let mut pop = Population::new(&cfg, &[], &mut rng);
        pop.roosters[0].calling = CallingState::Calling { started_at: 0.0 };

        // Distinct random positions are never exactly coincident, so a zero
        // trigger distance means no neighbor is in range.
        let outcome = pop.tick(0.1, 1.0, 1.0, &cfg, &[], &mut rng);
        assert!(outcome.calls.is_empty());
    }

    #[test]
    fn snapshot_reflects_calling_state() {
        let cfg = quiet_cfg();
        let mut rng = SmallRng::seed_from_u64(5);
        let mut pop = Population::new(&cfg, &[], &mut rng);
        pop.roosters[2].calling = CallingState::Calling { started_at: 0.0 };
        let snap = pop.snapshot();
        assert_eq!(snap.len(), 4);
        assert!(snap[2].calling);
        assert!(!snap[0].calling);
    }
}
