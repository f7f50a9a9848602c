use rand::Rng;

use crate::config::{AppConfig, CallsConfig};
use crate::sim::position::Position;

pub type RoosterId = u32;

/// Immutable personality drawn once at creation.
#[derive(Debug, Clone)]
pub struct Traits {
    pub id: RoosterId,
    /// Multiplier on movement probability; above 1.0 roams, below stays put.
    pub curiosity: f32,
    pub sticky: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CallingState {
    Idle,
    Calling { started_at: f64 },
}

/// A call decision made by one agent on one tick.
#[derive(Debug, Clone)]
pub struct CallEvent {
    pub rooster: RoosterId,
    pub asset: String,
    pub position: Position,
    pub is_reply: bool,
}

/// Per-tick environment for the decision pass.
#[derive(Debug, Clone, Copy)]
pub struct TickCtx {
    /// Real seconds since simulation start.
    pub now: f64,
    /// Jittered duration of this tick, real seconds.
    pub dt: f32,
    /// Day-phase multiplier for the current simulated time of day.
    pub tod_multiplier: f32,
    /// Whether any other agent is Calling within trigger distance.
    pub neighbor_calling: bool,
}

#[derive(Debug, Clone)]
pub struct Rooster {
    pub traits: Traits,
    pub position: Position,
    pub calling: CallingState,
    pub preferred_call: Option<String>,
}

/// Configured probabilities are rates per `time_unit` of real time; each
/// jittered tick scales them by its actual duration.
fn dt_factor(dt: f32, time_unit: f32) -> f32 {
    if time_unit > 0.0 { dt / time_unit } else { 0.0 }
}

fn pick_alternate<R: Rng + ?Sized>(available: &[String], rng: &mut R) -> Option<String> {
    if available.is_empty() {
        return None;
    }
    let idx = rng.random_range(0..available.len());
    Some(available[idx].clone())
}

impl Rooster {
    pub fn spawn<R: Rng + ?Sized>(
        id: RoosterId,
        cfg: &AppConfig,
        available: &[String],
        rng: &mut R,
    ) -> Self {
        let curiosity = {
            let c = &cfg.movement.curiosity;
            if c.max > c.min {
                rng.random_range(c.min..c.max)
            } else {
                c.min
            }
        };
        let stickiness = &cfg.calls.stickiness;
        let sticky = rng.random::<f32>() < stickiness.percentage_sticky_roosters;
        let preferred_call = if sticky {
            let alternate = if rng.random::<f32>() < stickiness.alternate_call_chance {
                pick_alternate(available, rng)
            } else {
                None
            };
            Some(alternate.unwrap_or_else(|| cfg.calls.default_call.clone()))
        } else {
            None
        };
        Self {
            traits: Traits {
                id,
                curiosity,
                sticky,
            },
            position: Position::random(rng, cfg.area.max_radius),
            calling: CallingState::Idle,
            preferred_call,
        }
    }

    pub fn is_calling(&self) -> bool {
        matches!(self.calling, CallingState::Calling { .. })
    }

    /// Calling -> Idle once the call duration has elapsed. Runs on every tick
    /// regardless of any decision.
    pub fn expire_call(&mut self, now: f64, call_duration: f32) {
        if let CallingState::Calling { started_at } = self.calling
            && now - started_at >= call_duration as f64
        {
            self.calling = CallingState::Idle;
        }
    }

    /// Movement decision: returns true when the agent walked this tick.
    pub fn decide_move<R: Rng + ?Sized>(
        &mut self,
        ctx: &TickCtx,
        cfg: &AppConfig,
        rng: &mut R,
    ) -> bool {
        let m = &cfg.movement;
        let p_move = (m.frequency
            * m.chance_to_move
            * self.traits.curiosity
            * dt_factor(ctx.dt, cfg.time_unit))
        .clamp(0.0, 1.0);
        if rng.random::<f32>() >= p_move {
            return false;
        }
        let step = if m.distance_max > m.distance_min {
            rng.random_range(m.distance_min..m.distance_max)
        } else {
            m.distance_min
        };
        self.position = self.position.walk(step, rng, cfg.area.max_radius);
        true
    }

    /// Calling decision. The proximity reply is evaluated at most once per
    /// tick, before the base draw, and an agent already Calling never draws
    /// at all until its call duration elapses.
    pub fn decide_call<R: Rng + ?Sized>(
        &mut self,
        ctx: &TickCtx,
        cfg: &AppConfig,
        available: &[String],
        rng: &mut R,
    ) -> Option<CallEvent> {
        if self.is_calling() {
            return None;
        }

        if ctx.neighbor_calling {
            let prox = &cfg.calling.proximity_response;
            let jitter = if prox.randomization > 0.0 {
                rng.random_range(-prox.randomization..prox.randomization)
            } else {
                0.0
            };
            let p_reply = (prox.reply_likelihood * (1.0 + jitter)).clamp(0.0, 1.0);
            if rng.random::<f32>() < p_reply {
                return Some(self.begin_call(ctx.now, &cfg.calls, available, rng, true));
            }
        }

        // Dawn multipliers can push this product past 1; the clamp keeps it a
        // valid probability.
        let p_call = (cfg.calling.frequency * ctx.tod_multiplier * dt_factor(ctx.dt, cfg.time_unit))
            .clamp(0.0, 1.0);
        if rng.random::<f32>() < p_call {
            return Some(self.begin_call(ctx.now, &cfg.calls, available, rng, false));
        }
        None
    }

    fn begin_call<R: Rng + ?Sized>(
        &mut self,
        now: f64,
        calls: &CallsConfig,
        available: &[String],
        rng: &mut R,
        is_reply: bool,
    ) -> CallEvent {
        self.calling = CallingState::Calling { started_at: now };
        let asset = self.choose_call(calls, available, rng);
        CallEvent {
            rooster: self.traits.id,
            asset,
            position: self.position,
            is_reply,
        }
    }

    /// Pick the asset for one call event, applying stickiness decay.
    pub fn choose_call<R: Rng + ?Sized>(
        &mut self,
        calls: &CallsConfig,
        available: &[String],
        rng: &mut R,
    ) -> String {
        match self.preferred_call.clone() {
            None => {
                if rng.random::<f32>() < calls.variation_probability
                    && let Some(alternate) = pick_alternate(available, rng)
                {
                    alternate
                } else {
                    calls.default_call.clone()
                }
            }
            Some(preferred) => {
                let chosen = if rng.random::<f32>() < calls.stickiness.alternate_call_chance
                    && let Some(alternate) = pick_alternate(available, rng)
                {
                    alternate
                } else {
                    preferred
                };
                // One-way decay: at most one reversion draw per call event.
                if rng.random::<f32>() < calls.stickiness.revert_to_default_chance {
                    self.preferred_call = None;
                }
                chosen
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn test_cfg() -> AppConfig {
        AppConfig::default()
    }

    fn idle_rooster(cfg: &AppConfig) -> Rooster {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut r = Rooster::spawn(0, cfg, &[], &mut rng);
        r.calling = CallingState::Idle;
        r.preferred_call = None;
        r
    }

    #[test]
    fn call_expires_after_duration() {
        let cfg = test_cfg();
        let mut r = idle_rooster(&cfg);
        r.calling = CallingState::Calling { started_at: 10.0 };
        r.expire_call(11.0, 2.0);
        assert!(r.is_calling(), "still inside call duration");
        r.expire_call(12.0, 2.0);
        assert!(!r.is_calling(), "call should have expired");
    }

    #[test]
    fn calling_agent_never_redraws() {
        let cfg = test_cfg();
        let mut r = idle_rooster(&cfg);
        r.calling = CallingState::Calling { started_at: 0.0 };
        let ctx = TickCtx {
            now: 0.5,
            dt: 1.0,
            tod_multiplier: 1000.0,
            neighbor_calling: true,
        };
        let mut rng = SmallRng::seed_from_u64(2);
        for _ in 0..200 {
            assert!(r.decide_call(&ctx, &cfg, &[], &mut rng).is_none());
        }
    }

    #[test]
    fn certain_probability_always_calls() {
        let mut cfg = test_cfg();
        cfg.calling.frequency = 1.0;
        cfg.calling.time_of_day.enabled = false;
        let mut r = idle_rooster(&cfg);
        let ctx = TickCtx {
            now: 0.0,
            dt: cfg.time_unit,
            tod_multiplier: 1.0,
            neighbor_calling: false,
        };
        let mut rng = SmallRng::seed_from_u64(3);
        let ev = r.decide_call(&ctx, &cfg, &[], &mut rng);
        assert!(ev.is_some());
        assert!(r.is_calling());
        assert!(!ev.unwrap().is_reply);
    }

    #[test]
    fn zero_dt_never_calls() {
        let mut cfg = test_cfg();
        cfg.calling.frequency = 1.0;
        let mut r = idle_rooster(&cfg);
        let ctx = TickCtx {
            now: 0.0,
            dt: 0.0,
            tod_multiplier: 100.0,
            neighbor_calling: false,
        };
        let mut rng = SmallRng::seed_from_u64(4);
        for _ in 0..100 {
            assert!(r.decide_call(&ctx, &cfg, &[], &mut rng).is_none());
        }
    }

    #[test]
    fn guaranteed_reply_is_flagged() {
        let mut cfg = test_cfg();
        cfg.calling.frequency = 0.0;
        cfg.calling.proximity_response.reply_likelihood = 1.0;
        cfg.calling.proximity_response.randomization = 0.0;
        let mut r = idle_rooster(&cfg);
        let ctx = TickCtx {
            now: 0.0,
            dt: 1.0,
            tod_multiplier: 1.0,
            neighbor_calling: true,
        };
        let mut rng = SmallRng::seed_from_u64(5);
        let ev = r.decide_call(&ctx, &cfg, &[], &mut rng).expect("reply");
        assert!(ev.is_reply);
    }

    #[test]
    fn movement_stays_within_area() {
        let mut cfg = test_cfg();
        cfg.movement.frequency = 1.0;
        cfg.movement.chance_to_move = 1.0;
        cfg.movement.curiosity.min = 1.0;
        cfg.movement.curiosity.max = 1.0;
        let mut rng = SmallRng::seed_from_u64(6);
        let mut r = Rooster::spawn(0, &cfg, &[], &mut rng);
        let ctx = TickCtx {
            now: 0.0,
            dt: cfg.time_unit,
            tod_multiplier: 1.0,
            neighbor_calling: false,
        };
        let mut moves = 0;
        for _ in 0..300 {
            if r.decide_move(&ctx, &cfg, &mut rng) {
                moves += 1;
            }
            assert!(r.position.distance() <= cfg.area.max_radius);
        }
        assert_eq!(moves, 300, "p=1 should move every tick");
    }

    #[test]
    fn non_sticky_uses_default_without_variation() {
        let mut cfg = test_cfg();
        cfg.calls.variation_probability = 0.0;
        let mut r = idle_rooster(&cfg);
        let available = vec!["a".to_string(), "b".to_string()];
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..50 {
            assert_eq!(
                r.choose_call(&cfg.calls, &available, &mut rng),
                cfg.calls.default_call
            );
        }
    }

    #[test]
    fn guaranteed_revert_clears_preference_after_one_call() {
        let mut cfg = test_cfg();
        cfg.calls.stickiness.alternate_call_chance = 0.0;
        cfg.calls.stickiness.revert_to_default_chance = 1.0;
        let mut r = idle_rooster(&cfg);
        r.preferred_call = Some("fancy".to_string());
        let mut rng = SmallRng::seed_from_u64(8);
        let chosen = r.choose_call(&cfg.calls, &[], &mut rng);
        assert_eq!(chosen, "fancy", "the reverting call still uses the preference");
        assert!(r.preferred_call.is_none(), "preference cleared afterwards");
    }
}
