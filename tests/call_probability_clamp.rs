use chanticleer::config::AppConfig;
use chanticleer::sim::rooster::{CallingState, Rooster, TickCtx};
use rand::SeedableRng;
use rand::rngs::SmallRng;

/// `frequency * dawn_multiplier` can exceed 1; the combined probability must
/// clamp to a valid probability instead of misbehaving.
#[test]
fn overdriven_probability_degenerates_to_always_calling() {
    let mut cfg = AppConfig::default();
    cfg.calling.frequency = 0.5;
    let mut rng = SmallRng::seed_from_u64(1);
    let mut rooster = Rooster::spawn(0, &cfg, &[], &mut rng);
    rooster.preferred_call = None;

    let ctx = TickCtx {
        now: 0.0,
        dt: cfg.time_unit,
        tod_multiplier: 5.0, // product 2.5, clamped to 1.0
        neighbor_calling: false,
    };
    for i in 0..100 {
        rooster.calling = CallingState::Idle;
        let event = rooster.decide_call(&ctx, &cfg, &[], &mut rng);
        assert!(event.is_some(), "clamped p=1 must call on draw {i}");
    }
}

#[test]
fn multiplier_below_one_still_scales_down() {
    let mut cfg = AppConfig::default();
    cfg.calling.frequency = 0.4;
    let mut rng = SmallRng::seed_from_u64(2);
    let mut rooster = Rooster::spawn(0, &cfg, &[], &mut rng);
    rooster.preferred_call = None;

    let ctx = TickCtx {
        now: 0.0,
        dt: cfg.time_unit,
        tod_multiplier: 0.3, // nighttime: p = 0.12
        neighbor_calling: false,
    };
    let mut calls = 0;
    let trials = 5000;
    for _ in 0..trials {
        rooster.calling = CallingState::Idle;
        if rooster.decide_call(&ctx, &cfg, &[], &mut rng).is_some() {
            calls += 1;
        }
    }
    let rate = calls as f32 / trials as f32;
    assert!(
        (0.09..0.15).contains(&rate),
        "nighttime call rate {rate} not near 0.12"
    );
}
