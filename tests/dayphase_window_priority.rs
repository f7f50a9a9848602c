use chanticleer::config::TimeOfDayConfig;
use chanticleer::sim::dayphase::{DayPhase, parse_time_of_day};

fn phase(cfg: &TimeOfDayConfig) -> DayPhase {
    DayPhase::from_config(cfg).expect("valid day-phase config")
}

#[test]
fn dawn_window_is_centered_on_dawn_time() {
    let cfg = TimeOfDayConfig::default(); // dawn 06:00, duration 1h
    let p = phase(&cfg);
    assert_eq!(
        p.multiplier(parse_time_of_day("05:45").unwrap()),
        cfg.dawn_multiplier
    );
    assert_eq!(
        p.multiplier(parse_time_of_day("06:15").unwrap()),
        cfg.dawn_multiplier
    );
    // Outside the half-duration window the curve is back to night.
    assert_eq!(
        p.multiplier(parse_time_of_day("06:45").unwrap()),
        cfg.nighttime_multiplier
    );
}

#[test]
fn half_hour_dawn_still_covers_six_oh_one() {
    let mut cfg = TimeOfDayConfig::default();
    cfg.dawn_duration = 0.5; // window 05:45..06:15
    let p = phase(&cfg);
    assert_eq!(
        p.multiplier(parse_time_of_day("06:01").unwrap()),
        cfg.dawn_multiplier
    );
    assert_eq!(
        p.multiplier(parse_time_of_day("06:16").unwrap()),
        cfg.nighttime_multiplier
    );
}

#[test]
fn dawn_wins_over_daylight_wherever_they_overlap() {
    let mut cfg = TimeOfDayConfig::default();
    cfg.dawn_time = "07:30".to_string();
    cfg.dawn_duration = 2.0; // 06:30..08:30, entirely inside daylight start
    cfg.daylight_start = "06:00".to_string();
    let p = phase(&cfg);
    for t in ["06:30", "07:30", "08:30"] {
        assert_eq!(
            p.multiplier(parse_time_of_day(t).unwrap()),
            cfg.dawn_multiplier,
            "dawn must override daylight at {t}"
        );
    }
    assert_eq!(
        p.multiplier(parse_time_of_day("08:31").unwrap()),
        cfg.daylight_multiplier
    );
}

#[test]
fn every_minute_of_the_day_maps_to_one_of_the_three_multipliers() {
    let cfg = TimeOfDayConfig::default();
    let p = phase(&cfg);
    let expected = [
        cfg.dawn_multiplier,
        cfg.daylight_multiplier,
        cfg.nighttime_multiplier,
    ];
    for minute in 0..(24 * 60) {
        let m = p.multiplier((minute * 60) as f32);
        assert!(expected.contains(&m), "minute {minute} produced {m}");
    }
}
