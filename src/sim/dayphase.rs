use anyhow::{Result, bail};

use crate::config::TimeOfDayConfig;

pub const SECONDS_PER_DAY: f32 = 24.0 * 3600.0;

/// Parse `"HH:MM"` or `"HH:MM:SS"` into seconds from midnight.
pub fn parse_time_of_day(s: &str) -> Result<f32> {
    let mut parts = s.split(':');
    let hours: u32 = match parts.next().map(str::trim).map(str::parse) {
        Some(Ok(h)) => h,
        _ => bail!("invalid time of day {s:?}, expected HH:MM"),
    };
    let minutes: u32 = match parts.next().map(str::trim).map(str::parse) {
        Some(Ok(m)) => m,
        None => 0,
        _ => bail!("invalid time of day {s:?}, expected HH:MM"),
    };
    let seconds: u32 = match parts.next().map(str::trim).map(str::parse) {
        Some(Ok(sec)) => sec,
        None => 0,
        _ => bail!("invalid time of day {s:?}, expected HH:MM:SS"),
    };
    if parts.next().is_some() || hours >= 24 || minutes >= 60 || seconds >= 60 {
        bail!("invalid time of day {s:?}");
    }
    Ok((hours * 3600 + minutes * 60 + seconds) as f32)
}

pub fn format_time_of_day(tod_sec: f32) -> String {
    let total = tod_sec.rem_euclid(SECONDS_PER_DAY) as u32;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Day-phase calling-frequency curve with resolved window boundaries.
///
/// The three windows are checked in fixed priority order, dawn before
/// daylight before night, with no blending at the edges. A one-tick jump in
/// calling frequency at a window boundary is accepted behavior.
#[derive(Debug, Clone, Copy)]
pub struct DayPhase {
    enabled: bool,
    dawn_start: f32,
    dawn_end: f32,
    dawn_multiplier: f32,
    daylight_start: f32,
    daylight_end: f32,
    daylight_multiplier: f32,
    nighttime_multiplier: f32,
}

impl DayPhase {
    pub fn from_config(cfg: &TimeOfDayConfig) -> Result<Self> {
        let dawn_center = parse_time_of_day(&cfg.dawn_time)?;
        let half_window = cfg.dawn_duration * 3600.0 / 2.0;
        Ok(Self {
            enabled: cfg.enabled,
            dawn_start: (dawn_center - half_window).rem_euclid(SECONDS_PER_DAY),
            dawn_end: (dawn_center + half_window).rem_euclid(SECONDS_PER_DAY),
            dawn_multiplier: cfg.dawn_multiplier,
            daylight_start: parse_time_of_day(&cfg.daylight_start)?,
            daylight_end: parse_time_of_day(&cfg.daylight_end)?,
            daylight_multiplier: cfg.daylight_multiplier,
            nighttime_multiplier: cfg.nighttime_multiplier,
        })
    }

    pub fn multiplier(&self, tod_sec: f32) -> f32 {
        if !self.enabled {
            return 1.0;
        }
        let t = tod_sec.rem_euclid(SECONDS_PER_DAY);
        if in_window(t, self.dawn_start, self.dawn_end) {
            self.dawn_multiplier
        } else if in_window(t, self.daylight_start, self.daylight_end) {
            self.daylight_multiplier
        } else {
            self.nighttime_multiplier
        }
    }
}

/// Inclusive window test that wraps across midnight when `start > end`.
fn in_window(t: f32, start: f32, end: f32) -> bool {
    if start <= end {
        t >= start && t <= end
    } else {
        t >= start || t <= end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase(cfg: &TimeOfDayConfig) -> DayPhase {
        DayPhase::from_config(cfg).expect("valid config")
    }

    fn at(h: u32, m: u32) -> f32 {
        (h * 3600 + m * 60) as f32
    }

    #[test]
    fn parses_hh_mm_and_hh_mm_ss() {
        assert_eq!(parse_time_of_day("06:00").unwrap(), 21_600.0);
        assert_eq!(parse_time_of_day("23:59:30").unwrap(), 86_370.0);
        assert!(parse_time_of_day("24:00").is_err());
        assert!(parse_time_of_day("6h30").is_err());
        assert!(parse_time_of_day("").is_err());
    }

    #[test]
    fn dawn_window_spans_half_duration_each_side() {
        let cfg = TimeOfDayConfig::default();
        let p = phase(&cfg);
        // dawn 06:00, duration 1h -> window 05:30..06:30
        assert_eq!(p.multiplier(at(5, 45)), cfg.dawn_multiplier);
        assert_eq!(p.multiplier(at(6, 29)), cfg.dawn_multiplier);
        assert_eq!(p.multiplier(at(5, 29)), cfg.nighttime_multiplier);
    }

    #[test]
    fn daylight_then_night() {
        let cfg = TimeOfDayConfig::default();
        let p = phase(&cfg);
        assert_eq!(p.multiplier(at(12, 0)), cfg.daylight_multiplier);
        assert_eq!(p.multiplier(at(18, 0)), cfg.daylight_multiplier);
        assert_eq!(p.multiplier(at(18, 1)), cfg.nighttime_multiplier);
        assert_eq!(p.multiplier(at(2, 0)), cfg.nighttime_multiplier);
    }

    #[test]
    fn dawn_takes_priority_over_daylight() {
        let mut cfg = TimeOfDayConfig::default();
        cfg.dawn_time = "08:00".to_string();
        cfg.daylight_start = "07:00".to_string();
        let p = phase(&cfg);
        assert_eq!(p.multiplier(at(8, 0)), cfg.dawn_multiplier);
        assert_eq!(p.multiplier(at(8, 29)), cfg.dawn_multiplier);
        assert_eq!(p.multiplier(at(8, 31)), cfg.daylight_multiplier);
    }

    #[test]
    fn dawn_window_wraps_midnight() {
        let mut cfg = TimeOfDayConfig::default();
        cfg.dawn_time = "00:15".to_string();
        let p = phase(&cfg);
        // window 23:45..00:45
        assert_eq!(p.multiplier(at(23, 50)), cfg.dawn_multiplier);
        assert_eq!(p.multiplier(at(0, 40)), cfg.dawn_multiplier);
        assert_eq!(p.multiplier(at(1, 0)), cfg.nighttime_multiplier);
    }

    #[test]
    fn disabled_curve_is_flat() {
        let mut cfg = TimeOfDayConfig::default();
        cfg.enabled = false;
        let p = phase(&cfg);
        for h in 0..24 {
            assert_eq!(p.multiplier(at(h, 0)), 1.0);
        }
    }

    #[test]
    fn multiplier_is_always_one_of_the_three() {
        let cfg = TimeOfDayConfig::default();
        let p = phase(&cfg);
        let expected = [
            cfg.dawn_multiplier,
            cfg.daylight_multiplier,
            cfg.nighttime_multiplier,
        ];
        let mut t = 0.0;
        while t < SECONDS_PER_DAY {
            let m = p.multiplier(t);
            assert!(expected.contains(&m), "unexpected multiplier {m} at {t}");
            t += 61.0;
        }
    }
}
