use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::sim::dayphase::parse_time_of_day;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementConfig {
    #[serde(default = "MovementConfig::default_frequency")]
    pub frequency: f32,
    #[serde(default = "MovementConfig::default_chance_to_move")]
    pub chance_to_move: f32,
    #[serde(default = "MovementConfig::default_distance_min")]
    pub distance_min: f32,
    #[serde(default = "MovementConfig::default_distance_max")]
    pub distance_max: f32,
    #[serde(default)]
    pub curiosity: CuriosityConfig,
}

impl MovementConfig {
    fn default_frequency() -> f32 {
        0.5
    }
    fn default_chance_to_move() -> f32 {
        0.3
    }
    fn default_distance_min() -> f32 {
        1.0
    }
    fn default_distance_max() -> f32 {
        10.0
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            frequency: Self::default_frequency(),
            chance_to_move: Self::default_chance_to_move(),
            distance_min: Self::default_distance_min(),
            distance_max: Self::default_distance_max(),
            curiosity: CuriosityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuriosityConfig {
    #[serde(default = "CuriosityConfig::default_min")]
    pub min: f32,
    #[serde(default = "CuriosityConfig::default_max")]
    pub max: f32,
}

impl CuriosityConfig {
    fn default_min() -> f32 {
        0.5
    }
    fn default_max() -> f32 {
        1.5
    }
}

impl Default for CuriosityConfig {
    fn default() -> Self {
        Self {
            min: Self::default_min(),
            max: Self::default_max(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProximityConfig {
    #[serde(default = "ProximityConfig::default_reply_likelihood")]
    pub reply_likelihood: f32,
    #[serde(default = "ProximityConfig::default_trigger_distance")]
    pub trigger_distance: f32,
    #[serde(default = "ProximityConfig::default_randomization")]
    pub randomization: f32,
}

impl ProximityConfig {
    fn default_reply_likelihood() -> f32 {
        0.3
    }
    fn default_trigger_distance() -> f32 {
        20.0
    }
    fn default_randomization() -> f32 {
        0.2
    }
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            reply_likelihood: Self::default_reply_likelihood(),
            trigger_distance: Self::default_trigger_distance(),
            randomization: Self::default_randomization(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeOfDayConfig {
    #[serde(default = "TimeOfDayConfig::default_enabled")]
    pub enabled: bool,
    #[serde(default = "TimeOfDayConfig::default_dawn_time")]
    pub dawn_time: String,
    /// Dawn window length in hours, centered on `dawn_time`.
    #[serde(default = "TimeOfDayConfig::default_dawn_duration")]
    pub dawn_duration: f32,
    #[serde(default = "TimeOfDayConfig::default_dawn_multiplier")]
    pub dawn_multiplier: f32,
    #[serde(default = "TimeOfDayConfig::default_daylight_start")]
    pub daylight_start: String,
    #[serde(default = "TimeOfDayConfig::default_daylight_end")]
    pub daylight_end: String,
    #[serde(default = "TimeOfDayConfig::default_daylight_multiplier")]
    pub daylight_multiplier: f32,
    #[serde(default = "TimeOfDayConfig::default_nighttime_multiplier")]
    pub nighttime_multiplier: f32,
}

impl TimeOfDayConfig {
    fn default_enabled() -> bool {
        true
    }
    fn default_dawn_time() -> String {
        "06:00".to_string()
    }
    fn default_dawn_duration() -> f32 {
        1.0
    }
    fn default_dawn_multiplier() -> f32 {
        5.0
    }
    fn default_daylight_start() -> String {
        "07:00".to_string()
    }
    fn default_daylight_end() -> String {
        "18:00".to_string()
    }
    fn default_daylight_multiplier() -> f32 {
        1.5
    }
    fn default_nighttime_multiplier() -> f32 {
        0.3
    }
}

impl Default for TimeOfDayConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            dawn_time: Self::default_dawn_time(),
            dawn_duration: Self::default_dawn_duration(),
            dawn_multiplier: Self::default_dawn_multiplier(),
            daylight_start: Self::default_daylight_start(),
            daylight_end: Self::default_daylight_end(),
            daylight_multiplier: Self::default_daylight_multiplier(),
            nighttime_multiplier: Self::default_nighttime_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallingConfig {
    #[serde(default = "CallingConfig::default_frequency")]
    pub frequency: f32,
    /// How long one call keeps an agent in the Calling state, in seconds.
    #[serde(default = "CallingConfig::default_call_duration")]
    pub call_duration: f32,
    #[serde(default)]
    pub proximity_response: ProximityConfig,
    #[serde(default)]
    pub time_of_day: TimeOfDayConfig,
}

impl CallingConfig {
    fn default_frequency() -> f32 {
        0.1
    }
    fn default_call_duration() -> f32 {
        2.0
    }
}

impl Default for CallingConfig {
    fn default() -> Self {
        Self {
            frequency: Self::default_frequency(),
            call_duration: Self::default_call_duration(),
            proximity_response: ProximityConfig::default(),
            time_of_day: TimeOfDayConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaConfig {
    #[serde(default = "AreaConfig::default_max_radius")]
    pub max_radius: f32,
    #[serde(default = "AreaConfig::default_distance_steps")]
    pub distance_steps: u32,
}

impl AreaConfig {
    fn default_max_radius() -> f32 {
        50.0
    }
    fn default_distance_steps() -> u32 {
        5
    }
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self {
            max_radius: Self::default_max_radius(),
            distance_steps: Self::default_distance_steps(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StickinessConfig {
    #[serde(default = "StickinessConfig::default_percentage_sticky_roosters")]
    pub percentage_sticky_roosters: f32,
    #[serde(default = "StickinessConfig::default_alternate_call_chance")]
    pub alternate_call_chance: f32,
    #[serde(default = "StickinessConfig::default_revert_to_default_chance")]
    pub revert_to_default_chance: f32,
}

impl StickinessConfig {
    fn default_percentage_sticky_roosters() -> f32 {
        0.3
    }
    fn default_alternate_call_chance() -> f32 {
        0.5
    }
    fn default_revert_to_default_chance() -> f32 {
        0.1
    }
}

impl Default for StickinessConfig {
    fn default() -> Self {
        Self {
            percentage_sticky_roosters: Self::default_percentage_sticky_roosters(),
            alternate_call_chance: Self::default_alternate_call_chance(),
            revert_to_default_chance: Self::default_revert_to_default_chance(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallsConfig {
    #[serde(default = "CallsConfig::default_default_call")]
    pub default_call: String,
    #[serde(default = "CallsConfig::default_variation_probability")]
    pub variation_probability: f32,
    #[serde(default)]
    pub stickiness: StickinessConfig,
}

impl CallsConfig {
    fn default_default_call() -> String {
        "rooster_call_1".to_string()
    }
    fn default_variation_probability() -> f32 {
        0.2
    }
}

impl Default for CallsConfig {
    fn default() -> Self {
        Self {
            default_call: Self::default_default_call(),
            variation_probability: Self::default_variation_probability(),
            stickiness: StickinessConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeConfig {
    #[serde(default = "VolumeConfig::default_min_volume")]
    pub min_volume: f32,
    #[serde(default = "VolumeConfig::default_max_volume")]
    pub max_volume: f32,
}

impl VolumeConfig {
    fn default_min_volume() -> f32 {
        0.1
    }
    fn default_max_volume() -> f32 {
        1.0
    }
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            min_volume: Self::default_min_volume(),
            max_volume: Self::default_max_volume(),
        }
    }
}

/// Speaker gain fractions used by the spatial mixer. `primary` and
/// `adjacent_bleed` anchor the panning kernel at a sector center; the kernel
/// interpolates between them so a source crossing a sector boundary fades
/// instead of jump-cutting between speakers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixConfig {
    #[serde(default = "MixConfig::default_primary")]
    pub primary: f32,
    #[serde(default = "MixConfig::default_adjacent_bleed")]
    pub adjacent_bleed: f32,
    #[serde(default = "MixConfig::default_center_bleed")]
    pub center_bleed: f32,
    #[serde(default = "MixConfig::default_lfe")]
    pub lfe: f32,
    #[serde(default = "MixConfig::default_downmix_share")]
    pub downmix_share: f32,
}

impl MixConfig {
    fn default_primary() -> f32 {
        0.8
    }
    fn default_adjacent_bleed() -> f32 {
        0.2
    }
    fn default_center_bleed() -> f32 {
        0.2
    }
    fn default_lfe() -> f32 {
        0.15
    }
    fn default_downmix_share() -> f32 {
        0.7
    }
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            primary: Self::default_primary(),
            adjacent_bleed: Self::default_adjacent_bleed(),
            center_bleed: Self::default_center_bleed(),
            lfe: Self::default_lfe(),
            downmix_share: Self::default_downmix_share(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GuardSetting {
    None,
    SoftClip,
    PeakLimiter,
}

impl Default for GuardSetting {
    fn default() -> Self {
        Self::PeakLimiter
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "AudioConfig::default_sample_rate")]
    pub sample_rate: u32,
    /// Requested output channels: 6 for 5.1, anything the device cannot
    /// provide falls back to stereo at initialization.
    #[serde(default = "AudioConfig::default_channels")]
    pub channels: u16,
    /// Maximum number of concurrently playing calls; further enqueues are
    /// rejected (drop-newest) and reported to the caller.
    #[serde(default = "AudioConfig::default_max_polyphony")]
    pub max_polyphony: usize,
    #[serde(default)]
    pub volume: VolumeConfig,
    #[serde(default)]
    pub mix: MixConfig,
    #[serde(default)]
    pub output_guard: GuardSetting,
}

impl AudioConfig {
    fn default_sample_rate() -> u32 {
        48_000
    }
    fn default_channels() -> u16 {
        6
    }
    fn default_max_polyphony() -> usize {
        32
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: Self::default_sample_rate(),
            channels: Self::default_channels(),
            max_polyphony: Self::default_max_polyphony(),
            volume: VolumeConfig::default(),
            mix: MixConfig::default(),
            output_guard: GuardSetting::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationTimeConfig {
    #[serde(default = "SimulationTimeConfig::default_start_time")]
    pub start_time: String,
    /// Simulated seconds per real second.
    #[serde(default = "SimulationTimeConfig::default_time_scale")]
    pub time_scale: f32,
}

impl SimulationTimeConfig {
    fn default_start_time() -> String {
        "06:00".to_string()
    }
    fn default_time_scale() -> f32 {
        60.0
    }
}

impl Default for SimulationTimeConfig {
    fn default() -> Self {
        Self {
            start_time: Self::default_start_time(),
            time_scale: Self::default_time_scale(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "AppConfig::default_num_roosters")]
    pub num_roosters: usize,
    /// Base tick length of the simulation loop, in real seconds.
    #[serde(default = "AppConfig::default_time_unit")]
    pub time_unit: f32,
    /// Cadence jitter: each tick sleeps `time_unit * (1 +/- time_randomization)`.
    #[serde(default = "AppConfig::default_time_randomization")]
    pub time_randomization: f32,
    #[serde(default)]
    pub movement: MovementConfig,
    #[serde(default)]
    pub calling: CallingConfig,
    #[serde(default)]
    pub area: AreaConfig,
    #[serde(default)]
    pub calls: CallsConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub simulation_time: SimulationTimeConfig,
}

impl AppConfig {
    fn default_num_roosters() -> usize {
        8
    }
    fn default_time_unit() -> f32 {
        1.0
    }
    fn default_time_randomization() -> f32 {
        0.2
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            num_roosters: Self::default_num_roosters(),
            time_unit: Self::default_time_unit(),
            time_randomization: Self::default_time_randomization(),
            movement: MovementConfig::default(),
            calling: CallingConfig::default(),
            area: AreaConfig::default(),
            calls: CallsConfig::default(),
            audio: AudioConfig::default(),
            simulation_time: SimulationTimeConfig::default(),
        }
    }
}

fn ensure_probability(value: f32, name: &str) -> Result<()> {
    ensure!(
        (0.0..=1.0).contains(&value),
        "{name} must be a probability in [0, 1], got {value}"
    );
    Ok(())
}

impl AppConfig {
    /// Reject malformed values up front. Runtime probability clamping
    /// (day-phase multipliers can push the combined call probability past 1)
    /// is a documented behavior of the decision pass, never of the loader.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.num_roosters >= 1, "num_roosters must be at least 1");
        ensure!(
            self.time_unit > 0.0 && self.time_unit.is_finite(),
            "time_unit must be positive, got {}",
            self.time_unit
        );
        ensure_probability(self.time_randomization, "time_randomization")?;

        let m = &self.movement;
        ensure_probability(m.frequency, "movement.frequency")?;
        ensure_probability(m.chance_to_move, "movement.chance_to_move")?;
        ensure!(
            m.distance_min >= 0.0,
            "movement.distance_min must be non-negative, got {}",
            m.distance_min
        );
        ensure!(
            m.distance_max >= m.distance_min,
            "movement.distance_max ({}) must be >= distance_min ({})",
            m.distance_max,
            m.distance_min
        );
        ensure!(
            m.curiosity.min > 0.0 && m.curiosity.max >= m.curiosity.min,
            "movement.curiosity range must satisfy 0 < min <= max, got [{}, {}]",
            m.curiosity.min,
            m.curiosity.max
        );

        let c = &self.calling;
        ensure_probability(c.frequency, "calling.frequency")?;
        ensure!(
            c.call_duration > 0.0,
            "calling.call_duration must be positive, got {}",
            c.call_duration
        );
        ensure_probability(
            c.proximity_response.reply_likelihood,
            "calling.proximity_response.reply_likelihood",
        )?;
        ensure!(
            c.proximity_response.trigger_distance >= 0.0,
            "calling.proximity_response.trigger_distance must be non-negative"
        );
        ensure_probability(
            c.proximity_response.randomization,
            "calling.proximity_response.randomization",
        )?;
        let tod = &c.time_of_day;
        ensure!(
            tod.dawn_duration >= 0.0,
            "time_of_day.dawn_duration must be non-negative, got {}",
            tod.dawn_duration
        );
        for (value, name) in [
            (tod.dawn_multiplier, "dawn_multiplier"),
            (tod.daylight_multiplier, "daylight_multiplier"),
            (tod.nighttime_multiplier, "nighttime_multiplier"),
        ] {
            ensure!(
                value > 0.0 && value.is_finite(),
                "time_of_day.{name} must be positive, got {value}"
            );
        }
        parse_time_of_day(&tod.dawn_time).context("time_of_day.dawn_time")?;
        parse_time_of_day(&tod.daylight_start).context("time_of_day.daylight_start")?;
        parse_time_of_day(&tod.daylight_end).context("time_of_day.daylight_end")?;

        ensure!(
            self.area.max_radius > 0.0 && self.area.max_radius.is_finite(),
            "area.max_radius must be positive, got {}",
            self.area.max_radius
        );
        ensure!(
            self.area.distance_steps >= 1,
            "area.distance_steps must be at least 1"
        );

        let calls = &self.calls;
        ensure!(
            !calls.default_call.is_empty(),
            "calls.default_call must not be empty"
        );
        ensure_probability(calls.variation_probability, "calls.variation_probability")?;
        ensure_probability(
            calls.stickiness.percentage_sticky_roosters,
            "calls.stickiness.percentage_sticky_roosters",
        )?;
        ensure_probability(
            calls.stickiness.alternate_call_chance,
            "calls.stickiness.alternate_call_chance",
        )?;
        ensure_probability(
            calls.stickiness.revert_to_default_chance,
            "calls.stickiness.revert_to_default_chance",
        )?;

        let a = &self.audio;
        ensure!(a.sample_rate > 0, "audio.sample_rate must be positive");
        ensure!(
            a.channels == 2 || a.channels == 6,
            "audio.channels must be 2 (stereo) or 6 (5.1), got {}",
            a.channels
        );
        ensure!(
            a.max_polyphony >= 1,
            "audio.max_polyphony must be at least 1"
        );
        ensure!(
            a.volume.min_volume >= 0.0 && a.volume.max_volume >= a.volume.min_volume,
            "audio.volume must satisfy 0 <= min_volume <= max_volume, got [{}, {}]",
            a.volume.min_volume,
            a.volume.max_volume
        );
        let mix = &a.mix;
        for (value, name) in [
            (mix.primary, "primary"),
            (mix.adjacent_bleed, "adjacent_bleed"),
            (mix.center_bleed, "center_bleed"),
            (mix.lfe, "lfe"),
            (mix.downmix_share, "downmix_share"),
        ] {
            ensure!(
                (0.0..=1.0).contains(&value),
                "audio.mix.{name} must be in [0, 1], got {value}"
            );
        }
        ensure!(
            mix.adjacent_bleed <= mix.primary,
            "audio.mix.adjacent_bleed ({}) must not exceed primary ({})",
            mix.adjacent_bleed,
            mix.primary
        );

        parse_time_of_day(&self.simulation_time.start_time).context("simulation_time.start_time")?;
        ensure!(
            self.simulation_time.time_scale > 0.0 && self.simulation_time.time_scale.is_finite(),
            "simulation_time.time_scale must be positive, got {}",
            self.simulation_time.time_scale
        );
        Ok(())
    }

    /// Load a config file, or write a fully commented default file and
    /// return defaults when it does not exist yet.
    pub fn load_or_default(path: &str) -> Result<Self> {
        let path_obj = Path::new(path);
        if path_obj.exists() {
            let contents = fs::read_to_string(path_obj)
                .with_context(|| format!("failed to read config {path}"))?;
            return toml::from_str(&contents)
                .with_context(|| format!("failed to parse config {path}"));
        }

        let default_cfg = Self::default();
        match toml::to_string_pretty(&default_cfg) {
            Ok(text) => {
                let mut commented = String::new();
                for line in text.lines() {
                    let trimmed = line.trim();
                    if trimmed.is_empty() || (trimmed.starts_with('[') && trimmed.ends_with(']')) {
                        commented.push_str(line);
                    } else {
                        commented.push_str("# ");
                        commented.push_str(line);
                    }
                    commented.push('\n');
                }
                if let Err(err) = fs::write(path_obj, commented) {
                    tracing::warn!("failed to write default config to {path}: {err}");
                }
            }
            Err(err) => {
                tracing::warn!("failed to serialize default config: {err}");
            }
        }
        Ok(default_cfg)
    }
}
