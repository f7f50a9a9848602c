use crate::config::GuardSetting;

const CEILING: f32 = 0.98;
const SOFT_CLIP_DRIVE: f32 = 2.0;
const ATTACK_MS: f32 = 0.5;
const RELEASE_MS: f32 = 50.0;

/// Final safety stage over the mixed frame: overlapping calls can sum past
/// full scale, and the guard keeps the output inside the ceiling.
#[derive(Debug)]
pub enum OutputGuard {
    None,
    SoftClip,
    PeakLimiter {
        attack_coeff: f32,
        release_coeff: f32,
        gain: f32,
    },
}

impl OutputGuard {
    pub fn from_setting(setting: &GuardSetting, sample_rate: u32) -> Self {
        match setting {
            GuardSetting::None => Self::None,
            GuardSetting::SoftClip => Self::SoftClip,
            GuardSetting::PeakLimiter => {
                let sample_rate = (sample_rate as f32).max(1.0);
                Self::PeakLimiter {
                    attack_coeff: time_to_coeff(ATTACK_MS, sample_rate),
                    release_coeff: time_to_coeff(RELEASE_MS, sample_rate),
                    gain: 1.0,
                }
            }
        }
    }

    /// Runs on the audio callback; no allocation, no blocking.
    pub fn process(&mut self, frames: &mut [f32], channels: usize) {
        if frames.is_empty() || channels == 0 {
            return;
        }
        match self {
            Self::None => {}
            Self::SoftClip => {
                for s in frames.iter_mut() {
                    let x = if s.is_finite() { *s } else { 0.0 };
                    *s = (x * SOFT_CLIP_DRIVE).tanh() * CEILING;
                }
            }
            Self::PeakLimiter {
                attack_coeff,
                release_coeff,
                gain,
            } => {
                let n_frames = frames.len() / channels;
                for frame in 0..n_frames {
                    let base = frame * channels;
                    let mut peak = 0.0f32;
                    for s in &frames[base..base + channels] {
                        let abs = if s.is_finite() { s.abs() } else { 0.0 };
                        peak = peak.max(abs);
                    }
                    let target = if peak > CEILING { CEILING / peak } else { 1.0 };
                    // All channels share one gain so the image does not shift
                    // while the limiter engages.
                    *gain = if target < *gain {
                        *attack_coeff * *gain + (1.0 - *attack_coeff) * target
                    } else {
                        *release_coeff * *gain + (1.0 - *release_coeff) * target
                    };
                    for s in frames[base..base + channels].iter_mut() {
                        let x = if s.is_finite() { *s } else { 0.0 };
                        *s = (x * *gain).clamp(-CEILING, CEILING);
                    }
                }
            }
        }
    }
}

fn time_to_coeff(time_ms: f32, sample_rate: f32) -> f32 {
    let time_s = time_ms.max(0.0) * 0.001;
    if time_s <= 0.0 {
        0.0
    } else {
        (-1.0 / (time_s * sample_rate)).exp()
    }
}
