use std::collections::HashMap;
use std::f32::consts::TAU;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

/// Decoded mono call samples by name, loaded and cached once at startup.
///
/// The real-time path only ever reads these buffers; nothing is decoded or
/// loaded after the bank is built. Samples from files with a different rate
/// are used as-is and noted in the log; the mixer treats them as opaque.
pub struct CallBank {
    calls: HashMap<String, Arc<[f32]>>,
    sample_rate: u32,
}

impl CallBank {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            calls: HashMap::new(),
            sample_rate,
        }
    }

    /// Scan a directory for `.wav` files and cache them keyed by file stem.
    /// A missing or empty directory is a warning, not an error.
    pub fn load_dir(dir: &Path, sample_rate: u32) -> Self {
        let mut bank = Self::new(sample_rate);
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("calls directory {} not readable: {err}", dir.display());
                return bank;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let is_wav = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("wav"))
                .unwrap_or(false);
            if !is_wav {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match load_wav_mono(&path) {
                Ok((samples, file_rate)) => {
                    if file_rate != sample_rate {
                        debug!(
                            "{}: file rate {file_rate} differs from output rate {sample_rate}",
                            path.display()
                        );
                    }
                    info!("loaded call {:?} ({} samples)", stem, samples.len());
                    bank.insert(stem, samples);
                }
                Err(err) => {
                    warn!("failed to load {}: {err}", path.display());
                }
            }
        }
        if bank.is_empty() {
            warn!(
                "no call files found in {}; synthetic tones will be used",
                dir.display()
            );
        }
        bank
    }

    pub fn insert(&mut self, name: &str, samples: Vec<f32>) {
        self.calls.insert(name.to_string(), samples.into());
    }

    /// When nothing was loaded, fill the bank with synthesized calls so the
    /// simulation is audible out of the box.
    pub fn ensure_synthetic_defaults(&mut self, default_call: &str) {
        if !self.is_empty() {
            return;
        }
        let base_freqs = [600.0, 550.0, 650.0, 580.0, 620.0];
        self.insert(
            default_call,
            synth_call(base_freqs[0], 2.0, self.sample_rate),
        );
        for (i, freq) in base_freqs[1..].iter().enumerate() {
            let name = format!("synthetic_call_{}", i + 1);
            self.insert(&name, synth_call(*freq, 2.0, self.sample_rate));
        }
        info!("synthesized {} fallback calls", self.calls.len());
    }

    pub fn get(&self, name: &str) -> Option<Arc<[f32]>> {
        self.calls.get(name).cloned()
    }

    /// Sorted for deterministic alternate-call draws under a fixed seed.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.calls.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

fn load_wav_mono(path: &Path) -> anyhow::Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<Vec<f32>, _>>()?
        }
    };
    Ok((downmix_to_mono(&samples, channels), spec.sample_rate))
}

/// Average interleaved channels down to mono.
fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Synthesize a frequency-wobbling tone that vaguely resembles a rooster
/// call, with fade-in and fade-out so playback start and eviction are
/// click-free.
pub fn synth_call(base_freq: f32, duration_sec: f32, sample_rate: u32) -> Vec<f32> {
    let n = (duration_sec * sample_rate as f32).max(1.0) as usize;
    let fade_in = ((0.05 * sample_rate as f32) as usize).min(n / 2).max(1);
    let fade_out = ((0.3 * sample_rate as f32) as usize).min(n / 2).max(1);
    (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let wobble = (TAU * 2.0 * t).sin() * 100.0;
            let mut s = (TAU * (base_freq + wobble) * t).sin() * 0.3;
            if i < fade_in {
                s *= i as f32 / fade_in as f32;
            }
            let remaining = n - i;
            if remaining <= fade_out {
                s *= remaining as f32 / fade_out as f32;
            }
            s
        })
        .collect()
}
