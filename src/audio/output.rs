use std::panic::AssertUnwindSafe;

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::HeapProd;
use ringbuf::traits::Producer;
use tracing::{info, warn};

use crate::audio::guard::OutputGuard;
use crate::audio::render::RenderEngine;
use crate::audio::spatial::ChannelLayout;

/// Opened output device plus the layout chosen for it.
pub struct OutputDevice {
    device: cpal::Device,
    pub config: cpal::StreamConfig,
    pub layout: ChannelLayout,
}

impl OutputDevice {
    pub fn channels(&self) -> usize {
        self.config.channels as usize
    }
}

/// Open the default output device, preferring the requested channel count
/// and falling back to stereo automatically when the device cannot provide
/// it. The fallback is a normal outcome, not an error.
pub fn open_output(requested_channels: u16, sample_rate: u32) -> Result<OutputDevice> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("no audio output device available")?;

    let config = match pick_config(&device, requested_channels, sample_rate) {
        Some(config) => config,
        None => {
            if requested_channels > 2 {
                warn!(
                    "device cannot open {requested_channels} channels at {sample_rate} Hz, falling back to stereo"
                );
            }
            match pick_config(&device, 2, sample_rate) {
                Some(config) => config,
                None => device
                    .default_output_config()
                    .context("no usable output configuration")?
                    .config(),
            }
        }
    };

    let layout = ChannelLayout::from_device_channels(config.channels);
    info!(
        "audio output: {} Hz, {} channels ({})",
        config.sample_rate.0,
        config.channels,
        match layout {
            ChannelLayout::FiveOne => "5.1 surround",
            ChannelLayout::Stereo => "stereo",
        }
    );
    Ok(OutputDevice {
        device,
        config,
        layout,
    })
}

fn pick_config(
    device: &cpal::Device,
    min_channels: u16,
    sample_rate: u32,
) -> Option<cpal::StreamConfig> {
    let ranges = device.supported_output_configs().ok()?;
    for range in ranges {
        if range.channels() >= min_channels
            && range.min_sample_rate().0 <= sample_rate
            && sample_rate <= range.max_sample_rate().0
        {
            let mut config = range.with_sample_rate(cpal::SampleRate(sample_rate)).config();
            config.buffer_size = cpal::BufferSize::Default;
            return Some(config);
        }
    }
    None
}

/// Build and start the output stream.
///
/// The callback owns the render engine and guard outright; its only shared
/// state is the SPSC job queue and the drain flag. Any panic inside the fill
/// path is caught and converted into one silent buffer, because an unwind
/// across the callback boundary would abort the whole stream.
pub fn build_stream(
    output: OutputDevice,
    mut engine: RenderEngine,
    mut guard: OutputGuard,
    mut wav_tap: Option<HeapProd<f32>>,
) -> Result<cpal::Stream> {
    let channels = output.channels();
    let stream = output.device.build_output_stream(
        &output.config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let filled = std::panic::catch_unwind(AssertUnwindSafe(|| {
                engine.fill(data);
                guard.process(data, channels);
                if let Some(tap) = wav_tap.as_mut() {
                    // Drops samples when the writer falls behind; the tap is
                    // diagnostics, never allowed to stall the callback.
                    let _ = tap.push_slice(data);
                }
            }));
            if filled.is_err() {
                data.fill(0.0);
            }
        },
        |err| warn!("output stream error: {err}"),
        None,
    )?;
    stream.play()?;
    Ok(stream)
}

/// Print the available output devices (CLI `--list-devices`).
pub fn list_devices() -> Result<()> {
    let host = cpal::default_host();
    println!("Available audio output devices:");
    for device in host.output_devices()? {
        let name = device.name().unwrap_or_else(|_| "<unknown>".to_string());
        match device.default_output_config() {
            Ok(config) => println!(
                "  {name}: {} ch @ {} Hz",
                config.channels(),
                config.sample_rate().0
            ),
            Err(_) => println!("  {name}: no default output config"),
        }
    }
    Ok(())
}
