use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::bounded;
use ringbuf::HeapRb;
use ringbuf::traits::Split;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chanticleer::audio::assets::CallBank;
use chanticleer::audio::guard::OutputGuard;
use chanticleer::audio::output;
use chanticleer::audio::render::{JobSender, RenderEngine, RenderJob, job_queue};
use chanticleer::audio::spatial::SpatialMixer;
use chanticleer::audio::writer::WavTee;
use chanticleer::cli::Args;
use chanticleer::config::AppConfig;
use chanticleer::sim::dayphase::{DayPhase, format_time_of_day, parse_time_of_day};
use chanticleer::sim::position::{Position, Quadrant};
use chanticleer::sim::runner::{self, RunStats, WorldFrame};

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if args.list_devices {
        return output::list_devices();
    }

    let cfg = AppConfig::load_or_default(&args.config)?;
    cfg.validate().context("invalid configuration")?;
    let day_phase = DayPhase::from_config(&cfg.calling.time_of_day)?;
    let start_tod = parse_time_of_day(&cfg.simulation_time.start_time)?;

    let mut bank = CallBank::load_dir(Path::new(&args.calls_dir), cfg.audio.sample_rate);
    bank.ensure_synthetic_defaults(&cfg.calls.default_call);
    let bank = Arc::new(bank);
    info!("{} call sounds available", bank.len());

    let device = output::open_output(cfg.audio.channels, cfg.audio.sample_rate)?;
    let sample_rate = device.config.sample_rate.0;
    let device_channels = device.channels();

    let (jobs_tx, jobs_rx) = job_queue(cfg.audio.max_polyphony);
    let engine = RenderEngine::new(
        jobs_rx,
        device.layout,
        device_channels,
        cfg.audio.mix.downmix_share,
        sample_rate,
    );
    let drain = engine.drain_control();
    let guard = OutputGuard::from_setting(&cfg.audio.output_guard, sample_rate);

    let tee_running = Arc::new(AtomicBool::new(true));
    let (wav_tap, wav_handle) = match args.wav.clone() {
        Some(path) => {
            let ring = HeapRb::<f32>::new((sample_rate as usize * device_channels * 2).max(8192));
            let (prod, cons) = ring.split();
            let handle = WavTee::run(
                cons,
                path,
                sample_rate,
                device_channels as u16,
                tee_running.clone(),
            );
            (Some(prod), Some(handle))
        }
        None => (None, None),
    };

    let stream = output::build_stream(device, engine, guard, wav_tap)?;

    let mixer = SpatialMixer::new(
        cfg.audio.mix.clone(),
        cfg.audio.volume.clone(),
        cfg.area.max_radius,
    );

    let stop = Arc::new(AtomicBool::new(false));
    let stop_for_ctrlc = stop.clone();
    ctrlc::set_handler(move || {
        stop_for_ctrlc.store(true, Ordering::SeqCst);
    })
    .context("failed to set Ctrl-C handler")?;

    if args.test {
        run_quadrant_test(&cfg, &bank, &mixer, jobs_tx, &stop);
    } else {
        let (snap_tx, snap_rx) = bounded::<WorldFrame>(8);
        let stats = Arc::new(RunStats::default());
        info!(
            "starting {} roosters in a {:.0} m radius, sim time {} at {:.0}x",
            cfg.num_roosters,
            cfg.area.max_radius,
            format_time_of_day(start_tod),
            cfg.simulation_time.time_scale
        );
        let sim = runner::spawn_sim(
            cfg.clone(),
            day_phase,
            start_tod,
            bank.clone(),
            mixer,
            jobs_tx,
            snap_tx,
            stats.clone(),
            stop.clone(),
            args.seed,
        );

        let status_interval = Duration::from_secs(10);
        let started = Instant::now();
        let mut last_status = Instant::now();
        let mut latest: Option<WorldFrame> = None;
        while !stop.load(Ordering::Acquire) {
            std::thread::sleep(Duration::from_millis(200));
            while let Ok(frame) = snap_rx.try_recv() {
                latest = Some(frame);
            }
            if let Some(limit) = args.duration
                && started.elapsed().as_secs_f64() >= limit
            {
                stop.store(true, Ordering::SeqCst);
            }
            if last_status.elapsed() >= status_interval {
                if let Some(frame) = &latest {
                    let calling = frame.roosters.iter().filter(|r| r.calling).count();
                    info!(
                        "[{}] {} roosters, {} calling, day-phase x{:.2} | {} calls ({} replies), {} moves",
                        format_time_of_day(frame.tod_sec),
                        frame.roosters.len(),
                        calling,
                        frame.tod_multiplier,
                        stats.total_calls(),
                        stats.proximity_replies(),
                        stats.total_moves()
                    );
                }
                last_status = Instant::now();
            }
        }

        let _ = sim.join();
        info!(
            "final: {} calls ({} replies), {} moves, {} dropped assets, {} rejected jobs",
            stats.total_calls(),
            stats.proximity_replies(),
            stats.total_moves(),
            stats.dropped_assets(),
            stats.rejected_jobs()
        );
    }

    // Let the engine fade to silence before tearing the stream down.
    drain.begin();
    let deadline = Instant::now() + Duration::from_millis(500);
    while !drain.is_drained() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    drop(stream);
    tee_running.store(false, Ordering::Release);
    if let Some(handle) = wav_handle {
        let _ = handle.join();
    }
    Ok(())
}

/// Sweep a test tone through each quadrant at a ladder of distances so a
/// surround setup can be verified by ear.
fn run_quadrant_test(
    cfg: &AppConfig,
    bank: &CallBank,
    mixer: &SpatialMixer,
    mut jobs: JobSender,
    stop: &AtomicBool,
) {
    let Some(tone) = bank.get(&cfg.calls.default_call) else {
        warn!("default call {:?} missing, nothing to play", cfg.calls.default_call);
        return;
    };
    let quadrants = [
        (Quadrant::FrontRight, "Front Right"),
        (Quadrant::RearRight, "Rear Right"),
        (Quadrant::RearLeft, "Rear Left"),
        (Quadrant::FrontLeft, "Front Left"),
    ];
    let steps = cfg.area.distance_steps.max(1);
    println!("Playing test tones in each quadrant...");
    for (quadrant, name) in quadrants {
        println!("Playing: {name}");
        let angle = quadrant.center_angle();
        for step in 1..=steps {
            if stop.load(Ordering::Acquire) {
                return;
            }
            let distance = cfg.area.max_radius * step as f32 / steps as f32;
            println!("  distance: {distance:.0} m");
            let position = Position::new(angle, distance, cfg.area.max_radius);
            let gains = mixer.place(position);
            if jobs.try_enqueue(RenderJob::new(tone.clone(), gains)).is_err() {
                warn!("render pool full during test");
            }
            std::thread::sleep(Duration::from_millis(1500));
        }
    }
    println!("Test complete.");
}
