use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::audio::spatial::{ChannelLayout, GainVector, SURROUND_CHANNELS};

/// One active, time-bounded contribution to the output mix. Owned exclusively
/// by the render engine from enqueue until its cursor reaches the end.
#[derive(Debug, Clone)]
pub struct RenderJob {
    samples: Arc<[f32]>,
    gains: GainVector,
    cursor: usize,
}

impl RenderJob {
    pub fn new(samples: Arc<[f32]>, gains: GainVector) -> Self {
        Self {
            samples,
            gains,
            cursor: 0,
        }
    }

    fn finished(&self) -> bool {
        self.cursor >= self.samples.len()
    }
}

/// Simulation-side half of the SPSC job handoff.
///
/// `try_enqueue` never blocks. The shared in-flight counter covers jobs both
/// queued and playing, so rejection is decided against the real pool
/// occupancy: once `capacity` jobs are in flight the newest enqueue is
/// dropped and handed back to the caller (drop-newest).
pub struct JobSender {
    prod: HeapProd<RenderJob>,
    in_flight: Arc<AtomicUsize>,
    capacity: usize,
}

impl JobSender {
    /// Returns the job back on rejection so the caller always learns the
    /// outcome.
    pub fn try_enqueue(&mut self, job: RenderJob) -> Result<(), RenderJob> {
        if self.in_flight.load(Ordering::Acquire) >= self.capacity {
            return Err(job);
        }
        // Count before pushing: the consumer may pop and retire the job at
        // any point after the push, and must never decrement below zero.
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        match self.prod.try_push(job) {
            Ok(()) => Ok(()),
            Err(job) => {
                self.in_flight.fetch_sub(1, Ordering::AcqRel);
                Err(job)
            }
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

pub struct JobReceiver {
    cons: HeapCons<RenderJob>,
    in_flight: Arc<AtomicUsize>,
    capacity: usize,
}

/// Fixed-capacity SPSC channel for render jobs.
pub fn job_queue(capacity: usize) -> (JobSender, JobReceiver) {
    let capacity = capacity.max(1);
    let (prod, cons) = HeapRb::<RenderJob>::new(capacity).split();
    let in_flight = Arc::new(AtomicUsize::new(0));
    (
        JobSender {
            prod,
            in_flight: in_flight.clone(),
            capacity,
        },
        JobReceiver {
            cons,
            in_flight,
            capacity,
        },
    )
}

/// Shared handle to stop the engine without a glitch: output is ramped down
/// over a short fade, then held at silence.
#[derive(Clone, Debug)]
pub struct DrainControl {
    drain: Arc<AtomicBool>,
    drained: Arc<AtomicBool>,
}

impl DrainControl {
    fn new() -> Self {
        Self {
            drain: Arc::new(AtomicBool::new(false)),
            drained: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn begin(&self) {
        self.drain.store(true, Ordering::Release);
    }

    pub fn is_drained(&self) -> bool {
        self.drained.load(Ordering::Acquire)
    }
}

const DRAIN_FADE_SEC: f32 = 0.05;

/// Mixes every active render job into the interleaved output frame.
///
/// `fill` runs on the audio callback: it never allocates, locks, or touches
/// the filesystem. All contributions are summed sample-accurately (linear
/// superposition), finished jobs are retired between fills, and the fade
/// ramp turns a stop request into silence without a step.
pub struct RenderEngine {
    rx: JobReceiver,
    active: Vec<RenderJob>,
    max_jobs: usize,
    layout: ChannelLayout,
    /// Interleave stride of the device; at least `layout.channels()`.
    stride: usize,
    downmix_share: f32,
    drain_ctl: DrainControl,
    master: f32,
    fade_step: f32,
}

impl RenderEngine {
    pub fn new(
        rx: JobReceiver,
        layout: ChannelLayout,
        device_channels: usize,
        downmix_share: f32,
        sample_rate: u32,
    ) -> Self {
        let max_jobs = rx.capacity;
        let fade_samples = (DRAIN_FADE_SEC * sample_rate as f32).max(1.0);
        Self {
            active: Vec::with_capacity(max_jobs),
            max_jobs,
            rx,
            layout,
            stride: device_channels.max(layout.channels()),
            downmix_share,
            drain_ctl: DrainControl::new(),
            master: 1.0,
            fade_step: 1.0 / fade_samples,
        }
    }

    pub fn drain_control(&self) -> DrainControl {
        self.drain_ctl.clone()
    }

    pub fn active_jobs(&self) -> usize {
        self.active.len()
    }

    fn admit_pending(&mut self) {
        while self.active.len() < self.max_jobs {
            match self.rx.cons.try_pop() {
                Some(job) => self.active.push(job),
                None => break,
            }
        }
    }

    fn retire_finished(&mut self) {
        let before = self.active.len();
        self.active.retain(|job| !job.finished());
        let removed = before - self.active.len();
        if removed > 0 {
            self.rx.in_flight.fetch_sub(removed, Ordering::AcqRel);
        }
    }

    pub fn fill(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        if self.drain_ctl.is_drained() {
            return;
        }
        self.admit_pending();

        let frames = out.len() / self.stride;
        match self.layout {
            ChannelLayout::FiveOne => {
                for job in &mut self.active {
                    let gains = job.gains.0;
                    let n = frames.min(job.samples.len() - job.cursor);
                    for frame in 0..n {
                        let sample = job.samples[job.cursor + frame];
                        let base = frame * self.stride;
                        for ch in 0..SURROUND_CHANNELS {
                            out[base + ch] += sample * gains[ch];
                        }
                    }
                    job.cursor += n;
                }
            }
            ChannelLayout::Stereo => {
                for job in &mut self.active {
                    let [left, right] = job.gains.downmix_stereo(self.downmix_share);
                    let n = frames.min(job.samples.len() - job.cursor);
                    for frame in 0..n {
                        let sample = job.samples[job.cursor + frame];
                        let base = frame * self.stride;
                        out[base] += sample * left;
                        out[base + 1] += sample * right;
                    }
                    job.cursor += n;
                }
            }
        }

        if self.drain_ctl.drain.load(Ordering::Acquire) {
            for frame in 0..frames {
                let base = frame * self.stride;
                for ch in 0..self.stride {
                    out[base + ch] *= self.master;
                }
                self.master = (self.master - self.fade_step).max(0.0);
            }
            if self.master <= 0.0 {
                self.drain_ctl.drained.store(true, Ordering::Release);
            }
        }

        self.retire_finished();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::spatial::{FL, FR, LFE};

    fn samples(value: f32, len: usize) -> Arc<[f32]> {
        vec![value; len].into()
    }

    fn unit_gains() -> GainVector {
        GainVector([1.0; SURROUND_CHANNELS])
    }

    #[test]
    fn enqueue_is_rejected_at_capacity() {
        let (mut tx, rx) = job_queue(32);
        let mut accepted = 0;
        let mut rejected = 0;
        for _ in 0..50 {
            match tx.try_enqueue(RenderJob::new(samples(0.1, 100), unit_gains())) {
                Ok(()) => accepted += 1,
                Err(_) => rejected += 1,
            }
        }
        assert_eq!(accepted, 32);
        assert_eq!(rejected, 18);

        let mut engine = RenderEngine::new(rx, ChannelLayout::FiveOne, 6, 0.7, 48_000);
        let mut out = vec![0.0f32; 16 * 6];
        engine.fill(&mut out);
        assert_eq!(engine.active_jobs(), 32, "exactly the pool capacity plays");
    }

    #[test]
    fn capacity_frees_up_after_jobs_finish() {
        let (mut tx, rx) = job_queue(2);
        tx.try_enqueue(RenderJob::new(samples(0.5, 8), unit_gains()))
            .unwrap();
        tx.try_enqueue(RenderJob::new(samples(0.5, 8), unit_gains()))
            .unwrap();
        assert!(
            tx.try_enqueue(RenderJob::new(samples(0.5, 8), unit_gains()))
                .is_err()
        );

        let mut engine = RenderEngine::new(rx, ChannelLayout::FiveOne, 6, 0.7, 48_000);
        let mut out = vec![0.0f32; 8 * 6];
        engine.fill(&mut out);
        engine.fill(&mut out);
        assert_eq!(engine.active_jobs(), 0);
        assert_eq!(tx.in_flight(), 0);
        assert!(
            tx.try_enqueue(RenderJob::new(samples(0.5, 8), unit_gains()))
                .is_ok()
        );
    }

    #[test]
    fn jobs_superpose_linearly() {
        let (mut tx, rx) = job_queue(4);
        let mut g1 = [0.0f32; SURROUND_CHANNELS];
        g1[FL] = 0.5;
        let mut g2 = [0.0f32; SURROUND_CHANNELS];
        g2[FL] = 0.25;
        g2[FR] = 1.0;
        tx.try_enqueue(RenderJob::new(samples(1.0, 16), GainVector(g1)))
            .unwrap();
        tx.try_enqueue(RenderJob::new(samples(1.0, 16), GainVector(g2)))
            .unwrap();

        let mut engine = RenderEngine::new(rx, ChannelLayout::FiveOne, 6, 0.7, 48_000);
        let mut out = vec![0.0f32; 4 * 6];
        engine.fill(&mut out);
        assert!((out[FL] - 0.75).abs() < 1e-6, "FL sums both jobs");
        assert!((out[FR] - 1.0).abs() < 1e-6);
        assert_eq!(out[LFE], 0.0);
    }

    #[test]
    fn job_tail_ends_inside_a_buffer_without_leftovers() {
        let (mut tx, rx) = job_queue(4);
        tx.try_enqueue(RenderJob::new(samples(1.0, 10), unit_gains()))
            .unwrap();
        let mut engine = RenderEngine::new(rx, ChannelLayout::FiveOne, 6, 0.7, 48_000);
        let mut out = vec![0.0f32; 16 * 6];
        engine.fill(&mut out);
        assert!(out[9 * 6] != 0.0, "last sample of the job is mixed");
        assert_eq!(out[10 * 6], 0.0, "nothing past the end of the job");
        assert_eq!(engine.active_jobs(), 0, "finished job was retired");
    }

    #[test]
    fn stereo_layout_uses_the_exact_downmix() {
        let (mut tx, rx) = job_queue(4);
        let gains = GainVector([0.5, 0.3, 0.2, 0.15, 0.1, 0.05]);
        tx.try_enqueue(RenderJob::new(samples(1.0, 8), gains))
            .unwrap();
        let mut engine = RenderEngine::new(rx, ChannelLayout::Stereo, 2, 0.7, 48_000);
        let mut out = vec![0.0f32; 8 * 2];
        engine.fill(&mut out);
        let [l, r] = gains.downmix_stereo(0.7);
        assert!((out[0] - l).abs() < 1e-6);
        assert!((out[1] - r).abs() < 1e-6);
    }

    #[test]
    fn drain_fades_to_silence_without_a_step() {
        let (mut tx, rx) = job_queue(4);
        tx.try_enqueue(RenderJob::new(samples(1.0, 48_000), unit_gains()))
            .unwrap();
        let mut engine = RenderEngine::new(rx, ChannelLayout::FiveOne, 6, 0.7, 48_000);
        let ctl = engine.drain_control();

        let mut out = vec![0.0f32; 480 * 6];
        engine.fill(&mut out);
        assert!(out.iter().any(|s| *s != 0.0));

        ctl.begin();
        engine.fill(&mut out);
        let first = out[FL];
        let later = out[479 * 6 + FL];
        assert!(first > later, "gain must fall across the fade");

        for _ in 0..20 {
            engine.fill(&mut out);
        }
        assert!(ctl.is_drained());
        assert!(out.iter().all(|s| *s == 0.0), "drained output is silence");
    }
}
