use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use hound::{SampleFormat, WavSpec, WavWriter};
use ringbuf::HeapCons;
use ringbuf::traits::{Consumer, Observer};
use tracing::{info, warn};

/// Tees the mixed interleaved frames to an N-channel 16-bit WAV file.
///
/// The audio callback feeds the ring with `push_slice` (no allocation); this
/// thread drains it at its own pace and finalizes the file once the stop
/// flag is set and the ring is empty.
pub struct WavTee;

impl WavTee {
    pub fn run(
        mut rx: HeapCons<f32>,
        path: String,
        sample_rate: u32,
        channels: u16,
        running: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        std::thread::Builder::new()
            .name("wav-tee".into())
            .spawn(move || {
                let spec = WavSpec {
                    channels,
                    sample_rate,
                    bits_per_sample: 16,
                    sample_format: SampleFormat::Int,
                };
                let mut writer = match WavWriter::create(&path, spec) {
                    Ok(writer) => writer,
                    Err(err) => {
                        warn!("cannot create wav file {path}: {err}");
                        return;
                    }
                };
                let mut scratch = vec![0.0f32; 4096];
                loop {
                    let n = rx.pop_slice(&mut scratch);
                    for &s in &scratch[..n] {
                        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                        if writer.write_sample(v).is_err() {
                            warn!("wav write failed, stopping capture");
                            return;
                        }
                    }
                    if n == 0 {
                        if !running.load(Ordering::Acquire) && rx.is_empty() {
                            break;
                        }
                        std::thread::sleep(Duration::from_millis(10));
                    }
                }
                match writer.finalize() {
                    Ok(()) => info!("wav capture written to {path}"),
                    Err(err) => warn!("failed to finalize {path}: {err}"),
                }
            })
            .expect("spawn wav-tee thread")
    }
}
