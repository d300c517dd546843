// src/capture/input.rs

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::{
    HeapCons, HeapProd, HeapRb,
    producer::Producer,
    traits::{Consumer, Observer, Split},
};

use super::{CaptureConfig, FrameSource, find_input_device};
use crate::analysis::window::downmix_into;
use crate::error::DeviceError;

/// Ring buffer holds this many frames of mono audio.
const RING_FRAMES: usize = 8;

/// Past this backlog the oldest audio is dropped so the display stays live.
const MAX_BACKLOG_FRAMES: usize = 4;

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Extra wait on top of one frame's worth of audio, for callback jitter.
const READ_SLACK: Duration = Duration::from_millis(10);

type SharedStreamError = Arc<Mutex<Option<DeviceError>>>;

/// Microphone capture. The cpal callback downmixes to mono and pushes into
/// an SPSC ring buffer; the tick thread pulls whole frames out of it.
pub struct LiveInput {
    stream: Stream,
    reader: FrameReader,
    name: String,
    channels: usize,
    sample_rate: u32,
}

/// Consumer half of the capture ring. Turns the sample stream into whole
/// frames, drains stale backlog and reports errors raised by the callback.
pub(crate) struct FrameReader {
    consumer: HeapCons<f32>,
    read_timeout: Duration,
    stream_error: SharedStreamError,
}

/// A fresh ring sized for `frame_size`. Each start gets its own, so no
/// samples survive a restart.
pub(crate) fn frame_ring(frame_size: usize) -> (HeapProd<f32>, HeapCons<f32>) {
    HeapRb::<f32>::new(frame_size.max(1) * RING_FRAMES).split()
}

/// How long `next_frame` may wait: at least one tick, and never less than
/// the time the device needs to deliver a whole frame.
pub(crate) fn frame_timeout(tick_interval: Duration, frame_size: usize, sample_rate: u32) -> Duration {
    let frame_duration = Duration::from_secs_f64(frame_size as f64 / sample_rate.max(1) as f64);
    tick_interval.max(frame_duration) + READ_SLACK
}

impl LiveInput {
    /// Open the configured (or default) input device and start capturing.
    pub fn start(config: &CaptureConfig) -> Result<Self, DeviceError> {
        let device = find_input_device(config.device.as_ref())?;
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let supported_config = device.default_input_config()?;
        let sample_format = supported_config.sample_format();
        let stream_config: StreamConfig = supported_config.into();
        let channels = stream_config.channels as usize;
        let sample_rate = stream_config.sample_rate.0;

        let frame_size = config.frame_size.max(1);
        let (producer, consumer) = frame_ring(frame_size);

        let stream_error: SharedStreamError = Arc::new(Mutex::new(None));

        let stream = match sample_format {
            SampleFormat::F32 => {
                build_stream::<f32, _>(&device, &stream_config, producer, stream_error.clone())?
            }
            SampleFormat::I16 => {
                build_stream::<i16, _>(&device, &stream_config, producer, stream_error.clone())?
            }
            SampleFormat::U16 => {
                build_stream::<u16, _>(&device, &stream_config, producer, stream_error.clone())?
            }
            other => return Err(DeviceError::UnsupportedFormat(other)),
        };
        stream.play()?;

        log::info!(
            "Input device: {} ({} ch @ {} Hz, {:?}), frame size {}",
            name,
            channels,
            sample_rate,
            sample_format,
            frame_size
        );

        let read_timeout = frame_timeout(config.tick_interval, frame_size, sample_rate);
        log::debug!("Frame read timeout {:?}", read_timeout);

        Ok(Self {
            stream,
            reader: FrameReader::new(consumer, read_timeout, stream_error),
            name,
            channels,
            sample_rate,
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}

impl FrameReader {
    pub(crate) fn new(
        consumer: HeapCons<f32>,
        read_timeout: Duration,
        stream_error: SharedStreamError,
    ) -> Self {
        Self {
            consumer,
            read_timeout,
            stream_error,
        }
    }

    fn take_stream_error(&self) -> Option<DeviceError> {
        self.stream_error.lock().ok().and_then(|mut slot| slot.take())
    }

    /// Fill `frame` with the next samples, waiting at most `read_timeout`.
    /// An underrun leaves the buffered samples in place for the next call.
    pub(crate) fn read(&mut self, frame: &mut [f32]) -> Result<(), DeviceError> {
        if let Some(err) = self.take_stream_error() {
            return Err(err);
        }

        let needed = frame.len();
        let backlog = self.consumer.occupied_len();
        if backlog > needed * MAX_BACKLOG_FRAMES {
            let dropped = self.consumer.skip(backlog - needed);
            log::trace!("Dropped {dropped} stale samples");
        }

        let deadline = Instant::now() + self.read_timeout;
        while self.consumer.occupied_len() < needed {
            if Instant::now() >= deadline {
                return Err(DeviceError::Underrun {
                    available: self.consumer.occupied_len(),
                    needed,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }

        let popped = self.consumer.pop_slice(frame);
        debug_assert_eq!(popped, needed);
        Ok(())
    }
}

impl FrameSource for LiveInput {
    fn next_frame(&mut self, frame: &mut [f32]) -> Result<(), DeviceError> {
        self.reader.read(frame)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

impl Drop for LiveInput {
    fn drop(&mut self) {
        if let Err(e) = self.stream.pause() {
            log::debug!("Pausing input stream on release failed: {e}");
        }
        log::info!("Released input device: {}", self.name);
    }
}

/// Build the cpal input stream for sample type `T`, converting to f32 and
/// downmixing to mono before pushing.
fn build_stream<T, P>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: P,
    stream_error: SharedStreamError,
) -> Result<Stream, DeviceError>
where
    T: SizedSample,
    f32: FromSample<T>,
    P: Producer<Item = f32> + Send + 'static,
{
    let channels = config.channels as usize;
    let mut converted: Vec<f32> = Vec::with_capacity(4096);
    let mut mono: Vec<f32> = Vec::with_capacity(4096);

    let err_fn = move |err: cpal::StreamError| {
        log::error!("Input stream error: {err}");
        let mapped = match err {
            cpal::StreamError::DeviceNotAvailable => DeviceError::Disconnected,
            other => DeviceError::Stream(other.to_string()),
        };
        if let Ok(mut slot) = stream_error.lock() {
            *slot = Some(mapped);
        }
    };

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            converted.clear();
            converted.extend(data.iter().map(|&s| f32::from_sample(s)));
            mono.clear();
            downmix_into(&converted, channels, &mut mono);

            // Buffer full -> drop the remainder; the reader drains stale audio.
            let _ = producer.push_slice(&mono);
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: usize = 64;

    fn reader_with(timeout_ms: u64) -> (HeapProd<f32>, FrameReader, SharedStreamError) {
        let (producer, consumer) = frame_ring(FRAME);
        let slot: SharedStreamError = Arc::new(Mutex::new(None));
        let reader = FrameReader::new(consumer, Duration::from_millis(timeout_ms), slot.clone());
        (producer, reader, slot)
    }

    #[test]
    fn test_reads_whole_frame_in_order() {
        let (mut producer, mut reader, _) = reader_with(5);
        let samples: Vec<f32> = (0..FRAME).map(|i| i as f32).collect();
        producer.push_slice(&samples);

        let mut frame = [0.0; FRAME];
        reader.read(&mut frame).unwrap();
        assert_eq!(frame.to_vec(), samples);
    }

    #[test]
    fn test_backlog_past_four_frames_keeps_newest() {
        let (mut producer, mut reader, _) = reader_with(5);
        let samples: Vec<f32> = (0..FRAME * 6).map(|i| i as f32).collect();
        producer.push_slice(&samples);

        let mut frame = [0.0; FRAME];
        reader.read(&mut frame).unwrap();
        assert_eq!(frame[..], samples[FRAME * 5..]);

        // Nothing stale left behind
        assert!(matches!(reader.read(&mut frame), Err(DeviceError::Underrun { available: 0, .. })));
    }

    #[test]
    fn test_backlog_within_limit_is_not_dropped() {
        let (mut producer, mut reader, _) = reader_with(5);
        let samples: Vec<f32> = (0..FRAME * 4).map(|i| i as f32).collect();
        producer.push_slice(&samples);

        let mut frame = [0.0; FRAME];
        reader.read(&mut frame).unwrap();
        assert_eq!(frame[..], samples[..FRAME]);
    }

    #[test]
    fn test_partial_frame_underruns_after_deadline() {
        let (mut producer, mut reader, _) = reader_with(5);
        producer.push_slice(&[0.5; FRAME / 2]);

        let started = Instant::now();
        let mut frame = [0.0; FRAME];
        match reader.read(&mut frame) {
            Err(DeviceError::Underrun { available, needed }) => {
                assert_eq!(available, FRAME / 2);
                assert_eq!(needed, FRAME);
            }
            other => panic!("expected underrun, got {other:?}"),
        }
        assert!(started.elapsed() >= Duration::from_millis(5));

        // The partial frame is kept and completed by later audio.
        producer.push_slice(&[0.25; FRAME / 2]);
        reader.read(&mut frame).unwrap();
        assert_eq!(frame[0], 0.5);
        assert_eq!(frame[FRAME - 1], 0.25);
    }

    #[test]
    fn test_stream_error_reported_once() {
        let (mut producer, mut reader, slot) = reader_with(5);
        producer.push_slice(&[0.1; FRAME]);
        *slot.lock().unwrap() = Some(DeviceError::Disconnected);

        let mut frame = [0.0; FRAME];
        assert!(matches!(reader.read(&mut frame), Err(DeviceError::Disconnected)));
        assert!(slot.lock().unwrap().is_none());
        reader.read(&mut frame).unwrap();
    }

    #[test]
    fn test_fresh_ring_starts_empty() {
        let (mut producer, consumer) = frame_ring(FRAME);
        assert_eq!(consumer.occupied_len(), 0);
        assert_eq!(producer.push_slice(&vec![0.0; FRAME * 10]), FRAME * RING_FRAMES);

        // A restart builds a new ring; the old audio goes with the old one.
        drop((producer, consumer));
        let (_producer, mut consumer) = frame_ring(FRAME);
        assert_eq!(consumer.occupied_len(), 0);
        let mut buf = [0.0; FRAME];
        assert_eq!(consumer.pop_slice(&mut buf), 0);
    }

    #[test]
    fn test_timeout_covers_a_whole_frame() {
        let tick = Duration::from_millis(33);
        // 2048 samples at 44.1 kHz take about 46 ms, longer than the tick.
        let timeout = frame_timeout(tick, 2048, 44_100);
        assert!(timeout > Duration::from_millis(46));
        // Short frames still get at least a tick.
        assert_eq!(frame_timeout(tick, 256, 48_000), tick + READ_SLACK);
    }
}
