//! Frame-rate sampler.
//!
//! Fed one timestamp per animation frame. Every sample interval it emits the
//! frame rate over that interval and the lowest rate seen so far.

use crate::collector::handle::{Listener, TrackerHandle};
use crate::collector::types::FpsData;
use std::time::Duration;

/// Default time between FPS samples.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct FpsSamplerOptions {
    pub sample_interval: Duration,
}

impl Default for FpsSamplerOptions {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }
}

pub struct FpsSampler {
    listener: Listener<FpsData>,
    interval_ms: f64,
    /// Start of the current sample interval
    interval_start: Option<f64>,
    frames: u32,
    min_fps: Option<u32>,
    handle: TrackerHandle,
}

impl FpsSampler {
    pub fn new(listener: Listener<FpsData>, options: FpsSamplerOptions) -> Self {
        Self {
            listener,
            interval_ms: options.sample_interval.as_secs_f64() * 1000.0,
            interval_start: None,
            frames: 0,
            min_fps: None,
            handle: TrackerHandle::new(),
        }
    }

    pub fn handle(&self) -> TrackerHandle {
        self.handle.clone()
    }

    /// Count one frame. Returns the sample if this frame closed an interval.
    pub fn on_frame(&mut self, timestamp: f64) -> Option<FpsData> {
        if !self.handle.is_running() {
            return None;
        }

        let start = *self.interval_start.get_or_insert(timestamp);
        self.frames += 1;
        let elapsed = timestamp - start;
        if elapsed < self.interval_ms || elapsed <= 0.0 {
            return None;
        }

        let current = (f64::from(self.frames) * 1000.0 / elapsed).round() as u32;
        let min = self.min_fps.map_or(current, |min| min.min(current));
        self.min_fps = Some(min);
        self.frames = 0;
        self.interval_start = Some(timestamp);

        let sample = FpsData {
            current,
            min,
            timestamp,
        };
        (self.listener)(sample);
        Some(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::handle::listener;
    use std::sync::{Arc, Mutex};

    fn sampler() -> (FpsSampler, Arc<Mutex<Vec<FpsData>>>) {
        let samples = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&samples);
        let sampler = FpsSampler::new(
            listener(move |sample: FpsData| sink.lock().unwrap().push(sample)),
            FpsSamplerOptions {
                sample_interval: Duration::from_millis(100),
            },
        );
        (sampler, samples)
    }

    #[test]
    fn test_emits_once_per_interval() {
        let (mut sampler, samples) = sampler();

        // 11 frames 10ms apart: the 11th closes the first 100ms interval.
        for frame in 0..=10 {
            sampler.on_frame(f64::from(frame) * 10.0);
        }

        let samples = samples.lock().unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].current, 110);
        assert_eq!(samples[0].min, 110);
        assert_eq!(samples[0].timestamp, 100.0);
    }

    #[test]
    fn test_min_tracks_slowest_interval() {
        let (mut sampler, _samples) = sampler();

        sampler.on_frame(0.0);
        let fast = sampler.on_frame(100.0).unwrap();
        sampler.on_frame(150.0);
        let slow = sampler.on_frame(300.0).unwrap();

        assert_eq!(fast.current, 20);
        assert_eq!(slow.current, 10);
        assert_eq!(slow.min, 10);
    }

    #[test]
    fn test_stopped_sampler_emits_nothing() {
        let (mut sampler, samples) = sampler();
        sampler.handle().stop();

        sampler.on_frame(0.0);
        sampler.on_frame(500.0);
        assert!(samples.lock().unwrap().is_empty());
    }
}
