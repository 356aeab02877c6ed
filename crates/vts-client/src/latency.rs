//! Bounded window of recent command round-trip times.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Aggregate over the samples currently held in a window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatencyStats {
    pub count: usize,
    pub mean: Duration,
    /// Sample standard deviation; zero when only one sample is held.
    pub std_dev: Duration,
}

/// Fixed-capacity FIFO of round-trip durations.
#[derive(Debug)]
pub struct LatencyWindow {
    samples: VecDeque<Duration>,
    capacity: usize,
}

impl LatencyWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a sample, evicting the oldest once the window is full.
    pub fn record(&mut self, sample: Duration) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn samples(&self) -> impl Iterator<Item = Duration> + '_ {
        self.samples.iter().copied()
    }

    pub fn stats(&self) -> Option<LatencyStats> {
        let count = self.samples.len();
        if count == 0 {
            return None;
        }
        let secs: Vec<f64> = self.samples.iter().map(Duration::as_secs_f64).collect();
        let mean = secs.iter().sum::<f64>() / count as f64;
        let std_dev = if count > 1 {
            let var = secs.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            var.sqrt()
        } else {
            0.0
        };
        Some(LatencyStats {
            count,
            mean: Duration::from_secs_f64(mean),
            std_dev: Duration::from_secs_f64(std_dev),
        })
    }
}

/// Shared handle to a [`LatencyWindow`]; the command layer writes, the
/// watchdog reads. Each call holds the lock for a single append or aggregate.
#[derive(Clone, Debug)]
pub struct LatencyMonitor {
    window: Arc<Mutex<LatencyWindow>>,
}

impl LatencyMonitor {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: Arc::new(Mutex::new(LatencyWindow::new(capacity))),
        }
    }

    pub fn record(&self, sample: Duration) {
        self.window.lock().record(sample);
    }

    pub fn stats(&self) -> Option<LatencyStats> {
        self.window.lock().stats()
    }

    pub fn len(&self) -> usize {
        self.window.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.lock().is_empty()
    }

    /// Copy of the held samples, oldest first.
    pub fn snapshot(&self) -> Vec<Duration> {
        self.window.lock().samples().collect()
    }
}
