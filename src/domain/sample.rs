// Motion sample domain models
use super::activity::ActivityState;
use serde::Serialize;
use std::collections::VecDeque;

pub const DEFAULT_LIVE_WINDOW: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Clock time as displayed, e.g. `12:30:05` or `9:07`
    pub time: String,
    pub svm: f64,
    pub activity: ActivityState,
}

impl Sample {
    pub fn new(time: String, svm: f64, activity: ActivityState) -> Self {
        Self {
            time,
            svm,
            activity,
        }
    }
}

/// Append-only log of samples from both the live and the history channel.
///
/// Only a new sync session may clear it.
#[derive(Debug, Clone, Default)]
pub struct SampleBuffer {
    samples: Vec<Sample>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }
}

/// Rolling window of raw svm readings for the live chart
#[derive(Debug, Clone)]
pub struct LiveWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl LiveWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
}

impl Default for LiveWindow {
    fn default() -> Self {
        Self::new(DEFAULT_LIVE_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_preserves_arrival_order() {
        let mut buffer = SampleBuffer::new();
        buffer.push(Sample::new("1".into(), 1.0, ActivityState::Resting));
        buffer.push(Sample::new("2".into(), 2.0, ActivityState::Walking));
        buffer.push(Sample::new("3".into(), 3.0, ActivityState::Running));

        let times: Vec<&str> = buffer.as_slice().iter().map(|s| s.time.as_str()).collect();
        assert_eq!(times, vec!["1", "2", "3"]);

        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_live_window_evicts_oldest() {
        let mut window = LiveWindow::default();
        for i in 0..45 {
            window.push(i as f64);
        }

        assert_eq!(window.len(), 30);
        let values = window.values();
        assert_eq!(values.first(), Some(&15.0));
        assert_eq!(values.last(), Some(&44.0));
    }

    #[test]
    fn test_live_window_zero_capacity_clamped() {
        let mut window = LiveWindow::new(0);
        window.push(1.0);
        window.push(2.0);
        assert_eq!(window.values(), vec![2.0]);
    }
}
