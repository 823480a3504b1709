// Live ingestor - Rolling live chart plus background history capture
use crate::domain::sample::{LiveWindow, Sample, SampleBuffer};
use crate::infrastructure::codec::LiveEvent;
use chrono::{Local, NaiveTime, Timelike};

#[derive(Debug, Clone)]
pub struct LiveIngestor {
    window: LiveWindow,
}

impl LiveIngestor {
    pub fn new(window_capacity: usize) -> Self {
        Self {
            window: LiveWindow::new(window_capacity),
        }
    }

    pub fn window(&self) -> &LiveWindow {
        &self.window
    }

    /// Record a live event stamped with the local wall clock
    pub fn ingest(&mut self, event: &LiveEvent, buffer: &mut SampleBuffer) -> bool {
        self.ingest_at(event, buffer, Local::now().time())
    }

    /// Record a live event stamped with `now`.
    ///
    /// The sample is appended whatever the sync session is doing, so live and
    /// history samples may interleave in the buffer. Returns whether anything
    /// was recorded.
    pub fn ingest_at(&mut self, event: &LiveEvent, buffer: &mut SampleBuffer, now: NaiveTime) -> bool {
        match event {
            LiveEvent::Record { svm, activity } => {
                self.window.push(*svm);
                buffer.push(Sample::new(clock_label(now), *svm, *activity));
                true
            }
            LiveEvent::Skip(reason) => {
                tracing::debug!("Dropping live notification: {:?}", reason);
                false
            }
        }
    }
}

/// `H:MM` with an unpadded hour, e.g. `9:05`
pub fn clock_label(now: NaiveTime) -> String {
    format!("{}:{:02}", now.hour(), now.minute())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::activity::ActivityState;
    use crate::infrastructure::codec::SkipReason;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_clock_label() {
        assert_eq!(clock_label(at(9, 5)), "9:05");
        assert_eq!(clock_label(at(14, 30)), "14:30");
        assert_eq!(clock_label(at(0, 0)), "0:00");
    }

    #[test]
    fn test_record_feeds_window_and_buffer() {
        let mut ingestor = LiveIngestor::new(30);
        let mut buffer = SampleBuffer::new();
        let event = LiveEvent::Record {
            svm: 12.55,
            activity: ActivityState::Walking,
        };

        assert!(ingestor.ingest_at(&event, &mut buffer, at(8, 7)));

        assert_eq!(ingestor.window().values(), vec![12.55]);
        assert_eq!(
            buffer.as_slice(),
            &[Sample::new("8:07".to_string(), 12.55, ActivityState::Walking)]
        );
    }

    #[test]
    fn test_skip_changes_nothing() {
        let mut ingestor = LiveIngestor::new(30);
        let mut buffer = SampleBuffer::new();
        let event = LiveEvent::Skip(SkipReason::Malformed { fields: 1 });

        assert!(!ingestor.ingest_at(&event, &mut buffer, at(8, 7)));
        assert!(ingestor.window().is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_window_bounded_but_buffer_keeps_everything() {
        let mut ingestor = LiveIngestor::new(30);
        let mut buffer = SampleBuffer::new();

        for i in 0..100 {
            let event = LiveEvent::Record {
                svm: i as f64,
                activity: ActivityState::Resting,
            };
            ingestor.ingest_at(&event, &mut buffer, at(10, 0));
        }

        assert_eq!(ingestor.window().len(), 30);
        assert_eq!(ingestor.window().values()[0], 70.0);
        assert_eq!(buffer.len(), 100);
    }
}
