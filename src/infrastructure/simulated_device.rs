// Simulated recorder - In-memory transport speaking the device protocol
use crate::application::transport::{Channel, Notification, NotificationStream, Transport, TransportError};
use crate::domain::activity::ActivityState;
use crate::infrastructure::codec::{decode_command, COMPLETION_SENTINEL};
use crate::infrastructure::config::SimulatorSettings;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration as ChronoDuration, Local};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

const NOTIFY_QUEUE: usize = 64;
/// Card lines this short are skipped by the firmware when replaying
const MIN_LINE_LEN: usize = 5;

/// Emulates the recorder firmware over an in-memory link.
///
/// Live readings are pushed at a fixed interval. A `SYNC:<n>` command pauses
/// them, replays the last `n` minutes of card lines on the history channel,
/// sends the completion sentinel and resumes live output.
#[derive(Clone)]
pub struct SimulatedDevice {
    inner: Arc<DeviceInner>,
}

struct DeviceInner {
    settings: SimulatorSettings,
    /// Timestamp of the newest card line
    recorded_until: DateTime<Local>,
    connected: AtomicBool,
    syncing: Arc<AtomicBool>,
    fail_writes: AtomicBool,
    history_tx: Mutex<Option<mpsc::Sender<Notification>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SimulatedDevice {
    pub fn new(settings: SimulatorSettings) -> Self {
        Self {
            inner: Arc::new(DeviceInner {
                settings,
                recorded_until: Local::now(),
                connected: AtomicBool::new(true),
                syncing: Arc::new(AtomicBool::new(false)),
                fail_writes: AtomicBool::new(false),
                history_tx: Mutex::new(None),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Bring the link back after a disconnect
    pub fn reconnect(&self) {
        self.inner.connected.store(true, Ordering::SeqCst);
    }

    /// Make every command write fail, as a flaky link would
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of lines on the simulated card
    pub fn card_lines(&self) -> u64 {
        self.inner.settings.history_minutes as u64 * self.inner.settings.records_per_minute as u64
    }

    /// Card line `index` (0 = oldest): `YYYY-MM-DD HH:MM:SS,<svm>,<LABEL>`
    pub fn card_line(&self, index: u64) -> String {
        let total = self.card_lines();
        let spacing_ms = 60_000 / self.inner.settings.records_per_minute.max(1) as i64;
        let age_ms = total.saturating_sub(index + 1) as i64 * spacing_ms;
        let stamp = self.inner.recorded_until - ChronoDuration::milliseconds(age_ms);
        let minute = index / self.inner.settings.records_per_minute.max(1) as u64;
        let (svm, activity) = reading(index, minute);

        format!(
            "{},{:.2},{}",
            stamp.format("%Y-%m-%d %H:%M:%S"),
            svm,
            activity.label()
        )
    }

    fn track(&self, handle: JoinHandle<()>) {
        if let Ok(mut tasks) = self.inner.tasks.lock() {
            tasks.retain(|t| !t.is_finished());
            tasks.push(handle);
        }
    }

    fn history_sender(&self) -> Option<mpsc::Sender<Notification>> {
        self.inner.history_tx.lock().ok().and_then(|tx| tx.clone())
    }

    fn spawn_live(&self, tx: mpsc::Sender<Notification>) -> JoinHandle<()> {
        let syncing = self.inner.syncing.clone();
        let period = Duration::from_millis(self.inner.settings.live_interval_ms.max(1));
        // A new live block starts every 20 readings
        let block = 20;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            let mut tick: u64 = 0;
            loop {
                ticker.tick().await;
                if syncing.load(Ordering::SeqCst) {
                    continue;
                }
                let (svm, activity) = reading(tick, tick / block);
                tick += 1;

                let payload = format!("{:.2},{}", svm, activity.label());
                if tx.send(Ok(Bytes::from(payload))).await.is_err() {
                    break;
                }
            }
        })
    }

    fn spawn_replay(&self, tx: mpsc::Sender<Notification>, minutes: u32) -> JoinHandle<()> {
        let device = self.clone();
        let pacing = Duration::from_millis(self.inner.settings.history_pacing_ms);
        let wanted = minutes as u64 * self.inner.settings.records_per_minute as u64;
        let total = self.card_lines();
        let first = total.saturating_sub(wanted);

        tokio::spawn(async move {
            tracing::info!("Simulator replaying {} card lines", total - first);

            for index in first..total {
                if !device.is_connected() {
                    break;
                }
                let line = device.card_line(index);
                if line.len() <= MIN_LINE_LEN {
                    continue;
                }
                if tx.send(Ok(Bytes::from(line))).await.is_err() {
                    break;
                }
                if !pacing.is_zero() {
                    tokio::time::sleep(pacing).await;
                }
            }

            if !pacing.is_zero() {
                tokio::time::sleep(pacing).await;
            }
            let _ = tx.send(Ok(Bytes::from_static(COMPLETION_SENTINEL.as_bytes()))).await;
            device.inner.syncing.store(false, Ordering::SeqCst);
            tracing::info!("Simulator sent completion, resuming live output");
        })
    }
}

#[async_trait]
impl Transport for SimulatedDevice {
    async fn write_command(&self, payload: Bytes) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::WriteFailed("simulated write failure".to_string()));
        }

        let Some(minutes) = decode_command(&payload) else {
            tracing::warn!("Simulator ignoring command {:?}", String::from_utf8_lossy(&payload));
            return Ok(());
        };

        let Some(tx) = self.history_sender() else {
            tracing::debug!("No history subscriber, dropping sync of {} min", minutes);
            return Ok(());
        };

        self.inner.syncing.store(true, Ordering::SeqCst);
        let handle = self.spawn_replay(tx, minutes.get());
        self.track(handle);
        Ok(())
    }

    async fn subscribe(&self, channel: Channel) -> Result<NotificationStream, TransportError> {
        if !self.is_connected() {
            return Err(TransportError::SubscribeFailed(
                channel,
                "device not connected".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel(NOTIFY_QUEUE);
        match channel {
            Channel::Live => {
                let handle = self.spawn_live(tx);
                self.track(handle);
            }
            Channel::History => {
                if let Ok(mut slot) = self.inner.history_tx.lock() {
                    *slot = Some(tx);
                }
            }
        }

        Ok(ReceiverStream::new(rx).boxed())
    }

    async fn disconnect(&self) {
        self.inner.connected.store(false, Ordering::SeqCst);
        self.inner.syncing.store(false, Ordering::SeqCst);
        if let Ok(mut slot) = self.inner.history_tx.lock() {
            slot.take();
        }
        if let Ok(mut tasks) = self.inner.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
        tracing::info!("Simulator link dropped");
    }
}

/// Deterministic svm reading and classification for sample `index`.
///
/// Activity cycles rest, walk, run per block; svm oscillates around a level
/// typical for that activity.
fn reading(index: u64, block: u64) -> (f64, ActivityState) {
    let (activity, level, swing) = match block % 3 {
        0 => (ActivityState::Resting, 9.81, 0.15),
        1 => (ActivityState::Walking, 12.0, 2.0),
        _ => (ActivityState::Running, 17.5, 5.0),
    };
    let svm = level + swing * (index as f64 * 0.7).sin();
    (svm, activity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::codec::{
        decode_history_notification, decode_live_notification, HistoryEvent, LiveEvent,
    };
    use tokio::time::timeout;

    fn settings() -> SimulatorSettings {
        SimulatorSettings {
            records_per_minute: 300,
            live_interval_ms: 1,
            history_pacing_ms: 0,
            history_minutes: 30,
        }
    }

    #[test]
    fn test_card_line_format() {
        let device = SimulatedDevice::new(settings());
        let line = device.card_line(0);

        match decode_history_notification(line.as_bytes()) {
            HistoryEvent::Record(sample) => {
                assert_eq!(sample.time.len(), 8);
                assert_eq!(sample.activity, ActivityState::Resting);
                assert!(sample.svm > 9.0 && sample.svm < 10.0);
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_reading_cycles_activity() {
        assert_eq!(reading(0, 0).1, ActivityState::Resting);
        assert_eq!(reading(0, 1).1, ActivityState::Walking);
        assert_eq!(reading(0, 2).1, ActivityState::Running);
        assert_eq!(reading(0, 3).1, ActivityState::Resting);
    }

    #[tokio::test]
    async fn test_sync_replays_requested_minutes_then_end() {
        let device = SimulatedDevice::new(settings());
        let mut history = device.subscribe(Channel::History).await.unwrap();

        device.write_command(Bytes::from_static(b"SYNC:2")).await.unwrap();

        let mut records = 0;
        loop {
            let payload = timeout(Duration::from_secs(5), history.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            match decode_history_notification(&payload) {
                HistoryEvent::Record(_) => records += 1,
                HistoryEvent::Completion => break,
                HistoryEvent::Skip(reason) => panic!("unexpected skip {:?}", reason),
            }
        }
        assert_eq!(records, 600);
    }

    #[tokio::test]
    async fn test_sync_longer_than_card_sends_everything() {
        let mut short = settings();
        short.history_minutes = 1;
        let device = SimulatedDevice::new(short);
        let history = device.subscribe(Channel::History).await.unwrap();

        device.write_command(Bytes::from_static(b"SYNC:60")).await.unwrap();

        let payloads: Vec<Notification> = timeout(
            Duration::from_secs(5),
            history.take(301).collect::<Vec<_>>(),
        )
        .await
        .unwrap();
        assert_eq!(payloads.last(), Some(&Ok(Bytes::from_static(b"END"))));
    }

    #[tokio::test]
    async fn test_live_notifications_decode() {
        let device = SimulatedDevice::new(settings());
        let mut live = device.subscribe(Channel::Live).await.unwrap();

        let payload = timeout(Duration::from_secs(5), live.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(matches!(
            decode_live_notification(&payload),
            LiveEvent::Record { .. }
        ));
    }

    #[tokio::test]
    async fn test_failing_writes() {
        let device = SimulatedDevice::new(settings());
        device.set_fail_writes(true);

        let result = device.write_command(Bytes::from_static(b"SYNC:1")).await;
        assert!(matches!(result, Err(TransportError::WriteFailed(_))));
    }

    #[tokio::test]
    async fn test_disconnect_ends_streams() {
        let device = SimulatedDevice::new(settings());
        let mut live = device.subscribe(Channel::Live).await.unwrap();
        let mut history = device.subscribe(Channel::History).await.unwrap();

        device.disconnect().await;

        let drained = timeout(Duration::from_secs(5), async {
            while live.next().await.is_some() {}
            history.next().await
        })
        .await
        .unwrap();
        assert!(drained.is_none());
        assert_eq!(
            device.write_command(Bytes::from_static(b"SYNC:1")).await,
            Err(TransportError::Disconnected)
        );
        assert!(device.subscribe(Channel::Live).await.is_err());

        device.reconnect();
        assert!(device.subscribe(Channel::Live).await.is_ok());
    }
}
