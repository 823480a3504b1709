// Sync engine - Context object owning all client-side protocol state
use crate::application::chart_reducer::ChartReducer;
use crate::application::history_sync::{HistorySyncSession, SyncError, SyncProgress};
use crate::application::live_ingestor::LiveIngestor;
use crate::application::transport::{Transport, TransportError};
use crate::domain::activity::{to_chart_code, ActivityState};
use crate::domain::chart::ChartDataset;
use crate::domain::sample::SampleBuffer;
use crate::domain::session::{SyncSession, SyncStatus};
use crate::infrastructure::codec::{decode_history_notification, decode_live_notification, LiveEvent};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// How long a command write may take before the sync is failed
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Screen the presentation layer is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Live,
    History,
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(Self::Live),
            "history" | "charts" => Ok(Self::History),
            other => Err(format!("unknown view: {}", other)),
        }
    }
}

/// Everything the presentation layer reads from the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSnapshot {
    pub connected: bool,
    pub status: String,
    pub session: SyncSession,
    pub syncing: bool,
    pub view: View,
    pub activity: ActivityState,
    pub activity_label: &'static str,
    pub activity_code: i32,
    pub status_color: &'static str,
    pub background_color: &'static str,
    pub live_svm: f64,
    pub live_window: Vec<f64>,
    pub buffered_samples: usize,
}

pub struct SyncEngine {
    transport: Option<Arc<dyn Transport>>,
    buffer: SampleBuffer,
    live: LiveIngestor,
    sync: HistorySyncSession,
    charts: ChartReducer,
    status: SyncStatus,
    activity: ActivityState,
    live_svm: f64,
    view: View,
    command_timeout: Duration,
}

impl SyncEngine {
    pub fn new(live_window: usize, charts: ChartReducer) -> Self {
        Self {
            transport: None,
            buffer: SampleBuffer::new(),
            live: LiveIngestor::new(live_window),
            sync: HistorySyncSession::new(),
            charts,
            status: SyncStatus::Disconnected,
            activity: ActivityState::Unknown,
            live_svm: 0.0,
            view: View::Live,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn attach(&mut self, transport: Arc<dyn Transport>) {
        self.transport = Some(transport);
        self.status = SyncStatus::Connected;
        tracing::info!("Device attached");
    }

    /// Drop the device link, aborting any transfer in flight.
    ///
    /// Samples already buffered are kept. Returns the detached transport.
    pub fn detach(&mut self) -> Option<Arc<dyn Transport>> {
        let transport = self.transport.take();
        if self.sync.abort() {
            tracing::warn!("Sync aborted by disconnect with {} samples buffered", self.buffer.len());
        }
        self.status = SyncStatus::Disconnected;
        self.activity = ActivityState::Unknown;
        if transport.is_some() {
            tracing::info!("Device detached");
        }
        transport
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    pub fn is_syncing(&self) -> bool {
        self.sync.state().is_active()
    }

    /// Ask the device for the last `minutes` of history.
    ///
    /// Without a device this does nothing and returns `Ok(false)`. A write
    /// still pending after the command timeout fails the session.
    pub async fn request_sync(&mut self, minutes: u32) -> Result<bool, SyncError> {
        let Some(transport) = self.transport.clone() else {
            tracing::debug!("Ignoring sync request without a device");
            return Ok(false);
        };

        let command = self.sync.begin(minutes, &mut self.buffer)?;
        self.status = SyncStatus::Downloading(minutes);

        let written = tokio::time::timeout(self.command_timeout, transport.write_command(command))
            .await
            .unwrap_or(Err(TransportError::Timeout(self.command_timeout)));

        match written {
            Ok(()) => {
                self.sync.command_sent();
                Ok(true)
            }
            Err(e) => {
                self.sync.command_failed(&e);
                self.status = SyncStatus::SendFailed;
                Err(SyncError::CommandWrite(e))
            }
        }
    }

    pub fn on_history_notification(&mut self, payload: &[u8]) -> SyncProgress {
        let event = decode_history_notification(payload);
        let progress = self.sync.on_event(event, &mut self.buffer);

        if progress == SyncProgress::Completed {
            self.status = SyncStatus::SyncComplete;
            self.refresh_charts();
        }

        progress
    }

    pub fn on_live_notification(&mut self, payload: &[u8]) {
        let event = decode_live_notification(payload);

        if let LiveEvent::Record { svm, activity } = event {
            self.live_svm = svm;
            self.activity = activity;
            if self.is_connected() && !self.is_syncing() {
                self.status = SyncStatus::ConnectedLive;
            }
        }

        self.live.ingest(&event, &mut self.buffer);
    }

    /// Switch screens; opening the history view outside a sync rebuilds the charts
    pub fn select_view(&mut self, view: View) {
        self.view = view;
        if view == View::History && !self.is_syncing() {
            self.refresh_charts();
        }
    }

    pub fn refresh_charts(&mut self) -> &ChartDataset {
        self.charts.reduce(self.buffer.as_slice())
    }

    pub fn chart(&self) -> &ChartDataset {
        self.charts.dataset()
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    pub fn session(&self) -> SyncSession {
        self.sync.session()
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn activity(&self) -> ActivityState {
        self.activity
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            connected: self.is_connected(),
            status: self.status.to_string(),
            session: self.sync.session(),
            syncing: self.is_syncing(),
            view: self.view,
            activity: self.activity,
            activity_label: self.activity.label(),
            activity_code: to_chart_code(self.activity),
            status_color: self.activity.status_color(),
            background_color: self.activity.background_color(),
            live_svm: self.live_svm,
            live_window: self.live.window().values(),
            buffered_samples: self.buffer.len(),
        }
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new(crate::domain::sample::DEFAULT_LIVE_WINDOW, ChartReducer::default())
    }
}
