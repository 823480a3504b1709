// History sync session domain model
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    #[default]
    Idle,
    Requesting,
    Receiving,
    Complete,
    Failed,
}

impl SyncState {
    /// Whether a transfer is in flight and history records are accepted
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Requesting | Self::Receiving)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SyncSession {
    pub state: SyncState,
    pub requested_minutes: u32,
}

impl SyncSession {
    pub fn new() -> Self {
        Self::default()
    }
}

/// User-facing connection and sync status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStatus {
    #[default]
    Disconnected,
    Connected,
    ConnectedLive,
    Downloading(u32),
    SyncComplete,
    SendFailed,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connected => write!(f, "Connected"),
            Self::ConnectedLive => write!(f, "Connected (live)"),
            Self::Downloading(minutes) => write!(f, "Downloading {} min...", minutes),
            Self::SyncComplete => write!(f, "Sync complete"),
            Self::SendFailed => write!(f, "Send failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_states() {
        assert!(SyncState::Requesting.is_active());
        assert!(SyncState::Receiving.is_active());
        assert!(!SyncState::Idle.is_active());
        assert!(!SyncState::Complete.is_active());
        assert!(!SyncState::Failed.is_active());
    }

    #[test]
    fn test_status_text() {
        assert_eq!(SyncStatus::default().to_string(), "Disconnected");
        assert_eq!(SyncStatus::Downloading(60).to_string(), "Downloading 60 min...");
        assert_eq!(SyncStatus::ConnectedLive.to_string(), "Connected (live)");
    }
}
