// History sync session - Bulk transfer state machine
use crate::application::transport::TransportError;
use crate::domain::sample::SampleBuffer;
use crate::domain::session::{SyncSession, SyncState};
use crate::infrastructure::codec::{encode_command, HistoryEvent};
use bytes::Bytes;
use std::num::NonZeroU32;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("sync range must be a positive number of minutes")]
    InvalidRange,

    #[error("a sync of {0} min is already in progress")]
    AlreadySyncing(u32),

    #[error("failed to send sync command: {0}")]
    CommandWrite(#[from] TransportError),
}

/// What a history notification did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncProgress {
    Recorded,
    Completed,
    Skipped,
    /// Arrived while no transfer was in flight
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct HistorySyncSession {
    session: SyncSession,
}

impl HistorySyncSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> SyncSession {
        self.session
    }

    pub fn state(&self) -> SyncState {
        self.session.state
    }

    /// Start a transfer: clears the buffer and returns the command to send.
    ///
    /// The buffer is cleared here and nowhere else.
    pub fn begin(&mut self, minutes: u32, buffer: &mut SampleBuffer) -> Result<Bytes, SyncError> {
        let minutes = NonZeroU32::new(minutes).ok_or(SyncError::InvalidRange)?;

        if self.session.state.is_active() {
            return Err(SyncError::AlreadySyncing(self.session.requested_minutes));
        }

        buffer.clear();
        self.session = SyncSession {
            state: SyncState::Requesting,
            requested_minutes: minutes.get(),
        };
        tracing::info!("Requesting {} min of history", minutes);

        Ok(encode_command(minutes))
    }

    /// The command write was confirmed
    pub fn command_sent(&mut self) {
        if self.session.state == SyncState::Requesting {
            self.transition(SyncState::Receiving);
        }
    }

    /// The command write failed; the session ends without retry
    pub fn command_failed(&mut self, error: &TransportError) {
        tracing::warn!("Sync command failed: {}", error);
        self.transition(SyncState::Failed);
    }

    /// Abort an in-flight transfer, e.g. on disconnect. Returns whether one was aborted.
    pub fn abort(&mut self) -> bool {
        if self.session.state.is_active() {
            self.transition(SyncState::Failed);
            true
        } else {
            false
        }
    }

    pub fn on_event(&mut self, event: HistoryEvent, buffer: &mut SampleBuffer) -> SyncProgress {
        if !self.session.state.is_active() {
            tracing::debug!(
                "Ignoring history notification in {:?} state",
                self.session.state
            );
            return SyncProgress::Ignored;
        }

        match event {
            HistoryEvent::Record(sample) => {
                buffer.push(sample);
                if self.session.state == SyncState::Requesting {
                    self.transition(SyncState::Receiving);
                }
                SyncProgress::Recorded
            }
            HistoryEvent::Completion => {
                self.transition(SyncState::Complete);
                tracing::info!("History sync complete: {} samples buffered", buffer.len());
                SyncProgress::Completed
            }
            HistoryEvent::Skip(reason) => {
                tracing::debug!("Dropping history notification: {:?}", reason);
                SyncProgress::Skipped
            }
        }
    }

    fn transition(&mut self, next: SyncState) {
        tracing::debug!("Sync session {:?} -> {:?}", self.session.state, next);
        self.session.state = next;
    }
}
