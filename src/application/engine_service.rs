// Engine service - Single-writer task serializing every engine mutation
use crate::application::history_sync::SyncError;
use crate::application::sync_engine::{EngineSnapshot, SyncEngine, View};
use crate::application::transport::{Channel, NotificationStream, Transport, TransportError};
use crate::domain::chart::ChartDataset;
use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

const COMMAND_QUEUE: usize = 256;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("engine task stopped")]
    Stopped,
}

/// Everything that may touch engine state, in the order it was enqueued
pub enum EngineCommand {
    Connect {
        transport: Arc<dyn Transport>,
        reply: oneshot::Sender<Result<(), TransportError>>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    Notification {
        channel: Channel,
        link: u64,
        payload: Bytes,
    },
    LinkLost {
        link: u64,
    },
    RequestSync {
        minutes: u32,
        reply: oneshot::Sender<Result<bool, SyncError>>,
    },
    SelectView(View),
    Chart {
        reply: oneshot::Sender<ChartDataset>,
    },
    Snapshot {
        reply: oneshot::Sender<EngineSnapshot>,
    },
}

/// Cloneable entry point used by producers and readers alike
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
    snapshots: watch::Receiver<EngineSnapshot>,
}

pub struct EngineService {
    engine: SyncEngine,
    rx: mpsc::Receiver<EngineCommand>,
    /// Weak so the task ends once every handle is dropped
    tx: mpsc::WeakSender<EngineCommand>,
    snapshots: watch::Sender<EngineSnapshot>,
    /// Bumped on every connect; notifications from older links are dropped
    link: u64,
    pumps: Vec<JoinHandle<()>>,
}

impl EngineService {
    /// Move `engine` into its own task and return the handle feeding it
    pub fn spawn(engine: SyncEngine) -> EngineHandle {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
        let (snapshot_tx, snapshot_rx) = watch::channel(engine.snapshot());

        let service = EngineService {
            engine,
            rx,
            tx: tx.downgrade(),
            snapshots: snapshot_tx,
            link: 0,
            pumps: Vec::new(),
        };
        tokio::spawn(service.run());

        EngineHandle {
            tx,
            snapshots: snapshot_rx,
        }
    }

    async fn run(mut self) {
        tracing::debug!("Engine task started");

        while let Some(command) = self.rx.recv().await {
            self.handle(command).await;
            self.snapshots.send_replace(self.engine.snapshot());
        }

        self.stop_pumps();
        tracing::debug!("Engine task stopped");
    }

    async fn handle(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Connect { transport, reply } => {
                let result = self.connect(transport).await;
                let _ = reply.send(result);
            }
            EngineCommand::Disconnect { reply } => {
                self.disconnect().await;
                let _ = reply.send(());
            }
            EngineCommand::Notification {
                channel,
                link,
                payload,
            } => {
                if link != self.link {
                    tracing::debug!("Dropping {:?} notification from stale link {}", channel, link);
                    return;
                }
                match channel {
                    Channel::History => {
                        self.engine.on_history_notification(&payload);
                    }
                    Channel::Live => self.engine.on_live_notification(&payload),
                }
            }
            EngineCommand::LinkLost { link } => {
                if link == self.link && self.engine.is_connected() {
                    tracing::warn!("Notification stream ended, treating as disconnect");
                    self.disconnect().await;
                }
            }
            EngineCommand::RequestSync { minutes, reply } => {
                let result = self.engine.request_sync(minutes).await;
                let _ = reply.send(result);
            }
            EngineCommand::SelectView(view) => self.engine.select_view(view),
            EngineCommand::Chart { reply } => {
                let _ = reply.send(self.engine.chart().clone());
            }
            EngineCommand::Snapshot { reply } => {
                let _ = reply.send(self.engine.snapshot());
            }
        }
    }

    /// Subscribe to both channels and attach `transport`.
    ///
    /// Connecting while a link is up keeps that link and ignores `transport`.
    async fn connect(&mut self, transport: Arc<dyn Transport>) -> Result<(), TransportError> {
        if self.engine.is_connected() {
            tracing::debug!("Already connected, keeping link {}", self.link);
            return Ok(());
        }

        let history = transport.subscribe(Channel::History).await?;
        let live = transport.subscribe(Channel::Live).await?;

        let Some(tx) = self.tx.upgrade() else {
            return Err(TransportError::Disconnected);
        };

        self.link += 1;
        self.pumps.push(spawn_pump(tx.clone(), Channel::History, self.link, history));
        self.pumps.push(spawn_pump(tx, Channel::Live, self.link, live));
        self.engine.attach(transport);
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.stop_pumps();
        if let Some(transport) = self.engine.detach() {
            transport.disconnect().await;
        }
    }

    fn stop_pumps(&mut self) {
        for pump in self.pumps.drain(..) {
            pump.abort();
        }
    }
}

/// Forward one channel's notifications into the engine queue, in arrival order
fn spawn_pump(
    tx: mpsc::Sender<EngineCommand>,
    channel: Channel,
    link: u64,
    mut stream: NotificationStream,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(notification) = stream.next().await {
            match notification {
                Ok(payload) => {
                    let command = EngineCommand::Notification {
                        channel,
                        link,
                        payload,
                    };
                    if tx.send(command).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    tracing::debug!("Ignoring {:?} notification error: {}", channel, e);
                }
            }
        }
        let _ = tx.send(EngineCommand::LinkLost { link }).await;
    })
}

impl EngineHandle {
    pub async fn connect(&self, transport: Arc<dyn Transport>) -> Result<(), EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Connect { transport, reply }).await?;
        Ok(rx.await.map_err(|_| EngineError::Stopped)??)
    }

    pub async fn disconnect(&self) -> Result<(), EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Disconnect { reply }).await?;
        rx.await.map_err(|_| EngineError::Stopped)
    }

    /// Returns `false` when no device is attached and nothing was sent
    pub async fn request_sync(&self, minutes: u32) -> Result<bool, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::RequestSync { minutes, reply }).await?;
        Ok(rx.await.map_err(|_| EngineError::Stopped)??)
    }

    pub async fn select_view(&self, view: View) -> Result<(), EngineError> {
        self.send(EngineCommand::SelectView(view)).await
    }

    pub async fn chart(&self) -> Result<ChartDataset, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Chart { reply }).await?;
        rx.await.map_err(|_| EngineError::Stopped)
    }

    pub async fn snapshot(&self) -> Result<EngineSnapshot, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| EngineError::Stopped)
    }

    /// Snapshot published after every processed command
    pub fn snapshots(&self) -> watch::Receiver<EngineSnapshot> {
        self.snapshots.clone()
    }

    async fn send(&self, command: EngineCommand) -> Result<(), EngineError> {
        self.tx.send(command).await.map_err(|_| EngineError::Stopped)
    }
}
