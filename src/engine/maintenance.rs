//! Background maintenance worker.
//!
//! Runs [`Engine::run_maintenance`] on an interval and on demand, and
//! optionally checkpoints the engine to disk after each pass. Overlapping
//! passes are skipped by the engine's own guard flag.
//!
//! # Usage
//!
//! ```ignore
//! let worker = MaintenanceWorker::new(engine.clone(), &config.maintenance, snapshot_path);
//! let commands = worker.command_sender();
//! let handle = worker.start();
//! commands.send(MaintenanceCommand::RunNow).await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use super::{Engine, MaintenanceReport};
use crate::config::MaintenanceConfig;

/// Commands that can be sent to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceCommand {
    /// Run a pass now, even while paused
    RunNow,
    /// Stop scheduled passes
    Pause,
    /// Resume scheduled passes
    Resume,
    /// Stop the worker
    Stop,
}

/// Events emitted by the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum MaintenanceEvent {
    PassComplete(MaintenanceReport),
    /// Another pass was still running
    Skipped,
    Checkpointed(PathBuf),
    CheckpointFailed(String),
    Paused,
    Resumed,
    Stopped,
}

pub struct MaintenanceWorker {
    engine: Arc<Engine>,
    period: Duration,
    checkpoint: Option<PathBuf>,
    command_tx: mpsc::Sender<MaintenanceCommand>,
    command_rx: mpsc::Receiver<MaintenanceCommand>,
    event_tx: Option<mpsc::Sender<MaintenanceEvent>>,
}

impl MaintenanceWorker {
    /// `checkpoint` is only used when the config enables checkpointing.
    pub fn new(engine: Arc<Engine>, config: &MaintenanceConfig, checkpoint: Option<PathBuf>) -> Self {
        let (command_tx, command_rx) = mpsc::channel(32);
        Self {
            engine,
            period: config.interval(),
            checkpoint: checkpoint.filter(|_| config.checkpoint),
            command_tx,
            command_rx,
            event_tx: None,
        }
    }

    /// Get a sender for commands.
    pub fn command_sender(&self) -> mpsc::Sender<MaintenanceCommand> {
        self.command_tx.clone()
    }

    /// Set the event sender for receiving updates.
    pub fn set_event_sender(&mut self, tx: mpsc::Sender<MaintenanceEvent>) {
        self.event_tx = Some(tx);
    }

    /// Start the worker task. The first scheduled pass runs one period from now.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        let period = self.period.max(Duration::from_millis(1));
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut paused = false;

        tracing::info!(target: "maintenance", "Maintenance worker started ({:?} interval)", period);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(MaintenanceCommand::RunNow) => self.pass().await,
                        Some(MaintenanceCommand::Pause) => {
                            paused = true;
                            self.emit(MaintenanceEvent::Paused).await;
                            tracing::debug!(target: "maintenance", "Paused");
                        }
                        Some(MaintenanceCommand::Resume) => {
                            paused = false;
                            self.emit(MaintenanceEvent::Resumed).await;
                            tracing::debug!(target: "maintenance", "Resumed");
                        }
                        Some(MaintenanceCommand::Stop) | None => {
                            self.emit(MaintenanceEvent::Stopped).await;
                            tracing::info!(target: "maintenance", "Stopped");
                            break;
                        }
                    }
                }

                _ = timer.tick() => {
                    if !paused {
                        self.pass().await;
                    }
                }
            }
        }
    }

    async fn pass(&self) {
        match self.engine.run_maintenance() {
            Some(report) => self.emit(MaintenanceEvent::PassComplete(report)).await,
            None => {
                self.emit(MaintenanceEvent::Skipped).await;
                return;
            }
        }

        if let Some(path) = &self.checkpoint {
            match self.engine.save(path) {
                Ok(()) => self.emit(MaintenanceEvent::Checkpointed(path.clone())).await,
                Err(e) => {
                    tracing::warn!(target: "maintenance", "Checkpoint failed: {}", e);
                    self.emit(MaintenanceEvent::CheckpointFailed(e.to_string())).await;
                }
            }
        }
    }

    async fn emit(&self, event: MaintenanceEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }
}
