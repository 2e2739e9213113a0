//! Table actor
//!
//! One task owns the `Table`. Intents, peer frames, session changes and
//! fired timers all arrive on one queue and are applied in order. After
//! every command the resulting snapshot is republished on a watch channel.

use crate::peer::SessionError;
use ludo_core::{
    GameEvent, GameState, PieceId, PlayerNames, ResetMode, Scheduled, SessionEvent, Table,
    WireMessage,
};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};

/// Everything that can happen to a table
#[derive(Debug)]
pub enum Command {
    Roll,
    Select(PieceId),
    Reset(ResetMode),
    SetPlayerNames(PlayerNames),
    Remote(WireMessage),
    Session(SessionEvent),
    Fire(Scheduled),
}

/// Published view of the table after a command
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u64,
    pub state: GameState,
    /// Events produced by the command that led to this snapshot
    pub events: Vec<GameEvent>,
}

struct Envelope {
    command: Command,
    reply: Option<oneshot::Sender<Snapshot>>,
}

/// Cheap, cloneable access to a running table
#[derive(Clone)]
pub struct TableHandle {
    commands: mpsc::UnboundedSender<Envelope>,
    snapshots: watch::Receiver<Snapshot>,
}

impl TableHandle {
    /// Move `table` into a new actor task
    pub fn spawn(table: Table) -> Self {
        let (commands, inbox) = mpsc::unbounded_channel();
        let (publish, snapshots) = watch::channel(Snapshot {
            version: table.version(),
            state: table.state().clone(),
            events: Vec::new(),
        });

        let timers = commands.downgrade();
        tokio::spawn(run_actor(table, inbox, timers, publish));

        Self {
            commands,
            snapshots,
        }
    }

    /// Queue a command without waiting for it
    pub fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(Envelope {
                command,
                reply: None,
            })
            .map_err(|_| SessionError::RuntimeGone)
    }

    /// Queue a command and wait for the snapshot it produced
    pub async fn apply(&self, command: Command) -> Result<Snapshot, SessionError> {
        let (reply, done) = oneshot::channel();
        self.commands
            .send(Envelope {
                command,
                reply: Some(reply),
            })
            .map_err(|_| SessionError::RuntimeGone)?;
        done.await.map_err(|_| SessionError::RuntimeGone)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Wait until the published version differs from `version`.
    /// Returns `None` if nothing changed within `limit`.
    pub async fn changed_since(&self, version: u64, limit: Duration) -> Option<Snapshot> {
        let mut snapshots = self.snapshots.clone();
        let waited = tokio::time::timeout(limit, snapshots.wait_for(|s| s.version != version)).await;
        match waited {
            Ok(Ok(snapshot)) => Some(snapshot.clone()),
            _ => None,
        }
    }
}

async fn run_actor(
    mut table: Table,
    mut inbox: mpsc::UnboundedReceiver<Envelope>,
    timers: mpsc::WeakUnboundedSender<Envelope>,
    publish: watch::Sender<Snapshot>,
) {
    while let Some(Envelope { command, reply }) = inbox.recv().await {
        let before = table.version();
        let scheduled = match command {
            Command::Roll => table.roll_dice(),
            Command::Select(id) => {
                table.select_piece(id);
                None
            }
            Command::Reset(mode) => {
                table.reset_game(mode);
                None
            }
            Command::SetPlayerNames(names) => {
                table.set_player_names(names);
                None
            }
            Command::Remote(message) => {
                table.apply_remote(message);
                None
            }
            Command::Session(event) => {
                table.apply_session(event);
                None
            }
            Command::Fire(task) => table.run(task),
        };

        if let Some(task) = scheduled {
            schedule(&timers, task);
        }

        let events = table.take_events();
        if table.version() != before || !events.is_empty() {
            publish.send_replace(Snapshot {
                version: table.version(),
                state: table.state().clone(),
                events,
            });
        }
        if let Some(reply) = reply {
            let _ = reply.send(publish.borrow().clone());
        }
    }
    tracing::debug!("table actor stopped");
}

/// Re-enqueue `task` once its delay has elapsed
fn schedule(timers: &mpsc::WeakUnboundedSender<Envelope>, task: Scheduled) {
    let timers = timers.clone();
    tokio::spawn(async move {
        tokio::time::sleep(task.delay).await;
        if let Some(commands) = timers.upgrade() {
            let _ = commands.send(Envelope {
                command: Command::Fire(task),
                reply: None,
            });
        }
    });
}
