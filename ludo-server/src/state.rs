//! Server state management
//!
//! Shared handles to the running table and the peer session hub.

use crate::peer::{Outbox, PeerHub};
use crate::runtime::TableHandle;
use crate::ServerConfig;
use ludo_core::{Dice, RandomDice, Table};

/// Server-wide shared state
pub struct ServerState {
    pub table: TableHandle,
    pub peers: PeerHub,
}

impl ServerState {
    /// Spawn the table actor. Must be called inside a tokio runtime.
    pub fn new(config: &ServerConfig) -> Self {
        let dice: Box<dyn Dice> = match config.seed {
            Some(seed) => Box::new(RandomDice::seeded(seed)),
            None => Box::new(RandomDice::from_entropy()),
        };
        let outbox = Outbox::default();
        let table = TableHandle::spawn(Table::new(
            config.settings.clone(),
            dice,
            Box::new(outbox.clone()),
        ));
        let peers = PeerHub::new(
            table.clone(),
            outbox,
            config.public_host.clone(),
            config.peer_port,
        );

        Self { table, peers }
    }
}
