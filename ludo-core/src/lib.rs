//! Ludo Core - Rules engine and turn machine
//!
//! This crate provides the core game logic for four-color Ludo:
//! - Board geometry (52-cell track, home stretches, safe cells)
//! - Piece identity and movement rules
//! - Game state and pure turn transitions
//! - Turn machine with deferred, cancellable tasks
//! - Replication messages for two-peer online play

pub mod board;
pub mod pieces;
pub mod rules;
pub mod settings;
pub mod game;
pub mod sync;
pub mod table;

// Re-exports for convenient access
pub use board::{BoardLayout, GridCoord, SAFE_CELLS, TRACK_LEN};
pub use pieces::{Color, ParsePieceIdError, Piece, PieceId, PieceStatus};
pub use rules::{compute_move, find_movable_pieces, MoveTarget, Pieces};
pub use settings::{GameSettings, PlayerNames, SettingsError, Timings};
pub use game::{GameEvent, GameState, MoveReport, OnlineStatus, Player, RollOutcome, TurnPhase};
pub use sync::{SessionEvent, StatePatch, WireMessage, GUEST_SEAT, HOST_SEAT};
pub use table::{Broadcast, Dice, NoPeer, RandomDice, ResetMode, Scheduled, Stamp, Table, Task};
