//! Game state and its pure turn transitions

use crate::pieces::{Color, PieceId, PieceStatus};
use crate::rules::{
    captured_by, compute_move, find_movable_pieces, has_won, starting_pieces, MoveTarget, Pieces,
};
use crate::settings::PlayerNames;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// CORE TYPES
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub color: Color,
    pub name: String,
}

/// Turn phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TurnPhase {
    WaitingForRoll,
    WaitingForMove,
    GameOver,
}

/// Peer connection status as shown to the player
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnlineStatus {
    Connecting,
    Connected,
    Offline,
    Error,
}

/// What a resolved roll asks the turn machine to do next
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RollOutcome {
    /// Third six in a row: the turn is forfeited after a pause
    Forfeit,
    /// Exactly one legal move, applied automatically after a pause
    Forced(PieceId),
    /// Several legal moves; wait for the player to pick
    Choose,
    /// Nothing movable but a six was rolled: same player rolls again
    RollAgain,
    /// Nothing movable: the turn passes after a pause
    NoMoves,
}

/// Summary of an applied move
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveReport {
    pub piece: PieceId,
    pub color: Color,
    pub dice: u8,
    pub from: i8,
    pub target: MoveTarget,
    pub captured: Vec<PieceId>,
    pub won: bool,
    pub turn_continues: bool,
}

impl MoveReport {
    pub fn reached_home(&self) -> bool {
        self.target.status == PieceStatus::Home
    }
}

/// Notable transitions for sound and commentary collaborators
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GameEvent {
    DiceRolled { color: Color, face: u8 },
    PieceMoved { piece: PieceId, from: i8, to: i8 },
    PieceCaptured { piece: PieceId, by: PieceId },
    PieceHome { piece: PieceId },
    TurnForfeited { color: Color },
    TurnPassed { from: Color, to: Color },
    Won { color: Color },
}

// ============================================================================
// GAME STATE
// ============================================================================

/// The whole replicated snapshot of one game
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub players: BTreeMap<Color, Player>,
    pub pieces: Pieces,
    pub current_player: Color,
    pub dice_value: Option<u8>,
    pub status: TurnPhase,
    pub winner: Option<Color>,
    pub message: String,
    pub six_streak: u8,
    pub movable_pieces: Vec<PieceId>,
    pub is_rolling: bool,
    pub last_dice_value: Option<u8>,
    pub last_player_rolled: Option<Color>,

    pub is_online: bool,
    /// Seat this instance controls; `None` when playing locally
    pub my_color: Option<Color>,
    pub room_id: Option<String>,
    pub online_status: OnlineStatus,
}

impl GameState {
    // ========================================================================
    // CONSTRUCTORS
    // ========================================================================

    /// Fresh offline game, red to roll
    pub fn new(names: &PlayerNames) -> Self {
        let players = Color::ALL
            .iter()
            .map(|&color| {
                (
                    color,
                    Player {
                        color,
                        name: names.get(color).to_string(),
                    },
                )
            })
            .collect();

        Self {
            players,
            pieces: starting_pieces(),
            current_player: Color::Red,
            dice_value: None,
            status: TurnPhase::WaitingForRoll,
            winner: None,
            message: format!("{}, roll the dice!", names.get(Color::Red)),
            six_streak: 0,
            movable_pieces: Vec::new(),
            is_rolling: false,
            last_dice_value: None,
            last_player_rolled: None,
            is_online: false,
            my_color: None,
            room_id: None,
            online_status: OnlineStatus::Offline,
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn name(&self, color: Color) -> &str {
        self.players
            .get(&color)
            .map(|p| p.name.as_str())
            .unwrap_or_else(|| color.label())
    }

    /// Seat after `color`: four-way rotation locally, red/green online
    pub fn next_player(&self, color: Color) -> Color {
        if self.is_online {
            match color {
                Color::Red => Color::Green,
                _ => Color::Red,
            }
        } else {
            color.next()
        }
    }

    /// Whether this instance may act for the current player
    pub fn controls_current_seat(&self) -> bool {
        !self.is_online || self.my_color == Some(self.current_player)
    }

    pub fn can_roll(&self) -> bool {
        self.status == TurnPhase::WaitingForRoll && self.winner.is_none() && !self.is_rolling
    }

    // ========================================================================
    // TRANSITIONS
    // ========================================================================

    /// Start a roll. Returns false if rolling is not allowed right now.
    pub fn begin_roll(&mut self) -> bool {
        if !self.controls_current_seat() || !self.can_roll() {
            return false;
        }
        self.is_rolling = true;
        self.last_dice_value = None;
        self.last_player_rolled = None;
        true
    }

    /// Settle an in-flight roll on `face`
    pub fn resolve_roll(&mut self, face: u8) -> Option<RollOutcome> {
        if !self.is_rolling || !(1..=6).contains(&face) {
            return None;
        }
        let player = self.current_player;
        let name = self.name(player).to_string();

        self.dice_value = Some(face);
        self.is_rolling = false;

        let streak = if face == 6 { self.six_streak + 1 } else { 0 };
        if streak == 3 {
            self.six_streak = 0;
            self.movable_pieces.clear();
            self.message = format!("Oops! Three 6s. {}'s turn is skipped.", name);
            return Some(RollOutcome::Forfeit);
        }
        self.six_streak = streak;

        let movable = find_movable_pieces(player, face, &self.pieces);
        if movable.is_empty() {
            self.movable_pieces.clear();
            self.status = TurnPhase::WaitingForRoll;
            if face == 6 {
                self.message = format!("{}, you got a 6! Roll again.", name);
                return Some(RollOutcome::RollAgain);
            }
            self.message = format!("{}, no possible moves.", name);
            return Some(RollOutcome::NoMoves);
        }

        self.status = TurnPhase::WaitingForMove;
        let outcome = if movable.len() == 1 {
            self.message = "Only one move. Moving automatically...".to_string();
            RollOutcome::Forced(movable[0])
        } else {
            self.message = format!("{}, select a piece to move.", name);
            RollOutcome::Choose
        };
        self.movable_pieces = movable;
        Some(outcome)
    }

    /// Pass the turn from `from` to the next seat, remembering `last_dice`.
    /// No-op when the turn already moved on.
    pub fn hand_over(&mut self, from: Color, last_dice: u8) -> bool {
        if self.current_player != from || self.status == TurnPhase::GameOver {
            return false;
        }
        let next = self.next_player(from);
        self.current_player = next;
        self.dice_value = None;
        self.last_dice_value = Some(last_dice);
        self.last_player_rolled = Some(from);
        self.status = TurnPhase::WaitingForRoll;
        self.message = format!("{}, roll the dice!", self.name(next));
        self.six_streak = 0;
        self.movable_pieces.clear();
        self.is_rolling = false;
        true
    }

    /// Move one of the offered pieces
    pub fn apply_move(&mut self, id: PieceId) -> Option<MoveReport> {
        if !self.controls_current_seat()
            || self.status != TurnPhase::WaitingForMove
            || !self.movable_pieces.contains(&id)
        {
            return None;
        }
        let dice = self.dice_value?;
        let player = self.current_player;
        let piece = *self.pieces.get(&id)?;
        let target = compute_move(&piece, dice, player, &self.pieces)?;

        let captured = captured_by(target, player, &self.pieces);
        if let Some(moved) = self.pieces.get_mut(&id) {
            moved.position = target.position;
            moved.status = target.status;
        }
        for victim in &captured {
            if let Some(p) = self.pieces.get_mut(victim) {
                p.return_to_base();
            }
        }

        let reached_home = target.status == PieceStatus::Home;
        let turn_continues = dice == 6 || !captured.is_empty() || reached_home;
        let won = has_won(player, &self.pieces);
        let name = self.name(player).to_string();

        if won {
            self.winner = Some(player);
            self.status = TurnPhase::GameOver;
            self.message = format!("{} wins!", name);
            self.last_dice_value = Some(dice);
            self.last_player_rolled = Some(player);
            self.dice_value = None;
            self.movable_pieces.clear();
        } else if turn_continues {
            self.status = TurnPhase::WaitingForRoll;
            self.dice_value = None;
            self.movable_pieces.clear();
            self.message = if !captured.is_empty() {
                format!("{} captured a piece! Roll again.", name)
            } else if reached_home {
                format!("{} got a piece home! Roll again.", name)
            } else {
                format!("{}, roll again!", name)
            };
        } else {
            self.hand_over(player, dice);
        }

        Some(MoveReport {
            piece: id,
            color: player,
            dice,
            from: piece.position,
            target,
            captured,
            won,
            turn_continues,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
