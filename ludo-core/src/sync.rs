//! Replication protocol between the two peers of an online game
//!
//! The peer whose seat is to move is the only writer. After every local
//! mutation it ships the resulting state; the other side merges it while
//! keeping its own session identity (`myColor`, `roomId`, connection status).

use crate::game::{GameState, OnlineStatus, Player, TurnPhase};
use crate::pieces::{Color, PieceId};
use crate::rules::Pieces;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Seat the hosting peer always plays
pub const HOST_SEAT: Color = Color::Red;

/// Seat the joining peer always plays
pub const GUEST_SEAT: Color = Color::Green;

/// Frames exchanged over the peer channel
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireMessage {
    /// Full snapshot sent by the host when the guest's channel opens
    SyncState(GameState),
    /// State after a local mutation by whichever peer performed it
    ActionUpdate(StatePatch),
}

impl WireMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Replicated subset of `GameState`. Absent fields leave the receiver's
/// value untouched; session identity fields are not part of it at all.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<BTreeMap<Color, Player>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pieces: Option<Pieces>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_player: Option<Color>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub dice_value: Option<Option<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TurnPhase>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub winner: Option<Option<Color>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub six_streak: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movable_pieces: Option<Vec<PieceId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_rolling: Option<bool>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub last_dice_value: Option<Option<u8>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub last_player_rolled: Option<Option<Color>>,
}

/// Distinguishes an explicit `null` (clear the field) from an absent one
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<&GameState> for StatePatch {
    fn from(state: &GameState) -> Self {
        Self {
            players: Some(state.players.clone()),
            pieces: Some(state.pieces.clone()),
            current_player: Some(state.current_player),
            dice_value: Some(state.dice_value),
            status: Some(state.status),
            winner: Some(state.winner),
            message: Some(state.message.clone()),
            six_streak: Some(state.six_streak),
            movable_pieces: Some(state.movable_pieces.clone()),
            is_rolling: Some(state.is_rolling),
            last_dice_value: Some(state.last_dice_value),
            last_player_rolled: Some(state.last_player_rolled),
        }
    }
}

/// Connection lifecycle reported by the transport
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// Host listener is up under `room_id`
    HostOpened { room_id: String },
    /// Host could not open its session
    HostFailed,
    /// A guest's channel opened on the host
    GuestJoined,
    /// Guest started dialing `room_id`
    Dialing { room_id: String },
    /// Guest's channel to the host opened
    Connected,
    /// Guest could not reach the host
    JoinFailed,
    /// The other peer went away mid-session
    PeerLost,
}

impl GameState {
    /// Adopt a host snapshot, keeping this instance's seat and room
    pub fn merge_sync(&mut self, remote: GameState) {
        let my_color = self.my_color;
        let room_id = self.room_id.take();
        *self = remote;
        self.my_color = my_color;
        self.room_id = room_id.or(self.room_id.take());
        self.is_online = true;
        self.online_status = OnlineStatus::Connected;
    }

    /// Overlay the fields present in `patch`
    pub fn merge_patch(&mut self, patch: StatePatch) {
        if let Some(players) = patch.players {
            self.players = players;
        }
        if let Some(pieces) = patch.pieces {
            self.pieces = pieces;
        }
        if let Some(current) = patch.current_player {
            self.current_player = current;
        }
        if let Some(dice) = patch.dice_value {
            self.dice_value = dice;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(winner) = patch.winner {
            self.winner = winner;
        }
        if let Some(message) = patch.message {
            self.message = message;
        }
        if let Some(streak) = patch.six_streak {
            self.six_streak = streak;
        }
        if let Some(movable) = patch.movable_pieces {
            self.movable_pieces = movable;
        }
        if let Some(rolling) = patch.is_rolling {
            self.is_rolling = rolling;
        }
        if let Some(last) = patch.last_dice_value {
            self.last_dice_value = last;
        }
        if let Some(last) = patch.last_player_rolled {
            self.last_player_rolled = last;
        }
    }

    pub fn apply_remote(&mut self, message: WireMessage) {
        match message {
            WireMessage::SyncState(remote) => self.merge_sync(remote),
            WireMessage::ActionUpdate(patch) => self.merge_patch(patch),
        }
    }

    /// Record a connection lifecycle change
    pub fn apply_session(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::HostOpened { room_id } => {
                self.is_online = true;
                self.my_color = Some(HOST_SEAT);
                self.room_id = Some(room_id);
                self.online_status = OnlineStatus::Connecting;
                self.message = "Waiting for friend to join...".to_string();
            }
            SessionEvent::HostFailed => {
                self.online_status = OnlineStatus::Error;
                self.message = "Connection failed. Try again.".to_string();
            }
            SessionEvent::GuestJoined => {
                self.online_status = OnlineStatus::Connected;
                self.message = "Friend joined! Game starting.".to_string();
            }
            SessionEvent::Dialing { room_id } => {
                self.is_online = true;
                self.my_color = Some(GUEST_SEAT);
                self.room_id = Some(room_id);
                self.online_status = OnlineStatus::Connecting;
                self.message = "Connecting to host...".to_string();
            }
            SessionEvent::Connected => {
                self.online_status = OnlineStatus::Connected;
                self.message = "Connected!".to_string();
            }
            SessionEvent::JoinFailed => {
                self.online_status = OnlineStatus::Error;
                self.message = "Could not connect to room.".to_string();
            }
            SessionEvent::PeerLost => {
                self.online_status = OnlineStatus::Error;
                self.message = "Friend disconnected.".to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::PlayerNames;

    fn host_state() -> GameState {
        let mut state = GameState::new(&PlayerNames::default());
        state.apply_session(SessionEvent::HostOpened {
            room_id: "ABC123".to_string(),
        });
        state.apply_session(SessionEvent::GuestJoined);
        state
    }

    fn guest_state() -> GameState {
        let mut state = GameState::new(&PlayerNames::default());
        state.apply_session(SessionEvent::Dialing {
            room_id: "ABC123".to_string(),
        });
        state.apply_session(SessionEvent::Connected);
        state
    }

    #[test]
    fn test_wire_format() {
        let json = WireMessage::SyncState(host_state()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "SYNC_STATE");
        assert_eq!(value["payload"]["myColor"], "red");

        let patch = StatePatch {
            current_player: Some(Color::Green),
            ..Default::default()
        };
        let json = WireMessage::ActionUpdate(patch).to_json().unwrap();
        assert_eq!(
            json,
            r#"{"type":"ACTION_UPDATE","payload":{"currentPlayer":"green"}}"#
        );
    }

    #[test]
    fn test_sync_keeps_local_seat() {
        let mut guest = guest_state();
        guest.merge_sync(host_state());
        assert_eq!(guest.my_color, Some(GUEST_SEAT));
        assert_eq!(guest.online_status, OnlineStatus::Connected);
        assert_eq!(guest.message, "Friend joined! Game starting.");
    }

    #[test]
    fn test_sync_is_idempotent() {
        let mut host = host_state();
        host.pieces.get_mut(&PieceId::new(Color::Red, 0)).unwrap().position = 0;

        let mut once = guest_state();
        once.merge_sync(host.clone());
        let mut twice = once.clone();
        twice.merge_sync(host);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_full_state_payload_decodes_as_patch() {
        // A peer may ship the whole state as an update; identity fields are dropped
        let host = host_state();
        let raw = serde_json::json!({ "type": "ACTION_UPDATE", "payload": host });
        let message = WireMessage::from_json(&raw.to_string()).unwrap();

        let mut guest = guest_state();
        guest.apply_remote(message);
        assert_eq!(guest.my_color, Some(GUEST_SEAT));
        assert_eq!(guest.pieces, host.pieces);
        assert_eq!(guest.message, host.message);
    }

    #[test]
    fn test_patch_only_touches_present_fields() {
        let mut guest = guest_state();
        let before = guest.clone();
        guest.merge_patch(StatePatch {
            is_rolling: Some(true),
            last_dice_value: Some(None),
            ..Default::default()
        });
        assert!(guest.is_rolling);
        assert_eq!(guest.pieces, before.pieces);
        assert_eq!(guest.message, before.message);
    }

    #[test]
    fn test_patch_null_clears_optional_fields() {
        let mut guest = guest_state();
        guest.dice_value = Some(4);
        guest.winner = Some(Color::Red);

        let json = r#"{"type":"ACTION_UPDATE","payload":{"diceValue":null}}"#;
        guest.apply_remote(WireMessage::from_json(json).unwrap());
        assert_eq!(guest.dice_value, None);
        assert_eq!(guest.winner, Some(Color::Red), "absent field is kept");
    }

    #[test]
    fn test_full_patch_round_trips_through_json() {
        let mut host = host_state();
        host.dice_value = None;
        host.last_dice_value = Some(5);
        let json = WireMessage::ActionUpdate(StatePatch::from(&host)).to_json().unwrap();

        let mut guest = guest_state();
        guest.dice_value = Some(2);
        guest.apply_remote(WireMessage::from_json(&json).unwrap());
        assert_eq!(guest.dice_value, None);
        assert_eq!(guest.last_dice_value, Some(5));
        assert_eq!(guest.my_color, Some(GUEST_SEAT));
    }

    #[test]
    fn test_session_messages() {
        let mut state = GameState::new(&PlayerNames::default());
        state.apply_session(SessionEvent::HostFailed);
        assert_eq!(state.online_status, OnlineStatus::Error);
        assert_eq!(state.message, "Connection failed. Try again.");

        let mut state = guest_state();
        state.apply_session(SessionEvent::PeerLost);
        assert_eq!(state.message, "Friend disconnected.");
    }
}
