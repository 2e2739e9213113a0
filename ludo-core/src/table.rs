//! Turn machine: owns the `GameState` and sequences rolls, moves and resets
//!
//! Pauses between transitions are returned to the caller as `Scheduled`
//! tasks instead of sleeping here. Each task carries the `Stamp` it was
//! issued against; when it comes back and the game has moved on it is
//! dropped without effect. Session changes and remote merges that leave
//! the turn untouched do not move the game on.

use crate::game::{GameEvent, GameState, MoveReport, OnlineStatus, RollOutcome, TurnPhase};
use crate::pieces::{Color, PieceId};
use crate::settings::{GameSettings, PlayerNames, Timings};
use crate::sync::{SessionEvent, StatePatch, WireMessage};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

// ============================================================================
// SEAMS
// ============================================================================

/// Outbound half of the peer channel, injected by the session layer
pub trait Broadcast: Send {
    fn broadcast(&self, message: WireMessage);
}

/// Broadcaster for tables with no peer attached
pub struct NoPeer;

impl Broadcast for NoPeer {
    fn broadcast(&self, _message: WireMessage) {}
}

/// Source of dice faces
pub trait Dice: Send {
    /// A face in 1..=6
    fn roll(&mut self) -> u8;
}

/// Uniform dice backed by a ChaCha stream
pub struct RandomDice {
    rng: ChaCha8Rng,
}

impl RandomDice {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }
}

impl Dice for RandomDice {
    fn roll(&mut self) -> u8 {
        self.rng.gen_range(1..=6)
    }
}

// ============================================================================
// DEFERRED TASKS
// ============================================================================

/// Game epoch and seat a deferred task was issued against
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stamp {
    pub epoch: u64,
    pub player: Color,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Task {
    /// Settle the dice after the suspense pause
    ResolveRoll,
    /// Hand the turn over after three sixes
    Forfeit { last_dice: u8 },
    /// Hand the turn over after a roll with no legal move
    PassTurn { last_dice: u8 },
    /// Apply the only legal move
    AutoMove(PieceId),
}

/// A task to feed back into `Table::run` once `delay` has elapsed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scheduled {
    pub task: Task,
    pub delay: Duration,
    pub stamp: Stamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetMode {
    /// New game, same peer session (play again)
    Soft,
    /// New offline game; the session is being torn down
    Hard,
}

// ============================================================================
// TABLE
// ============================================================================

pub struct Table {
    state: GameState,
    names: PlayerNames,
    timings: Timings,
    version: u64,
    epoch: u64,
    pending_handoff: Option<Stamp>,
    dice: Box<dyn Dice>,
    outbox: Box<dyn Broadcast>,
    events: Vec<GameEvent>,
}

impl Table {
    pub fn new(settings: GameSettings, dice: Box<dyn Dice>, outbox: Box<dyn Broadcast>) -> Self {
        Self {
            state: GameState::new(&settings.player_names),
            names: settings.player_names,
            timings: settings.timings,
            version: 0,
            epoch: 0,
            pending_handoff: None,
            dice,
            outbox,
            events: Vec::new(),
        }
    }

    /// Offline table with random dice and no peer
    pub fn local(settings: GameSettings) -> Self {
        Self::new(settings, Box::new(RandomDice::from_entropy()), Box::new(NoPeer))
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Bumped on every change, including session and remote ones
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn names(&self) -> &PlayerNames {
        &self.names
    }

    /// Events emitted since the last call
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    fn stamp(&self) -> Stamp {
        Stamp {
            epoch: self.epoch,
            player: self.state.current_player,
        }
    }

    fn schedule(&self, task: Task, delay: Duration) -> Scheduled {
        Scheduled {
            task,
            delay,
            stamp: self.stamp(),
        }
    }

    fn handoff_pending(&self) -> bool {
        self.pending_handoff == Some(self.stamp())
    }

    /// Record a local game transition and replicate it when online
    fn publish(&mut self) {
        self.version += 1;
        self.epoch += 1;
        if self.state.is_online {
            self.outbox
                .broadcast(WireMessage::ActionUpdate(StatePatch::from(&self.state)));
        }
    }

    // ========================================================================
    // ENTRY POINTS
    // ========================================================================

    /// Start a roll; the face resolves when the returned task runs
    pub fn roll_dice(&mut self) -> Option<Scheduled> {
        if self.handoff_pending() || !self.state.begin_roll() {
            return None;
        }
        self.publish();
        tracing::debug!(player = %self.state.current_player, "rolling");
        Some(self.schedule(Task::ResolveRoll, self.timings.roll()))
    }

    /// Move one of the offered pieces. Anything else is silently ignored.
    pub fn select_piece(&mut self, id: PieceId) -> Option<MoveReport> {
        let report = self.state.apply_move(id)?;
        tracing::info!(
            piece = %report.piece,
            from = report.from,
            to = report.target.position,
            captured = report.captured.len(),
            "piece moved"
        );

        self.events.push(GameEvent::PieceMoved {
            piece: report.piece,
            from: report.from,
            to: report.target.position,
        });
        for &victim in &report.captured {
            self.events.push(GameEvent::PieceCaptured {
                piece: victim,
                by: report.piece,
            });
        }
        if report.reached_home() {
            self.events.push(GameEvent::PieceHome {
                piece: report.piece,
            });
        }
        if report.won {
            tracing::info!(winner = %report.color, "game over");
            self.events.push(GameEvent::Won {
                color: report.color,
            });
        } else if !report.turn_continues {
            self.events.push(GameEvent::TurnPassed {
                from: report.color,
                to: self.state.current_player,
            });
        }

        self.publish();
        Some(report)
    }

    /// Start over. A soft reset keeps the peer session, a hard one drops it.
    pub fn reset_game(&mut self, mode: ResetMode) {
        let mut fresh = GameState::new(&self.names);
        if mode == ResetMode::Soft && self.state.is_online {
            fresh.is_online = true;
            fresh.my_color = self.state.my_color;
            fresh.room_id = self.state.room_id.take();
            fresh.online_status = self.state.online_status;
        }
        tracing::info!(?mode, "game reset");
        self.state = fresh;
        self.pending_handoff = None;
        self.publish();
    }

    /// Change display names; an offline game restarts with them
    pub fn set_player_names(&mut self, names: PlayerNames) {
        self.names = names;
        if !self.state.is_online {
            self.reset_game(ResetMode::Soft);
        }
    }

    /// Merge a frame from the other peer. Pending tasks survive unless
    /// the merge moved the turn.
    pub fn apply_remote(&mut self, message: WireMessage) {
        let before = self.turn_shape();
        self.state.apply_remote(message);
        self.version += 1;
        if self.turn_shape() != before {
            self.epoch += 1;
        }
    }

    fn turn_shape(&self) -> (Color, TurnPhase, bool) {
        (
            self.state.current_player,
            self.state.status,
            self.state.is_rolling,
        )
    }

    /// Record a connection lifecycle change from the session layer
    pub fn apply_session(&mut self, event: SessionEvent) {
        let joined = event == SessionEvent::GuestJoined;
        self.state.apply_session(event);
        self.version += 1;
        if joined && self.state.online_status == OnlineStatus::Connected {
            self.outbox
                .broadcast(WireMessage::SyncState(self.state.clone()));
        }
    }

    // ========================================================================
    // DEFERRED TASKS
    // ========================================================================

    /// Run a task that was scheduled earlier, possibly scheduling another
    pub fn run(&mut self, scheduled: Scheduled) -> Option<Scheduled> {
        if scheduled.stamp != self.stamp() {
            tracing::debug!(task = ?scheduled.task, "dropping stale task");
            return None;
        }

        match scheduled.task {
            Task::ResolveRoll => self.resolve_roll(),
            Task::Forfeit { last_dice } => {
                self.finish_handoff(scheduled.stamp.player, last_dice, true);
                None
            }
            Task::PassTurn { last_dice } => {
                self.finish_handoff(scheduled.stamp.player, last_dice, false);
                None
            }
            Task::AutoMove(id) => {
                self.select_piece(id);
                None
            }
        }
    }

    /// Run `first` and everything it schedules, ignoring the delays
    pub fn run_chain(&mut self, first: Option<Scheduled>) {
        let mut next = first;
        while let Some(scheduled) = next {
            next = self.run(scheduled);
        }
    }

    fn resolve_roll(&mut self) -> Option<Scheduled> {
        let face = self.dice.roll();
        let player = self.state.current_player;
        let outcome = self.state.resolve_roll(face)?;
        tracing::info!(player = %player, face, ?outcome, "dice resolved");
        self.events.push(GameEvent::DiceRolled {
            color: player,
            face,
        });
        self.publish();

        match outcome {
            RollOutcome::Forfeit => {
                let scheduled = self.schedule(Task::Forfeit { last_dice: face }, self.timings.penalty());
                self.pending_handoff = Some(scheduled.stamp);
                Some(scheduled)
            }
            RollOutcome::NoMoves => {
                let scheduled = self.schedule(Task::PassTurn { last_dice: face }, self.timings.pass());
                self.pending_handoff = Some(scheduled.stamp);
                Some(scheduled)
            }
            RollOutcome::Forced(id) if self.state.controls_current_seat() => {
                Some(self.schedule(Task::AutoMove(id), self.timings.auto_move()))
            }
            RollOutcome::Forced(_) | RollOutcome::Choose | RollOutcome::RollAgain => None,
        }
    }

    fn finish_handoff(&mut self, from: Color, last_dice: u8, forfeited: bool) {
        self.pending_handoff = None;
        if !self.state.hand_over(from, last_dice) {
            return;
        }
        if forfeited {
            self.events.push(GameEvent::TurnForfeited { color: from });
        }
        self.events.push(GameEvent::TurnPassed {
            from,
            to: self.state.current_player,
        });
        tracing::debug!(from = %from, to = %self.state.current_player, "turn handed over");
        self.publish();
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pieces::PieceStatus;
    use crate::sync::GUEST_SEAT;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Dice that return a fixed script of faces
    struct LoadedDice(VecDeque<u8>);

    impl Dice for LoadedDice {
        fn roll(&mut self) -> u8 {
            self.0.pop_front().unwrap_or(1)
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<WireMessage>>>);

    impl Broadcast for Recorder {
        fn broadcast(&self, message: WireMessage) {
            self.0.lock().unwrap().push(message);
        }
    }

    impl Recorder {
        fn sent(&self) -> Vec<WireMessage> {
            self.0.lock().unwrap().clone()
        }
    }

    fn table(faces: &[u8]) -> Table {
        Table::new(
            GameSettings::default(),
            Box::new(LoadedDice(faces.iter().copied().collect())),
            Box::new(NoPeer),
        )
    }

    fn id(color: Color, index: u8) -> PieceId {
        PieceId::new(color, index)
    }

    /// Roll and settle the dice, returning whatever that schedules
    fn roll(table: &mut Table) -> Option<Scheduled> {
        let pending = table.roll_dice().expect("roll accepted");
        assert!(table.state().is_rolling);
        table.run(pending)
    }

    #[test]
    fn test_roll_schedules_resolution_with_delay() {
        let mut table = table(&[3]);
        let pending = table.roll_dice().unwrap();
        assert_eq!(pending.task, Task::ResolveRoll);
        assert_eq!(pending.delay, Duration::from_millis(1000));
        assert!(table.roll_dice().is_none(), "already rolling");
    }

    #[test]
    fn test_no_move_passes_turn_after_pause() {
        let mut table = table(&[4]);
        let pass = roll(&mut table).unwrap();
        assert_eq!(pass.task, Task::PassTurn { last_dice: 4 });
        assert_eq!(table.state().current_player, Color::Red);
        assert!(table.roll_dice().is_none(), "handoff pending");

        assert!(table.run(pass).is_none());
        assert_eq!(table.state().current_player, Color::Green);
        assert_eq!(table.state().last_player_rolled, Some(Color::Red));
        assert!(table.roll_dice().is_some());
    }

    #[test]
    fn test_forced_move_runs_automatically() {
        let mut table = table(&[6]);
        table.state.pieces.get_mut(&id(Color::Red, 0)).unwrap().status = PieceStatus::Active;
        table.state.pieces.get_mut(&id(Color::Red, 0)).unwrap().position = 0;
        // Everything else red is already home
        for i in 1..4 {
            let piece = table.state.pieces.get_mut(&id(Color::Red, i)).unwrap();
            piece.status = PieceStatus::Home;
            piece.position = 58;
        }

        let auto = roll(&mut table).unwrap();
        assert_eq!(auto.task, Task::AutoMove(id(Color::Red, 0)));
        assert_eq!(auto.delay, Duration::from_millis(1200));
        assert_eq!(table.state().status, TurnPhase::WaitingForMove);

        table.run(auto);
        assert_eq!(table.state().pieces[&id(Color::Red, 0)].position, 6);
        // Rolled a six, so red goes again
        assert_eq!(table.state().current_player, Color::Red);
        assert_eq!(table.state().status, TurnPhase::WaitingForRoll);
    }

    #[test]
    fn test_manual_pick_makes_auto_move_stale() {
        let mut table = table(&[2]);
        {
            let piece = table.state.pieces.get_mut(&id(Color::Red, 0)).unwrap();
            piece.status = PieceStatus::Active;
            piece.position = 10;
        }
        let auto = roll(&mut table).unwrap();
        assert!(table.select_piece(id(Color::Red, 0)).is_some());
        let version = table.version();

        assert!(table.run(auto).is_none());
        assert_eq!(table.version(), version);
        assert_eq!(table.state().pieces[&id(Color::Red, 0)].position, 12);
    }

    #[test]
    fn test_three_sixes_forfeit_turn() {
        let mut table = table(&[6, 6, 6]);
        {
            let piece = table.state.pieces.get_mut(&id(Color::Red, 0)).unwrap();
            piece.status = PieceStatus::Active;
            piece.position = 10;
        }
        assert!(roll(&mut table).is_none(), "choice between base exit and track");
        table.select_piece(id(Color::Red, 0)).unwrap();
        roll(&mut table);
        table.select_piece(id(Color::Red, 0)).unwrap();

        let forfeit = roll(&mut table).unwrap();
        assert_eq!(forfeit.task, Task::Forfeit { last_dice: 6 });
        assert_eq!(forfeit.delay, Duration::from_millis(1000));
        table.run(forfeit);
        assert_eq!(table.state().current_player, Color::Green);
        assert_eq!(table.state().six_streak, 0);

        let events = table.take_events();
        assert!(events.contains(&GameEvent::TurnForfeited { color: Color::Red }));
    }

    #[test]
    fn test_reset_cancels_pending_work() {
        let mut table = table(&[3]);
        let pending = table.roll_dice().unwrap();
        table.reset_game(ResetMode::Soft);
        assert!(table.run(pending).is_none());
        assert!(!table.state().is_rolling);
        assert_eq!(table.state().dice_value, None);
    }

    #[test]
    fn test_player_names_restart_offline_game() {
        let mut table = table(&[]);
        let mut names = PlayerNames::default();
        names.red = "Ana".to_string();
        table.set_player_names(names);
        assert_eq!(table.state().message, "Ana, roll the dice!");
        assert_eq!(table.state().name(Color::Red), "Ana");
    }

    #[test]
    fn test_online_mutations_are_broadcast() {
        let recorder = Recorder::default();
        let mut table = Table::new(
            GameSettings::default(),
            Box::new(LoadedDice(VecDeque::from(vec![5]))),
            Box::new(recorder.clone()),
        );
        table.apply_session(SessionEvent::HostOpened {
            room_id: "ROOM42".to_string(),
        });
        assert!(recorder.sent().is_empty());

        table.apply_session(SessionEvent::GuestJoined);
        assert!(matches!(recorder.sent()[0], WireMessage::SyncState(_)));

        let pending = table.roll_dice().unwrap();
        match &recorder.sent()[1] {
            WireMessage::ActionUpdate(patch) => assert_eq!(patch.is_rolling, Some(true)),
            other => panic!("unexpected {:?}", other),
        }
        table.run_chain(Some(pending));
        assert_eq!(table.state().current_player, GUEST_SEAT);
        // roll start, roll result, handoff
        assert_eq!(recorder.sent().len(), 4);
    }

    #[test]
    fn test_guest_cannot_act_for_host() {
        let mut table = table(&[6]);
        table.apply_session(SessionEvent::Dialing {
            room_id: "ROOM42".to_string(),
        });
        table.apply_session(SessionEvent::Connected);
        assert!(table.roll_dice().is_none());
    }

    #[test]
    fn test_soft_reset_keeps_session_hard_reset_drops_it() {
        let mut table = table(&[]);
        table.apply_session(SessionEvent::HostOpened {
            room_id: "ROOM42".to_string(),
        });
        table.apply_session(SessionEvent::GuestJoined);

        table.reset_game(ResetMode::Soft);
        assert!(table.state().is_online);
        assert_eq!(table.state().room_id.as_deref(), Some("ROOM42"));
        assert_eq!(table.state().online_status, OnlineStatus::Connected);

        table.reset_game(ResetMode::Hard);
        assert!(!table.state().is_online);
        assert_eq!(table.state().my_color, None);
        assert_eq!(table.state().online_status, OnlineStatus::Offline);
    }

    #[test]
    fn test_roll_settles_across_session_and_idle_updates() {
        let mut table = table(&[4]);
        table.apply_session(SessionEvent::HostOpened {
            room_id: "ROOM42".to_string(),
        });
        let pending = table.roll_dice().unwrap();

        table.apply_session(SessionEvent::GuestJoined);
        table.apply_remote(WireMessage::ActionUpdate(StatePatch {
            message: Some("hello".to_string()),
            ..Default::default()
        }));
        table.apply_remote(WireMessage::ActionUpdate(StatePatch::default()));

        let pass = table.run(pending).expect("roll resolves");
        assert!(!table.state().is_rolling);
        assert_eq!(table.state().dice_value, Some(4));
        assert_eq!(pass.task, Task::PassTurn { last_dice: 4 });
    }

    #[test]
    fn test_pass_survives_session_event() {
        let mut table = table(&[3]);
        table.apply_session(SessionEvent::HostOpened {
            room_id: "ROOM42".to_string(),
        });
        let pass = roll(&mut table).unwrap();

        table.apply_session(SessionEvent::GuestJoined);
        assert!(table.roll_dice().is_none(), "handoff still pending");
        table.run(pass);
        assert_eq!(table.state().current_player, Color::Green);
        assert_eq!(table.state().last_dice_value, Some(3));
    }

    #[test]
    fn test_remote_turn_change_cancels_pending_roll() {
        let mut table = table(&[3]);
        let pending = table.roll_dice().unwrap();
        table.apply_remote(WireMessage::ActionUpdate(StatePatch {
            current_player: Some(Color::Green),
            is_rolling: Some(false),
            ..Default::default()
        }));
        let version = table.version();

        assert!(table.run(pending).is_none());
        assert_eq!(table.version(), version);
        assert_eq!(table.state().dice_value, None);
        assert!(table.roll_dice().is_some(), "green may roll");
    }

    #[test]
    fn test_seeded_dice_are_reproducible() {
        let mut a = RandomDice::seeded(7);
        let mut b = RandomDice::seeded(7);
        for _ in 0..50 {
            let face = a.roll();
            assert!((1..=6).contains(&face));
            assert_eq!(face, b.roll());
        }
    }
}
