use std::sync::Arc;

use chess::{
    EndReason, GameOutcome, GameStatus, LegalityOracle, MoveDto, PieceColor, Position,
    PossibleMove,
};
use tokio::time::Instant;

use super::clock::Clock;
use super::ledger::{MoveLedger, MoveRecord};
use super::snapshot::{Player, SessionSnapshot};
use super::{GameSetup, SessionConfig};
use crate::connections::ConnId;
use crate::error::{StateError, TimingFault};

/// Internal mutable state, owned entirely by the session actor. No locks.
///
/// Every operation takes the current instant explicitly so the actor decides
/// what "now" is.
pub(crate) struct SessionState {
    pub id: String,
    control: chess::ControlKind,
    bonus_secs: u32,
    players: [Player; 2],
    status: GameStatus,
    position: Position,
    clock: Clock,
    ledger: MoveLedger,
    oracle: Arc<dyn LegalityOracle>,
    config: SessionConfig,
    grace_deadlines: [Option<Instant>; 2],
    /// Newest connection each player has reattached from.
    attached: [ConnId; 2],
    newly_ended: Option<GameOutcome>,
}

impl SessionState {
    pub fn new(
        setup: GameSetup,
        oracle: Arc<dyn LegalityOracle>,
        config: SessionConfig,
        now: Instant,
    ) -> Self {
        let base_ms = setup.control.base_seconds() * 1000;
        let bonus_ms = u64::from(setup.bonus_secs) * 1000;
        let mut state = Self {
            id: setup.id,
            control: setup.control,
            bonus_secs: setup.bonus_secs,
            players: [
                Player {
                    user: setup.white,
                    color: PieceColor::White,
                },
                Player {
                    user: setup.black,
                    color: PieceColor::Black,
                },
            ],
            status: GameStatus::Pending,
            position: Position::new(),
            clock: Clock::new(base_ms, bonus_ms),
            ledger: MoveLedger::new(),
            oracle,
            config,
            grace_deadlines: [None, None],
            attached: [0, 0],
            newly_ended: None,
        };
        state.activate(now);
        state
    }

    fn activate(&mut self, now: Instant) {
        if self.status.advance(GameStatus::Active).is_ok() {
            self.clock.start(self.position.side_to_move(), now);
        }
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn color_of(&self, user_id: &str) -> Option<PieceColor> {
        self.players
            .iter()
            .find(|p| p.user.id == user_id)
            .map(|p| p.color)
    }

    fn seat(&self, user_id: &str) -> Result<PieceColor, StateError> {
        self.color_of(user_id).ok_or(StateError::NotInGame)
    }

    fn ensure_active(&self) -> Result<(), StateError> {
        if self.status.is_active() {
            Ok(())
        } else {
            Err(StateError::GameNotActive)
        }
    }

    pub fn submit_move(
        &mut self,
        user_id: &str,
        dto: &MoveDto,
        now: Instant,
    ) -> Result<MoveRecord, StateError> {
        let color = self.seat(user_id)?;
        self.ensure_active()?;
        if self.position.side_to_move() != color {
            return Err(StateError::NotYourTurn);
        }

        // The flag may have fallen before the deadline timer got to run.
        if self.clock.remaining(color, now) == 0 {
            self.time_out(color, now);
            return Err(StateError::GameNotActive);
        }

        let verdict = self
            .oracle
            .evaluate(&self.position, dto)
            .map_err(|e| StateError::IllegalMove(e.to_string()))?;
        if !self.position.play(verdict.mv) {
            return Err(StateError::IllegalMove(format!("{}{}", dto.from, dto.to)));
        }

        let time_left = match self.clock.apply_move(color, now) {
            Ok(ms) => ms,
            Err(_) => {
                self.time_out(color, now);
                return Err(StateError::GameNotActive);
            }
        };

        let record = MoveRecord {
            color,
            from: verdict.from,
            to: verdict.to,
            move_type: verdict.move_type,
            promotion: verdict.promotion,
            is_capture: verdict.is_capture,
            is_check: verdict.is_check,
            is_checkmate: verdict.is_checkmate,
            time_left,
        };
        self.ledger.append(record.clone());
        tracing::debug!(
            color = color.as_str(),
            from = %record.from,
            to = %record.to,
            time_left,
            "Move applied"
        );

        if verdict.is_checkmate {
            self.finish(GameOutcome::won_by(EndReason::Checkmate, color), now);
        } else if verdict.is_draw {
            self.finish(GameOutcome::no_winner(EndReason::Draw), now);
        } else {
            self.clock.start(color.opposite(), now);
        }

        Ok(record)
    }

    pub fn abort(&mut self, user_id: &str, now: Instant) -> Result<GameOutcome, StateError> {
        self.seat(user_id)?;
        self.ensure_active()?;
        if self.ledger.len() >= self.config.abort_ply_limit {
            return Err(StateError::AbortWindowClosed);
        }
        let outcome = GameOutcome::no_winner(EndReason::Abort);
        self.finish(outcome, now);
        Ok(outcome)
    }

    pub fn resign(&mut self, user_id: &str, now: Instant) -> Result<GameOutcome, StateError> {
        let color = self.seat(user_id)?;
        self.ensure_active()?;
        let outcome = GameOutcome::won_by(EndReason::Resignation, color.opposite());
        self.finish(outcome, now);
        Ok(outcome)
    }

    /// Start the grace window for a player whose connection `conn` dropped.
    /// Their clock keeps running. Returns false if there is nothing to guard,
    /// including a drop of a connection older than the one the player has
    /// since reattached from.
    pub fn disconnected(&mut self, user_id: &str, conn: ConnId, now: Instant) -> bool {
        let Some(color) = self.color_of(user_id) else {
            return false;
        };
        if !self.status.is_active() || conn < self.attached[color.index()] {
            return false;
        }
        self.grace_deadlines[color.index()] = Some(now + self.config.grace);
        true
    }

    /// Record that the player is back on `conn` and cancel a pending grace
    /// window. Returns true if one was running.
    pub fn reconnected(&mut self, user_id: &str, conn: ConnId) -> bool {
        let Some(color) = self.color_of(user_id) else {
            return false;
        };
        let slot = &mut self.attached[color.index()];
        *slot = (*slot).max(conn);
        self.grace_deadlines[color.index()].take().is_some()
    }

    /// Earliest instant at which a timer may end the game.
    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.status.is_active() {
            return None;
        }
        self.pending_faults().map(|(at, _)| at).min()
    }

    /// Fire whichever timer is due first, if any.
    pub fn on_deadline(&mut self, now: Instant) -> Option<TimingFault> {
        if !self.status.is_active() {
            return None;
        }
        let (_, fault) = self
            .pending_faults()
            .filter(|(at, _)| *at <= now)
            .min_by_key(|(at, _)| *at)?;

        match fault {
            TimingFault::Timeout(color) => self.time_out(color, now),
            TimingFault::Disconnect(_) => self.finish(fault.outcome(), now),
        }
        Some(fault)
    }

    fn pending_faults(&self) -> impl Iterator<Item = (Instant, TimingFault)> + '_ {
        let flag = self
            .clock
            .running()
            .zip(self.clock.deadline())
            .map(|(color, at)| (at, TimingFault::Timeout(color)));
        let grace = [PieceColor::White, PieceColor::Black]
            .into_iter()
            .filter_map(|color| {
                self.grace_deadlines[color.index()].map(|at| (at, TimingFault::Disconnect(color)))
            });
        flag.into_iter().chain(grace)
    }

    fn time_out(&mut self, color: PieceColor, now: Instant) {
        self.clock.flag(color);
        self.finish(TimingFault::Timeout(color).outcome(), now);
    }

    fn finish(&mut self, outcome: GameOutcome, now: Instant) {
        self.clock.stop(now);
        if self.status.advance(GameStatus::Ended(outcome)).is_ok() {
            self.grace_deadlines = [None, None];
            self.newly_ended = Some(outcome);
            tracing::info!(reason = ?outcome.reason, winner = ?outcome.winner, "Game ended");
        }
    }

    /// Outcome of a game that ended since the last call.
    pub fn take_ended(&mut self) -> Option<GameOutcome> {
        self.newly_ended.take()
    }

    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            control: self.control,
            bonus_secs: self.bonus_secs,
            status: self.status,
            white: self.players[0].clone(),
            black: self.players[1].clone(),
            turn: self.position.side_to_move(),
            white_time_left: self.clock.remaining(PieceColor::White, now),
            black_time_left: self.clock.remaining(PieceColor::Black, now),
            fen: self.position.to_fen(),
            move_count: self.ledger.len(),
        }
    }

    pub fn history(&self) -> Vec<MoveRecord> {
        self.ledger.entries().to_vec()
    }

    pub fn possible_moves(&self, from: &str) -> Result<Vec<PossibleMove>, StateError> {
        self.oracle
            .possible_moves(&self.position, from)
            .map_err(|e| StateError::IllegalMove(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::UserRef;
    use chess::{ControlKind, IllegalMove, MoveType, StandardOracle, Verdict};
    use tokio::time::Duration;

    const SEC: Duration = Duration::from_secs(1);

    fn setup(control: ControlKind, bonus_secs: u32) -> GameSetup {
        GameSetup {
            id: "game-1".into(),
            control,
            bonus_secs,
            white: UserRef::guest("alice", "Alice"),
            black: UserRef::guest("bob", "Bob"),
        }
    }

    fn config() -> SessionConfig {
        SessionConfig {
            grace: 30 * SEC,
            abort_ply_limit: 2,
        }
    }

    fn new_state(control: ControlKind, bonus_secs: u32, now: Instant) -> SessionState {
        SessionState::new(
            setup(control, bonus_secs),
            Arc::new(StandardOracle),
            config(),
            now,
        )
    }

    fn mv(from: &str, to: &str) -> MoveDto {
        MoveDto::new(from, to)
    }

    #[test]
    fn test_new_session_is_active_white_to_move() {
        let t0 = Instant::now();
        let state = new_state(ControlKind::Bullet, 0, t0);
        assert!(state.status().is_active());
        let snap = state.snapshot(t0 + 2 * SEC);
        assert_eq!(snap.turn, PieceColor::White);
        assert_eq!(snap.white_time_left, 58_000);
        assert_eq!(snap.black_time_left, 60_000);
        assert_eq!(snap.move_count, 0);
        assert_eq!(snap.white.user.id, "alice");
    }

    #[test]
    fn test_turns_alternate_and_ledger_grows() {
        let t0 = Instant::now();
        let mut state = new_state(ControlKind::Blitz, 0, t0);
        let line = [("e2", "e4"), ("e7", "e5"), ("g1", "f3"), ("b8", "c6")];
        for (i, (from, to)) in line.iter().enumerate() {
            let user = if i % 2 == 0 { "alice" } else { "bob" };
            let record = state.submit_move(user, &mv(from, to), t0).unwrap();
            let expected = if i % 2 == 0 {
                PieceColor::White
            } else {
                PieceColor::Black
            };
            assert_eq!(record.color, expected);
            assert_eq!(state.history().len(), i + 1);
        }
        assert_eq!(state.snapshot(t0).turn, PieceColor::White);
    }

    #[test]
    fn test_wrong_side_is_rejected_without_change() {
        let t0 = Instant::now();
        let mut state = new_state(ControlKind::Blitz, 0, t0);
        let before = state.snapshot(t0).fen;
        assert_eq!(
            state.submit_move("bob", &mv("e7", "e5"), t0),
            Err(StateError::NotYourTurn)
        );
        assert_eq!(state.snapshot(t0).fen, before);
        assert!(state.history().is_empty());

        state.submit_move("alice", &mv("e2", "e4"), t0).unwrap();
        assert_eq!(
            state.submit_move("alice", &mv("d2", "d4"), t0),
            Err(StateError::NotYourTurn)
        );
    }

    #[test]
    fn test_illegal_move_is_rejected_without_change() {
        let t0 = Instant::now();
        let mut state = new_state(ControlKind::Blitz, 0, t0);
        let err = state.submit_move("alice", &mv("e2", "e5"), t0).unwrap_err();
        assert!(matches!(err, StateError::IllegalMove(_)));
        assert!(state.history().is_empty());
        assert_eq!(state.snapshot(t0).turn, PieceColor::White);
    }

    #[test]
    fn test_outsider_is_not_in_game() {
        let t0 = Instant::now();
        let mut state = new_state(ControlKind::Blitz, 0, t0);
        assert_eq!(
            state.submit_move("mallory", &mv("e2", "e4"), t0),
            Err(StateError::NotInGame)
        );
        assert_eq!(state.resign("mallory", t0), Err(StateError::NotInGame));
    }

    #[test]
    fn test_move_debits_elapsed_and_credits_bonus() {
        let t0 = Instant::now();
        let mut state = new_state(ControlKind::Bullet, 2, t0);
        let record = state
            .submit_move("alice", &mv("e2", "e4"), t0 + 3 * SEC)
            .unwrap();
        assert_eq!(record.time_left, 59_000);
        assert_eq!(record.move_type, MoveType::DoublePush);
        assert!(!record.is_capture);
        assert!(!record.is_check);

        // Black's clock starts when White's move lands.
        let snap = state.snapshot(t0 + 5 * SEC);
        assert_eq!(snap.white_time_left, 59_000);
        assert_eq!(snap.black_time_left, 58_000);
    }

    #[test]
    fn test_checkmate_ends_in_same_step() {
        let t0 = Instant::now();
        let mut state = new_state(ControlKind::Blitz, 0, t0);
        state.submit_move("alice", &mv("f2", "f3"), t0).unwrap();
        state.submit_move("bob", &mv("e7", "e5"), t0).unwrap();
        state.submit_move("alice", &mv("g2", "g4"), t0).unwrap();
        let record = state.submit_move("bob", &mv("d8", "h4"), t0).unwrap();
        assert!(record.is_checkmate);
        assert!(record.is_check);

        let outcome = GameOutcome::won_by(EndReason::Checkmate, PieceColor::Black);
        assert_eq!(state.status(), GameStatus::Ended(outcome));
        assert_eq!(state.take_ended(), Some(outcome));
        assert_eq!(state.take_ended(), None);
        assert_eq!(state.next_deadline(), None);
        assert_eq!(
            state.submit_move("alice", &mv("e1", "f2"), t0),
            Err(StateError::GameNotActive)
        );
    }

    /// Standard legality, but every move is reported as leaving a drawn
    /// position.
    struct DrawingOracle;

    impl LegalityOracle for DrawingOracle {
        fn evaluate(&self, position: &Position, dto: &MoveDto) -> Result<Verdict, IllegalMove> {
            let mut verdict = StandardOracle.evaluate(position, dto)?;
            verdict.is_draw = true;
            Ok(verdict)
        }

        fn possible_moves(
            &self,
            position: &Position,
            from: &str,
        ) -> Result<Vec<PossibleMove>, IllegalMove> {
            StandardOracle.possible_moves(position, from)
        }
    }

    #[test]
    fn test_drawn_position_ends_as_draw() {
        let t0 = Instant::now();
        let mut state = SessionState::new(
            setup(ControlKind::Rapid, 0),
            Arc::new(DrawingOracle),
            config(),
            t0,
        );
        state.submit_move("alice", &mv("e2", "e4"), t0).unwrap();
        assert_eq!(
            state.status(),
            GameStatus::Ended(GameOutcome::no_winner(EndReason::Draw))
        );
    }

    #[test]
    fn test_late_move_ends_by_timeout() {
        let t0 = Instant::now();
        let mut state = new_state(ControlKind::Bullet, 5, t0);
        assert_eq!(
            state.submit_move("alice", &mv("e2", "e4"), t0 + 61 * SEC),
            Err(StateError::GameNotActive)
        );
        let outcome = GameOutcome::won_by(EndReason::Timeout, PieceColor::Black);
        assert_eq!(state.status(), GameStatus::Ended(outcome));
        assert_eq!(state.snapshot(t0 + 61 * SEC).white_time_left, 0);
        assert!(state.history().is_empty());
    }

    #[test]
    fn test_deadline_fires_timeout() {
        let t0 = Instant::now();
        let mut state = new_state(ControlKind::Bullet, 0, t0);
        assert_eq!(state.next_deadline(), Some(t0 + 60 * SEC));
        assert_eq!(state.on_deadline(t0 + 59 * SEC), None);
        assert!(state.status().is_active());

        assert_eq!(
            state.on_deadline(t0 + 60 * SEC),
            Some(TimingFault::Timeout(PieceColor::White))
        );
        assert_eq!(
            state.take_ended(),
            Some(GameOutcome::won_by(EndReason::Timeout, PieceColor::Black))
        );
        assert_eq!(
            state.submit_move("alice", &mv("e2", "e4"), t0 + 61 * SEC),
            Err(StateError::GameNotActive)
        );
    }

    #[test]
    fn test_abort_window() {
        let t0 = Instant::now();
        let mut state = new_state(ControlKind::Blitz, 0, t0);
        state.submit_move("alice", &mv("e2", "e4"), t0).unwrap();
        assert_eq!(
            state.abort("bob", t0),
            Ok(GameOutcome::no_winner(EndReason::Abort))
        );
        assert_eq!(state.abort("bob", t0), Err(StateError::GameNotActive));

        let mut state = new_state(ControlKind::Blitz, 0, t0);
        state.submit_move("alice", &mv("e2", "e4"), t0).unwrap();
        state.submit_move("bob", &mv("e7", "e5"), t0).unwrap();
        assert_eq!(state.abort("alice", t0), Err(StateError::AbortWindowClosed));
        assert!(state.status().is_active());
    }

    #[test]
    fn test_resign_awards_opponent() {
        let t0 = Instant::now();
        let mut state = new_state(ControlKind::Blitz, 0, t0);
        assert_eq!(
            state.resign("alice", t0),
            Ok(GameOutcome::won_by(EndReason::Resignation, PieceColor::Black))
        );
        assert_eq!(state.resign("bob", t0), Err(StateError::GameNotActive));
    }

    #[test]
    fn test_disconnect_forfeits_after_grace() {
        let t0 = Instant::now();
        let mut state = new_state(ControlKind::Rapid, 0, t0);
        state.submit_move("alice", &mv("e2", "e4"), t0).unwrap();
        assert!(state.disconnected("bob", 1, t0 + SEC));
        assert_eq!(state.next_deadline(), Some(t0 + 31 * SEC));

        assert_eq!(state.on_deadline(t0 + 30 * SEC), None);
        assert_eq!(
            state.on_deadline(t0 + 31 * SEC),
            Some(TimingFault::Disconnect(PieceColor::Black))
        );
        assert_eq!(
            state.status(),
            GameStatus::Ended(GameOutcome::won_by(
                EndReason::Disconnect,
                PieceColor::White
            ))
        );
    }

    #[test]
    fn test_reconnect_cancels_grace() {
        let t0 = Instant::now();
        let mut state = new_state(ControlKind::Rapid, 0, t0);
        assert!(state.disconnected("alice", 1, t0));
        assert!(state.reconnected("alice", 2));
        assert!(!state.reconnected("alice", 2));
        assert_eq!(state.next_deadline(), Some(t0 + 600 * SEC));
        assert_eq!(state.on_deadline(t0 + 31 * SEC), None);
        assert!(state.status().is_active());

        // The clock kept running while away.
        assert_eq!(state.snapshot(t0 + 31 * SEC).white_time_left, 569_000);
    }

    #[test]
    fn test_stale_drop_after_reattach_is_ignored() {
        let t0 = Instant::now();
        let mut state = new_state(ControlKind::Rapid, 0, t0);

        // The new connection reattached before the old one's drop arrived.
        assert!(!state.reconnected("bob", 7));
        assert!(!state.disconnected("bob", 5, t0));
        assert_eq!(state.next_deadline(), Some(t0 + 600 * SEC));

        // A drop of the current connection still counts.
        assert!(state.disconnected("bob", 7, t0));
        assert_eq!(state.next_deadline(), Some(t0 + 30 * SEC));
    }

    #[test]
    fn test_possible_moves() {
        let t0 = Instant::now();
        let state = new_state(ControlKind::Blitz, 0, t0);
        let moves = state.possible_moves("g1").unwrap();
        let mut targets: Vec<_> = moves.iter().map(|m| m.to.as_str()).collect();
        targets.sort_unstable();
        assert_eq!(targets, ["f3", "h3"]);
        assert!(state.possible_moves("z9").is_err());
    }
}
