use chess::GameOutcome;

use super::ledger::MoveRecord;

/// Events broadcast from the session actor to all subscribers.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    MovePlayed(MoveRecord),
    /// Emitted exactly once, whatever ended the game.
    Ended(GameOutcome),
}
