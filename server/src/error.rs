use chess::{EndReason, GameOutcome, PieceColor};
use chess_proto::ErrorCode;

/// A request that was refused before anything changed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Illegal move: {0}")]
    IllegalMove(String),
    #[error("Game is not active")]
    GameNotActive,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Only the room owner can do that")]
    NotOwner,
    #[error("You already have an open room")]
    AlreadyOwnsRoom,
    #[error("Cannot join your own room")]
    SelfJoin,
    #[error("Abort is no longer allowed")]
    AbortWindowClosed,
    #[error("Not playing in a game")]
    NotInGame,
    #[error("Finish your current game first")]
    AlreadyInGame,
    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

impl StateError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotYourTurn => ErrorCode::NotYourTurn,
            Self::IllegalMove(_) => ErrorCode::IllegalMove,
            Self::GameNotActive => ErrorCode::GameNotActive,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::NotOwner => ErrorCode::NotOwner,
            Self::AlreadyOwnsRoom => ErrorCode::AlreadyOwnsRoom,
            Self::SelfJoin => ErrorCode::SelfJoin,
            Self::AbortWindowClosed => ErrorCode::AbortWindowClosed,
            Self::NotInGame => ErrorCode::NotInGame,
            Self::AlreadyInGame => ErrorCode::AlreadyInGame,
            Self::InvalidMessage(_) => ErrorCode::InvalidMessage,
        }
    }
}

/// A game ending raised by a server timer. The color is the side that ran
/// out of time or failed to come back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TimingFault {
    #[error("{} ran out of time", .0.as_str())]
    Timeout(PieceColor),
    #[error("{} did not reconnect in time", .0.as_str())]
    Disconnect(PieceColor),
}

impl TimingFault {
    pub fn outcome(self) -> GameOutcome {
        match self {
            Self::Timeout(loser) => GameOutcome::won_by(EndReason::Timeout, loser.opposite()),
            Self::Disconnect(loser) => GameOutcome::won_by(EndReason::Disconnect, loser.opposite()),
        }
    }
}
