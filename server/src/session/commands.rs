use chess::{GameOutcome, MoveDto, PossibleMove};
use chess_proto::ErrorCode;
use tokio::sync::oneshot;

use super::ledger::MoveRecord;
use super::snapshot::SessionSnapshot;
use crate::connections::ConnId;
use crate::error::StateError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Rejected(#[from] StateError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// Plumbing failures mean the session is gone, which players see as a
    /// game that is no longer active.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Rejected(e) => e.code(),
            Self::Internal(_) => ErrorCode::GameNotActive,
        }
    }
}

/// Result of an accepted move.
#[derive(Debug, Clone)]
pub struct MoveReply {
    pub record: MoveRecord,
    /// Set when the move ended the game (checkmate or draw).
    pub ended: Option<GameOutcome>,
}

/// Commands sent to the session actor. Players are named by user id; the
/// actor maps them to a color.
pub enum SessionCommand {
    SubmitMove {
        user_id: String,
        mv: MoveDto,
        reply: oneshot::Sender<Result<MoveReply, StateError>>,
    },
    Abort {
        user_id: String,
        reply: oneshot::Sender<Result<GameOutcome, StateError>>,
    },
    Resign {
        user_id: String,
        reply: oneshot::Sender<Result<GameOutcome, StateError>>,
    },
    Disconnected {
        user_id: String,
        conn: ConnId,
        reply: oneshot::Sender<bool>,
    },
    Reconnected {
        user_id: String,
        conn: ConnId,
        reply: oneshot::Sender<bool>,
    },
    GetSnapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    GetHistory {
        reply: oneshot::Sender<Vec<MoveRecord>>,
    },
    GetPossibleMoves {
        from: String,
        reply: oneshot::Sender<Result<Vec<PossibleMove>, StateError>>,
    },
    Shutdown,
}
