use chess::{GameOutcome, MoveDto, PossibleMove};
use tokio::sync::{mpsc, oneshot};

use super::commands::{MoveReply, SessionCommand, SessionError};
use crate::connections::ConnId;
use super::ledger::MoveRecord;
use super::snapshot::SessionSnapshot;

/// Cheap, cloneable handle to a session actor.
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    players: [String; 2],
    cmd_tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub(crate) fn new(
        id: String,
        white_id: String,
        black_id: String,
        cmd_tx: mpsc::Sender<SessionCommand>,
    ) -> Self {
        Self {
            id,
            players: [white_id, black_id],
            cmd_tx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// User ids of both seats, white first.
    pub fn players(&self) -> &[String; 2] {
        &self.players
    }

    pub async fn submit_move(&self, user_id: &str, mv: MoveDto) -> Result<MoveReply, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::SubmitMove {
            user_id: user_id.to_string(),
            mv,
            reply: tx,
        })
        .await?;
        Ok(recv(rx).await??)
    }

    pub async fn abort(&self, user_id: &str) -> Result<GameOutcome, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Abort {
            user_id: user_id.to_string(),
            reply: tx,
        })
        .await?;
        Ok(recv(rx).await??)
    }

    pub async fn resign(&self, user_id: &str) -> Result<GameOutcome, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Resign {
            user_id: user_id.to_string(),
            reply: tx,
        })
        .await?;
        Ok(recv(rx).await??)
    }

    /// Start the grace window for `user_id`, whose connection `conn` closed.
    /// Returns false if the game is not active, the user is not seated, or
    /// the user has already reattached from a newer connection.
    pub async fn disconnected(&self, user_id: &str, conn: ConnId) -> Result<bool, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Disconnected {
            user_id: user_id.to_string(),
            conn,
            reply: tx,
        })
        .await?;
        recv(rx).await
    }

    /// Returns true if a pending grace window was cancelled.
    pub async fn reconnected(&self, user_id: &str, conn: ConnId) -> Result<bool, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Reconnected {
            user_id: user_id.to_string(),
            conn,
            reply: tx,
        })
        .await?;
        recv(rx).await
    }

    pub async fn get_snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::GetSnapshot { reply: tx }).await?;
        recv(rx).await
    }

    pub async fn get_history(&self) -> Result<Vec<MoveRecord>, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::GetHistory { reply: tx }).await?;
        recv(rx).await
    }

    pub async fn get_possible_moves(&self, from: &str) -> Result<Vec<PossibleMove>, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::GetPossibleMoves {
            from: from.to_string(),
            reply: tx,
        })
        .await?;
        Ok(recv(rx).await??)
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(SessionCommand::Shutdown).await;
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| SessionError::Internal("Session actor closed".into()))
    }
}

async fn recv<T>(rx: oneshot::Receiver<T>) -> Result<T, SessionError> {
    rx.await
        .map_err(|_| SessionError::Internal("Reply dropped".into()))
}
