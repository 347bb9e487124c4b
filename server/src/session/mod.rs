pub mod actor;
pub mod clock;
pub mod commands;
pub mod events;
pub mod handle;
pub mod ledger;
pub mod snapshot;
pub mod state;

use std::collections::HashMap;
use std::sync::Arc;

use chess::{ControlKind, LegalityOracle};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::{Duration, Instant};

use crate::config::ServerConfig;
use crate::error::StateError;
use crate::identity::UserRef;
use actor::run_session_actor;
pub use commands::{MoveReply, SessionError};
pub use events::SessionEvent;
pub use handle::SessionHandle;
pub use ledger::MoveRecord;
pub use snapshot::{Player, SessionSnapshot};
use state::SessionState;

const COMMAND_QUEUE: usize = 32;
const EVENT_QUEUE: usize = 64;

/// Rules shared by every session the manager creates.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub grace: Duration,
    pub abort_ply_limit: usize,
}

impl From<&ServerConfig> for SessionConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            grace: config.grace,
            abort_ply_limit: config.abort_ply_limit,
        }
    }
}

/// Everything needed to start a game once both seats are filled.
#[derive(Debug, Clone)]
pub struct GameSetup {
    pub id: String,
    pub control: ControlKind,
    pub bonus_secs: u32,
    pub white: UserRef,
    pub black: UserRef,
}

#[derive(Default)]
struct Sessions {
    by_id: HashMap<String, SessionHandle>,
    /// Latest game of each player.
    by_player: HashMap<String, String>,
}

/// Manages all live sessions. Spawns an actor task per session.
pub struct SessionManager {
    sessions: RwLock<Sessions>,
    oracle: Arc<dyn LegalityOracle>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(oracle: Arc<dyn LegalityOracle>, config: SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(Sessions::default()),
            oracle,
            config,
        }
    }

    /// Spawn the actor for a new game. The returned receiver is subscribed
    /// before the actor starts, so it sees every event.
    pub async fn create_session(
        &self,
        setup: GameSetup,
    ) -> (SessionHandle, broadcast::Receiver<SessionEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE);
        let (event_tx, event_rx) = broadcast::channel(EVENT_QUEUE);

        let id = setup.id.clone();
        let handle = SessionHandle::new(
            id.clone(),
            setup.white.id.clone(),
            setup.black.id.clone(),
            cmd_tx,
        );

        let state = SessionState::new(
            setup,
            Arc::clone(&self.oracle),
            self.config.clone(),
            Instant::now(),
        );
        tokio::spawn(async move {
            run_session_actor(state, cmd_rx, event_tx).await;
        });

        let mut sessions = self.sessions.write().await;
        for player in handle.players() {
            sessions.by_player.insert(player.clone(), id.clone());
        }
        sessions.by_id.insert(id.clone(), handle.clone());
        tracing::info!(session = %id, open = sessions.by_id.len(), "Session created");

        (handle, event_rx)
    }

    pub async fn get_handle(&self, session_id: &str) -> Result<SessionHandle, StateError> {
        self.sessions
            .read()
            .await
            .by_id
            .get(session_id)
            .cloned()
            .ok_or_else(|| StateError::NotFound(format!("game {session_id}")))
    }

    /// The most recent game `user_id` was seated in, if it is still held.
    pub async fn game_of(&self, user_id: &str) -> Option<SessionHandle> {
        let sessions = self.sessions.read().await;
        let id = sessions.by_player.get(user_id)?;
        sessions.by_id.get(id).cloned()
    }

    /// Drop a session and stop its actor. Returns false if it was unknown.
    pub async fn close_session(&self, session_id: &str) -> bool {
        let handle = {
            let mut sessions = self.sessions.write().await;
            let Some(handle) = sessions.by_id.remove(session_id) else {
                return false;
            };
            sessions.by_player.retain(|_, game| game != session_id);
            handle
        };
        handle.shutdown().await;
        tracing::info!(session = %session_id, "Session closed");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::{EndReason, GameOutcome, GameStatus, MoveDto, PieceColor, StandardOracle};

    fn test_manager() -> SessionManager {
        SessionManager::new(
            Arc::new(StandardOracle),
            SessionConfig {
                grace: Duration::from_secs(30),
                abort_ply_limit: 2,
            },
        )
    }

    fn setup(id: &str, control: ControlKind) -> GameSetup {
        GameSetup {
            id: id.into(),
            control,
            bonus_secs: 0,
            white: UserRef::guest("alice", "Alice"),
            black: UserRef::guest("bob", "Bob"),
        }
    }

    async fn next_end(rx: &mut broadcast::Receiver<SessionEvent>) -> GameOutcome {
        loop {
            match rx.recv().await {
                Ok(SessionEvent::Ended(outcome)) => return outcome,
                Ok(SessionEvent::MovePlayed(_)) => continue,
                Err(e) => panic!("event stream failed: {e}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_and_lookup() {
        let mgr = test_manager();
        let (handle, _rx) = mgr.create_session(setup("g1", ControlKind::Blitz)).await;
        assert_eq!(handle.id(), "g1");
        assert!(mgr.get_handle("g1").await.is_ok());
        assert!(matches!(
            mgr.get_handle("nope").await,
            Err(StateError::NotFound(_))
        ));
        assert_eq!(mgr.game_of("alice").await.map(|h| h.id().to_string()), Some("g1".into()));
        assert_eq!(mgr.game_of("bob").await.map(|h| h.id().to_string()), Some("g1".into()));
        assert!(mgr.game_of("carol").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_moves_through_actor() {
        let mgr = test_manager();
        let (handle, mut rx) = mgr.create_session(setup("g1", ControlKind::Blitz)).await;

        let reply = handle
            .submit_move("alice", MoveDto::new("e2", "e4"))
            .await
            .unwrap();
        assert_eq!(reply.record.to, "e4");
        assert!(reply.ended.is_none());
        assert!(matches!(rx.recv().await, Ok(SessionEvent::MovePlayed(_))));

        let err = handle
            .submit_move("alice", MoveDto::new("d2", "d4"))
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::Rejected(StateError::NotYourTurn));

        let snap = handle.get_snapshot().await.unwrap();
        assert_eq!(snap.move_count, 1);
        assert_eq!(snap.turn, PieceColor::Black);
        assert_eq!(handle.get_history().await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flag_fall_ends_game() {
        let mgr = test_manager();
        let (handle, mut rx) = mgr.create_session(setup("g1", ControlKind::Bullet)).await;

        let outcome = next_end(&mut rx).await;
        assert_eq!(
            outcome,
            GameOutcome::won_by(EndReason::Timeout, PieceColor::Black)
        );

        let snap = handle.get_snapshot().await.unwrap();
        assert_eq!(snap.white_time_left, 0);
        assert_eq!(snap.status, GameStatus::Ended(outcome));
        let err = handle
            .submit_move("alice", MoveDto::new("e2", "e4"))
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::Rejected(StateError::GameNotActive));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_inside_grace_keeps_game() {
        let mgr = test_manager();
        let (handle, _rx) = mgr.create_session(setup("g1", ControlKind::Rapid)).await;
        handle
            .submit_move("alice", MoveDto::new("e2", "e4"))
            .await
            .unwrap();

        assert!(handle.disconnected("bob", 1).await.unwrap());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(handle.reconnected("bob", 2).await.unwrap());
        tokio::time::sleep(Duration::from_secs(40)).await;

        let snap = handle.get_snapshot().await.unwrap();
        assert!(snap.status.is_active());
        assert_eq!(snap.black_time_left, 550_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_expiry_forfeits() {
        let mgr = test_manager();
        let (handle, mut rx) = mgr.create_session(setup("g1", ControlKind::Rapid)).await;
        assert!(handle.disconnected("alice", 1).await.unwrap());

        let outcome = next_end(&mut rx).await;
        assert_eq!(
            outcome,
            GameOutcome::won_by(EndReason::Disconnect, PieceColor::Black)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_session() {
        let mgr = test_manager();
        let (handle, _rx) = mgr.create_session(setup("g1", ControlKind::Blitz)).await;
        assert!(mgr.close_session("g1").await);
        assert!(!mgr.close_session("g1").await);
        assert!(mgr.get_handle("g1").await.is_err());
        assert!(mgr.game_of("alice").await.is_none());
        assert!(matches!(
            handle.get_snapshot().await,
            Err(SessionError::Internal(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_game_replaces_player_lookup() {
        let mgr = test_manager();
        mgr.create_session(setup("g1", ControlKind::Blitz)).await;
        mgr.create_session(setup("g2", ControlKind::Blitz)).await;
        assert_eq!(mgr.game_of("alice").await.map(|h| h.id().to_string()), Some("g2".into()));

        // Closing the older game leaves the newer mapping alone.
        mgr.close_session("g1").await;
        assert!(mgr.game_of("alice").await.is_some());
    }
}
