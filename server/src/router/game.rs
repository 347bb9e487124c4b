use std::sync::Arc;

use chess_proto::{
    Event, GetGamePayload, MoveRequest, PossibleMovesPayload, PossibleMovesRequest,
    SendMessagePayload,
};
use tokio::sync::broadcast;
use tokio::time;
use tracing::Instrument;

use super::converters::{game_info, move_payload};
use super::{EventRouter, Outbound, Sender};
use crate::connections::Membership;
use crate::error::StateError;
use crate::session::{SessionError, SessionEvent, SessionHandle};

type Handled = Result<Vec<Outbound>, SessionError>;

const MAX_CHAT_CHARS: usize = 500;

async fn current_game(router: &EventRouter, sender: &Sender) -> Result<SessionHandle, StateError> {
    router
        .sessions
        .game_of(&sender.user.id)
        .await
        .ok_or(StateError::NotInGame)
}

/// GAME_INFO followed by MOVES, for one user.
async fn game_state(session: &SessionHandle, user_id: &str) -> Handled {
    let snapshot = session.get_snapshot().await?;
    let history = session.get_history().await?;
    Ok(vec![
        Outbound::user(user_id, Event::GameInfo(Box::new(game_info(&snapshot)))),
        Outbound::user(
            user_id,
            Event::Moves(history.iter().map(move_payload).collect()),
        ),
    ])
}

pub(super) async fn get_game(
    router: &EventRouter,
    sender: &Sender,
    payload: GetGamePayload,
) -> Handled {
    let session = router.sessions.get_handle(&payload.game_id).await?;
    router.connections.set_membership(
        &sender.user.id,
        Membership::Game(session.id().to_string()),
    );
    game_state(&session, &sender.user.id).await
}

/// Put a returning player back into their game if it is still running.
pub(super) async fn reattach(
    router: &EventRouter,
    sender: &Sender,
    session: &SessionHandle,
) -> Handled {
    let snapshot = session.get_snapshot().await?;
    if !snapshot.status.is_active() {
        return Ok(Vec::new());
    }
    session.reconnected(&sender.user.id, sender.conn).await?;
    router.connections.set_membership(
        &sender.user.id,
        Membership::Game(session.id().to_string()),
    );
    tracing::info!(
        user = %sender.user.id,
        session = %session.id(),
        status = snapshot.status.as_str(),
        "Player reattached"
    );
    game_state(session, &sender.user.id).await
}

pub(super) async fn make_move(
    router: &EventRouter,
    sender: &Sender,
    payload: MoveRequest,
) -> Handled {
    let session = current_game(router, sender).await?;
    let reply = session
        .submit_move(&sender.user.id, payload.into())
        .await?;

    let mut out = vec![Outbound::players(
        &session,
        Event::LastMove(move_payload(&reply.record)),
    )];
    if let Some(outcome) = reply.ended {
        out.push(Outbound::players(&session, Event::EndResult(outcome)));
    }
    Ok(out)
}

/// Legal targets from one square, for the player whose turn it is.
pub(super) async fn possible_moves(
    router: &EventRouter,
    sender: &Sender,
    payload: PossibleMovesRequest,
) -> Handled {
    let session = current_game(router, sender).await?;
    let moves = session.get_possible_moves(&payload.from).await?;
    Ok(vec![Outbound::user(
        &sender.user.id,
        Event::PossibleMoves(PossibleMovesPayload {
            from: payload.from,
            moves: moves.into_iter().map(Into::into).collect(),
        }),
    )])
}

pub(super) async fn abort(router: &EventRouter, sender: &Sender) -> Handled {
    let session = current_game(router, sender).await?;
    let outcome = session.abort(&sender.user.id).await?;
    Ok(vec![Outbound::players(&session, Event::EndResult(outcome))])
}

pub(super) async fn resign(router: &EventRouter, sender: &Sender) -> Handled {
    let session = current_game(router, sender).await?;
    let outcome = session.resign(&sender.user.id).await?;
    Ok(vec![Outbound::players(&session, Event::EndResult(outcome))])
}

pub(super) async fn send_message(
    router: &EventRouter,
    sender: &Sender,
    payload: SendMessagePayload,
) -> Handled {
    let text = payload.text.trim();
    if text.is_empty() {
        return Err(StateError::InvalidMessage("message is empty".into()).into());
    }
    if text.chars().count() > MAX_CHAT_CHARS {
        return Err(StateError::InvalidMessage(format!(
            "message is longer than {MAX_CHAT_CHARS} characters"
        ))
        .into());
    }
    let session = current_game(router, sender).await?;
    Ok(vec![Outbound::players(
        &session,
        Event::ChatMessage(chess_proto::ChatMessagePayload {
            sender: sender.user.username.clone(),
            text: text.to_string(),
        }),
    )])
}

/// Follow a session until it ends. Timer-driven endings have no request to
/// answer, so their END_RESULT is pushed from here. Once ended, the session
/// stays readable for the retention period and is then closed.
pub(super) fn spawn_session_watcher(
    router: &EventRouter,
    session: SessionHandle,
    mut events: broadcast::Receiver<SessionEvent>,
) {
    let connections = Arc::clone(&router.connections);
    let sessions = Arc::clone(&router.sessions);
    let retention = router.retention;
    let span = tracing::info_span!("watcher", session = %session.id());

    tokio::spawn(
        async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::Ended(outcome)) => {
                        if outcome.reason.is_timing_fault() {
                            for player in session.players() {
                                connections.send(player, Event::EndResult(outcome));
                            }
                        }
                        time::sleep(retention).await;
                        sessions.close_session(session.id()).await;
                        break;
                    }
                    Ok(SessionEvent::MovePlayed(_)) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Watcher lagged behind session events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
        .instrument(span),
    );
}
