use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Instant};
use tracing::Instrument;

use super::commands::{MoveReply, SessionCommand};
use super::events::SessionEvent;
use super::state::SessionState;

/// The main session actor loop.
/// Owns all mutable state. Commands and timer deadlines are handled one at a
/// time, in arrival order.
pub(crate) async fn run_session_actor(
    state: SessionState,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
) {
    let session_id = state.id.clone();
    run_session_actor_inner(state, cmd_rx, event_tx)
        .instrument(tracing::info_span!("session", id = %session_id))
        .await;
}

async fn run_session_actor_inner(
    mut state: SessionState,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
) {
    tracing::info!("Session actor started");

    loop {
        let deadline = state.next_deadline();

        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SessionCommand::Shutdown) | None => {
                        tracing::info!("Session actor shutting down");
                        break;
                    }
                    Some(cmd) => handle_command(&mut state, cmd, &event_tx),
                }
            }

            _ = wait_until(deadline), if deadline.is_some() => {
                if let Some(fault) = state.on_deadline(Instant::now()) {
                    tracing::info!(%fault, "Timer ended the game");
                }
            }
        }

        if let Some(outcome) = state.take_ended() {
            let _ = event_tx.send(SessionEvent::Ended(outcome));
        }
    }

    tracing::info!("Session actor exited");
}

fn handle_command(
    state: &mut SessionState,
    cmd: SessionCommand,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    match cmd {
        SessionCommand::SubmitMove { user_id, mv, reply } => {
            let result = state
                .submit_move(&user_id, &mv, Instant::now())
                .map(|record| {
                    let _ = event_tx.send(SessionEvent::MovePlayed(record.clone()));
                    MoveReply {
                        record,
                        ended: state.status().outcome(),
                    }
                });
            if let Err(ref e) = result {
                tracing::debug!(user = %user_id, error = %e, "Move rejected");
            }
            let _ = reply.send(result);
        }
        SessionCommand::Abort { user_id, reply } => {
            let _ = reply.send(state.abort(&user_id, Instant::now()));
        }
        SessionCommand::Resign { user_id, reply } => {
            let _ = reply.send(state.resign(&user_id, Instant::now()));
        }
        SessionCommand::Disconnected {
            user_id,
            conn,
            reply,
        } => {
            let guarded = state.disconnected(&user_id, conn, Instant::now());
            if guarded {
                tracing::info!(user = %user_id, conn, "Player disconnected, grace window started");
            } else {
                tracing::debug!(user = %user_id, conn, "Disconnect ignored");
            }
            let _ = reply.send(guarded);
        }
        SessionCommand::Reconnected {
            user_id,
            conn,
            reply,
        } => {
            let cancelled = state.reconnected(&user_id, conn);
            if cancelled {
                tracing::info!(user = %user_id, conn, "Player reconnected");
            }
            let _ = reply.send(cancelled);
        }
        SessionCommand::GetSnapshot { reply } => {
            let _ = reply.send(state.snapshot(Instant::now()));
        }
        SessionCommand::GetHistory { reply } => {
            let _ = reply.send(state.history());
        }
        SessionCommand::GetPossibleMoves { from, reply } => {
            let _ = reply.send(state.possible_moves(&from));
        }
        SessionCommand::Shutdown => {}
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
