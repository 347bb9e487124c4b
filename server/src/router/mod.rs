//! Inbound event dispatch.
//!
//! Handlers never write to sockets. Each returns the events it wants sent
//! and to whom; [`EventRouter::deliver`] hands them to the connection layer.

mod converters;
mod game;
mod lobby;

use std::sync::Arc;

use chess_proto::{codec, ErrorCode, Event};
use tokio::time::Duration;

use crate::connections::{ConnId, ConnectionManager, Membership};
use crate::identity::UserRef;
use crate::rooms::RoomRegistry;
use crate::session::{SessionError, SessionHandle, SessionManager};

/// Who sent an event.
#[derive(Debug, Clone)]
pub struct Sender {
    pub user: UserRef,
    pub conn: ConnId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    User(String),
    Users(Vec<String>),
    /// Everyone currently in the lobby.
    Lobby,
    Everyone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub to: Recipients,
    pub event: Event,
}

impl Outbound {
    pub fn user(user_id: &str, event: Event) -> Self {
        Self {
            to: Recipients::User(user_id.to_string()),
            event,
        }
    }

    /// Both seats of a game.
    pub fn players(session: &SessionHandle, event: Event) -> Self {
        Self {
            to: Recipients::Users(session.players().to_vec()),
            event,
        }
    }

    pub fn lobby(event: Event) -> Self {
        Self {
            to: Recipients::Lobby,
            event,
        }
    }

    pub fn everyone(event: Event) -> Self {
        Self {
            to: Recipients::Everyone,
            event,
        }
    }

    fn error(sender: &Sender, err: &SessionError) -> Self {
        Self::user(&sender.user.id, Event::error(err.code(), err.to_string()))
    }
}

pub struct EventRouter {
    rooms: Arc<RoomRegistry>,
    sessions: Arc<SessionManager>,
    connections: Arc<ConnectionManager>,
    /// How long an ended game stays readable.
    retention: Duration,
}

impl EventRouter {
    pub fn new(
        rooms: Arc<RoomRegistry>,
        sessions: Arc<SessionManager>,
        connections: Arc<ConnectionManager>,
        retention: Duration,
    ) -> Self {
        Self {
            rooms,
            sessions,
            connections,
            retention,
        }
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    /// Decode and dispatch one text frame. A frame that does not decode is
    /// answered with a `protocol` error; the connection stays open.
    pub async fn handle_text(&self, sender: &Sender, text: &str) -> Vec<Outbound> {
        match codec::decode(text) {
            Ok(event) => self.dispatch(sender, event).await,
            Err(e) => {
                tracing::warn!(user = %sender.user.id, error = %e, "Undecodable frame");
                vec![Outbound::user(
                    &sender.user.id,
                    Event::error(ErrorCode::Protocol, e.to_string()),
                )]
            }
        }
    }

    pub async fn dispatch(&self, sender: &Sender, event: Event) -> Vec<Outbound> {
        let action = event.action();
        if !action.is_client_bound() {
            tracing::warn!(user = %sender.user.id, %action, "Ignoring server-bound action");
            return Vec::new();
        }
        tracing::debug!(user = %sender.user.id, conn = sender.conn, %action, "Dispatching");

        let result = match event {
            Event::CreateRoom(payload) => lobby::create_room(self, sender, payload).await,
            Event::JoinRoom(payload) => lobby::join_room(self, sender, payload).await,
            Event::LeaveRoom(payload) => lobby::leave_room(self, sender, payload).await,
            Event::GetRooms(_) => lobby::get_rooms(self, sender).await,
            Event::GetGame(payload) => game::get_game(self, sender, payload).await,
            Event::Move(payload) => game::make_move(self, sender, payload).await,
            Event::Abort(_) => game::abort(self, sender).await,
            Event::Resign(_) => game::resign(self, sender).await,
            Event::SendMessage(payload) => game::send_message(self, sender, payload).await,
            Event::GetPossibleMoves(payload) => {
                game::possible_moves(self, sender, payload).await
            }
            Event::CreateRoomErr(_)
            | Event::ClientsCounter(_)
            | Event::Redirect(_)
            | Event::AddRoom(_)
            | Event::RemoveRoom(_)
            | Event::LastMove(_)
            | Event::Moves(_)
            | Event::GameInfo(_)
            | Event::EndResult(_)
            | Event::ChatMessage(_)
            | Event::PossibleMoves(_)
            | Event::Identity(_)
            | Event::Error(_) => Ok(Vec::new()),
        };

        result.unwrap_or_else(|e| {
            tracing::debug!(user = %sender.user.id, %action, error = %e, "Request rejected");
            vec![Outbound::error(sender, &e)]
        })
    }

    /// A user's connection was registered. Reattaches them to a running game.
    pub async fn on_connect(&self, sender: &Sender) -> Vec<Outbound> {
        let mut out = Vec::new();
        if let Some(session) = self.sessions.game_of(&sender.user.id).await {
            match game::reattach(self, sender, &session).await {
                Ok(mut events) => out.append(&mut events),
                Err(e) => {
                    tracing::warn!(user = %sender.user.id, error = %e, "Reattach failed");
                }
            }
        }
        out.push(self.clients_counter());
        out
    }

    /// A user's current connection closed. The session ignores the drop if
    /// the user has meanwhile reattached from a newer connection.
    pub async fn on_disconnect(&self, sender: &Sender) -> Vec<Outbound> {
        let user = &sender.user;
        let mut out = Vec::new();
        if let Some(room) = self.rooms.remove_owned_by(&user.id).await {
            out.push(Outbound::lobby(Event::remove_room(room.id)));
        }
        if let Some(session) = self.sessions.game_of(&user.id).await {
            if let Err(e) = session.disconnected(&user.id, sender.conn).await {
                tracing::warn!(user = %user.id, error = %e, "Could not notify session");
            }
        }
        out.push(self.clients_counter());
        out
    }

    fn clients_counter(&self) -> Outbound {
        Outbound::everyone(Event::ClientsCounter(self.connections.clients_counter()))
    }

    pub fn deliver(&self, outbound: Vec<Outbound>) {
        for Outbound { to, event } in outbound {
            match to {
                Recipients::User(id) => {
                    self.connections.send(&id, event);
                }
                Recipients::Users(ids) => {
                    for id in ids {
                        self.connections.send(&id, event.clone());
                    }
                }
                Recipients::Lobby => {
                    self.connections
                        .broadcast(&event, |_, m| *m == Membership::Lobby);
                }
                Recipients::Everyone => {
                    self.connections.broadcast(&event, |_, _| true);
                }
            }
        }
    }
}
