//! Rooms waiting for a second player.

use std::sync::Arc;

use chess::ControlKind;
use chess_proto::RoomPayload;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::error::StateError;
use crate::identity::UserRef;
use crate::session::{GameSetup, SessionEvent, SessionHandle, SessionManager};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: String,
    pub control: ControlKind,
    pub bonus_secs: u32,
    pub owner: UserRef,
}

impl Room {
    pub fn to_payload(&self) -> RoomPayload {
        RoomPayload {
            id: self.id.clone(),
            control: self.control,
            bonus: self.bonus_secs,
            owner: self.owner.to_payload(),
        }
    }
}

/// How seats are handed out when a room is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorPolicy {
    /// Fair coin.
    #[default]
    Random,
    /// Owner always plays white.
    OwnerWhite,
}

impl ColorPolicy {
    fn owner_is_white(self) -> bool {
        match self {
            Self::Random => rand::random::<bool>(),
            Self::OwnerWhite => true,
        }
    }
}

/// A room turned into a game.
pub struct Joined {
    pub room: Room,
    pub session: SessionHandle,
    pub events: broadcast::Receiver<SessionEvent>,
    /// The joiner's own open room, withdrawn because they are now playing.
    pub withdrawn: Option<Room>,
}

pub struct RoomRegistry {
    rooms: Mutex<Vec<Room>>,
    sessions: Arc<SessionManager>,
    policy: ColorPolicy,
}

impl RoomRegistry {
    pub fn new(sessions: Arc<SessionManager>, policy: ColorPolicy) -> Self {
        Self {
            rooms: Mutex::new(Vec::new()),
            sessions,
            policy,
        }
    }

    /// Open a room. An owner may hold at most one.
    pub async fn create_room(
        &self,
        owner: UserRef,
        control: ControlKind,
        bonus_secs: u32,
    ) -> Result<Room, StateError> {
        let mut rooms = self.rooms.lock().await;
        if rooms.iter().any(|r| r.owner.id == owner.id) {
            return Err(StateError::AlreadyOwnsRoom);
        }
        let room = Room {
            id: Uuid::new_v4().to_string(),
            control,
            bonus_secs,
            owner,
        };
        rooms.push(room.clone());
        tracing::info!(room = %room.id, owner = %room.owner.id, %control, "Room created");
        Ok(room)
    }

    /// Consume a room and start its game. The session id is the room id.
    pub async fn join_room(&self, room_id: &str, joiner: UserRef) -> Result<Joined, StateError> {
        let (room, withdrawn) = {
            let mut rooms = self.rooms.lock().await;
            let idx = rooms
                .iter()
                .position(|r| r.id == room_id)
                .ok_or_else(|| StateError::NotFound(format!("room {room_id}")))?;
            if rooms[idx].owner.id == joiner.id {
                return Err(StateError::SelfJoin);
            }
            let room = rooms.remove(idx);
            let withdrawn = rooms
                .iter()
                .position(|r| r.owner.id == joiner.id)
                .map(|i| rooms.remove(i));
            (room, withdrawn)
        };

        let (white, black) = if self.policy.owner_is_white() {
            (room.owner.clone(), joiner)
        } else {
            (joiner, room.owner.clone())
        };
        tracing::info!(
            room = %room.id,
            white = %white.id,
            white_rating = white.rating(room.control),
            black = %black.id,
            black_rating = black.rating(room.control),
            "Room joined"
        );

        let (session, events) = self
            .sessions
            .create_session(GameSetup {
                id: room.id.clone(),
                control: room.control,
                bonus_secs: room.bonus_secs,
                white,
                black,
            })
            .await;

        Ok(Joined {
            room,
            session,
            events,
            withdrawn,
        })
    }

    pub async fn leave_room(&self, room_id: &str, requester_id: &str) -> Result<Room, StateError> {
        let mut rooms = self.rooms.lock().await;
        let idx = rooms
            .iter()
            .position(|r| r.id == room_id)
            .ok_or_else(|| StateError::NotFound(format!("room {room_id}")))?;
        if rooms[idx].owner.id != requester_id {
            return Err(StateError::NotOwner);
        }
        let room = rooms.remove(idx);
        tracing::info!(room = %room.id, "Room closed by owner");
        Ok(room)
    }

    /// Withdraw whatever room `owner_id` holds.
    pub async fn remove_owned_by(&self, owner_id: &str) -> Option<Room> {
        let mut rooms = self.rooms.lock().await;
        let idx = rooms.iter().position(|r| r.owner.id == owner_id)?;
        let room = rooms.remove(idx);
        tracing::info!(room = %room.id, "Room withdrawn");
        Some(room)
    }

    /// Open rooms, oldest first.
    pub async fn list_rooms(&self) -> Vec<Room> {
        self.rooms.lock().await.clone()
    }
}
