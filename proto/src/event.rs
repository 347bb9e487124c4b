use chess::GameOutcome;
use serde::{Deserialize, Serialize};

use crate::action::EventAction;
use crate::payloads::{
    ChatMessagePayload, CreateRoomPayload, Empty, ErrorPayload, GameInfoPayload, GetGamePayload,
    IdentityPayload, MovePayload, MoveRequest, PossibleMovesPayload, PossibleMovesRequest,
    RemoveRoomPayload, RoomPayload, RoomRefPayload, SendMessagePayload,
};

/// One protocol frame. The variant decides the payload shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "a", content = "p")]
pub enum Event {
    #[serde(rename = "cr")]
    CreateRoom(CreateRoomPayload),
    #[serde(rename = "cre")]
    CreateRoomErr(Empty),
    #[serde(rename = "jr")]
    JoinRoom(RoomRefPayload),
    #[serde(rename = "lr")]
    LeaveRoom(RoomRefPayload),
    #[serde(rename = "gr")]
    GetRooms(Empty),
    #[serde(rename = "gg")]
    GetGame(GetGamePayload),
    #[serde(rename = "m")]
    Move(MoveRequest),
    #[serde(rename = "cc")]
    ClientsCounter(usize),
    #[serde(rename = "r")]
    Redirect(RoomRefPayload),
    #[serde(rename = "ar")]
    AddRoom(RoomPayload),
    #[serde(rename = "rr")]
    RemoveRoom(RemoveRoomPayload),
    #[serde(rename = "lm")]
    LastMove(MovePayload),
    #[serde(rename = "mh")]
    Moves(Vec<MovePayload>),
    #[serde(rename = "gi")]
    GameInfo(Box<GameInfoPayload>),
    #[serde(rename = "a")]
    Abort(Empty),
    #[serde(rename = "rs")]
    Resign(Empty),
    #[serde(rename = "er")]
    EndResult(GameOutcome),
    #[serde(rename = "sm")]
    SendMessage(SendMessagePayload),
    #[serde(rename = "cm")]
    ChatMessage(ChatMessagePayload),
    #[serde(rename = "pmr")]
    GetPossibleMoves(PossibleMovesRequest),
    #[serde(rename = "pm")]
    PossibleMoves(PossibleMovesPayload),
    /// First frame on every connection: who the server thinks you are.
    #[serde(rename = "id")]
    Identity(IdentityPayload),
    #[serde(rename = "err")]
    Error(ErrorPayload),
}

impl Event {
    pub fn action(&self) -> EventAction {
        match self {
            Self::CreateRoom(_) => EventAction::CreateRoom,
            Self::CreateRoomErr(_) => EventAction::CreateRoomErr,
            Self::JoinRoom(_) => EventAction::JoinRoom,
            Self::LeaveRoom(_) => EventAction::LeaveRoom,
            Self::GetRooms(_) => EventAction::GetRooms,
            Self::GetGame(_) => EventAction::GetGame,
            Self::Move(_) => EventAction::Move,
            Self::ClientsCounter(_) => EventAction::ClientsCounter,
            Self::Redirect(_) => EventAction::Redirect,
            Self::AddRoom(_) => EventAction::AddRoom,
            Self::RemoveRoom(_) => EventAction::RemoveRoom,
            Self::LastMove(_) => EventAction::LastMove,
            Self::Moves(_) => EventAction::Moves,
            Self::GameInfo(_) => EventAction::GameInfo,
            Self::Abort(_) => EventAction::Abort,
            Self::Resign(_) => EventAction::Resign,
            Self::EndResult(_) => EventAction::EndResult,
            Self::SendMessage(_) => EventAction::SendMessage,
            Self::ChatMessage(_) => EventAction::ChatMessage,
            Self::GetPossibleMoves(_) => EventAction::GetPossibleMoves,
            Self::PossibleMoves(_) => EventAction::PossibleMoves,
            Self::Identity(_) => EventAction::Identity,
            Self::Error(_) => EventAction::Error,
        }
    }

    pub fn error(code: crate::payloads::ErrorCode, message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload::new(code, message))
    }

    pub fn redirect(room_id: impl Into<String>) -> Self {
        Self::Redirect(RoomRefPayload {
            room_id: room_id.into(),
        })
    }

    pub fn remove_room(id: impl Into<String>) -> Self {
        Self::RemoveRoom(RemoveRoomPayload { id: id.into() })
    }
}
