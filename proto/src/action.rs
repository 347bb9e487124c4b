use serde::{Deserialize, Serialize};

/// Action tag carried in the `a` field of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventAction {
    #[serde(rename = "cr")]
    CreateRoom,
    #[serde(rename = "cre")]
    CreateRoomErr,
    #[serde(rename = "jr")]
    JoinRoom,
    #[serde(rename = "lr")]
    LeaveRoom,
    #[serde(rename = "gr")]
    GetRooms,
    #[serde(rename = "gg")]
    GetGame,
    #[serde(rename = "m")]
    Move,
    #[serde(rename = "cc")]
    ClientsCounter,
    #[serde(rename = "r")]
    Redirect,
    #[serde(rename = "ar")]
    AddRoom,
    #[serde(rename = "rr")]
    RemoveRoom,
    #[serde(rename = "lm")]
    LastMove,
    #[serde(rename = "mh")]
    Moves,
    #[serde(rename = "gi")]
    GameInfo,
    #[serde(rename = "a")]
    Abort,
    #[serde(rename = "rs")]
    Resign,
    #[serde(rename = "er")]
    EndResult,
    #[serde(rename = "sm")]
    SendMessage,
    #[serde(rename = "cm")]
    ChatMessage,
    #[serde(rename = "pmr")]
    GetPossibleMoves,
    #[serde(rename = "pm")]
    PossibleMoves,
    #[serde(rename = "id")]
    Identity,
    #[serde(rename = "err")]
    Error,
}

impl EventAction {
    pub const ALL: [EventAction; 23] = [
        Self::CreateRoom,
        Self::CreateRoomErr,
        Self::JoinRoom,
        Self::LeaveRoom,
        Self::GetRooms,
        Self::GetGame,
        Self::Move,
        Self::ClientsCounter,
        Self::Redirect,
        Self::AddRoom,
        Self::RemoveRoom,
        Self::LastMove,
        Self::Moves,
        Self::GameInfo,
        Self::Abort,
        Self::Resign,
        Self::EndResult,
        Self::SendMessage,
        Self::ChatMessage,
        Self::GetPossibleMoves,
        Self::PossibleMoves,
        Self::Identity,
        Self::Error,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::CreateRoom => "cr",
            Self::CreateRoomErr => "cre",
            Self::JoinRoom => "jr",
            Self::LeaveRoom => "lr",
            Self::GetRooms => "gr",
            Self::GetGame => "gg",
            Self::Move => "m",
            Self::ClientsCounter => "cc",
            Self::Redirect => "r",
            Self::AddRoom => "ar",
            Self::RemoveRoom => "rr",
            Self::LastMove => "lm",
            Self::Moves => "mh",
            Self::GameInfo => "gi",
            Self::Abort => "a",
            Self::Resign => "rs",
            Self::EndResult => "er",
            Self::SendMessage => "sm",
            Self::ChatMessage => "cm",
            Self::GetPossibleMoves => "pmr",
            Self::PossibleMoves => "pm",
            Self::Identity => "id",
            Self::Error => "err",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.code() == code)
    }

    /// Actions a client is allowed to send. Everything else is server-pushed.
    pub fn is_client_bound(self) -> bool {
        matches!(
            self,
            Self::CreateRoom
                | Self::JoinRoom
                | Self::LeaveRoom
                | Self::GetRooms
                | Self::GetGame
                | Self::Move
                | Self::Abort
                | Self::Resign
                | Self::SendMessage
                | Self::GetPossibleMoves
        )
    }
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
