//! Payload bodies, one per action. Field names go over the wire in camelCase.

use chess::{ControlKind, GameStatus, MoveDto, MoveType, PieceColor, PieceKind, PossibleMove};
use serde::{Deserialize, Serialize};

/// Body of actions that carry nothing: `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub id: String,
    pub username: String,
    pub bullet_rating: u32,
    pub blitz_rating: u32,
    pub rapid_rating: u32,
}

/// Sent once per connection. `token` lets the same user reconnect later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityPayload {
    pub user: UserPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomPayload {
    pub control: ControlKind,
    /// Per-move increment in seconds.
    #[serde(default)]
    pub bonus: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRefPayload {
    pub room_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPayload {
    pub id: String,
    pub control: ControlKind,
    pub bonus: u32,
    pub owner: UserPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveRoomPayload {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetGamePayload {
    pub game_id: String,
}

/// A move as submitted by the player on turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion_payload: Option<PieceKind>,
}

impl From<MoveRequest> for MoveDto {
    fn from(req: MoveRequest) -> Self {
        MoveDto {
            from: req.from,
            to: req.to,
            promotion: req.promotion_payload,
        }
    }
}

/// A completed move, as recorded in the game ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePayload {
    pub from: String,
    pub to: String,
    pub is_check: bool,
    pub move_type: MoveType,
    /// Mover's remaining time after the move, in milliseconds.
    pub time_left: u64,
    pub is_capture: bool,
    pub is_checkmate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion_payload: Option<PieceKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PossibleMovesRequest {
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PossibleMovePayload {
    pub from: String,
    pub to: String,
    pub move_type: MoveType,
}

impl From<PossibleMove> for PossibleMovePayload {
    fn from(mv: PossibleMove) -> Self {
        Self {
            from: mv.from,
            to: mv.to,
            move_type: mv.move_type,
        }
    }
}

/// Legal targets from one square for the side to move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PossibleMovesPayload {
    pub from: String,
    pub moves: Vec<PossibleMovePayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPayload {
    pub user: UserPayload,
    pub color: PieceColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTag {
    Pending,
    Active,
    Ended,
}

impl From<GameStatus> for StatusTag {
    fn from(status: GameStatus) -> Self {
        match status {
            GameStatus::Pending => Self::Pending,
            GameStatus::Active => Self::Active,
            GameStatus::Ended(_) => Self::Ended,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfoPayload {
    pub id: String,
    pub control: ControlKind,
    pub bonus: u32,
    pub status: StatusTag,
    pub white: PlayerPayload,
    pub black: PlayerPayload,
    pub turn: PieceColor,
    pub white_time_left: u64,
    pub black_time_left: u64,
    pub fen: String,
    pub move_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<chess::GameOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessagePayload {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessagePayload {
    /// Username of the author.
    pub sender: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Protocol,
    NotYourTurn,
    IllegalMove,
    GameNotActive,
    NotFound,
    NotOwner,
    AlreadyOwnsRoom,
    SelfJoin,
    AbortWindowClosed,
    NotInGame,
    AlreadyInGame,
    InvalidMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorPayload {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_move_payload_field_names() {
        let payload = MovePayload {
            from: "e2".into(),
            to: "e4".into(),
            is_check: false,
            move_type: MoveType::DoublePush,
            time_left: 60_000,
            is_capture: false,
            is_checkmate: false,
            promotion_payload: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "from": "e2",
                "to": "e4",
                "isCheck": false,
                "moveType": "double_push",
                "timeLeft": 60000,
                "isCapture": false,
                "isCheckmate": false,
            })
        );
    }

    #[test]
    fn test_move_request_promotion_is_optional() {
        let req: MoveRequest = serde_json::from_value(json!({"from": "e2", "to": "e4"})).unwrap();
        assert_eq!(req.promotion_payload, None);

        let req: MoveRequest =
            serde_json::from_value(json!({"from": "a7", "to": "a8", "promotionPayload": "knight"}))
                .unwrap();
        let dto = MoveDto::from(req);
        assert_eq!(dto.promotion, Some(PieceKind::Knight));
        assert_eq!(dto.from, "a7");
    }

    #[test]
    fn test_error_codes_snake_case() {
        let value = serde_json::to_value(ErrorPayload::new(ErrorCode::AbortWindowClosed, "late"))
            .unwrap();
        assert_eq!(
            value,
            json!({"code": "abort_window_closed", "message": "late"})
        );
    }

    #[test]
    fn test_create_room_bonus_defaults_to_zero() {
        let payload: CreateRoomPayload =
            serde_json::from_value(json!({"control": "bullet"})).unwrap();
        assert_eq!(payload.control, ControlKind::Bullet);
        assert_eq!(payload.bonus, 0);
    }

    #[test]
    fn test_possible_move_field_names() {
        let payload = PossibleMovesPayload {
            from: "e1".into(),
            moves: vec![PossibleMovePayload {
                from: "e1".into(),
                to: "g1".into(),
                move_type: MoveType::ShortCastling,
            }],
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "from": "e1",
                "moves": [{"from": "e1", "to": "g1", "moveType": "short_castling"}],
            })
        );
    }

    #[test]
    fn test_status_tag_from_game_status() {
        assert_eq!(StatusTag::from(GameStatus::Active), StatusTag::Active);
        let ended = GameStatus::Ended(chess::GameOutcome::no_winner(chess::EndReason::Draw));
        assert_eq!(StatusTag::from(ended), StatusTag::Ended);
    }
}
