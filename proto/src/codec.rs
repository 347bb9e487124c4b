//! Text frame codec.
//!
//! Decoding is two-phase: the action tag is checked first so an unknown tag
//! is reported separately from a payload that does not fit its action.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::action::EventAction;
use crate::event::Event;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Malformed frame: {0}")]
    Malformed(String),

    #[error("Invalid payload for {action}: {reason}")]
    InvalidPayload { action: EventAction, reason: String },
}

/// Parse one text frame.
///
/// A missing `p` is read as `{}` so payload-less actions may omit it.
pub fn decode(text: &str) -> Result<Event, DecodeError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let Value::Object(mut frame) = value else {
        return Err(DecodeError::Malformed("frame is not an object".into()));
    };

    let action = match frame.get("a") {
        Some(Value::String(code)) => EventAction::from_code(code)
            .ok_or_else(|| DecodeError::UnknownAction(code.clone()))?,
        Some(_) => return Err(DecodeError::Malformed("action tag is not a string".into())),
        None => return Err(DecodeError::Malformed("missing action tag".into())),
    };

    frame
        .entry("p")
        .or_insert_with(|| Value::Object(Map::new()));

    serde_json::from_value(Value::Object(frame)).map_err(|e| DecodeError::InvalidPayload {
        action,
        reason: e.to_string(),
    })
}

pub fn encode(event: &Event) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payloads::*;
    use chess::{ControlKind, EndReason, GameOutcome, MoveType, PieceColor, PieceKind};

    fn user(id: &str) -> UserPayload {
        UserPayload {
            id: id.into(),
            username: format!("{id}-name"),
            bullet_rating: 1500,
            blitz_rating: 1510,
            rapid_rating: 1490,
        }
    }

    fn last_move() -> MovePayload {
        MovePayload {
            from: "e7".into(),
            to: "e8".into(),
            is_check: true,
            move_type: MoveType::Promotion,
            time_left: 42_500,
            is_capture: false,
            is_checkmate: false,
            promotion_payload: Some(PieceKind::Queen),
        }
    }

    fn sample(action: EventAction) -> Event {
        match action {
            EventAction::CreateRoom => Event::CreateRoom(CreateRoomPayload {
                control: ControlKind::Blitz,
                bonus: 2,
            }),
            EventAction::CreateRoomErr => Event::CreateRoomErr(Empty {}),
            EventAction::JoinRoom => Event::JoinRoom(RoomRefPayload {
                room_id: "room-1".into(),
            }),
            EventAction::LeaveRoom => Event::LeaveRoom(RoomRefPayload {
                room_id: "room-1".into(),
            }),
            EventAction::GetRooms => Event::GetRooms(Empty {}),
            EventAction::GetGame => Event::GetGame(GetGamePayload {
                game_id: "room-1".into(),
            }),
            EventAction::Move => Event::Move(MoveRequest {
                from: "a7".into(),
                to: "a8".into(),
                promotion_payload: Some(PieceKind::Rook),
            }),
            EventAction::ClientsCounter => Event::ClientsCounter(7),
            EventAction::Redirect => Event::redirect("room-1"),
            EventAction::AddRoom => Event::AddRoom(RoomPayload {
                id: "room-1".into(),
                control: ControlKind::Rapid,
                bonus: 0,
                owner: user("alice"),
            }),
            EventAction::RemoveRoom => Event::remove_room("room-1"),
            EventAction::LastMove => Event::LastMove(last_move()),
            EventAction::Moves => Event::Moves(vec![last_move(), last_move()]),
            EventAction::GameInfo => Event::GameInfo(Box::new(GameInfoPayload {
                id: "room-1".into(),
                control: ControlKind::Bullet,
                bonus: 1,
                status: StatusTag::Ended,
                white: PlayerPayload {
                    user: user("alice"),
                    color: PieceColor::White,
                },
                black: PlayerPayload {
                    user: user("bob"),
                    color: PieceColor::Black,
                },
                turn: PieceColor::Black,
                white_time_left: 59_000,
                black_time_left: 0,
                fen: "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1".into(),
                move_count: 1,
                result: Some(GameOutcome::won_by(EndReason::Timeout, PieceColor::White)),
            })),
            EventAction::Abort => Event::Abort(Empty {}),
            EventAction::Resign => Event::Resign(Empty {}),
            EventAction::EndResult => {
                Event::EndResult(GameOutcome::no_winner(EndReason::Abort))
            }
            EventAction::SendMessage => Event::SendMessage(SendMessagePayload {
                text: "good luck".into(),
            }),
            EventAction::ChatMessage => Event::ChatMessage(ChatMessagePayload {
                sender: "alice-name".into(),
                text: "good luck".into(),
            }),
            EventAction::GetPossibleMoves => Event::GetPossibleMoves(PossibleMovesRequest {
                from: "g1".into(),
            }),
            EventAction::PossibleMoves => Event::PossibleMoves(PossibleMovesPayload {
                from: "g1".into(),
                moves: vec![PossibleMovePayload {
                    from: "g1".into(),
                    to: "f3".into(),
                    move_type: MoveType::Normal,
                }],
            }),
            EventAction::Identity => Event::Identity(IdentityPayload {
                user: user("alice"),
                token: Some("secret".into()),
            }),
            EventAction::Error => Event::error(ErrorCode::NotYourTurn, "wait"),
        }
    }

    #[test]
    fn test_round_trip_every_action() {
        for action in EventAction::ALL {
            let event = sample(action);
            assert_eq!(event.action(), action);

            let text = encode(&event).unwrap();
            let value: Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value["a"], Value::String(action.code().to_string()));

            assert_eq!(decode(&text).unwrap(), event, "round trip of {action}");
        }
    }

    #[test]
    fn test_decode_client_move() {
        let event = decode(r#"{"a":"m","p":{"from":"e2","to":"e4"}}"#).unwrap();
        assert_eq!(
            event,
            Event::Move(MoveRequest {
                from: "e2".into(),
                to: "e4".into(),
                promotion_payload: None,
            })
        );
    }

    #[test]
    fn test_missing_payload_reads_as_empty() {
        assert_eq!(decode(r#"{"a":"gr"}"#).unwrap(), Event::GetRooms(Empty {}));
        assert_eq!(decode(r#"{"a":"rs"}"#).unwrap(), Event::Resign(Empty {}));
    }

    #[test]
    fn test_unknown_action() {
        assert_eq!(
            decode(r#"{"a":"zz","p":{}}"#),
            Err(DecodeError::UnknownAction("zz".into()))
        );
    }

    #[test]
    fn test_malformed_frames() {
        assert!(matches!(decode("not json"), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode("[1,2]"), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode(r#"{"p":{}}"#), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode(r#"{"a":3}"#), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_payload_must_fit_action() {
        let err = decode(r#"{"a":"cr","p":{"control":"classical","bonus":0}}"#).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidPayload {
                action: EventAction::CreateRoom,
                ..
            }
        ));

        let err = decode(r#"{"a":"m","p":{"from":"e2"}}"#).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidPayload {
                action: EventAction::Move,
                ..
            }
        ));
    }

    #[test]
    fn test_clients_counter_is_bare_integer() {
        assert_eq!(encode(&Event::ClientsCounter(3)).unwrap(), r#"{"a":"cc","p":3}"#);
    }
}
