use chess::PieceColor;
use chess_proto::{GameInfoPayload, MovePayload, PlayerPayload};

use crate::session::{MoveRecord, Player, SessionSnapshot};

pub fn move_payload(record: &MoveRecord) -> MovePayload {
    MovePayload {
        from: record.from.clone(),
        to: record.to.clone(),
        is_check: record.is_check,
        move_type: record.move_type,
        time_left: record.time_left,
        is_capture: record.is_capture,
        is_checkmate: record.is_checkmate,
        promotion_payload: record.promotion,
    }
}

fn player_payload(player: &Player) -> PlayerPayload {
    PlayerPayload {
        user: player.user.to_payload(),
        color: player.color,
    }
}

pub fn game_info(snapshot: &SessionSnapshot) -> GameInfoPayload {
    GameInfoPayload {
        id: snapshot.id.clone(),
        control: snapshot.control,
        bonus: snapshot.bonus_secs,
        status: snapshot.status.into(),
        white: player_payload(snapshot.player(PieceColor::White)),
        black: player_payload(snapshot.player(PieceColor::Black)),
        turn: snapshot.turn,
        white_time_left: snapshot.white_time_left,
        black_time_left: snapshot.black_time_left,
        fen: snapshot.fen.clone(),
        move_count: snapshot.move_count,
        result: snapshot.status.outcome(),
    }
}
