use chess::{ControlKind, GameStatus, PieceColor};

use crate::identity::UserRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub user: UserRef,
    pub color: PieceColor,
}

/// Point-in-time view of a session, clocks read as of the moment it was taken.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub id: String,
    pub control: ControlKind,
    pub bonus_secs: u32,
    pub status: GameStatus,
    pub white: Player,
    pub black: Player,
    pub turn: PieceColor,
    pub white_time_left: u64,
    pub black_time_left: u64,
    pub fen: String,
    pub move_count: usize,
}

impl SessionSnapshot {
    pub fn player(&self, color: PieceColor) -> &Player {
        match color {
            PieceColor::White => &self.white,
            PieceColor::Black => &self.black,
        }
    }
}
