//! Move shapes exchanged with the oracle.

use cozy_chess::Move;
use serde::{Deserialize, Serialize};

use crate::types::PieceKind;

/// Classification of a move, as reported back to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveType {
    Normal,
    /// Pawn advancing two squares from its start rank.
    DoublePush,
    EnPassant,
    ShortCastling,
    LongCastling,
    Promotion,
}

impl MoveType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::DoublePush => "double_push",
            Self::EnPassant => "en_passant",
            Self::ShortCastling => "short_castling",
            Self::LongCastling => "long_castling",
            Self::Promotion => "promotion",
        }
    }

    pub fn is_castling(self) -> bool {
        matches!(self, Self::ShortCastling | Self::LongCastling)
    }
}

/// What the mover sends: squares as labels plus an optional promotion piece.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveDto {
    pub from: String,
    pub to: String,
    pub promotion: Option<PieceKind>,
}

impl MoveDto {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            promotion: None,
        }
    }

    pub fn promoting(mut self, piece: PieceKind) -> Self {
        self.promotion = Some(piece);
        self
    }
}

/// The oracle's answer for a legal move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// The move in cozy-chess form, ready to be played.
    pub mv: Move,
    /// Origin square label.
    pub from: String,
    /// Destination label; for castling this is the king's landing square.
    pub to: String,
    pub promotion: Option<PieceKind>,
    pub move_type: MoveType,
    pub is_capture: bool,
    pub is_check: bool,
    pub is_checkmate: bool,
    /// The move leaves a drawn position (stalemate, fifty-move rule).
    pub is_draw: bool,
}

/// A candidate move from a square. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PossibleMove {
    pub from: String,
    pub to: String,
    pub move_type: MoveType,
}
