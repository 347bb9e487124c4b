//! Move legality and classification.
//!
//! The session never inspects chess rules itself; it hands the current
//! [`Position`] and the mover's [`MoveDto`] to a [`LegalityOracle`] and acts on
//! the [`Verdict`]. Castling may be submitted either in standard notation
//! (`e1g1`) or king-takes-rook form (`e1h1`); verdicts always report the
//! king's landing square.

use cozy_chess::{File, Move, Piece, Square};

use crate::board::Cell;
use crate::converters::{format_square, parse_square};
use crate::moves::{MoveDto, MoveType, PossibleMove, Verdict};
use crate::position::{Position, PositionStatus};
use crate::types::{PieceColor, PieceKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IllegalMove {
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("No piece of the side to move on {0}")]
    NotOwnPiece(String),
    #[error("Illegal move: {from}{to}")]
    NotLegal { from: String, to: String },
    #[error("Invalid promotion piece: {0:?}")]
    InvalidPromotion(PieceKind),
}

/// Capability that decides legality and tactical flags of a candidate move.
pub trait LegalityOracle: Send + Sync {
    /// Judge `dto` against `position`. Must not have side effects.
    fn evaluate(&self, position: &Position, dto: &MoveDto) -> Result<Verdict, IllegalMove>;

    /// Candidate moves for the piece on `from`. Empty if the square is empty
    /// or holds a piece of the side not to move.
    fn possible_moves(
        &self,
        position: &Position,
        from: &str,
    ) -> Result<Vec<PossibleMove>, IllegalMove>;
}

/// Oracle backed by cozy-chess move generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardOracle;

impl LegalityOracle for StandardOracle {
    fn evaluate(&self, position: &Position, dto: &MoveDto) -> Result<Verdict, IllegalMove> {
        let from =
            parse_square(&dto.from).ok_or_else(|| IllegalMove::InvalidSquare(dto.from.clone()))?;
        let to = parse_square(&dto.to).ok_or_else(|| IllegalMove::InvalidSquare(dto.to.clone()))?;

        let mover = position.side_to_move();
        let piece = match position.grid().get(from) {
            Cell::Occupied(p) if p.color == mover => p,
            _ => return Err(IllegalMove::NotOwnPiece(dto.from.clone())),
        };

        let promotion = match dto.promotion {
            Some(kind) if !kind.is_promotion_target() => {
                return Err(IllegalMove::InvalidPromotion(kind))
            }
            Some(kind) => Some(kind),
            // A pawn reaching the last rank without a choice becomes a queen.
            None if piece.kind == PieceKind::Pawn && is_last_rank(to, mover) => {
                Some(PieceKind::Queen)
            }
            None => None,
        };

        let mv = Move {
            from,
            to: castling_target(position, from, to, piece.kind, mover),
            promotion: promotion.map(Piece::from),
        };

        let not_legal = || IllegalMove::NotLegal {
            from: dto.from.clone(),
            to: dto.to.clone(),
        };
        let next = position.after(mv).ok_or_else(not_legal)?;
        let move_type = classify(position, mv);
        let status = next.status();

        Ok(Verdict {
            mv,
            from: format_square(mv.from),
            to: format_square(landing_square(mv, move_type)),
            promotion,
            move_type,
            is_capture: is_capture(position, mv, move_type),
            is_check: next.is_check(),
            is_checkmate: status == PositionStatus::Checkmate,
            is_draw: status == PositionStatus::Draw,
        })
    }

    fn possible_moves(
        &self,
        position: &Position,
        from: &str,
    ) -> Result<Vec<PossibleMove>, IllegalMove> {
        let from_sq = parse_square(from).ok_or_else(|| IllegalMove::InvalidSquare(from.to_string()))?;

        let mut out: Vec<PossibleMove> = Vec::new();
        for mv in position.legal_moves().into_iter().filter(|mv| mv.from == from_sq) {
            let move_type = classify(position, mv);
            let candidate = PossibleMove {
                from: format_square(mv.from),
                to: format_square(landing_square(mv, move_type)),
                move_type,
            };
            // Promotions come once per piece; one entry per destination is enough.
            if !out.contains(&candidate) {
                out.push(candidate);
            }
        }
        Ok(out)
    }
}

fn is_last_rank(sq: Square, color: PieceColor) -> bool {
    match color {
        PieceColor::White => sq.rank() == cozy_chess::Rank::Eighth,
        PieceColor::Black => sq.rank() == cozy_chess::Rank::First,
    }
}

/// Map a standard-notation castling move (king two files sideways) onto the
/// king-takes-rook square cozy-chess expects. Anything else passes through.
fn castling_target(
    position: &Position,
    from: Square,
    to: Square,
    kind: PieceKind,
    mover: PieceColor,
) -> Square {
    if kind != PieceKind::King || from.rank() != to.rank() {
        return to;
    }
    let distance = (to.file() as i8 - from.file() as i8).abs();
    if distance != 2 {
        return to;
    }
    let rook_file = if to.file() as u8 > from.file() as u8 {
        File::H
    } else {
        File::A
    };
    let rook_sq = Square::new(rook_file, from.rank());
    match position.grid().get(rook_sq) {
        Cell::Occupied(p) if p.kind == PieceKind::Rook && p.color == mover => rook_sq,
        _ => to,
    }
}

fn classify(position: &Position, mv: Move) -> MoveType {
    let grid = position.grid();
    let Cell::Occupied(piece) = grid.get(mv.from) else {
        return MoveType::Normal;
    };

    match piece.kind {
        PieceKind::King if grid.get(mv.to).holds(piece.color) => {
            if mv.to.file() as u8 > mv.from.file() as u8 {
                MoveType::ShortCastling
            } else {
                MoveType::LongCastling
            }
        }
        PieceKind::Pawn => {
            if mv.promotion.is_some() {
                MoveType::Promotion
            } else if mv.from.file() != mv.to.file() && grid.get(mv.to).is_empty() {
                MoveType::EnPassant
            } else if (mv.to.rank() as i8 - mv.from.rank() as i8).abs() == 2 {
                MoveType::DoublePush
            } else {
                MoveType::Normal
            }
        }
        _ => MoveType::Normal,
    }
}

fn is_capture(position: &Position, mv: Move, move_type: MoveType) -> bool {
    if move_type == MoveType::EnPassant {
        return true;
    }
    if move_type.is_castling() {
        return false;
    }
    let mover = position.side_to_move();
    position.grid().get(mv.to).holds(mover.opposite())
}

fn landing_square(mv: Move, move_type: MoveType) -> Square {
    match move_type {
        MoveType::ShortCastling => Square::new(File::G, mv.from.rank()),
        MoveType::LongCastling => Square::new(File::C, mv.from.rank()),
        _ => mv.to,
    }
}
