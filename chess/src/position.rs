use cozy_chess::{Board, GameStatus, Move};

use crate::board::Grid;
use crate::types::PieceColor;

/// A FEN string cozy-chess could not read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid FEN: {0}")]
pub struct InvalidFen(pub String);

/// Outcome of the position for the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    Ongoing,
    /// The side to move is checkmated.
    Checkmate,
    /// Stalemate or the fifty-move rule.
    Draw,
}

/// Current board state: the cozy-chess board plus its grid mirror.
#[derive(Debug, Clone)]
pub struct Position {
    board: Board,
    grid: Grid,
}

impl Position {
    /// Standard starting position.
    pub fn new() -> Self {
        Self::from_board(Board::default())
    }

    pub fn from_fen(fen: &str) -> Result<Self, InvalidFen> {
        fen.trim()
            .parse::<Board>()
            .map(Self::from_board)
            .map_err(|_| InvalidFen(fen.to_string()))
    }

    fn from_board(board: Board) -> Self {
        let grid = Grid::from_board(&board);
        Self { board, grid }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn side_to_move(&self) -> PieceColor {
        PieceColor::from(self.board.side_to_move())
    }

    pub fn to_fen(&self) -> String {
        self.board.to_string()
    }

    /// All legal moves, castling in cozy-chess king-takes-rook form.
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.board.generate_moves(|mvs| {
            moves.extend(mvs);
            false
        });
        moves
    }

    pub fn is_check(&self) -> bool {
        !self.board.checkers().is_empty()
    }

    pub fn status(&self) -> PositionStatus {
        match self.board.status() {
            GameStatus::Ongoing => PositionStatus::Ongoing,
            GameStatus::Won => PositionStatus::Checkmate,
            GameStatus::Drawn => PositionStatus::Draw,
        }
    }

    /// Position after `mv`, or `None` if the move is not legal here.
    pub fn after(&self, mv: Move) -> Option<Position> {
        if !self.board.is_legal(mv) {
            return None;
        }
        let mut board = self.board.clone();
        board.play_unchecked(mv);
        Some(Self::from_board(board))
    }

    /// Play a legal move in place. Returns false and leaves the position
    /// untouched if the move is illegal.
    pub fn play(&mut self, mv: Move) -> bool {
        match self.after(mv) {
            Some(next) => {
                *self = next;
                true
            }
            None => false,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}
