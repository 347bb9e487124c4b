//! Fixed 8x8 piece grid.
//!
//! The grid mirrors the piece placement of a cozy-chess `Board` so that
//! classification code can look squares up by rank and file without going
//! through bitboards. Indexing is `[rank][file]`, rank 1 first.

use cozy_chess::{Board, Square};

use crate::types::{ColoredPiece, PieceColor, PieceKind};

/// Contents of one square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Occupied(ColoredPiece),
}

impl Cell {
    pub fn is_empty(self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// True if the cell holds a piece of `color`.
    pub fn holds(self, color: PieceColor) -> bool {
        matches!(self, Cell::Occupied(p) if p.color == color)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    cells: [[Cell; 8]; 8],
}

impl Grid {
    pub fn empty() -> Self {
        Self {
            cells: [[Cell::Empty; 8]; 8],
        }
    }

    /// Build the grid from a cozy-chess board.
    pub fn from_board(board: &Board) -> Self {
        let mut grid = Self::empty();
        for sq in Square::ALL {
            if let (Some(piece), Some(color)) = (board.piece_on(sq), board.color_on(sq)) {
                grid.set(
                    sq,
                    Cell::Occupied(ColoredPiece::new(
                        PieceKind::from(piece),
                        PieceColor::from(color),
                    )),
                );
            }
        }
        grid
    }

    pub fn get(&self, sq: Square) -> Cell {
        self.cells[sq.rank() as usize][sq.file() as usize]
    }

    pub fn set(&mut self, sq: Square, cell: Cell) {
        self.cells[sq.rank() as usize][sq.file() as usize] = cell;
    }

    /// Rows from rank 8 down to rank 1, the order a board is printed in.
    pub fn rows_top_down(&self) -> impl Iterator<Item = &[Cell; 8]> {
        self.cells.iter().rev()
    }

    /// Piece placement field of a FEN string.
    pub fn placement(&self) -> String {
        let mut out = String::with_capacity(72);
        for (i, row) in self.rows_top_down().enumerate() {
            if i > 0 {
                out.push('/');
            }
            let mut gap = 0;
            for cell in row {
                match cell {
                    Cell::Empty => gap += 1,
                    Cell::Occupied(p) => {
                        if gap > 0 {
                            out.push(char::from(b'0' + gap));
                            gap = 0;
                        }
                        out.push(p.fen_char());
                    }
                }
            }
            if gap > 0 {
                out.push(char::from(b'0' + gap));
            }
        }
        out
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::empty()
    }
}
