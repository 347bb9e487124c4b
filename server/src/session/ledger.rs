use chess::{MoveType, PieceColor, PieceKind};

/// A completed move. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    pub color: PieceColor,
    pub from: String,
    pub to: String,
    pub move_type: MoveType,
    pub promotion: Option<PieceKind>,
    pub is_capture: bool,
    pub is_check: bool,
    pub is_checkmate: bool,
    /// Mover's clock right after the move, in milliseconds.
    pub time_left: u64,
}

/// Append-only move history of one game.
#[derive(Debug, Clone, Default)]
pub struct MoveLedger {
    entries: Vec<MoveRecord>,
}

impl MoveLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: MoveRecord) -> &MoveRecord {
        self.entries.push(record);
        &self.entries[self.entries.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[MoveRecord] {
        &self.entries
    }
}
