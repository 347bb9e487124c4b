//! Chess domain types for the room server.
//!
//! Board state is kept as a cozy-chess `Board` plus a fixed 8x8 grid used for
//! square lookups. Move legality is answered through the [`LegalityOracle`]
//! trait; [`StandardOracle`] is the cozy-chess backed implementation.

pub mod board;
pub mod converters;
pub mod game;
pub mod moves;
pub mod oracle;
pub mod position;
pub mod types;

pub use board::{Cell, Grid};
pub use converters::*;
pub use game::{ControlKind, EndReason, GameOutcome, GameStatus, InvalidTransition};
pub use moves::{MoveDto, MoveType, PossibleMove, Verdict};
pub use oracle::{IllegalMove, LegalityOracle, StandardOracle};
pub use position::{InvalidFen, Position, PositionStatus};
pub use types::{ColoredPiece, PieceColor, PieceKind};
