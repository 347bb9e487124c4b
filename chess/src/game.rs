//! Game lifecycle types shared by the server and the wire protocol.

use serde::{Deserialize, Serialize};

use crate::types::PieceColor;

/// Base time category of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Bullet,
    Blitz,
    Rapid,
}

impl ControlKind {
    /// Initial clock per side, in seconds.
    pub fn base_seconds(self) -> u64 {
        match self {
            Self::Bullet => 60,
            Self::Blitz => 180,
            Self::Rapid => 600,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bullet => "bullet",
            Self::Blitz => "blitz",
            Self::Rapid => "rapid",
        }
    }
}

impl std::fmt::Display for ControlKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    Checkmate,
    Resignation,
    Abort,
    Draw,
    Timeout,
    Disconnect,
}

impl EndReason {
    /// Endings raised by the server's timers rather than by a player action.
    pub fn is_timing_fault(self) -> bool {
        matches!(self, Self::Timeout | Self::Disconnect)
    }
}

/// Final result of a game. `winner` is `None` for draws and aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub reason: EndReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<PieceColor>,
}

impl GameOutcome {
    pub fn won_by(reason: EndReason, winner: PieceColor) -> Self {
        Self {
            reason,
            winner: Some(winner),
        }
    }

    pub fn no_winner(reason: EndReason) -> Self {
        Self {
            reason,
            winner: None,
        }
    }
}

/// Lifecycle of a game. Only ever moves forward:
/// `Pending -> Active -> Ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameStatus {
    #[default]
    Pending,
    Active,
    Ended(GameOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid status transition: {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: GameStatus,
    pub to: GameStatus,
}

impl GameStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Active => 1,
            Self::Ended(_) => 2,
        }
    }

    /// Move to `next` if it is strictly later in the lifecycle.
    pub fn advance(&mut self, next: GameStatus) -> Result<(), InvalidTransition> {
        if next.rank() <= self.rank() {
            return Err(InvalidTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn outcome(self) -> Option<GameOutcome> {
        match self {
            Self::Ended(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Ended(_) => "ended",
        }
    }
}
