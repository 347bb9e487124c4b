//! Per-player game clock.
//!
//! Time is kept in milliseconds. At most one side runs at a time; elapsed
//! time is only debited when the running side is stopped or moves.

use chess::PieceColor;
use tokio::time::{Duration, Instant};

/// The mover's time ran out before the move landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flagged;

#[derive(Debug, Clone)]
pub struct Clock {
    remaining_ms: [u64; 2],
    bonus_ms: u64,
    running: Option<(PieceColor, Instant)>,
}

impl Clock {
    pub fn new(base_ms: u64, bonus_ms: u64) -> Self {
        Self {
            remaining_ms: [base_ms, base_ms],
            bonus_ms,
            running: None,
        }
    }

    pub fn running(&self) -> Option<PieceColor> {
        self.running.map(|(color, _)| color)
    }

    /// Start `color`'s clock. Any other running clock is stopped first.
    pub fn start(&mut self, color: PieceColor, now: Instant) {
        self.stop(now);
        self.running = Some((color, now));
    }

    /// Stop whichever clock is running, debiting its elapsed time.
    pub fn stop(&mut self, now: Instant) {
        if let Some((color, since)) = self.running.take() {
            let slot = &mut self.remaining_ms[color.index()];
            *slot = slot.saturating_sub(elapsed_ms(since, now));
        }
    }

    /// Remaining time for `color` as of `now`, counting a running clock.
    pub fn remaining(&self, color: PieceColor, now: Instant) -> u64 {
        let stored = self.remaining_ms[color.index()];
        match self.running {
            Some((running, since)) if running == color => {
                stored.saturating_sub(elapsed_ms(since, now))
            }
            _ => stored,
        }
    }

    /// Settle `color`'s clock for a completed move and stop it:
    /// `remaining - elapsed + bonus`. A move that arrives with no time left
    /// zeroes the clock and reports [`Flagged`] instead of crediting a bonus.
    pub fn apply_move(&mut self, color: PieceColor, now: Instant) -> Result<u64, Flagged> {
        let left = self.remaining(color, now);
        if self.running() == Some(color) {
            self.running = None;
        }
        let slot = &mut self.remaining_ms[color.index()];
        if left == 0 {
            *slot = 0;
            return Err(Flagged);
        }
        *slot = left + self.bonus_ms;
        Ok(*slot)
    }

    /// Zero `color`'s clock and stop it.
    pub fn flag(&mut self, color: PieceColor) {
        self.remaining_ms[color.index()] = 0;
        if self.running() == Some(color) {
            self.running = None;
        }
    }

    /// Instant at which the running clock reaches zero.
    pub fn deadline(&self) -> Option<Instant> {
        self.running.map(|(color, since)| {
            since + Duration::from_millis(self.remaining_ms[color.index()])
        })
    }
}

fn elapsed_ms(since: Instant, now: Instant) -> u64 {
    u64::try_from(now.saturating_duration_since(since).as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    #[test]
    fn test_new_clock_is_idle() {
        let clock = Clock::new(60_000, 0);
        let now = Instant::now();
        assert_eq!(clock.running(), None);
        assert_eq!(clock.deadline(), None);
        assert_eq!(clock.remaining(PieceColor::White, now), 60_000);
        assert_eq!(clock.remaining(PieceColor::Black, now), 60_000);
    }

    #[test]
    fn test_running_side_counts_down() {
        let t0 = Instant::now();
        let mut clock = Clock::new(60_000, 0);
        clock.start(PieceColor::White, t0);
        assert_eq!(clock.remaining(PieceColor::White, t0 + 5 * SEC), 55_000);
        assert_eq!(clock.remaining(PieceColor::Black, t0 + 5 * SEC), 60_000);
        assert_eq!(clock.deadline(), Some(t0 + 60 * SEC));
    }

    #[test]
    fn test_apply_move_credits_bonus() {
        let t0 = Instant::now();
        let mut clock = Clock::new(60_000, 2_000);
        clock.start(PieceColor::White, t0);
        let left = clock.apply_move(PieceColor::White, t0 + 3 * SEC).unwrap();
        assert_eq!(left, 59_000);
        assert_eq!(clock.running(), None);
        assert_eq!(clock.remaining(PieceColor::White, t0 + 10 * SEC), 59_000);
    }

    #[test]
    fn test_apply_move_after_flag_fall() {
        let t0 = Instant::now();
        let mut clock = Clock::new(1_000, 5_000);
        clock.start(PieceColor::Black, t0);
        assert_eq!(
            clock.apply_move(PieceColor::Black, t0 + 2 * SEC),
            Err(Flagged)
        );
        assert_eq!(clock.remaining(PieceColor::Black, t0 + 2 * SEC), 0);
    }

    #[test]
    fn test_exactly_zero_is_flagged() {
        let t0 = Instant::now();
        let mut clock = Clock::new(1_000, 0);
        clock.start(PieceColor::White, t0);
        assert_eq!(clock.apply_move(PieceColor::White, t0 + SEC), Err(Flagged));
    }

    #[test]
    fn test_start_switches_sides() {
        let t0 = Instant::now();
        let mut clock = Clock::new(10_000, 0);
        clock.start(PieceColor::White, t0);
        clock.start(PieceColor::Black, t0 + 4 * SEC);
        assert_eq!(clock.running(), Some(PieceColor::Black));
        assert_eq!(clock.remaining(PieceColor::White, t0 + 9 * SEC), 6_000);
        assert_eq!(clock.remaining(PieceColor::Black, t0 + 9 * SEC), 5_000);
    }

    #[test]
    fn test_never_negative() {
        let t0 = Instant::now();
        let mut clock = Clock::new(1_000, 0);
        clock.start(PieceColor::White, t0);
        assert_eq!(clock.remaining(PieceColor::White, t0 + 3600 * SEC), 0);
        clock.stop(t0 + 3600 * SEC);
        assert_eq!(clock.remaining(PieceColor::White, t0 + 3600 * SEC), 0);
    }

    #[test]
    fn test_flag_stops_clock() {
        let t0 = Instant::now();
        let mut clock = Clock::new(1_000, 0);
        clock.start(PieceColor::White, t0);
        clock.flag(PieceColor::White);
        assert_eq!(clock.running(), None);
        assert_eq!(clock.remaining(PieceColor::White, t0), 0);
    }
}
