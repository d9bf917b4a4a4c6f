use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DotKind {
    Confirmed,
    Pending,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dot {
    pub kind: DotKind,
    pub excess: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decomposition {
    pub confirmed_filled: u32,
    pub pending_shown: u32,
    pub empty_remaining: u32,
    /// Index of the first filled unit past the goal, if any unit is.
    pub excess_from: Option<u32>,
}

impl Decomposition {
    pub fn total_shown(&self) -> u32 {
        self.confirmed_filled.saturating_add(self.pending_shown)
    }

    pub fn is_excess(&self, index: u32) -> bool {
        self.excess_from.is_some_and(|from| index >= from)
    }

    pub fn excess_count(&self) -> u32 {
        self.excess_from
            .map_or(0, |from| self.total_shown().saturating_sub(from))
    }

    /// Dots in drawing order: confirmed, pending, then empty goal slots.
    pub fn dots(&self) -> impl Iterator<Item = Dot> + '_ {
        let filled = (0..self.total_shown()).map(move |index| Dot {
            kind: if index < self.confirmed_filled {
                DotKind::Confirmed
            } else {
                DotKind::Pending
            },
            excess: self.is_excess(index),
        });
        let empty = (0..self.empty_remaining).map(|_| Dot {
            kind: DotKind::Empty,
            excess: false,
        });
        filled.chain(empty)
    }
}

/// Splits a counter into the segments drawn for it.
///
/// A pending decrease turns confirmed units into pending ones rather than
/// adding units. A goal of zero disables empty slots and excess marking.
pub fn decompose(committed_count: u32, pending_delta: i64, goal: u32) -> Decomposition {
    let (confirmed_filled, pending_shown) = if pending_delta < 0 {
        let pending = clamp_u32(pending_delta.unsigned_abs());
        if pending > committed_count {
            // A decrease raced with a stale, lower base.
            warn!(
                committed_count,
                pending_delta, "pending decrease exceeds committed count, clamping to zero"
            );
        }
        (committed_count.saturating_sub(pending), pending)
    } else {
        (committed_count, clamp_u32(pending_delta.unsigned_abs()))
    };

    let total_shown = confirmed_filled.saturating_add(pending_shown);
    let (empty_remaining, excess_from) = if goal == 0 {
        (0, None)
    } else {
        (
            goal.saturating_sub(total_shown),
            (total_shown > goal).then_some(goal),
        )
    };

    Decomposition {
        confirmed_filled,
        pending_shown,
        empty_remaining,
        excess_from,
    }
}

fn clamp_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
