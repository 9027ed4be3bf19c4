//! Conflict / back-off state
//!
//! Counts consecutive ticks on which a correction was needed. Reaching the
//! threshold means something else keeps flipping the feature back, so the
//! loop stops fighting for `backoff_ticks` and then re-probes carefully.

/// What the back-off gate allows this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Normal polling
    Proceed,
    /// Still cooling down; don't probe
    Wait,
    /// Cool-down over; probe with the streak primed at `threshold - 2`
    Reprobe,
}

/// Result of recording a needed correction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    DeclareConflict,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConflictState {
    streak: u32,
    conflict_tick: u64,
}

impl ConflictState {
    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn conflict_tick(&self) -> u64 {
        self.conflict_tick
    }

    pub fn reset(&mut self) {
        self.streak = 0;
    }

    pub fn in_backoff(&self, threshold: u32) -> bool {
        self.streak >= threshold
    }

    pub fn gate(&mut self, tick: u64, threshold: u32, backoff_ticks: u64) -> Gate {
        if !self.in_backoff(threshold) {
            return Gate::Proceed;
        }
        if tick.saturating_sub(self.conflict_tick) < backoff_ticks {
            return Gate::Wait;
        }

        // Two more needed readings in a row before conflict is declared again
        self.streak = threshold.saturating_sub(2);
        Gate::Reprobe
    }

    pub fn record_needed(&mut self, tick: u64, threshold: u32) -> Verdict {
        self.streak += 1;
        if self.streak >= threshold {
            self.conflict_tick = tick;
            Verdict::DeclareConflict
        } else {
            Verdict::Correct
        }
    }
}
