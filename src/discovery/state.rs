/// Outcome of feeding one entity count into [`DiscoveryState::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Grew { count: usize },
    Stalled { attempt: u32 },
    Exhausted,
}

/// Loop-local bookkeeping for one discovery run. Owned by the driving loop,
/// never shared.
#[derive(Debug)]
pub struct DiscoveryState {
    stall_threshold: u32,
    previous_count: usize,
    stall_attempts: u32,
    ticks: u32,
}

impl DiscoveryState {
    pub fn new(stall_threshold: u32) -> Self {
        Self {
            stall_threshold,
            previous_count: 0,
            stall_attempts: 0,
            ticks: 0,
        }
    }

    /// Record the count seen after one reveal action.
    ///
    /// An unchanged count is a stall; any change (including a drop) resets the
    /// stall run. `Exhausted` is returned once `stall_threshold` stalls in a
    /// row have been seen.
    pub fn observe(&mut self, current: usize) -> Observation {
        self.ticks += 1;

        if current == self.previous_count {
            self.stall_attempts += 1;
        } else {
            self.stall_attempts = 0;
        }

        if self.stall_attempts >= self.stall_threshold {
            return Observation::Exhausted;
        }

        let grew = self.stall_attempts == 0;
        self.previous_count = current;
        if grew {
            Observation::Grew { count: current }
        } else {
            Observation::Stalled {
                attempt: self.stall_attempts,
            }
        }
    }

    /// A failed count query: treated as no growth.
    pub fn observe_unknown(&mut self) -> Observation {
        self.observe(self.previous_count)
    }

    pub fn count(&self) -> usize {
        self.previous_count
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn stall_threshold(&self) -> u32 {
        self.stall_threshold
    }
}
