//! Coalescing trigger
//!
//! Bursts of DOM mutations collapse into one scan. Each `poke` re-arms a
//! single pending invocation; the timer that eventually fires presents its
//! ticket, and only the latest ticket is honoured.

/// Identifies one arming of the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Debounce state with injected time.
#[derive(Debug, Clone)]
pub struct CoalescingTrigger {
    quiet_ms: u64,
    generation: u64,
    deadline: Option<u64>,
}

impl CoalescingTrigger {
    pub fn new(quiet_ms: u64) -> Self {
        Self {
            quiet_ms,
            generation: 0,
            deadline: None,
        }
    }

    pub fn quiet_ms(&self) -> u64 {
        self.quiet_ms
    }

    /// Re-arm: the pending invocation moves to `now + quiet`. Any earlier
    /// ticket becomes stale.
    pub fn poke(&mut self, now: u64) -> Ticket {
        self.generation = self.generation.wrapping_add(1);
        self.deadline = Some(now.saturating_add(self.quiet_ms));
        Ticket(self.generation)
    }

    /// Called by the timer scheduled for `ticket`. Returns true (and disarms)
    /// only for the latest ticket while armed.
    pub fn fire(&mut self, ticket: Ticket) -> bool {
        if self.deadline.is_none() || ticket.0 != self.generation {
            return false;
        }
        self.deadline = None;
        true
    }

    /// Polling variant: true (and disarms) once the quiet period has elapsed.
    pub fn due(&mut self, now: u64) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }
}
