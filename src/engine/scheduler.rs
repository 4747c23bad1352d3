//! Single-slot cooperative scheduler.
//!
//! Time is a millisecond counter supplied by the caller. The active protocol
//! returns a delay from each invocation and the scheduler turns it into the
//! next deadline; nothing else owns timing state.

/// One timer slot plus the last observed time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scheduler {
    now_ms: u64,
    deadline_ms: Option<u64>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last observed time.
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Move the clock forward. Earlier times are ignored.
    pub fn advance_to(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    /// Arm the slot `delay_ms` after the current time, replacing any pending
    /// deadline. Returns the new deadline.
    pub fn arm_after(&mut self, delay_ms: u16) -> u64 {
        let deadline = self.now_ms + u64::from(delay_ms);
        self.deadline_ms = Some(deadline);
        deadline
    }

    pub fn cancel(&mut self) {
        self.deadline_ms = None;
    }

    pub fn deadline(&self) -> Option<u64> {
        self.deadline_ms
    }

    /// Consume the deadline if it has been reached.
    pub fn take_due(&mut self) -> bool {
        match self.deadline_ms {
            Some(deadline) if deadline <= self.now_ms => {
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }
}
