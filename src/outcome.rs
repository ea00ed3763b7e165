use std::sync::atomic::{AtomicU8, Ordering};

#[repr(u8)]
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub(crate) enum Outcome {
    Undecided = 0,
    Success = 1,
    Fail = 2,
}

impl Outcome {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Outcome::Undecided,
            1 => Outcome::Success,
            2 => Outcome::Fail,
            _ => unreachable!("corrupted outcome: {}", raw),
        }
    }

    /// Panics if called on an outcome nobody has decided yet.
    pub fn succeeded(self) -> bool {
        match self {
            Outcome::Success => true,
            Outcome::Fail => false,
            Outcome::Undecided => unreachable!("operation record completed while undecided"),
        }
    }
}

/// Status word of an operation record. Moves from `Undecided` to a final
/// outcome exactly once.
pub(crate) struct AtomicOutcome(AtomicU8);

impl AtomicOutcome {
    pub fn new() -> Self {
        Self(AtomicU8::new(Outcome::Undecided as u8))
    }

    pub fn load(&self) -> Outcome {
        Outcome::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn compare_exchange(&self, expected: Outcome, new: Outcome) -> Result<Outcome, Outcome> {
        self.0
            .compare_exchange(expected as u8, new as u8, Ordering::SeqCst, Ordering::SeqCst)
            .map(Outcome::from_u8)
            .map_err(Outcome::from_u8)
    }

    // returns whichever outcome won
    pub fn decide(&self, outcome: Outcome) -> Outcome {
        debug_assert_ne!(outcome, Outcome::Undecided);
        match self.compare_exchange(Outcome::Undecided, outcome) {
            Ok(_) => outcome,
            Err(decided) => decided,
        }
    }
}

impl Default for AtomicOutcome {
    fn default() -> Self {
        Self::new()
    }
}
