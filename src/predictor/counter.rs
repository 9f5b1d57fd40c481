//! Implementation of a saturating counter.

use crate::branch::Outcome;

/// An unsigned saturating counter with an inclusive upper bound.
///
/// The counter predicts taken in the upper half of its range; for a 3-bit
/// counter (max 7) that is values 4..=7, for a 2-bit counter (max 3) values
/// 2..=3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaturatingCounter {
    val: u8,
    max: u8,
}
impl SaturatingCounter {
    pub fn new(val: u8, max: u8) -> Self {
        assert!(val <= max);
        Self { val, max }
    }

    pub fn value(&self) -> u8 { self.val }
    pub fn max(&self) -> u8 { self.max }

    /// Get the current predicted outcome.
    pub fn predict(&self) -> Outcome {
        Outcome::from(self.val > self.max / 2)
    }

    /// Returns true when the counter sits in one of the two states around
    /// the midpoint (a freshly allocated entry starts here).
    pub fn is_weak(&self) -> bool {
        self.val == self.max / 2 || self.val == self.max / 2 + 1
    }

    pub fn increment(&mut self) {
        if self.val < self.max {
            self.val += 1;
        }
    }

    pub fn decrement(&mut self) {
        if self.val > 0 {
            self.val -= 1;
        }
    }

    /// Move the counter toward the resolved outcome.
    pub fn update(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::T => self.increment(),
            Outcome::N => self.decrement(),
        }
    }

    /// Replace the value, clamping into range.
    pub fn set(&mut self, val: u8) {
        self.val = val.min(self.max);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn saturation() {
        let mut c = SaturatingCounter::new(2, 3);
        c.increment();
        c.increment();
        assert_eq!(c.value(), 3);
        for _ in 0..8 {
            c.decrement();
        }
        assert_eq!(c.value(), 0);
    }

    #[test]
    fn midpoint_threshold() {
        // 3-bit counter: 0..=3 predict not-taken, 4..=7 predict taken
        assert_eq!(SaturatingCounter::new(3, 7).predict(), Outcome::N);
        assert_eq!(SaturatingCounter::new(4, 7).predict(), Outcome::T);
        // 2-bit counter: 0..=1 not-taken, 2..=3 taken
        assert_eq!(SaturatingCounter::new(1, 3).predict(), Outcome::N);
        assert_eq!(SaturatingCounter::new(2, 3).predict(), Outcome::T);
    }

    #[test]
    fn weak_states() {
        assert!(SaturatingCounter::new(3, 7).is_weak());
        assert!(SaturatingCounter::new(4, 7).is_weak());
        assert!(!SaturatingCounter::new(2, 7).is_weak());
        assert!(!SaturatingCounter::new(5, 7).is_weak());
    }
}
