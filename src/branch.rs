
/// A branch outcome.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Outcome { N = 0, T = 1 }
impl std::ops::Not for Outcome {
    type Output = Self;
    fn not(self) -> Self {
        match self {
            Self::N => Self::T,
            Self::T => Self::N,
        }
    }
}
impl From<bool> for Outcome {
    fn from(x: bool) -> Self {
        match x {
            true => Self::T,
            false => Self::N,
        }
    }
}
impl From<Outcome> for bool {
    fn from(x: Outcome) -> bool {
        match x {
            Outcome::T => true,
            Outcome::N => false,
        }
    }
}

/// Attribute bits describing a branch instruction.
///
/// A branch may be both conditional and indirect (an indirect conditional
/// branch); the two bits are independent.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct BranchFlags(pub u32);
impl BranchFlags {
    /// The branch direction depends on a condition.
    pub const CONDITIONAL: u32 = 1 << 0;

    /// The branch target is computed at runtime.
    pub const INDIRECT: u32 = 1 << 1;

    pub fn new(bits: u32) -> Self { Self(bits) }

    pub fn conditional() -> Self { Self(Self::CONDITIONAL) }
    pub fn indirect() -> Self { Self(Self::INDIRECT) }

    pub fn bits(&self) -> u32 { self.0 }
    pub fn is_conditional(&self) -> bool { self.0 & Self::CONDITIONAL != 0 }
    pub fn is_indirect(&self) -> bool { self.0 & Self::INDIRECT != 0 }
}
impl std::ops::BitOr for BranchFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self { Self(self.0 | rhs.0) }
}

/// A record of branch execution.
///
/// NOTE: The field order here matches the on-disk trace record layout
/// (five little-endian 32-bit words, see [crate::trace]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchRecord {
    /// The program counter value for this branch
    pub address: u32,

    /// The instruction opcode (unused by the predictors, carried through
    /// from the trace)
    pub opcode: u32,

    /// Attribute bits for this branch
    pub flags: BranchFlags,

    /// The outcome evaluated for this branch
    pub outcome: Outcome,

    /// The target address evaluated for this branch
    pub target: u32,
}
impl BranchRecord {
    /// Returns 'true' if this is a conditional branch.
    pub fn is_conditional(&self) -> bool {
        self.flags.is_conditional()
    }

    /// Returns 'true' if this is an indirect branch.
    pub fn is_indirect(&self) -> bool {
        self.flags.is_indirect()
    }

    pub fn outcome(&self) -> Outcome { self.outcome }
    pub fn target(&self) -> u32 { self.target }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flags() {
        let both = BranchFlags::conditional() | BranchFlags::indirect();
        assert!(both.is_conditional());
        assert!(both.is_indirect());
        assert!(!BranchFlags::conditional().is_indirect());
        assert!(!BranchFlags::indirect().is_conditional());
    }

    #[test]
    fn outcome_conversions() {
        assert_eq!(Outcome::from(true), Outcome::T);
        assert_eq!(Outcome::from(false), Outcome::N);
        assert_eq!(!Outcome::T, Outcome::N);
        assert!(bool::from(Outcome::T));
    }
}
