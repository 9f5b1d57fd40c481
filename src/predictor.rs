//! Implementations of the branch predictors.

pub mod base;
pub mod composite;
pub mod counter;
pub mod ittage;
pub mod table;
pub mod tage;

pub use base::*;
pub use composite::*;
pub use counter::*;
pub use ittage::*;
pub use table::*;
pub use tage::*;

use crate::branch::{BranchRecord, Outcome};

/// Number of tagged components in each predictor.
pub const NUM_TAGGED_TABLES: usize = 4;

/// log2 of the number of entries in a tagged component.
pub const TAGGED_LOG2_SIZE: usize = 12;

/// log2 of the number of entries in a base component.
pub const BASE_LOG2_SIZE: usize = 14;

/// Number of tag bits in a tagged entry.
pub const TAG_BITS: usize = 9;

/// Output widths of the two per-component tag folds.
pub const TAG_FOLD_BITS: [usize; 2] = [9, 8];

/// Geometric history lengths, longest first (T0 observes the most history).
pub const GEOMETRIC_LENGTHS: [usize; NUM_TAGGED_TABLES] = [130, 44, 15, 5];

/// Global history register length: the longest geometric length plus one
/// slack bit, so the bit leaving the longest window is always readable.
pub const GHR_BITS: usize = 131;

/// Saturation point of the alternate-was-better counter.
pub const ALT_BETTER_COUNT_MAX: u8 = 15;

/// Number of updates between useful-counter decay events.
pub const USEFUL_RESET_PERIOD: u32 = 1 << 18;

/// Interface to a predictor that consumes branch records, emits a prediction
/// per record, and is then updated with the resolved outcome.
///
/// The prediction value doubles as the update handle: everything derived at
/// predict time (provider, alternate, per-component indices and tags) is
/// carried inside it, because the histories have not yet advanced and the
/// derivation cannot be repeated during `update`.
pub trait BranchPredictor {
    /// The prediction/update-handle type.
    type Prediction;

    fn name(&self) -> &'static str;

    /// Make a prediction for the provided record.
    fn predict(&self, record: &BranchRecord) -> Self::Prediction;

    /// Given the prediction for a record and the resolved outcome and
    /// target, update the state of the predictor.
    fn update(&mut self, prediction: &Self::Prediction,
        taken: Outcome, target: u32);
}

/// Identifies the component supplying a prediction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    /// The base component
    Base,

    /// A tagged component
    Tagged(usize),
}
impl Provider {
    /// Number of components with a longer history than the provider; these
    /// are the candidates for allocating a replacement entry.
    pub fn tables_above(&self) -> usize {
        match self {
            Self::Base => NUM_TAGGED_TABLES,
            Self::Tagged(idx) => *idx,
        }
    }

    pub fn is_base(&self) -> bool {
        matches!(self, Self::Base)
    }
}
