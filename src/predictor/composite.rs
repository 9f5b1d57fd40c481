//! The composite predictor: a direction predictor and a target predictor
//! behind a single predict/update interface.

use crate::branch::{BranchRecord, Outcome};
use crate::predictor::*;

/// Output of [CompositePredictor::predict]: the direction comes from the
/// TAGE side, the target from the ITTAGE side. The sub-predictor lookup
/// state rides along for the matching update.
#[derive(Clone, Copy, Debug)]
pub struct Prediction {
    pub(crate) tage: TagePrediction,
    pub(crate) ittage: IttagePrediction,
}
impl Prediction {
    /// The predicted direction (taken for non-conditional records).
    pub fn direction(&self) -> Outcome {
        self.tage.outcome
    }

    /// The predicted target (0 for non-indirect records).
    pub fn target(&self) -> u32 {
        self.ittage.target
    }
}

/// Composition of a TAGE direction predictor and an ITTAGE target predictor.
///
/// Conditional records train the direction side and indirect records the
/// target side; a record may be both. The two sides keep fully separate
/// global, folded, and path histories.
pub struct CompositePredictor {
    pub tage: TagePredictor,
    pub ittage: IttagePredictor,
}
impl CompositePredictor {
    pub fn new() -> Self {
        Self {
            tage: TagePredictor::new(),
            ittage: IttagePredictor::new(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            tage: TagePredictor::with_seed(seed),
            ittage: IttagePredictor::with_seed(seed),
        }
    }
}
impl Default for CompositePredictor {
    fn default() -> Self { Self::new() }
}

impl BranchPredictor for CompositePredictor {
    type Prediction = Prediction;

    fn name(&self) -> &'static str { "TAGE+ITTAGE" }

    fn predict(&self, record: &BranchRecord) -> Prediction {
        Prediction {
            tage: self.tage.predict(record),
            ittage: self.ittage.predict(record),
        }
    }

    fn update(&mut self, p: &Prediction, taken: Outcome, target: u32) {
        self.tage.update(&p.tage, taken, target);
        self.ittage.update(&p.ittage, taken, target);
    }
}
