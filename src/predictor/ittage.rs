//! Implementation of an "Indirect-Target TAGE" (ITTAGE) predictor.
//!
//! Same skeleton as the direction predictor: a base table backed by four
//! tagged components with geometric history lengths. Entries store a full
//! target address with a confidence counter instead of a direction counter,
//! and the global history records target low bits instead of outcomes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::branch::BranchRecord;
use crate::branch::Outcome;
use crate::history::{HistoryRegister, PathHistoryRegister};
use crate::predictor::*;

/// An entry in a tagged target component.
#[derive(Clone, Debug)]
pub struct IttageEntry {
    /// Predicted target address
    pub target: u32,

    /// Tag associated with this entry; [None] until first allocation
    pub tag: Option<u16>,

    /// Confidence in the stored target (2 bits)
    pub conf: SaturatingCounter,

    /// The 'useful' counter (2 bits)
    pub useful: SaturatingCounter,
}
impl IttageEntry {
    pub const CONF_MAX: u8 = 3;
    pub const USEFUL_MAX: u8 = 3;
}
impl TaggedEntry for IttageEntry {
    fn empty() -> Self {
        Self {
            target: 0,
            tag: None,
            conf: SaturatingCounter::new(0, Self::CONF_MAX),
            useful: SaturatingCounter::new(0, Self::USEFUL_MAX),
        }
    }
    fn tag(&self) -> Option<u16> { self.tag }
    fn useful(&self) -> &SaturatingCounter { &self.useful }
    fn useful_mut(&mut self) -> &mut SaturatingCounter { &mut self.useful }
}

/// Container for [IttagePredictor] runtime stats.
#[derive(Clone, Debug, Default)]
pub struct IttageStats {
    /// Successful allocations
    pub allocs: usize,

    /// Allocation attempts that found every candidate entry useful
    pub failed_allocs: usize,

    /// Number of useful-counter decay events
    pub decays: usize,
}

/// Container for output from [IttagePredictor::predict], carrying the
/// predicted target and the lookup state its update consumes.
#[derive(Clone, Copy, Debug)]
pub struct IttagePrediction {
    /// The predicted target (0 when nothing is known, or for non-indirect
    /// records)
    pub target: u32,

    /// Whether the record was an indirect branch
    pub(crate) indirect: bool,

    /// Branch address, for the base index and path history update
    pub(crate) address: u32,

    /// The component providing the prediction
    pub provider: Provider,

    /// Index and tag computed for every tagged component
    pub(crate) lookup: TaggedLookup,

    /// Index into the base component
    pub(crate) base_idx: usize,

    /// Target predicted by the provider (the base table's target when no
    /// component matched)
    pub(crate) provider_target: u32,

    /// Target predicted by the alternate
    pub(crate) alt_target: u32,
}

/// The indirect-target analog of the TAGE predictor.
pub struct IttagePredictor {
    /// Base component: last observed target per slot
    pub(crate) base: TargetTable,

    /// Tagged components, longest history first
    pub(crate) comp: Vec<TaggedComponent<IttageEntry>>,

    /// Global history of target low bits
    pub(crate) ghr: HistoryRegister,

    /// Path history of branch-address low bits
    pub(crate) phr: PathHistoryRegister,

    /// How often the alternate prediction beat the provider
    pub(crate) alt_better_count: SaturatingCounter,

    /// Update counter driving the periodic useful-counter decay
    pub(crate) clock: u32,

    /// Which half of the useful counters the next decay clears
    pub(crate) clock_flip: bool,

    /// Allocation bank selection
    rng: StdRng,

    pub stat: IttageStats,
}

impl IttagePredictor {
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            base: TargetTable::new(),
            comp: GEOMETRIC_LENGTHS.iter()
                .map(|g| TaggedComponent::new(*g))
                .collect(),
            ghr: HistoryRegister::new(GHR_BITS),
            phr: PathHistoryRegister::new(),
            alt_better_count: SaturatingCounter::new(
                (ALT_BETTER_COUNT_MAX + 1) / 2, ALT_BETTER_COUNT_MAX,
            ),
            clock: 0,
            clock_flip: false,
            rng: StdRng::seed_from_u64(seed),
            stat: IttageStats::default(),
        }
    }

    /// Allocation mirrors the direction predictor, but a fresh entry records
    /// the resolved target with low confidence.
    fn allocate(&mut self, lookup: &TaggedLookup, limit: usize, target: u32) {
        let candidates: Vec<usize> = (0..limit)
            .filter(|&i| {
                self.comp[i].entry(lookup.idx[i]).useful.value() == 0
            })
            .collect();

        if candidates.is_empty() {
            for i in (0..limit).rev() {
                self.comp[i].entry_mut(lookup.idx[i]).useful.decrement();
            }
            self.stat.failed_allocs += 1;
            return;
        }

        let chosen = if candidates.len() == 1 {
            candidates[0]
        } else {
            let r: u32 = self.rng.gen_range(0..100);
            if r > 33 { candidates[0] } else { candidates[1] }
        };

        for i in (0..=chosen).rev() {
            let entry = self.comp[i].entry_mut(lookup.idx[i]);
            if entry.useful.value() == 0 {
                entry.target = target;
                entry.tag = Some(lookup.tag[i]);
                entry.conf.set(1);
                entry.useful.set(0);
                self.stat.allocs += 1;
                break;
            }
        }
    }

    /// Advance the histories; indirect branches record the low bit of the
    /// resolved target rather than a direction.
    fn update_history(&mut self, address: u32, target: u32) {
        self.ghr.shift_in(target & 1 != 0);
        for comp in self.comp.iter_mut() {
            comp.update_history(&self.ghr);
        }
        self.phr.push(address);
    }

    fn tick_decay_clock(&mut self) {
        self.clock += 1;
        if self.clock == USEFUL_RESET_PERIOD {
            self.clock = 0;
            self.clock_flip = !self.clock_flip;
            let mask = if self.clock_flip { 0b01 } else { 0b10 };
            for comp in self.comp.iter_mut() {
                comp.decay_useful(mask);
            }
            self.stat.decays += 1;
        }
    }
}

impl Default for IttagePredictor {
    fn default() -> Self { Self::new() }
}

impl BranchPredictor for IttagePredictor {
    type Prediction = IttagePrediction;

    fn name(&self) -> &'static str { "ITTAGE" }

    fn predict(&self, record: &BranchRecord) -> IttagePrediction {
        let base_idx = self.base.index(record.address);

        if !record.is_indirect() {
            return IttagePrediction {
                target: 0,
                indirect: false,
                address: record.address,
                provider: Provider::Base,
                lookup: TaggedLookup::default(),
                base_idx,
                provider_target: 0,
                alt_target: 0,
            };
        }

        let base_target = self.base.get(base_idx);
        let lookup = compute_lookup(&self.comp, record.address,
            self.phr.value());

        let provider = first_match(&self.comp, &lookup, 0);
        let alt = provider
            .and_then(|p| first_match(&self.comp, &lookup, p + 1));

        let mut result = IttagePrediction {
            target: base_target,
            indirect: true,
            address: record.address,
            provider: Provider::Base,
            lookup,
            base_idx,
            provider_target: base_target,
            alt_target: base_target,
        };

        if let Some(p) = provider {
            let entry = self.comp[p].entry(lookup.idx[p]);
            result.provider = Provider::Tagged(p);
            result.provider_target = entry.target;
            if let Some(a) = alt {
                result.alt_target = self.comp[a].entry(lookup.idx[a]).target;
            }

            // A confident provider wins outright; otherwise fall back to
            // the alternate once it has proven itself better.
            let use_provider = entry.conf.value() > 1
                || self.alt_better_count.value() <= ALT_BETTER_COUNT_MAX / 2;
            result.target = if use_provider {
                result.provider_target
            } else {
                result.alt_target
            };
        }

        result
    }

    fn update(&mut self, p: &IttagePrediction, _taken: Outcome, target: u32) {
        if !p.indirect {
            return;
        }

        match p.provider {
            Provider::Tagged(pi) => {
                let entry = self.comp[pi].entry_mut(p.lookup.idx[pi]);

                // Useful counter: did the emitted target beat the alternate?
                if p.target != p.alt_target {
                    if p.target == target {
                        entry.useful.increment();
                    } else {
                        entry.useful.decrement();
                    }
                }

                // Confidence tracks the provider's own target; once drained,
                // the stored target is replaced.
                if p.provider_target != target {
                    entry.conf.decrement();
                    if entry.conf.value() == 0 {
                        entry.target = target;
                    }
                } else {
                    entry.conf.increment();
                }
            },
            Provider::Base => {
                self.base.set(p.base_idx, target);
            },
        }

        // Track whether the alternate would have been the better choice,
        // but only while the provider entry has no accumulated usefulness.
        if let Provider::Tagged(pi) = p.provider {
            if self.comp[pi].entry(p.lookup.idx[pi]).useful.value() == 0
                && p.provider_target != p.alt_target
            {
                if p.alt_target == target {
                    self.alt_better_count.increment();
                } else {
                    self.alt_better_count.decrement();
                }
            }
        }

        // A provider-target miss asks for a longer-history entry, whether or
        // not the emitted target happened to be rescued by the alternate.
        if p.provider_target != target {
            let limit = p.provider.tables_above();
            if limit > 0 {
                self.allocate(&p.lookup, limit, target);
            }
        }

        self.tick_decay_clock();
        self.update_history(p.address, target);
    }
}

#[cfg(test)]
impl IttagePredictor {
    pub(crate) fn check_invariants(&self) {
        for comp in self.comp.iter() {
            for entry in comp.data.iter() {
                assert!(entry.conf.value() <= IttageEntry::CONF_MAX);
                assert!(entry.useful.value() <= IttageEntry::USEFUL_MAX);
                if let Some(tag) = entry.tag {
                    assert!(tag < (1 << TAG_BITS));
                }
            }
            assert!(comp.index_fold.value() < (1 << TAGGED_LOG2_SIZE));
            assert!(comp.tag_folds[0].value() < (1 << TAG_FOLD_BITS[0]));
            assert!(comp.tag_folds[1].value() < (1 << TAG_FOLD_BITS[1]));
        }
        assert!(self.alt_better_count.value() <= ALT_BETTER_COUNT_MAX);
        assert!(self.clock < USEFUL_RESET_PERIOD);
    }
}
