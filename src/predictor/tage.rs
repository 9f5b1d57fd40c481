//! Implementation of a "Tagged GEometric history length" (TAGE) predictor
//! for conditional branch directions.
//!
//! See the following:
//!  - "A case for (partially) TAgged GEometric history length branch
//!  prediction" (Seznec, 2006).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::branch::{BranchRecord, Outcome};
use crate::history::{HistoryRegister, PathHistoryRegister};
use crate::predictor::*;

/// An entry in a tagged direction component.
#[derive(Clone, Debug)]
pub struct TageEntry {
    /// State machine tracking a branch direction (3 bits)
    pub ctr: SaturatingCounter,

    /// Tag associated with this entry; [None] until first allocation
    pub tag: Option<u16>,

    /// The 'useful' counter (2 bits)
    pub useful: SaturatingCounter,
}
impl TageEntry {
    pub const CTR_MAX: u8 = 7;
    pub const USEFUL_MAX: u8 = 3;

    /// Get the current predicted outcome.
    pub fn predict(&self) -> Outcome {
        self.ctr.predict()
    }

    /// A newly allocated entry with no accumulated usefulness whose counter
    /// still sits at the midpoint.
    pub fn is_weak_new(&self) -> bool {
        self.useful.value() == 0 && self.ctr.is_weak()
    }
}
impl TaggedEntry for TageEntry {
    fn empty() -> Self {
        Self {
            ctr: SaturatingCounter::new(4, Self::CTR_MAX),
            tag: None,
            useful: SaturatingCounter::new(0, Self::USEFUL_MAX),
        }
    }
    fn tag(&self) -> Option<u16> { self.tag }
    fn useful(&self) -> &SaturatingCounter { &self.useful }
    fn useful_mut(&mut self) -> &mut SaturatingCounter { &mut self.useful }
}

/// Container for [TagePredictor] runtime stats.
#[derive(Clone, Debug, Default)]
pub struct TageStats {
    /// Successful allocations
    pub allocs: usize,

    /// Allocation attempts that found every candidate entry useful
    pub failed_allocs: usize,

    /// Number of useful-counter decay events
    pub decays: usize,
}

/// Container for output from [TagePredictor::predict].
///
/// Besides the predicted direction this carries everything derived from the
/// pre-update histories, which the matching [TagePredictor::update] call
/// consumes.
#[derive(Clone, Copy, Debug)]
pub struct TagePrediction {
    /// The predicted direction
    pub outcome: Outcome,

    /// Whether the record was a conditional branch; nothing is learned from
    /// records that were not
    pub(crate) conditional: bool,

    /// Branch address, for the base index and path history update
    pub(crate) address: u32,

    /// The component providing the prediction
    pub provider: Provider,

    /// The next-longest matching component
    pub alt: Provider,

    /// Index and tag computed for every tagged component
    pub(crate) lookup: TaggedLookup,

    /// Index into the base component
    pub(crate) base_idx: usize,

    /// Direction predicted by the provider
    pub(crate) provider_outcome: Outcome,

    /// Direction predicted by the alternate
    pub(crate) alt_outcome: Outcome,
}

/// The "TAgged GEometric history length" direction predictor.
pub struct TagePredictor {
    /// Base component
    pub(crate) base: BimodalTable,

    /// Tagged components, longest history first
    pub(crate) comp: Vec<TaggedComponent<TageEntry>>,

    /// Global history of branch directions
    pub(crate) ghr: HistoryRegister,

    /// Path history of branch-address low bits
    pub(crate) phr: PathHistoryRegister,

    /// How often the alternate prediction beat the provider
    pub(crate) alt_better_count: SaturatingCounter,

    /// Update counter driving the periodic useful-counter decay
    pub(crate) clock: u32,

    /// Which half of the useful counters the next decay clears
    pub(crate) clock_flip: bool,

    /// Allocation bank selection; owned so a run is reproducible from the
    /// construction seed
    rng: StdRng,

    pub stat: TageStats,
}

impl TagePredictor {
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            base: BimodalTable::new(),
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
            stat: TageStats::default(),
        }
    }

    /// Try to allocate an entry in a component with a longer history than
    /// the provider, given the indices/tags captured at predict time.
    ///
    /// When every candidate entry is still useful, nothing is written and
    /// all of their useful counters are decremented instead.
    fn allocate(&mut self, lookup: &TaggedLookup, limit: usize,
        taken: Outcome)
    {
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

        // With several candidates, prefer the longest-history one with
        // probability 2/3, the next-longest otherwise.
        let chosen = if candidates.len() == 1 {
            candidates[0]
        } else {
            let r: u32 = self.rng.gen_range(0..100);
            if r > 33 { candidates[0] } else { candidates[1] }
        };

        for i in (0..=chosen).rev() {
            let entry = self.comp[i].entry_mut(lookup.idx[i]);
            if entry.useful.value() == 0 {
                entry.ctr.set(match taken {
                    Outcome::T => 4,
                    Outcome::N => 3,
                });
                entry.tag = Some(lookup.tag[i]);
                entry.useful.set(0);
                self.stat.allocs += 1;
                break;
            }
        }
    }

    /// Advance the global, folded, and path histories after a conditional
    /// branch resolves.
    fn update_history(&mut self, address: u32, taken: Outcome) {
        self.ghr.shift_in(taken.into());
        for comp in self.comp.iter_mut() {
            comp.update_history(&self.ghr);
        }
        self.phr.push(address);
    }

    /// Tick the decay clock; every [USEFUL_RESET_PERIOD] updates, clear one
    /// half of every useful counter, alternating the MSB and the LSB.
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

impl Default for TagePredictor {
    fn default() -> Self { Self::new() }
}

impl BranchPredictor for TagePredictor {
    type Prediction = TagePrediction;

    fn name(&self) -> &'static str { "TAGE" }

    fn predict(&self, record: &BranchRecord) -> TagePrediction {
        let base_idx = self.base.index(record.address);

        // Non-conditional branches resolve taken
        if !record.is_conditional() {
            return TagePrediction {
                outcome: Outcome::T,
                conditional: false,
                address: record.address,
                provider: Provider::Base,
                alt: Provider::Base,
                lookup: TaggedLookup::default(),
                base_idx,
                provider_outcome: Outcome::T,
                alt_outcome: Outcome::T,
            };
        }

        let base_outcome = self.base.predict(base_idx);
        let lookup = compute_lookup(&self.comp, record.address,
            self.phr.value());

        // The longest-history tag match provides the prediction; the next
        // match (or the base component) is the alternate.
        let provider = first_match(&self.comp, &lookup, 0);
        let alt = provider
            .and_then(|p| first_match(&self.comp, &lookup, p + 1));

        let mut result = TagePrediction {
            outcome: base_outcome,
            conditional: true,
            address: record.address,
            provider: Provider::Base,
            alt: Provider::Base,
            lookup,
            base_idx,
            provider_outcome: base_outcome,
            alt_outcome: base_outcome,
        };

        if let Some(p) = provider {
            let entry = self.comp[p].entry(lookup.idx[p]);
            result.provider = Provider::Tagged(p);
            result.provider_outcome = entry.predict();
            if let Some(a) = alt {
                result.alt = Provider::Tagged(a);
                result.alt_outcome =
                    self.comp[a].entry(lookup.idx[a]).predict();
            }

            // Trust the provider unless its entry looks newly allocated and
            // the alternate has recently been the better predictor.
            let use_alt = entry.is_weak_new()
                && self.alt_better_count.value() > ALT_BETTER_COUNT_MAX / 2;
            result.outcome = if use_alt {
                result.alt_outcome
            } else {
                result.provider_outcome
            };
        }

        result
    }

    fn update(&mut self, p: &TagePrediction, taken: Outcome, _target: u32) {
        if !p.conditional {
            return;
        }

        // Update the provider's useful counter when it disagreed with the
        // alternate, then move its direction counter toward the outcome.
        match p.provider {
            Provider::Tagged(pi) => {
                let entry = self.comp[pi].entry_mut(p.lookup.idx[pi]);
                if p.outcome != p.alt_outcome {
                    if p.outcome == taken {
                        entry.useful.increment();
                    } else {
                        entry.useful.decrement();
                    }
                }
                entry.ctr.update(taken);
            },
            Provider::Base => {
                self.base.update(p.base_idx, taken);
            },
        }

        // A provider entry that still looks newly allocated is the signal
        // for tracking whether the alternate would have done better.
        let mut new_entry = false;
        if let Provider::Tagged(pi) = p.provider {
            if self.comp[pi].entry(p.lookup.idx[pi]).is_weak_new() {
                new_entry = true;
                if p.provider_outcome != p.alt_outcome {
                    if p.alt_outcome == taken {
                        self.alt_better_count.increment();
                    } else {
                        self.alt_better_count.decrement();
                    }
                }
            }
        }

        // Allocate into a longer-history component on a misprediction,
        // unless a weak new provider entry was itself correct.
        if (!new_entry || p.provider_outcome != taken) && p.outcome != taken {
            let limit = p.provider.tables_above();
            if limit > 0 {
                self.allocate(&p.lookup, limit, taken);
            }
        }

        self.tick_decay_clock();
        self.update_history(p.address, taken);
    }
}

#[cfg(test)]
impl TagePredictor {
    pub(crate) fn check_invariants(&self) {
        for comp in self.comp.iter() {
            for entry in comp.data.iter() {
                assert!(entry.ctr.value() <= TageEntry::CTR_MAX);
                assert!(entry.useful.value() <= TageEntry::USEFUL_MAX);
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

#[cfg(test)]
mod test {
    use super::*;
    use crate::branch::BranchFlags;

    fn conditional(address: u32) -> BranchRecord {
        BranchRecord {
            address,
            opcode: 0,
            flags: BranchFlags::conditional(),
            outcome: Outcome::N,
            target: 0,
        }
    }

    fn step(tage: &mut TagePredictor, address: u32, taken: Outcome)
        -> TagePrediction
    {
        let p = tage.predict(&conditional(address));
        tage.update(&p, taken, 0);
        p
    }

    #[test]
    fn fresh_predictor_defaults() {
        let tage = TagePredictor::new();

        // Conditional: base component, weakly taken
        let p = tage.predict(&conditional(0x1000));
        assert_eq!(p.outcome, Outcome::T);
        assert!(p.provider.is_base());

        // Non-conditional: taken, no learning
        let mut r = conditional(0x1000);
        r.flags = BranchFlags::indirect();
        let p = tage.predict(&r);
        assert_eq!(p.outcome, Outcome::T);
        assert!(!p.conditional);
    }

    #[test]
    fn single_taken_branch_strengthens_bimodal() {
        let mut tage = TagePredictor::new();
        let p = step(&mut tage, 0x1000, Outcome::T);
        assert_eq!(p.outcome, Outcome::T);
        assert!(p.provider.is_base());

        let idx = tage.base.index(0x1000);
        assert_eq!(tage.base.counter(idx).value(), 3);
        // Correct prediction: nothing to allocate
        assert_eq!(tage.stat.allocs, 0);
        tage.check_invariants();
    }

    #[test]
    fn non_conditional_update_changes_nothing() {
        let mut tage = TagePredictor::new();
        let mut r = conditional(0x1000);
        r.flags = BranchFlags::indirect();
        let p = tage.predict(&r);
        tage.update(&p, Outcome::T, 0x2000);
        assert_eq!(tage.clock, 0);
        let idx = tage.base.index(0x1000);
        assert_eq!(tage.base.counter(idx).value(), 2);
    }

    #[test]
    fn alternating_outcomes_oscillate_around_weakly_taken() {
        let mut tage = TagePredictor::new();
        for i in 0..10 {
            let taken = if i % 2 == 0 { Outcome::T } else { Outcome::N };
            step(&mut tage, 0x4044, taken);

            let idx = tage.base.index(0x4044);
            let ctr = tage.base.counter(idx).value();
            assert!((1..=3).contains(&ctr), "ctr {} left the weak band", ctr);
        }
        tage.check_invariants();
    }

    #[test]
    fn well_behaved_branches_never_mispredict() {
        let mut tage = TagePredictor::new();
        // Distinct base slots, all taken: the initial weakly-taken counters
        // already predict every one of them
        for i in 0..16u32 {
            let address = 0x8000 + i * 4;
            let p = step(&mut tage, address, Outcome::T);
            assert_eq!(p.outcome, Outcome::T);

            let idx = tage.base.index(address);
            assert_eq!(tage.base.counter(idx).value(), 3);
        }
        assert_eq!(tage.stat.allocs, 0);
        assert_eq!(tage.stat.failed_allocs, 0);
        tage.check_invariants();
    }

    #[test]
    fn misprediction_with_base_provider_allocates() {
        let mut tage = TagePredictor::new();
        // Weakly taken base says taken; the branch is not
        step(&mut tage, 0x77f0, Outcome::N);
        assert_eq!(tage.stat.allocs, 1);

        // The allocated entry starts weak in the not-taken direction
        let allocated: Vec<&TageEntry> = tage.comp.iter()
            .flat_map(|c| c.data.iter())
            .filter(|e| e.tag.is_some())
            .collect();
        assert_eq!(allocated.len(), 1);
        assert_eq!(allocated[0].ctr.value(), 3);
        assert_eq!(allocated[0].useful.value(), 0);
        tage.check_invariants();
    }

    #[test]
    fn provider_counter_locks_monotonically() {
        let mut tage = TagePredictor::new();

        // An always-taken warmup saturates the global and path histories,
        // after which the lookup for this address is stationary.
        for _ in 0..200 {
            step(&mut tage, 0x5550, Outcome::T);
        }

        // Plant a provider entry that contradicts the stationary outcome
        let p = tage.predict(&conditional(0x5550));
        let idx = p.lookup.idx[0];
        {
            let entry = tage.comp[0].entry_mut(idx);
            entry.tag = Some(p.lookup.tag[0]);
            entry.ctr.set(0);
            entry.useful.set(1);
        }

        let mut last = 0;
        for _ in 0..12 {
            let p = tage.predict(&conditional(0x5550));
            assert!(matches!(p.provider, Provider::Tagged(0)));
            tage.update(&p, Outcome::T, 0);

            let ctr = tage.comp[0].entry(idx).ctr.value();
            assert!(ctr >= last, "counter moved backwards: {} -> {}",
                last, ctr);
            last = ctr;
        }
        assert_eq!(last, TageEntry::CTR_MAX);
        tage.check_invariants();
    }

    #[test]
    fn all_useful_candidates_decrement_without_allocating() {
        let mut tage = TagePredictor::new();

        // Install a provider in the shortest-history component predicting
        // strongly not-taken, and make every longer-history candidate
        // useful.
        let p = tage.predict(&conditional(0x9000));
        let idx3 = p.lookup.idx[3];
        {
            let entry = tage.comp[3].entry_mut(idx3);
            entry.tag = Some(p.lookup.tag[3]);
            entry.ctr.set(0);
            entry.useful.set(1);
        }
        let mut tags = Vec::new();
        for i in 0..3 {
            let entry = tage.comp[i].entry_mut(p.lookup.idx[i]);
            entry.useful.set(3);
            tags.push(entry.tag);
        }

        let p = tage.predict(&conditional(0x9000));
        assert!(matches!(p.provider, Provider::Tagged(3)));
        assert!(p.alt.is_base());
        assert_eq!(p.outcome, Outcome::N);
        tage.update(&p, Outcome::T, 0);

        assert_eq!(tage.stat.allocs, 0);
        assert_eq!(tage.stat.failed_allocs, 1);
        for i in 0..3 {
            let entry = tage.comp[i].entry(p.lookup.idx[i]);
            assert_eq!(entry.tag, tags[i], "tag overwritten in T{}", i);
            assert_eq!(entry.useful.value(), 2);
        }
        tage.check_invariants();
    }

    #[test]
    fn decay_clock_clears_msb_then_lsb() {
        let mut tage = TagePredictor::new();
        let record = conditional(0x2004);

        for i in 0..USEFUL_RESET_PERIOD {
            // Plant useful values right before each decay boundary
            if i == USEFUL_RESET_PERIOD - 1 {
                tage.comp[1].data[17].useful.set(3);
                tage.comp[2].data[33].useful.set(2);
            }
            let p = tage.predict(&record);
            tage.update(&p, Outcome::T, 0);
        }

        assert_eq!(tage.clock, 0);
        assert!(tage.clock_flip);
        assert_eq!(tage.stat.decays, 1);
        // MSB cleared: 3 -> 1, 2 -> 0
        assert_eq!(tage.comp[1].data[17].useful.value(), 1);
        assert_eq!(tage.comp[2].data[33].useful.value(), 0);
        for comp in tage.comp.iter() {
            for entry in comp.data.iter() {
                assert!(entry.useful.value() <= 1);
            }
        }
        tage.check_invariants();

        // The next period clears the LSB instead
        tage.comp[1].data[17].useful.set(3);
        for _ in 0..USEFUL_RESET_PERIOD {
            let p = tage.predict(&record);
            tage.update(&p, Outcome::T, 0);
        }
        assert!(!tage.clock_flip);
        assert_eq!(tage.comp[1].data[17].useful.value(), 2);
    }

    #[test]
    fn clock_counts_updates() {
        let mut tage = TagePredictor::new();
        for _ in 0..100 {
            step(&mut tage, 0x1234, Outcome::T);
        }
        assert_eq!(tage.clock, 100);
    }

    #[test]
    fn same_seed_is_deterministic() {
        let mut a = TagePredictor::with_seed(7);
        let mut b = TagePredictor::with_seed(7);
        let mut rng = StdRng::seed_from_u64(99);

        for _ in 0..2000 {
            let address = rng.gen_range(0u32..0x200) * 4;
            let taken = Outcome::from(rng.gen::<bool>());
            let pa = step(&mut a, address, taken);
            let pb = b.predict(&conditional(address));
            b.update(&pb, taken, 0);
            assert_eq!(pa.outcome, pb.outcome);
        }
        assert_eq!(a.stat.allocs, b.stat.allocs);
        a.check_invariants();
    }
}
