//! Machinery shared by the tagged components of the TAGE-family predictors.

use crate::history::{FoldedHistoryRegister, HistoryRegister};
use crate::predictor::*;

/// Interface to an entry in a tagged component.
///
/// The direction predictor and the target predictor store different payloads
/// but share tag matching, the useful counter, and the decay policy.
pub trait TaggedEntry: Clone {
    /// Entry state for a component with no recorded branches.
    fn empty() -> Self;

    /// The stored tag, if the entry has been allocated.
    fn tag(&self) -> Option<u16>;

    /// The 'useful' counter, used to decide when the entry is eligible to be
    /// replaced.
    fn useful(&self) -> &SaturatingCounter;
    fn useful_mut(&mut self) -> &mut SaturatingCounter;

    /// Returns true if the provided tag matches this entry.
    fn tag_matches(&self, tag: u16) -> bool {
        self.tag() == Some(tag)
    }
}

/// A tagged component: a table of entries plus the folded-history registers
/// feeding its index and tag hashes.
#[derive(Clone, Debug)]
pub struct TaggedComponent<E: TaggedEntry> {
    /// Length of the global-history window observed by this component
    pub geom_length: usize,

    /// Table of entries
    pub data: Vec<E>,

    /// Folded global history for the index hash
    pub index_fold: FoldedHistoryRegister,

    /// Folded global history for the tag hash (two independent widths)
    pub tag_folds: [FoldedHistoryRegister; 2],
}
impl<E: TaggedEntry> TaggedComponent<E> {
    pub fn new(geom_length: usize) -> Self {
        Self {
            geom_length,
            data: vec![E::empty(); 1 << TAGGED_LOG2_SIZE],
            index_fold: FoldedHistoryRegister::new(
                geom_length, TAGGED_LOG2_SIZE,
            ),
            tag_folds: [
                FoldedHistoryRegister::new(geom_length, TAG_FOLD_BITS[0]),
                FoldedHistoryRegister::new(geom_length, TAG_FOLD_BITS[1]),
            ],
        }
    }

    pub fn index_mask(&self) -> usize {
        (1 << TAGGED_LOG2_SIZE) - 1
    }

    pub fn entry(&self, idx: usize) -> &E {
        &self.data[idx & self.index_mask()]
    }

    pub fn entry_mut(&mut self, idx: usize) -> &mut E {
        let mask = self.index_mask();
        &mut self.data[idx & mask]
    }

    /// Tag hash for this component: `pc ^ fold0 ^ (fold1 << 1)`, cropped to
    /// the tag width.
    pub fn tag_hash(&self, pc: u32) -> u16 {
        let x = pc as usize
            ^ self.tag_folds[0].value()
            ^ (self.tag_folds[1].value() << 1);
        (x & ((1 << TAG_BITS) - 1)) as u16
    }

    /// Propagate a global-history shift into the folded registers.
    pub fn update_history(&mut self, ghr: &HistoryRegister) {
        self.index_fold.update(ghr);
        self.tag_folds[0].update(ghr);
        self.tag_folds[1].update(ghr);
    }

    /// Mask every 'useful' counter in the component (periodic decay).
    pub fn decay_useful(&mut self, mask: u8) {
        for entry in self.data.iter_mut() {
            let u = entry.useful().value();
            entry.useful_mut().set(u & mask);
        }
    }
}

/// Indices and tags computed for every tagged component of a predictor at
/// predict time. Carried into the update handle so that the update never has
/// to re-derive them from the (by then advanced) histories.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TaggedLookup {
    pub idx: [usize; NUM_TAGGED_TABLES],
    pub tag: [u16; NUM_TAGGED_TABLES],
}

/// Index hash for component `slot`. Longer-history components mix in more
/// of the path history.
fn component_index(slot: usize, pc: u32, fold: usize, phr: u16) -> usize {
    let pc = pc as usize;
    let phr = phr as usize;
    let x = match slot {
        0 => pc ^ (pc >> TAGGED_LOG2_SIZE) ^ fold
            ^ phr ^ (phr >> TAGGED_LOG2_SIZE),
        1 => pc ^ (pc >> (TAGGED_LOG2_SIZE - 1)) ^ fold ^ phr,
        2 => pc ^ (pc >> (TAGGED_LOG2_SIZE - 2)) ^ fold ^ (phr & 31),
        _ => pc ^ (pc >> (TAGGED_LOG2_SIZE - 3)) ^ fold ^ (phr & 7),
    };
    x & ((1 << TAGGED_LOG2_SIZE) - 1)
}

/// Compute the index and tag for every component.
pub fn compute_lookup<E: TaggedEntry>(
    comp: &[TaggedComponent<E>], pc: u32, phr: u16,
) -> TaggedLookup {
    let mut lookup = TaggedLookup::default();
    for (i, c) in comp.iter().enumerate() {
        lookup.idx[i] = component_index(i, pc, c.index_fold.value(), phr);
        lookup.tag[i] = c.tag_hash(pc);
    }
    lookup
}

/// Find the first component at or after `from` whose indexed entry matches
/// its computed tag. Components are ordered longest-history first, so the
/// result is the longest-history match.
pub fn first_match<E: TaggedEntry>(
    comp: &[TaggedComponent<E>], lookup: &TaggedLookup, from: usize,
) -> Option<usize> {
    (from..comp.len())
        .find(|&i| comp[i].entry(lookup.idx[i]).tag_matches(lookup.tag[i]))
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Clone, Debug)]
    struct TestEntry {
        tag: Option<u16>,
        useful: SaturatingCounter,
    }
    impl TaggedEntry for TestEntry {
        fn empty() -> Self {
            Self { tag: None, useful: SaturatingCounter::new(0, 3) }
        }
        fn tag(&self) -> Option<u16> { self.tag }
        fn useful(&self) -> &SaturatingCounter { &self.useful }
        fn useful_mut(&mut self) -> &mut SaturatingCounter {
            &mut self.useful
        }
    }

    fn components() -> Vec<TaggedComponent<TestEntry>> {
        GEOMETRIC_LENGTHS.iter().map(|g| TaggedComponent::new(*g)).collect()
    }

    #[test]
    fn empty_entries_never_match() {
        let comp = components();
        let lookup = compute_lookup(&comp, 0x1000, 0);
        // A fresh table has no tags, including tag hash 0
        assert_eq!(first_match(&comp, &lookup, 0), None);
        assert_eq!(lookup.tag[0], 0);
    }

    #[test]
    fn match_order_is_longest_history_first() {
        let mut comp = components();
        let lookup = compute_lookup(&comp, 0xdead_beef, 0x55);
        comp[1].entry_mut(lookup.idx[1]).tag = Some(lookup.tag[1]);
        comp[3].entry_mut(lookup.idx[3]).tag = Some(lookup.tag[3]);

        assert_eq!(first_match(&comp, &lookup, 0), Some(1));
        assert_eq!(first_match(&comp, &lookup, 2), Some(3));
        assert_eq!(first_match(&comp, &lookup, 4), None);
    }

    #[test]
    fn indices_and_tags_fit_their_widths() {
        let comp = components();
        for pc in [0u32, 1, 0x1000, 0xffff_ffff, 0x8000_0001] {
            let lookup = compute_lookup(&comp, pc, 0xffff);
            for i in 0..NUM_TAGGED_TABLES {
                assert!(lookup.idx[i] < (1 << TAGGED_LOG2_SIZE));
                assert!(lookup.tag[i] < (1 << TAG_BITS));
            }
        }
    }

    #[test]
    fn decay_masks_useful_counters() {
        let mut comp = components();
        comp[0].data[7].useful.set(3);
        comp[0].data[9].useful.set(2);
        comp[0].decay_useful(0b01);
        assert_eq!(comp[0].data[7].useful.value(), 1);
        assert_eq!(comp[0].data[9].useful.value(), 0);
    }
}
