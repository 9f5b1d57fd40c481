
use bitvec::prelude::*;
use std::ops::RangeInclusive;

/// A global history register.
///
/// Bit 0 is the newest entry; [HistoryRegister::shift_in] moves every bit
/// one position toward the oldest end and writes the new bit at index 0.
pub struct HistoryRegister {
    data: BitVec<usize, Lsb0>,
    len: usize,
}

// NOTE: This *reverses* all of the bits and presents them in a format
// where the leftmost bit is the most-significant (index n) and the rightmost
// bit is the least-significant (index 0).
impl std::fmt::Display for HistoryRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let x: String = self.data.as_bitslice().iter().by_vals()
            .map(|b| if b { '1' } else { '0' })
            .rev()
            .collect();
        write!(f, "{}", x)
    }
}

impl HistoryRegister {
    /// Create a register with the specified length in bits.
    /// All bits in the register are initialized to zero.
    pub fn new(len: usize) -> Self {
        Self {
            data: bitvec![usize, Lsb0; 0; len],
            len,
        }
    }

    pub fn len(&self) -> usize { self.len }
    pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Read a single bit.
    pub fn bit(&self, idx: usize) -> bool {
        self.data[idx]
    }

    /// Shift the register by one bit and record the newest entry at index 0.
    pub fn shift_in(&mut self, newest: bool) {
        self.data.shift_right(1);
        self.data.set(0, newest);
    }

    /// Fold [with XOR] some slice of bits.
    ///
    /// This is the reference computation for [FoldedHistoryRegister]: the
    /// slice is split into `output_bits`-wide chunks (the lowest-indexed
    /// history bits in the lowest chunk) which are all XOR'ed together.
    pub fn fold(&self, range: RangeInclusive<usize>, output_bits: usize)
        -> usize
    {
        let output_mask = (1 << output_bits) - 1;
        let slice = &self.data[range];
        slice.chunks(output_bits)
            .fold(0usize, |res, x| res ^ x.load::<usize>())
            & output_mask
    }
}

/// A circular shift register tracking a folded projection of global history.
///
/// This maintains the XOR-fold of the `geom_length` newest history bits into
/// `target_length` bits without re-reading the whole window: each time the
/// history register shifts, the newest bit enters at position 0, the bit
/// rotating past the output width wraps back to position 0, and the bit
/// falling out of the geometric window is cancelled at position
/// `geom_length % target_length`.
///
/// [FoldedHistoryRegister::update] must be called exactly once per history
/// shift, *after* the shift; skipping a shift breaks the folding identity.
#[derive(Clone, Debug)]
pub struct FoldedHistoryRegister {
    /// Length of the history window to-be-folded, in bits.
    geom_length: usize,

    /// The size of the output [in bits].
    target_length: usize,

    /// The current folded value.
    comp_hist: usize,
}
impl FoldedHistoryRegister {
    pub fn new(geom_length: usize, target_length: usize) -> Self {
        assert!(geom_length > 0 && target_length > 0);
        Self {
            geom_length,
            target_length,
            comp_hist: 0,
        }
    }

    /// Return the folded history value (always below `2^target_length`).
    pub fn value(&self) -> usize { self.comp_hist }

    pub fn geom_length(&self) -> usize { self.geom_length }
    pub fn target_length(&self) -> usize { self.target_length }

    /// Using some [HistoryRegister], update the folded history.
    ///
    /// The register must already contain the newest bit at index 0, which
    /// means `ghr.bit(geom_length)` is the bit that just left the window.
    pub fn update(&mut self, ghr: &HistoryRegister) {
        let newest = ghr.bit(0) as usize;
        let oldest = ghr.bit(self.geom_length) as usize;

        self.comp_hist = (self.comp_hist << 1) | newest;
        self.comp_hist ^=
            (self.comp_hist & (1 << self.target_length)) >> self.target_length;
        self.comp_hist ^= oldest << (self.geom_length % self.target_length);
        self.comp_hist &= (1 << self.target_length) - 1;
    }
}

/// A path history register holding the low address bit of recent branches.
#[derive(Clone, Copy, Debug, Default)]
pub struct PathHistoryRegister {
    val: u16,
}
impl PathHistoryRegister {
    pub const LEN: usize = 16;

    pub fn new() -> Self { Self { val: 0 } }

    pub fn value(&self) -> u16 { self.val }

    /// Record the low bit of a branch address.
    pub fn push(&mut self, address: u32) {
        self.val = (self.val << 1) | (address as u16 & 1);
    }
}
