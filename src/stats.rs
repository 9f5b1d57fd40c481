//! Helpers for collecting statistics while replaying a trace.

use std::collections::*;

use bitvec::prelude::*;
use itertools::*;

use crate::branch::*;

/// Each trace stands for this many executed instructions when computing
/// mispredictions per kilo-instruction.
pub const INSTRUCTIONS_PER_TRACE: f64 = 1e8;

/// Container for recording statistics while evaluating a predictor.
pub struct TraceStats {
    /// Per-branch statistics (indexed by program counter value).
    pub data: BTreeMap<u32, BranchData>,

    /// Number of conditional records seen
    pub conditional: usize,

    /// Direction mispredictions over conditional records
    pub direction_misses: usize,

    /// Number of indirect records seen
    pub indirect: usize,

    /// Target mispredictions over indirect records
    pub target_misses: usize,
}
impl TraceStats {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            conditional: 0,
            direction_misses: 0,
            indirect: 0,
            target_misses: 0,
        }
    }

    /// Record a resolved conditional branch and its predicted direction.
    pub fn record_direction(&mut self, record: &BranchRecord,
        predicted: Outcome)
    {
        let hit = predicted == record.outcome();
        self.conditional += 1;
        if !hit {
            self.direction_misses += 1;
        }

        let data = self.get_mut(record.address);
        data.occ += 1;
        data.pat.push(record.outcome().into());
        if hit {
            data.hits += 1;
        }
    }

    /// Record a resolved indirect branch and its predicted target.
    pub fn record_target(&mut self, record: &BranchRecord, predicted: u32) {
        let hit = predicted == record.target();
        self.indirect += 1;
        if !hit {
            self.target_misses += 1;
        }

        let data = self.get_mut(record.address);
        data.occ += 1;
        if hit {
            data.hits += 1;
        }
    }

    /// Total mispredictions (direction plus target).
    pub fn total_misses(&self) -> usize {
        self.direction_misses + self.target_misses
    }

    /// Mispredictions per kilo-instruction.
    pub fn mpki(&self) -> f64 {
        1000.0 * (self.total_misses() as f64 / INSTRUCTIONS_PER_TRACE)
    }

    /// Fraction of conditional records whose direction was predicted.
    pub fn direction_hit_rate(&self) -> f64 {
        (self.conditional - self.direction_misses) as f64
            / self.conditional as f64
    }

    /// Fraction of indirect records whose target was predicted.
    pub fn target_hit_rate(&self) -> f64 {
        (self.indirect - self.target_misses) as f64 / self.indirect as f64
    }

    /// Returns a mutable reference to data collected for a particular
    /// branch. Creates a new entry if one doesn't already exist.
    pub fn get_mut(&mut self, pc: u32) -> &mut BranchData {
        self.data.entry(pc).or_insert_with(BranchData::new)
    }

    /// Returns the number of unique observed branch instructions.
    pub fn num_unique_branches(&self) -> usize {
        self.data.len()
    }

    /// The 'n' most frequently executed branches.
    pub fn get_common_branches(&self, n: usize) -> Vec<(u32, &BranchData)> {
        self.data.iter()
            .sorted_by(|x, y| x.1.occ.cmp(&y.1.occ))
            .rev()
            .take(n)
            .map(|(pc, s)| (*pc, s))
            .collect()
    }

    /// Frequently executed branches with a poor hit rate.
    pub fn get_low_rate_branches(&self, n: usize) -> Vec<(u32, &BranchData)> {
        self.data.iter()
            .filter(|(_, s)| s.occ > 100 && s.hit_rate() <= 0.55)
            .sorted_by(|x, y| x.1.occ.cmp(&y.1.occ))
            .rev()
            .take(n)
            .map(|(pc, s)| (*pc, s))
            .collect()
    }
}
impl Default for TraceStats {
    fn default() -> Self { Self::new() }
}

/// Container for per-branch statistics.
pub struct BranchData {
    /// Number of times this branch was encountered.
    pub occ: usize,

    /// Number of correct predictions for this branch.
    pub hits: usize,

    /// Record of observed outcomes for this branch (conditional only).
    pub pat: BitVec,
}
impl BranchData {
    pub fn new() -> Self {
        Self {
            occ: 0,
            hits: 0,
            pat: BitVec::new(),
        }
    }

    /// Return the hit rate for this branch.
    pub fn hit_rate(&self) -> f64 {
        self.hits as f64 / self.occ as f64
    }

    pub fn is_always_taken(&self) -> bool {
        self.pat.count_ones() == self.pat.len()
    }

    pub fn is_never_taken(&self) -> bool {
        self.pat.count_zeros() == self.pat.len()
    }
}
impl Default for BranchData {
    fn default() -> Self { Self::new() }
}
