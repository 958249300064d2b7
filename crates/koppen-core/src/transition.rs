use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::classes::ClassCode;
use crate::error::TransitionError;
use crate::grid::ClassGrid;

/// Ordered (historical class, future class) reclassification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TransitionPair {
    pub from: ClassCode,
    pub to: ClassCode,
}

impl TransitionPair {
    pub const fn new(from: ClassCode, to: ClassCode) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for TransitionPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Pixel counts per transition pair for one historical/future raster pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionTally {
    counts: BTreeMap<TransitionPair, u64>,
}

impl TransitionTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` occurrences of `pair`.
    pub fn add(&mut self, pair: TransitionPair, n: u64) {
        if n > 0 {
            *self.counts.entry(pair).or_insert(0) += n;
        }
    }

    /// Count for `pair`; zero if never observed.
    pub fn get(&self, pair: TransitionPair) -> u64 {
        self.counts.get(&pair).copied().unwrap_or(0)
    }

    /// Distinct pairs observed.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total transitioned pixels across all pairs.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Pairs in ascending (from, to) order.
    pub fn iter(&self) -> impl Iterator<Item = (TransitionPair, u64)> + '_ {
        self.counts.iter().map(|(&p, &n)| (p, n))
    }

    pub fn pairs(&self) -> impl Iterator<Item = TransitionPair> + '_ {
        self.counts.keys().copied()
    }
}

impl FromIterator<(TransitionPair, u64)> for TransitionTally {
    fn from_iter<I: IntoIterator<Item = (TransitionPair, u64)>>(iter: I) -> Self {
        let mut tally = Self::new();
        for (pair, n) in iter {
            tally.add(pair, n);
        }
        tally
    }
}

/// Count cells whose historical class is `origin` and whose future class
/// differs, keyed by `(origin, future class)`.
///
/// Both grids must come from the same pixel window; differing shapes are an
/// error rather than a partial comparison.
pub fn tally_transitions(
    historical: &ClassGrid,
    future: &ClassGrid,
    origin: ClassCode,
) -> Result<TransitionTally, TransitionError> {
    if historical.shape() != future.shape() {
        return Err(TransitionError::ShapeMismatch {
            historical: historical.shape(),
            future: future.shape(),
        });
    }

    // Dense per-destination counters; folded into the map at the end.
    let mut per_dest = [0u64; 256];
    for (&h, &f) in historical.data.iter().zip(future.data.iter()) {
        if h == origin && f != h {
            per_dest[usize::from(f)] += 1;
        }
    }

    Ok(per_dest
        .iter()
        .enumerate()
        .filter(|(_, &n)| n > 0)
        .map(|(to, &n)| (TransitionPair::new(origin, to as ClassCode), n))
        .collect())
}
