//! Pie-chart composition: where do origin-class pixels end up?
//!
//! Slices are ensemble-mean destination counts. Slices below a share of the
//! total changed area are dropped; the remainder of the historical origin
//! population is shown as an "unchanged" slice in the origin class colour.

use serde::Serialize;

use crate::classes::{ClassCode, ClassTable};
use crate::ensemble::EnsembleSummary;

/// Default minimum share (percent of all changed pixels) for a slice to be drawn.
pub const DEFAULT_MIN_SLICE_PCT: f64 = 0.15;
/// Default minimum share (percent of origin pixels) for the unchanged slice.
pub const DEFAULT_MIN_UNCHANGED_PCT: f64 = 0.01;

/// One wedge of a pie.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PieSlice {
    /// Destination class (the origin class itself for the unchanged slice).
    pub class: ClassCode,
    /// Ensemble-mean pixel count.
    pub size: f64,
    pub unchanged: bool,
}

/// Slices for one scenario × time slice cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieComposition {
    pub slices: Vec<PieSlice>,
    /// Historical pixels of the origin class inside the bounding box.
    pub origin_count: u64,
    /// Sum of the kept (changed) slices.
    pub changed: f64,
    /// `origin_count - changed`, whether or not it is drawn.
    pub unchanged: f64,
}

impl PieComposition {
    /// Sum of the drawn slices.
    pub fn drawn_total(&self) -> f64 {
        self.slices.iter().map(|s| s.size).sum()
    }

    /// Share of each drawn slice in percent of [`PieComposition::drawn_total`].
    pub fn percentages(&self) -> Vec<f64> {
        let total = self.drawn_total();
        self.slices
            .iter()
            .map(|s| if total > 0.0 { s.size / total * 100.0 } else { 0.0 })
            .collect()
    }

    /// `"Dfc (12.3%)"` labels, one per drawn slice.
    pub fn labels(&self, classes: &ClassTable) -> Vec<String> {
        self.slices
            .iter()
            .zip(self.percentages())
            .map(|(s, pct)| format!("{} ({pct:.1}%)", classes.label(s.class)))
            .collect()
    }

    /// Classes of the drawn slices, in slice order.
    pub fn classes(&self) -> impl Iterator<Item = ClassCode> + '_ {
        self.slices.iter().map(|s| s.class)
    }
}

/// Keep `(class, size)` entries whose share of the summed sizes exceeds
/// `threshold_pct` percent. Order is preserved.
pub fn filter_small(entries: &[(ClassCode, f64)], threshold_pct: f64) -> Vec<(ClassCode, f64)> {
    let total: f64 = entries.iter().map(|&(_, s)| s).sum();
    if total <= 0.0 {
        return Vec::new();
    }
    entries
        .iter()
        .copied()
        .filter(|&(_, size)| size / total * 100.0 > threshold_pct)
        .collect()
}

/// Build the pie for one ensemble summary.
///
/// With a zero `origin_count` the unchanged slice is skipped and no share of
/// it is computed.
pub fn compose_pie(
    summary: &EnsembleSummary,
    origin: ClassCode,
    origin_count: u64,
    min_slice_pct: f64,
    min_unchanged_pct: f64,
) -> PieComposition {
    let sizes: Vec<(ClassCode, f64)> = summary
        .from_origin(origin)
        .filter(|s| s.pair.to != origin && s.ensemble_mean > 0.0)
        .map(|s| (s.pair.to, s.ensemble_mean))
        .collect();

    let kept = filter_small(&sizes, min_slice_pct);
    let changed: f64 = kept.iter().map(|&(_, s)| s).sum();
    let unchanged = origin_count as f64 - changed;

    let mut slices: Vec<PieSlice> = kept
        .into_iter()
        .map(|(class, size)| PieSlice { class, size, unchanged: false })
        .collect();
    if origin_count > 0 && unchanged / origin_count as f64 * 100.0 > min_unchanged_pct {
        slices.push(PieSlice { class: origin, size: unchanged, unchanged: true });
    }

    PieComposition { slices, origin_count, changed, unchanged }
}
