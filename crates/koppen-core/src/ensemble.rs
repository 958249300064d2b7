//! Ensemble statistics over per-model transition tallies.
//!
//! A pair seen by only some models needs a convention for the others.
//! [`ZeroPolicy::ZeroFill`] counts them as zero samples and is the default for
//! every chart; [`ZeroPolicy::ObservedOnly`] averages over the models that saw
//! the pair, which inflates the mean of rare transitions.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::transition::{TransitionPair, TransitionTally};

/// How models that never observed a pair enter its statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZeroPolicy {
    /// Absent pairs are zero samples; statistics are over all N models.
    #[default]
    ZeroFill,
    /// Only models with a non-zero count contribute samples.
    ObservedOnly,
}

impl std::str::FromStr for ZeroPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zero-fill" => Ok(Self::ZeroFill),
            "observed-only" => Ok(Self::ObservedOnly),
            other => Err(format!("unknown zero policy '{other}' (expected zero-fill or observed-only)")),
        }
    }
}

/// Statistics for one transition pair across the ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairStats {
    pub pair: TransitionPair,
    /// Mean count under the chosen [`ZeroPolicy`].
    pub mean: f64,
    /// Population standard deviation under the chosen [`ZeroPolicy`].
    pub std_dev: f64,
    /// Models with a non-zero count.
    pub observed: usize,
    /// Sum of counts over all models.
    pub total: u64,
    /// `total / ensemble_size`, independent of the policy.
    pub ensemble_mean: f64,
}

/// Aggregated statistics for one scenario × time slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsembleSummary {
    /// Tallies the statistics were computed over.
    pub model_count: usize,
    /// Divisor of [`PairStats::ensemble_mean`]: the configured model count.
    pub ensemble_size: usize,
    pub policy: ZeroPolicy,
    /// One entry per pair seen by any model, ascending by pair.
    pub stats: Vec<PairStats>,
}

impl EnsembleSummary {
    pub fn get(&self, pair: TransitionPair) -> Option<&PairStats> {
        self.stats.iter().find(|s| s.pair == pair)
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Stats ordered by descending mean; ties keep ascending pair order.
    pub fn sorted_by_mean(&self) -> Vec<PairStats> {
        let mut sorted = self.stats.clone();
        sorted.sort_by(|a, b| b.mean.total_cmp(&a.mean).then(a.pair.cmp(&b.pair)));
        sorted
    }

    /// Stats whose pair starts at `origin`.
    pub fn from_origin(&self, origin: crate::classes::ClassCode) -> impl Iterator<Item = &PairStats> + '_ {
        self.stats.iter().filter(move |s| s.pair.from == origin)
    }
}

/// Population mean and standard deviation; `(0, 0)` for an empty sample.
pub fn mean_std(samples: &[f64]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let var = samples.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Aggregate per-model tallies for one scenario × time slice. The ensemble
/// mean divides by the number of tallies.
pub fn aggregate(tallies: &[TransitionTally], policy: ZeroPolicy) -> EnsembleSummary {
    aggregate_over_models(tallies, policy, tallies.len())
}

/// Like [`aggregate`], but the ensemble mean divides summed counts by
/// `ensemble_size`, the number of configured models, however many tallies
/// were found on disk.
pub fn aggregate_over_models(tallies: &[TransitionTally], policy: ZeroPolicy, ensemble_size: usize) -> EnsembleSummary {
    let model_count = tallies.len();
    let pairs: BTreeSet<TransitionPair> = tallies.iter().flat_map(|t| t.pairs()).collect();

    let stats = pairs
        .into_iter()
        .map(|pair| {
            let counts: Vec<u64> = tallies.iter().map(|t| t.get(pair)).collect();
            let total: u64 = counts.iter().sum();
            let observed = counts.iter().filter(|&&c| c > 0).count();
            let samples: Vec<f64> = match policy {
                ZeroPolicy::ZeroFill => counts.iter().map(|&c| c as f64).collect(),
                ZeroPolicy::ObservedOnly => counts.iter().filter(|&&c| c > 0).map(|&c| c as f64).collect(),
            };
            let (mean, std_dev) = mean_std(&samples);
            PairStats {
                pair,
                mean,
                std_dev,
                observed,
                total,
                ensemble_mean: if ensemble_size > 0 { total as f64 / ensemble_size as f64 } else { 0.0 },
            }
        })
        .collect();

    EnsembleSummary { model_count, ensemble_size, policy, stats }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::classes::{EF, ET};

    fn tally(entries: &[(u8, u64)]) -> TransitionTally {
        entries.iter().map(|&(to, n)| (TransitionPair::new(ET, to), n)).collect()
    }

    #[test]
    fn zero_fill_mean_and_population_std() {
        // Dfc seen by 2 of 3 models: samples [10, 0, 20].
        let tallies = [tally(&[(20, 10), (EF, 4)]), tally(&[(EF, 4)]), tally(&[(20, 20), (EF, 4)])];
        let s = aggregate(&tallies, ZeroPolicy::ZeroFill);
        assert_eq!(s.model_count, 3);

        let dfc = s.get(TransitionPair::new(ET, 20)).unwrap();
        assert_abs_diff_eq!(dfc.mean, 10.0, epsilon = 1e-12);
        let expected_std = (200.0f64 / 3.0).sqrt();
        assert_abs_diff_eq!(dfc.std_dev, expected_std, epsilon = 1e-12);
        assert_eq!(dfc.observed, 2);
        assert_eq!(dfc.total, 30);
        assert_abs_diff_eq!(dfc.ensemble_mean, 10.0, epsilon = 1e-12);

        let ef = s.get(TransitionPair::new(ET, EF)).unwrap();
        assert_eq!(ef.mean, 4.0);
        assert_eq!(ef.std_dev, 0.0);
    }

    #[test]
    fn observed_only_skips_absent_models() {
        let tallies = [tally(&[(20, 10)]), tally(&[]), tally(&[(20, 20)])];
        let s = aggregate(&tallies, ZeroPolicy::ObservedOnly);
        let dfc = s.get(TransitionPair::new(ET, 20)).unwrap();
        assert_eq!(dfc.mean, 15.0);
        assert_eq!(dfc.std_dev, 5.0);
        assert_eq!(dfc.observed, 2);
        // The ensemble mean still divides by every model.
        assert_abs_diff_eq!(dfc.ensemble_mean, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn policies_agree_when_every_model_observes() {
        let tallies = [tally(&[(20, 3)]), tally(&[(20, 5)])];
        let a = aggregate(&tallies, ZeroPolicy::ZeroFill);
        let b = aggregate(&tallies, ZeroPolicy::ObservedOnly);
        assert_eq!(a.stats, b.stats);
    }

    #[test]
    fn single_model_has_zero_std() {
        let s = aggregate(&[tally(&[(EF, 4)])], ZeroPolicy::ZeroFill);
        let ef = s.get(TransitionPair::new(ET, EF)).unwrap();
        assert_eq!((ef.mean, ef.std_dev), (4.0, 0.0));
    }

    #[test]
    fn ensemble_mean_divides_by_configured_models() {
        // One of five configured models found, with 4 pixels ET -> EF.
        let s = aggregate_over_models(&[tally(&[(EF, 4)])], ZeroPolicy::ZeroFill, 5);
        let ef = s.get(TransitionPair::new(ET, EF)).unwrap();
        assert_eq!(s.model_count, 1);
        assert_eq!(s.ensemble_size, 5);
        assert_abs_diff_eq!(ef.ensemble_mean, 0.8, epsilon = 1e-12);
        assert_eq!((ef.mean, ef.std_dev), (4.0, 0.0));
    }

    #[test]
    fn empty_ensemble() {
        let s = aggregate(&[], ZeroPolicy::ZeroFill);
        assert!(s.is_empty());
        assert_eq!(s.model_count, 0);
    }

    #[test]
    fn sorted_by_mean_descending() {
        let tallies = [tally(&[(19, 5), (20, 50), (EF, 5), (21, 7)])];
        let s = aggregate(&tallies, ZeroPolicy::ZeroFill);
        let order: Vec<u8> = s.sorted_by_mean().iter().map(|p| p.pair.to).collect();
        assert_eq!(order, vec![20, 21, 19, EF]);
    }

    #[test]
    fn zero_policy_parses_kebab_case() {
        assert_eq!("observed-only".parse::<ZeroPolicy>(), Ok(ZeroPolicy::ObservedOnly));
        assert_eq!(serde_json::to_string(&ZeroPolicy::ZeroFill).unwrap(), "\"zero-fill\"");
        assert!("mean".parse::<ZeroPolicy>().is_err());
    }
}
