//! Machine-readable ensemble results written next to the charts.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;

use crate::classes::{ClassCode, ClassTable};
use crate::ensemble::{EnsembleSummary, ZeroPolicy};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionRecord {
    pub from: ClassCode,
    pub to: ClassCode,
    pub from_label: String,
    pub to_label: String,
    pub mean: f64,
    pub std_dev: f64,
    pub observed: usize,
    pub ensemble_mean: f64,
}

/// Results for one scenario × time slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsembleReport {
    pub scenario: String,
    pub time_slice: String,
    pub origin_class: ClassCode,
    pub origin_label: String,
    pub origin_pixels: u64,
    pub model_count: usize,
    /// Configured models; divisor of each `ensemble_mean`.
    pub ensemble_size: usize,
    pub contributors: Vec<String>,
    pub zero_policy: ZeroPolicy,
    /// Descending by mean.
    pub transitions: Vec<TransitionRecord>,
}

impl EnsembleReport {
    pub fn new(
        scenario: &str,
        time_slice: &str,
        origin: ClassCode,
        origin_pixels: u64,
        contributors: &[String],
        summary: &EnsembleSummary,
        classes: &ClassTable,
    ) -> Self {
        let transitions = summary
            .sorted_by_mean()
            .into_iter()
            .filter(|s| s.pair.from == origin)
            .map(|s| TransitionRecord {
                from: s.pair.from,
                to: s.pair.to,
                from_label: classes.label(s.pair.from).to_owned(),
                to_label: classes.label(s.pair.to).to_owned(),
                mean: s.mean,
                std_dev: s.std_dev,
                observed: s.observed,
                ensemble_mean: s.ensemble_mean,
            })
            .collect();

        Self {
            scenario: scenario.to_owned(),
            time_slice: time_slice.to_owned(),
            origin_class: origin,
            origin_label: classes.label(origin).to_owned(),
            origin_pixels,
            model_count: summary.model_count,
            ensemble_size: summary.ensemble_size,
            contributors: contributors.to_vec(),
            zero_policy: summary.policy,
            transitions,
        }
    }
}

/// Pretty-print `value` as JSON to `path`.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::{EF, ET};
    use crate::ensemble::aggregate;
    use crate::transition::{TransitionPair, TransitionTally};

    fn report() -> EnsembleReport {
        let a: TransitionTally = [(TransitionPair::new(ET, EF), 4), (TransitionPair::new(ET, 20), 9)]
            .into_iter()
            .collect();
        let b: TransitionTally = [(TransitionPair::new(ET, EF), 4)].into_iter().collect();
        let summary = aggregate(&[a, b], ZeroPolicy::ZeroFill);
        let models = vec!["GFDL-ESM4".to_owned(), "MRI-ESM2-0".to_owned()];
        EnsembleReport::new("ssp370", "2041-2070", ET, 16, &models, &summary, &ClassTable::default())
    }

    #[test]
    fn transitions_are_labelled_and_sorted() {
        let r = report();
        assert_eq!(r.model_count, 2);
        assert_eq!(r.ensemble_size, 2);
        assert_eq!(r.origin_label, "ET");
        let labels: Vec<_> = r.transitions.iter().map(|t| t.to_label.as_str()).collect();
        assert_eq!(labels, vec!["Dfc", "EF"]);
        assert_eq!(r.transitions[1].mean, 4.0);
        assert_eq!(r.transitions[1].std_dev, 0.0);
        assert_eq!(r.transitions[0].observed, 1);
    }

    #[test]
    fn serializes_policy_in_kebab_case() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["zero_policy"], "zero-fill");
        assert_eq!(json["transitions"][0]["from_label"], "ET");
        assert_eq!(json["origin_pixels"], 16);
    }

    #[test]
    fn write_json_round_trips_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json(&path, &[report()]).unwrap();
        let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v[0]["scenario"], "ssp370");
    }
}
