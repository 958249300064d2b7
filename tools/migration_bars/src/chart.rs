//! Horizontal bar chart of the most frequent transitions.

use std::error::Error;
use std::path::Path;

use koppen_core::{ClassCode, ClassTable, EnsembleSummary};
use plotters::prelude::*;

const BAR_COLOR: RGBColor = RGBColor(135, 206, 235);

/// One bar: a labelled transition with its ensemble mean and spread.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub mean: f64,
    pub std_dev: f64,
}

/// The `top_n` transitions away from `origin`, largest mean first.
pub fn top_bars(summary: &EnsembleSummary, origin: ClassCode, top_n: usize, classes: &ClassTable) -> Vec<Bar> {
    summary
        .sorted_by_mean()
        .into_iter()
        .filter(|s| s.pair.from == origin)
        .take(top_n)
        .map(|s| Bar {
            label: classes.transition_label(s.pair.from, s.pair.to),
            mean: s.mean,
            std_dev: s.std_dev,
        })
        .collect()
}

/// `mean ± std_dev` clipped to `[0, x_max]`; `None` when nothing is visible.
fn error_span(bar: &Bar, x_max: f64) -> Option<(f64, f64)> {
    let lo = (bar.mean - bar.std_dev).clamp(0.0, x_max);
    let hi = (bar.mean + bar.std_dev).clamp(0.0, x_max);
    (bar.std_dev > 0.0 && lo < hi).then_some((lo, hi))
}

/// Draw `bars` top to bottom with ±1σ error bars, clipped to `[0, x_max]`.
pub fn render(path: &Path, bars: &[Bar], title: &str, x_max: f64) -> Result<(), Box<dyn Error>> {
    let height = 160 + 40 * bars.len().max(4) as u32;
    let root = BitMapBackend::new(path, (1000, height)).into_drawing_area();
    root.fill(&WHITE)?;

    // Integer segment ranges include their end, so `0..n - 1` gives n rows.
    // A single-value range collapses, hence at least two rows.
    let n = bars.len().max(2) as i32;
    let rows = (0..n - 1).into_segmented();
    // Row 0 sits at the bottom, so the first bar goes to row n - 1.
    let row_of = |i: usize| n - 1 - i as i32;
    let top_of = |row: i32| if row == n - 1 { SegmentValue::Last } else { SegmentValue::Exact(row + 1) };
    let labels: Vec<&str> = bars.iter().map(|b| b.label.as_str()).collect();

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(140)
        .build_cartesian_2d(0.0..x_max, rows)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n as usize)
        .y_label_formatter(&|v| match v {
            SegmentValue::CenterOf(row) => usize::try_from(n - 1 - row)
                .ok()
                .and_then(|i| labels.get(i))
                .map(|l| l.to_string())
                .unwrap_or_default(),
            _ => String::new(),
        })
        .x_label_formatter(&|x| format!("{x:.0}"))
        .x_desc("Mean transitioned pixels (ensemble)")
        .y_desc("Transition")
        .label_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, b)| {
        let row = row_of(i);
        let mut rect = Rectangle::new(
            [(0.0, SegmentValue::Exact(row)), (b.mean.min(x_max), top_of(row))],
            BAR_COLOR.filled(),
        );
        rect.set_margin(6, 6, 0, 0);
        rect
    }))?;

    for (i, b) in bars.iter().enumerate() {
        let Some((lo, hi)) = error_span(b, x_max) else {
            continue;
        };
        let row = row_of(i);
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(lo, SegmentValue::CenterOf(row)), (hi, SegmentValue::CenterOf(row))],
            BLACK.stroke_width(2),
        )))?;
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use koppen_core::classes::{EF, ET};
    use koppen_core::{aggregate, TransitionPair, TransitionTally, ZeroPolicy};

    fn summary() -> EnsembleSummary {
        let a: TransitionTally = [
            (TransitionPair::new(ET, 20), 90),
            (TransitionPair::new(ET, EF), 10),
            (TransitionPair::new(ET, 19), 40),
        ]
        .into_iter()
        .collect();
        let b: TransitionTally = [(TransitionPair::new(ET, 20), 110)].into_iter().collect();
        aggregate(&[a, b], ZeroPolicy::ZeroFill)
    }

    #[test]
    fn bars_are_sorted_and_truncated() {
        let bars = top_bars(&summary(), ET, 2, &ClassTable::default());
        let labels: Vec<_> = bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["ET -> Dfc", "ET -> Dfb"]);
        assert_eq!(bars[0].mean, 100.0);
        assert_eq!(bars[0].std_dev, 10.0);
    }

    fn bar(mean: f64, std_dev: f64) -> Bar {
        Bar { label: "ET -> Dfc".into(), mean, std_dev }
    }

    #[test]
    fn error_span_is_clipped_to_axis() {
        assert_eq!(error_span(&bar(100.0, 20.0), 400.0), Some((80.0, 120.0)));
        assert_eq!(error_span(&bar(390.0, 20.0), 400.0), Some((370.0, 400.0)));
        assert_eq!(error_span(&bar(10.0, 20.0), 400.0), Some((0.0, 30.0)));
        // Entire span beyond the axis.
        assert_eq!(error_span(&bar(500.0, 20.0), 400.0), None);
        assert_eq!(error_span(&bar(100.0, 0.0), 400.0), None);
    }

    #[test]
    fn render_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.png");
        let bars = vec![bar(120.0, 30.0), bar(450.0, 10.0), bar(5.0, 0.0)];
        render(&path, &bars, "ET transitions, ssp126 2011-2040 (5 models)", 400.0).unwrap();
        assert!(path.metadata().unwrap().len() > 0);
    }

    #[test]
    fn render_handles_no_bars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        render(&path, &[], "no transitions", 400.0).unwrap();
        assert!(path.exists());
        render(&path, &[bar(42.0, 3.0)], "one transition", 400.0).unwrap();
    }

    #[test]
    fn other_origins_are_excluded() {
        assert!(top_bars(&summary(), EF, 20, &ClassTable::default()).is_empty());
    }
}
