//! Terminal progress for ensemble collection.

use std::sync::LazyLock;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

static CELL_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("{prefix:>20} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

/// One bar per scenario × time slice, stacked in a shared display.
pub struct ModelProgress {
    multi: MultiProgress,
}

impl Default for ModelProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelProgress {
    /// Bars drawn to stderr.
    pub fn new() -> Self {
        Self { multi: MultiProgress::new() }
    }

    /// Bars that track state but never draw. Used by tests and `--quiet`.
    pub fn hidden() -> Self {
        Self { multi: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()) }
    }

    /// Bar for one scenario × time slice expecting `models` steps.
    pub fn cell(&self, scenario: &str, time_slice: &str, models: usize) -> CellProgress {
        let bar = self.multi.add(ProgressBar::new(models as u64));
        bar.set_style(CELL_STYLE.clone());
        bar.set_prefix(format!("{scenario} {time_slice}"));
        CellProgress { bar }
    }
}

pub struct CellProgress {
    bar: ProgressBar,
}

impl CellProgress {
    pub fn start_model(&self, model: &str) {
        self.bar.set_message(model.to_owned());
    }

    pub fn advance(&self) {
        self.bar.inc(1);
    }

    pub fn finish(&self, contributing: usize) {
        self.bar.finish_with_message(format!("{contributing} model(s)"));
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_bars_still_count() {
        let progress = ModelProgress::hidden();
        let cell = progress.cell("ssp126", "2011-2040", 3);
        cell.start_model("GFDL-ESM4");
        cell.advance();
        cell.advance();
        assert_eq!(cell.position(), 2);
        cell.finish(2);
    }
}
