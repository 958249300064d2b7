//! Scenario × time-slice grid of pie charts with a shared class legend.

use std::collections::BTreeSet;
use std::error::Error;
use std::path::Path;

use koppen_core::slices::PieComposition;
use koppen_core::{ClassCode, ClassTable};
use plotters::prelude::*;

const CELL_PX: u32 = 520;
const LEGEND_PX: u32 = 140;
const LEGEND_ITEM_PX: i32 = 110;

/// One grid cell. `pie` is `None` when no model contributed.
#[derive(Debug, Clone)]
pub struct PieCell {
    pub title: String,
    pub pie: Option<PieComposition>,
}

/// Classes drawn anywhere in the grid, ascending.
pub fn legend_classes(cells: &[PieCell]) -> Vec<ClassCode> {
    cells
        .iter()
        .filter_map(|c| c.pie.as_ref())
        .flat_map(|p| p.classes())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn rgb(classes: &ClassTable, code: ClassCode) -> RGBColor {
    let [r, g, b] = classes.color(code);
    RGBColor(r, g, b)
}

/// Render `cells` row-major into a `rows`×`cols` grid.
pub fn render(
    path: &Path,
    cells: &[PieCell],
    rows: usize,
    cols: usize,
    classes: &ClassTable,
) -> Result<(), Box<dyn Error>> {
    let width = CELL_PX * cols as u32;
    let grid_height = CELL_PX * rows as u32;
    let root = BitMapBackend::new(path, (width, grid_height + LEGEND_PX)).into_drawing_area();
    root.fill(&WHITE)?;
    let (grid_area, legend_area) = root.split_vertically(grid_height as i32);

    for (area, cell) in grid_area.split_evenly((rows, cols)).iter().zip(cells) {
        let area = area.titled(&cell.title, ("sans-serif", 30))?;
        let (w, h) = area.dim_in_pixel();
        let center = (w as i32 / 2, h as i32 / 2);

        let drawable = cell.pie.as_ref().filter(|p| p.drawn_total() > 0.0);
        let Some(pie) = drawable else {
            area.draw(&Text::new("no data", (center.0 - 40, center.1), ("sans-serif", 24)))?;
            continue;
        };

        let sizes: Vec<f64> = pie.slices.iter().map(|s| s.size).collect();
        let colors: Vec<RGBColor> = pie.classes().map(|c| rgb(classes, c)).collect();
        let labels = pie.labels(classes);
        let radius = f64::from(w.min(h)) * 0.34;

        let mut chart = Pie::new(&center, &radius, &sizes, &colors, &labels);
        chart.start_angle(-90.0);
        chart.label_style(("sans-serif", 18).into_font());
        area.draw(&chart)?;
    }

    let legend_top = 20;
    for (i, code) in legend_classes(cells).into_iter().enumerate() {
        let per_row = (width as i32 / LEGEND_ITEM_PX).max(1);
        let x = 20 + (i as i32 % per_row) * LEGEND_ITEM_PX;
        let y = legend_top + (i as i32 / per_row) * 30;
        legend_area.draw(&Rectangle::new([(x, y), (x + 20, y + 20)], rgb(classes, code).filled()))?;
        legend_area.draw(&Text::new(classes.label(code).to_owned(), (x + 26, y + 2), ("sans-serif", 18)))?;
    }

    root.present()?;
    Ok(())
}
