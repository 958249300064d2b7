use crate::classes::ClassCode;

/// A cropped 2D grid of Köppen–Geiger class codes, row-major, row 0 = north.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassGrid {
    /// Row-major class codes.
    pub data: Vec<ClassCode>,
    pub width: usize,
    pub height: usize,
}

impl ClassGrid {
    /// Create a grid filled with `fill`.
    pub fn new(width: usize, height: usize, fill: ClassCode) -> Self {
        Self { data: vec![fill; width * height], width, height }
    }

    /// Wrap row-major data. Returns `None` if `data.len() != width * height`.
    pub fn from_vec(data: Vec<ClassCode>, width: usize, height: usize) -> Option<Self> {
        (data.len() == width * height).then_some(Self { data, width, height })
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> ClassCode {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: ClassCode) {
        self.data[row * self.width + col] = val;
    }

    /// (width, height).
    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of cells holding `class`.
    pub fn count(&self, class: ClassCode) -> u64 {
        self.data.iter().filter(|&&c| c == class).count() as u64
    }

    /// Fill the rectangle `rows × cols` with `val`. Ranges are clipped to the grid.
    pub fn fill_block(&mut self, rows: std::ops::Range<usize>, cols: std::ops::Range<usize>, val: ClassCode) {
        for r in rows.start..rows.end.min(self.height) {
            for c in cols.start..cols.end.min(self.width) {
                self.set(r, c, val);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_checks_length() {
        assert!(ClassGrid::from_vec(vec![1, 2, 3], 2, 2).is_none());
        let g = ClassGrid::from_vec(vec![1, 2, 3, 4], 2, 2).unwrap();
        assert_eq!(g.get(1, 0), 3);
        assert_eq!(g.shape(), (2, 2));
    }

    #[test]
    fn count_and_fill_block() {
        let mut g = ClassGrid::new(4, 4, 30);
        assert_eq!(g.count(30), 16);
        g.fill_block(1..3, 2..6, 31);
        assert_eq!(g.count(31), 4);
        assert_eq!(g.get(1, 2), 31);
        assert_eq!(g.get(0, 2), 30);
    }
}
