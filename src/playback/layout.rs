/// Rows and columns of the video grid for a given session count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub rows: usize,
    pub cols: usize,
    count: usize,
}

impl GridLayout {
    /// Near-square grid: start from floor(sqrt(n)) on both axes, widen
    /// first, then add a row.
    pub fn for_count(count: usize) -> Self {
        let count = count.max(1);
        let side = (count as f64).sqrt().floor() as usize;
        let mut rows = side;
        let mut cols = side;
        if rows * cols < count {
            cols += 1;
        }
        if rows * cols < count {
            rows += 1;
        }
        Self { rows, cols, count }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Grid cell of `slot`, filled row by row
    pub fn cell(&self, slot: usize) -> Option<(usize, usize)> {
        (slot < self.count).then(|| (slot / self.cols, slot % self.cols))
    }
}
