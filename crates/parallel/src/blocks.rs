//! Row-block planning for whole-image passes
//!
//! A pass never needs more than one block of each plane in flight per
//! worker. Block boundaries carry no state, so any block height yields the
//! same numbers.

/// Rows per block when the caller does not choose
pub const DEFAULT_BLOCK_ROWS: usize = 256;

/// A horizontal strip of full-width rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBlock {
    /// Position of the block in the plan
    pub index: usize,
    /// First source row covered by the block
    pub row_offset: usize,
    /// Number of rows in this block
    pub rows: usize,
}

impl RowBlock {
    /// One past the last row of the block
    pub fn row_end(&self) -> usize {
        self.row_offset + self.rows
    }

    /// Number of samples in the block for a plane `cols` wide
    pub fn len(&self, cols: usize) -> usize {
        self.rows * cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

/// Plan of row blocks covering `total_rows`
#[derive(Debug, Clone)]
pub struct RowBlocks {
    total_rows: usize,
    block_rows: usize,
}

impl RowBlocks {
    /// A plan with blocks of `block_rows` rows (a zero height is treated as one row)
    pub fn new(total_rows: usize, block_rows: usize) -> Self {
        Self {
            total_rows,
            block_rows: block_rows.max(1),
        }
    }

    pub fn block_rows(&self) -> usize {
        self.block_rows
    }

    /// Number of blocks in the plan
    pub fn count(&self) -> usize {
        self.total_rows.div_ceil(self.block_rows)
    }

    /// The `index`-th block, `None` past the end
    pub fn get(&self, index: usize) -> Option<RowBlock> {
        let row_offset = index.checked_mul(self.block_rows)?;
        if row_offset >= self.total_rows {
            return None;
        }
        Some(RowBlock {
            index,
            row_offset,
            rows: self.block_rows.min(self.total_rows - row_offset),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = RowBlock> + '_ {
        (0..self.count()).filter_map(move |i| self.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_cover_all_rows_once() {
        let plan = RowBlocks::new(1000, 64);
        let mut covered = vec![0u8; 1000];
        for block in plan.iter() {
            for r in block.row_offset..block.row_end() {
                covered[r] += 1;
            }
        }
        assert!(covered.iter().all(|&c| c == 1));
        assert_eq!(plan.count(), 16);
    }

    #[test]
    fn test_last_block_is_short() {
        let plan = RowBlocks::new(10, 4);
        let last = plan.get(plan.count() - 1).unwrap();
        assert_eq!((last.row_offset, last.rows), (8, 2));
        assert!(plan.get(3).is_none());
    }

    #[test]
    fn test_zero_height_and_empty() {
        assert_eq!(RowBlocks::new(5, 0).count(), 5);
        assert_eq!(RowBlocks::new(0, 16).count(), 0);
    }
}
