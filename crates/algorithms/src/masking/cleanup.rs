//! Scene-wide helpers shared by the cloud masks
//!
//! Region filtering, square dilation, depression filling and percentiles.
//! These run on whole class grids after the per-pixel pass.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use ndarray::Array2;

/// D8 neighbor offsets
const D8_OFFSETS: [(isize, isize); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1),           (0, 1),
    (1, -1),  (1, 0),  (1, 1),
];

fn neighbor(row: usize, col: usize, dr: isize, dc: isize, rows: usize, cols: usize) -> Option<(usize, usize)> {
    let r = row as isize + dr;
    let c = col as isize + dc;
    if r < 0 || c < 0 || r >= rows as isize || c >= cols as isize {
        None
    } else {
        Some((r as usize, c as usize))
    }
}

/// Relabel 8-connected regions of `class` smaller than `min_pixels` as `replacement`.
///
/// Returns the number of pixels relabelled.
pub fn remove_small_regions(labels: &mut Array2<u8>, class: u8, min_pixels: usize, replacement: u8) -> usize {
    if min_pixels <= 1 {
        return 0;
    }
    let (rows, cols) = labels.dim();
    let mut visited = Array2::from_elem((rows, cols), false);
    let mut queue = VecDeque::new();
    let mut region: Vec<(usize, usize)> = Vec::new();
    let mut removed = 0;

    for row in 0..rows {
        for col in 0..cols {
            if visited[(row, col)] || labels[(row, col)] != class {
                continue;
            }
            region.clear();
            visited[(row, col)] = true;
            queue.push_back((row, col));

            while let Some((r, c)) = queue.pop_front() {
                region.push((r, c));
                for &(dr, dc) in &D8_OFFSETS {
                    if let Some((nr, nc)) = neighbor(r, c, dr, dc, rows, cols) {
                        if !visited[(nr, nc)] && labels[(nr, nc)] == class {
                            visited[(nr, nc)] = true;
                            queue.push_back((nr, nc));
                        }
                    }
                }
            }

            if region.len() < min_pixels {
                for &(r, c) in &region {
                    labels[(r, c)] = replacement;
                }
                removed += region.len();
            }
        }
    }
    removed
}

/// Grow `class` by a square window of `radius` pixels.
///
/// Pixels labelled with any value in `keep` are never overwritten. Returns
/// the number of pixels added to `class`.
pub fn dilate_class(labels: &mut Array2<u8>, class: u8, radius: usize, keep: &[u8]) -> usize {
    if radius == 0 {
        return 0;
    }
    let near = square_reach(&labels.mapv(|v| v == class), radius);

    let mut added = 0;
    for ((r, c), v) in labels.indexed_iter_mut() {
        if near[(r, c)] && *v != class && !keep.contains(&*v) {
            *v = class;
            added += 1;
        }
    }
    added
}

/// `true` wherever a set cell lies within the `(2r+1)²` window.
///
/// Separable: a running count along rows, then along columns.
fn square_reach(set: &Array2<bool>, radius: usize) -> Array2<bool> {
    let (rows, cols) = set.dim();
    let mut horizontal = Array2::from_elem((rows, cols), false);
    for r in 0..rows {
        let mut prefix = vec![0usize; cols + 1];
        for c in 0..cols {
            prefix[c + 1] = prefix[c] + usize::from(set[(r, c)]);
        }
        for c in 0..cols {
            let lo = c.saturating_sub(radius);
            let hi = (c + radius + 1).min(cols);
            horizontal[(r, c)] = prefix[hi] > prefix[lo];
        }
    }

    let mut out = Array2::from_elem((rows, cols), false);
    for c in 0..cols {
        let mut prefix = vec![0usize; rows + 1];
        for r in 0..rows {
            prefix[r + 1] = prefix[r] + usize::from(horizontal[(r, c)]);
        }
        for r in 0..rows {
            let lo = r.saturating_sub(radius);
            let hi = (r + radius + 1).min(rows);
            out[(r, c)] = prefix[hi] > prefix[lo];
        }
    }
    out
}

/// A cell in the priority queue, ordered by level (min-heap)
#[derive(Debug, Clone)]
struct Cell {
    level: f64,
    row: usize,
    col: usize,
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse: lower level has higher priority
        other.level.partial_cmp(&self.level).unwrap_or(Ordering::Equal)
    }
}

/// Priority-flood fill of the local minima of `surface`.
///
/// The flood starts from the grid edge and from every valid cell touching
/// an invalid one. Invalid cells keep their value.
pub fn fill_depressions(surface: &Array2<f64>, valid: &Array2<bool>) -> Array2<f64> {
    let (rows, cols) = surface.dim();
    let mut filled = surface.clone();
    let mut closed = Array2::from_elem((rows, cols), false);
    let mut heap = BinaryHeap::new();

    for row in 0..rows {
        for col in 0..cols {
            if !valid[(row, col)] {
                closed[(row, col)] = true;
                continue;
            }
            let on_edge = row == 0 || col == 0 || row == rows - 1 || col == cols - 1;
            let by_gap = D8_OFFSETS.iter().any(|&(dr, dc)| {
                neighbor(row, col, dr, dc, rows, cols).is_some_and(|(r, c)| !valid[(r, c)])
            });
            if on_edge || by_gap {
                closed[(row, col)] = true;
                heap.push(Cell {
                    level: surface[(row, col)],
                    row,
                    col,
                });
            }
        }
    }

    while let Some(Cell { level, row, col }) = heap.pop() {
        for &(dr, dc) in &D8_OFFSETS {
            let Some((nr, nc)) = neighbor(row, col, dr, dc, rows, cols) else {
                continue;
            };
            if closed[(nr, nc)] {
                continue;
            }
            closed[(nr, nc)] = true;
            let raised = filled[(nr, nc)].max(level);
            filled[(nr, nc)] = raised;
            heap.push(Cell {
                level: raised,
                row: nr,
                col: nc,
            });
        }
    }
    filled
}

/// Linear-interpolated percentile (`p` in `[0, 100]`) of `values`, `None` if empty
pub fn percentile(values: &mut [f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(values[lo] + (values[hi] - values[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_small_regions_removed() {
        let mut labels = array![
            [1, 1, 0, 0, 0],
            [1, 1, 0, 0, 1],
            [0, 0, 0, 0, 0],
            [0, 0, 0, 1, 0],
        ];
        let removed = remove_small_regions(&mut labels, 1, 3, 0);
        assert_eq!(removed, 2);
        assert_eq!(labels.iter().filter(|&&v| v == 1).count(), 4);
    }

    #[test]
    fn test_diagonal_counts_as_connected() {
        let mut labels = array![[1, 0, 0], [0, 1, 0], [0, 0, 1]];
        assert_eq!(remove_small_regions(&mut labels, 1, 3, 0), 0);
    }

    #[test]
    fn test_dilate_respects_keep() {
        let mut labels = Array2::from_elem((5, 5), 0u8);
        labels[(2, 2)] = 4;
        labels[(1, 1)] = 255;
        let added = dilate_class(&mut labels, 4, 1, &[255]);
        assert_eq!(added, 7);
        assert_eq!(labels[(1, 1)], 255);
        assert_eq!(labels[(3, 3)], 4);
        assert_eq!(labels[(0, 0)], 0);
    }

    #[test]
    fn test_fill_raises_pit() {
        let surface = array![
            [5.0, 5.0, 5.0],
            [5.0, 1.0, 5.0],
            [5.0, 5.0, 5.0],
        ];
        let valid = Array2::from_elem((3, 3), true);
        let filled = fill_depressions(&surface, &valid);
        assert_eq!(filled[(1, 1)], 5.0);
        assert_eq!(filled[(0, 0)], 5.0);
    }

    #[test]
    fn test_percentile() {
        let mut v = vec![4.0, 1.0, 3.0, 2.0, 5.0];
        assert_eq!(percentile(&mut v, 50.0), Some(3.0));
        assert_eq!(percentile(&mut v, 100.0), Some(5.0));
        assert_eq!(percentile(&mut v, 25.0), Some(2.0));
        assert_eq!(percentile(&mut [], 50.0), None);
    }
}
