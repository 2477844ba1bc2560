use munkres::{solve_assignment, Position, WeightMatrix};
use ndarray::prelude::*;

use crate::bbox::{BBox, Ltwh};

// Cost of the padding cells that square up a rectangular problem.
const PADDING_COST: f32 = 100_000.0;

/// Result of matching predicted track boxes (rows) against detections
/// (columns). Every row and every column index shows up exactly once across
/// the three collections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Association {
    /// `(track, detection, cost)`
    pub matches: Vec<(usize, usize, f32)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

impl Association {
    fn unmatched(tracks: usize, detections: usize) -> Self {
        Self {
            matches: Vec::new(),
            unmatched_tracks: (0..tracks).collect(),
            unmatched_detections: (0..detections).collect(),
        }
    }
}

/// `1 - IoU` for every (track, detection) pair. Invalid geometry costs 1.
pub fn iou_cost_matrix(tracks: &[BBox<Ltwh>], detections: &[BBox<Ltwh>]) -> Array2<f32> {
    Array2::from_shape_fn((tracks.len(), detections.len()), |(r, c)| {
        1.0 - tracks[r].iou(&detections[c])
    })
}

/// Matches predicted boxes to detections with minimum total `1 - IoU` cost,
/// rejecting pairs whose cost exceeds `max_cost`.
pub fn associate(
    tracks: &[BBox<Ltwh>],
    detections: &[BBox<Ltwh>],
    max_cost: f32,
) -> Association {
    if tracks.is_empty() || detections.is_empty() {
        return Association::unmatched(tracks.len(), detections.len());
    }

    assign(iou_cost_matrix(tracks, detections).view(), max_cost)
}

/// Optimal assignment over an arbitrary (possibly rectangular) cost matrix.
pub fn assign(costs: ArrayView2<'_, f32>, max_cost: f32) -> Association {
    let (rows, cols) = costs.dim();

    if rows == 0 || cols == 0 {
        return Association::unmatched(rows, cols);
    }

    let n = rows.max(cols);
    let mut mat = WeightMatrix::from_fn(n, |(r, c)| {
        if r < rows && c < cols {
            let cost = costs[[r, c]];
            if cost.is_finite() {
                cost
            } else {
                PADDING_COST
            }
        } else {
            PADDING_COST
        }
    });

    let positions = match solve_assignment(&mut mat) {
        Ok(positions) => positions,
        Err(err) => {
            log::warn!(
                "assignment of {}x{} could not be solved: {:?}",
                rows,
                cols,
                err
            );
            return Association::unmatched(rows, cols);
        }
    };

    split(positions, costs, max_cost)
}

/// Turns solver positions into matches and leftovers. Padding positions are
/// ignored; a real row or column assigned twice is a solver bug.
fn split<I>(positions: I, costs: ArrayView2<'_, f32>, max_cost: f32) -> Association
where
    I: IntoIterator<Item = Position>,
{
    let (rows, cols) = costs.dim();
    let mut track_assigned = vec![false; rows];
    let mut det_assigned = vec![false; cols];
    let mut track_matched = vec![false; rows];
    let mut det_matched = vec![false; cols];
    let mut matches = Vec::with_capacity(rows.min(cols));

    for pos in positions {
        if pos.row >= rows || pos.column >= cols {
            continue;
        }

        assert!(
            !track_assigned[pos.row] && !det_assigned[pos.column],
            "assignment produced a duplicate pair ({}, {})",
            pos.row,
            pos.column
        );
        track_assigned[pos.row] = true;
        det_assigned[pos.column] = true;

        let cost = costs[[pos.row, pos.column]];
        if cost <= max_cost {
            track_matched[pos.row] = true;
            det_matched[pos.column] = true;
            matches.push((pos.row, pos.column, cost));
        }
    }

    matches.sort_unstable_by_key(|&(r, _, _)| r);

    Association {
        matches,
        unmatched_tracks: unmatched_indexes(&track_matched),
        unmatched_detections: unmatched_indexes(&det_matched),
    }
}

#[inline]
fn unmatched_indexes(matched: &[bool]) -> Vec<usize> {
    matched
        .iter()
        .enumerate()
        .filter_map(|(i, &m)| if m { None } else { Some(i) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn picks_minimum_total_cost() {
        let costs = array![[0.1, 0.9], [0.9, 0.1]];
        let res = assign(costs.view(), 0.7);

        assert_eq!(res.matches.len(), 2);
        assert_eq!((res.matches[0].0, res.matches[0].1), (0, 0));
        assert_eq!((res.matches[1].0, res.matches[1].1), (1, 1));

        let total: f32 = res.matches.iter().map(|m| m.2).sum();
        assert_abs_diff_eq!(total, 0.2, epsilon = 1e-6);
        assert!(res.unmatched_tracks.is_empty());
        assert!(res.unmatched_detections.is_empty());
    }

    #[test]
    fn beats_greedy_choice() {
        // Greedy takes (0, 0) first and is left with (1, 1) = 0.9.
        let costs = array![[0.1, 0.2], [0.3, 0.9]];
        let res = assign(costs.view(), 1.0);

        let pairs: Vec<_> = res.matches.iter().map(|m| (m.0, m.1)).collect();
        assert_eq!(pairs, [(0, 1), (1, 0)]);
    }

    #[test]
    fn rejects_pairs_above_threshold() {
        let costs = array![[0.8]];
        let res = assign(costs.view(), 0.7);

        assert!(res.matches.is_empty());
        assert_eq!(res.unmatched_tracks, [0]);
        assert_eq!(res.unmatched_detections, [0]);
    }

    #[test]
    fn rectangular_problems_leave_leftovers() {
        let costs = array![[0.9, 0.0, 0.9], [0.9, 0.9, 0.2]];
        let res = assign(costs.view(), 0.7);

        let pairs: Vec<_> = res.matches.iter().map(|m| (m.0, m.1)).collect();
        assert_eq!(pairs, [(0, 1), (1, 2)]);
        assert!(res.unmatched_tracks.is_empty());
        assert_eq!(res.unmatched_detections, [0]);

        let costs = array![[0.9], [0.1], [0.5]];
        let res = assign(costs.view(), 0.7);
        assert_eq!(res.matches.len(), 1);
        assert_eq!((res.matches[0].0, res.matches[0].1), (1, 0));
        assert_eq!(res.unmatched_tracks, [0, 2]);
    }

    #[test]
    fn degenerate_shapes() {
        let det = [BBox::ltwh(0.0, 0.0, 10.0, 10.0)];

        let res = associate(&[], &det, 0.7);
        assert!(res.matches.is_empty());
        assert!(res.unmatched_tracks.is_empty());
        assert_eq!(res.unmatched_detections, [0]);

        let res = associate(&det, &[], 0.7);
        assert!(res.matches.is_empty());
        assert_eq!(res.unmatched_tracks, [0]);
        assert!(res.unmatched_detections.is_empty());

        let res = associate(&[], &[], 0.7);
        assert_eq!(res, Association::default());
    }

    #[test]
    fn cost_matrix_uses_iou() {
        let tracks = [
            BBox::ltwh(0.0, 0.0, 10.0, 10.0),
            BBox::ltwh(0.0, 0.0, 0.0, 10.0),
        ];
        let dets = [
            BBox::ltwh(0.0, 0.0, 10.0, 10.0),
            BBox::ltwh(50.0, 50.0, 10.0, 10.0),
        ];
        let costs = iou_cost_matrix(&tracks, &dets);

        assert_abs_diff_eq!(costs[[0, 0]], 0.0);
        assert_abs_diff_eq!(costs[[0, 1]], 1.0);
        assert_abs_diff_eq!(costs[[1, 0]], 1.0);
        assert_abs_diff_eq!(costs[[1, 1]], 1.0);
    }

    #[test]
    fn associates_overlapping_boxes() {
        let tracks = [
            BBox::ltwh(0.0, 0.0, 50.0, 50.0),
            BBox::ltwh(200.0, 0.0, 50.0, 50.0),
        ];
        let dets = [
            BBox::ltwh(203.0, 2.0, 50.0, 50.0),
            BBox::ltwh(500.0, 500.0, 50.0, 50.0),
            BBox::ltwh(4.0, 1.0, 50.0, 50.0),
        ];
        let res = associate(&tracks, &dets, 0.7);

        let pairs: Vec<_> = res.matches.iter().map(|m| (m.0, m.1)).collect();
        assert_eq!(pairs, [(0, 2), (1, 0)]);
        assert_eq!(res.unmatched_detections, [1]);
    }

    #[test]
    #[should_panic(expected = "duplicate pair")]
    fn duplicate_rejected_pair_is_a_contract_violation() {
        // both pairs are above the threshold and would never become matches
        let costs = array![[0.9, 0.95], [0.9, 0.95]];
        let positions = vec![
            Position { row: 0, column: 0 },
            Position { row: 1, column: 0 },
        ];

        split(positions, costs.view(), 0.7);
    }

    #[test]
    fn padding_positions_are_ignored() {
        let costs = array![[0.2], [0.9]];
        let positions = vec![
            Position { row: 0, column: 0 },
            Position { row: 1, column: 1 },
        ];
        let res = split(positions, costs.view(), 0.7);

        assert_eq!(res.matches.len(), 1);
        assert_eq!(res.unmatched_tracks, [1]);
        assert!(res.unmatched_detections.is_empty());
    }
}
