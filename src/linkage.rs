// src/linkage.rs
use log::debug;
use serde::Serialize;
use std::time::Instant;

use crate::config::MIN_RECORDS_FOR_CLUSTERING;
use crate::error::PipelineError;
use crate::models::{FeatureVector, LinkageStep};

/// Ordered merge sequence over the leaves `0..leaf_count`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkageTree {
    pub leaf_count: usize,
    pub steps: Vec<LinkageStep>,
}

impl LinkageTree {
    /// Conventional 4-column linkage matrix: `[left, right, distance, size]`
    pub fn to_matrix(&self) -> Vec<[f64; 4]> {
        self.steps
            .iter()
            .map(|s| [s.left as f64, s.right as f64, s.distance, s.size as f64])
            .collect()
    }

    /// Cluster id created by the merge at `step`
    pub fn node_id(&self, step: usize) -> usize {
        self.leaf_count + step
    }
}

/// Builds a Ward (minimum variance) agglomerative clustering over the rows.
///
/// Cluster dissimilarities are squared Euclidean distances updated with the
/// Lance-Williams recurrence for Ward's criterion. Each step merges the pair
/// with the smallest cost; on exact ties the pair whose lowest original row
/// indices compare lowest (lexicographically) wins. Reported distances are
/// the square root of the merge cost, so two singletons merge at their
/// Euclidean distance.
pub fn ward_linkage(features: &[FeatureVector]) -> Result<LinkageTree, PipelineError> {
    let n = features.len();
    if n < MIN_RECORDS_FOR_CLUSTERING {
        return Err(PipelineError::insufficient_records(
            MIN_RECORDS_FOR_CLUSTERING,
            n,
        ));
    }

    let start_time = Instant::now();

    // Slot i always holds the cluster whose smallest leaf is i
    let mut dist = vec![0.0_f64; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = squared_euclidean(&features[i].0, &features[j].0);
            dist[i * n + j] = d;
            dist[j * n + i] = d;
        }
    }
    let mut active = vec![true; n];
    let mut sizes = vec![1_usize; n];
    let mut node_ids: Vec<usize> = (0..n).collect();
    let mut steps = Vec::with_capacity(n - 1);

    for step in 0..(n - 1) {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in (0..n).filter(|&i| active[i]) {
            for j in ((i + 1)..n).filter(|&j| active[j]) {
                let d = dist[i * n + j];
                if best.map_or(true, |(_, _, best_d)| d < best_d) {
                    best = Some((i, j, d));
                }
            }
        }
        // n - step >= 2 clusters remain active, so a pair always exists
        let Some((i, j, d_ij)) = best else {
            break;
        };

        let (size_i, size_j) = (sizes[i] as f64, sizes[j] as f64);
        for k in (0..n).filter(|&k| active[k] && k != i && k != j) {
            let size_k = sizes[k] as f64;
            let updated = ((size_i + size_k) * dist[i * n + k] + (size_j + size_k) * dist[j * n + k]
                - size_k * d_ij)
                / (size_i + size_j + size_k);
            let updated = updated.max(0.0);
            dist[i * n + k] = updated;
            dist[k * n + i] = updated;
        }

        let (left, right) = if node_ids[i] < node_ids[j] {
            (node_ids[i], node_ids[j])
        } else {
            (node_ids[j], node_ids[i])
        };
        sizes[i] += sizes[j];
        active[j] = false;
        node_ids[i] = n + step;

        steps.push(LinkageStep {
            left,
            right,
            distance: d_ij.sqrt(),
            size: sizes[i],
        });
    }

    debug!(
        "Ward linkage over {} rows finished in {:.2?}",
        n,
        start_time.elapsed()
    );

    Ok(LinkageTree {
        leaf_count: n,
        steps,
    })
}

fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(points: &[&[f64]]) -> Vec<FeatureVector> {
        points.iter().map(|p| FeatureVector(p.to_vec())).collect()
    }

    #[test]
    fn test_rejects_fewer_than_two_rows() {
        let err = ward_linkage(&rows(&[&[1.0, 2.0]])).unwrap_err();
        assert_eq!(err, PipelineError::insufficient_records(2, 1));
        assert!(ward_linkage(&[]).is_err());
    }

    #[test]
    fn test_two_singletons_merge_at_euclidean_distance() {
        let tree = ward_linkage(&rows(&[&[0.0, 0.0], &[3.0, 4.0]])).unwrap();
        assert_eq!(tree.steps.len(), 1);
        let step = &tree.steps[0];
        assert_eq!((step.left, step.right, step.size), (0, 1, 2));
        assert!((step.distance - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_ward_distance_for_merged_cluster() {
        let tree = ward_linkage(&rows(&[&[0.0], &[1.0], &[10.0]])).unwrap();
        assert_eq!(tree.to_matrix()[0], [0.0, 1.0, 1.0, 2.0]);

        // 2 * (2 * 1 / 3) * 9.5^2
        let expected = (4.0 / 3.0 * 9.5_f64.powi(2)).sqrt();
        let last = &tree.steps[1];
        assert_eq!((last.left, last.right, last.size), (2, 3, 3));
        assert!((last.distance - expected).abs() < 1e-9);
    }

    #[test]
    fn test_ties_prefer_lowest_indices() {
        let tree =
            ward_linkage(&rows(&[&[0.0, 0.0], &[1.0, 0.0], &[0.0, 1.0], &[1.0, 1.0]])).unwrap();
        assert_eq!((tree.steps[0].left, tree.steps[0].right), (0, 1));
        assert_eq!((tree.steps[1].left, tree.steps[1].right), (2, 3));
        assert_eq!((tree.steps[2].left, tree.steps[2].right), (4, 5));
        assert_eq!(tree.steps[2].size, 4);
    }

    #[test]
    fn test_merge_distances_are_monotonic() {
        let data = rows(&[
            &[0.1, 2.0],
            &[5.0, 1.0],
            &[0.3, 2.2],
            &[4.8, 0.7],
            &[9.0, 9.0],
            &[2.5, 2.5],
        ]);
        let tree = ward_linkage(&data).unwrap();
        assert_eq!(tree.steps.len(), 5);
        for pair in tree.steps.windows(2) {
            assert!(pair[0].distance <= pair[1].distance + 1e-12);
        }
        assert_eq!(tree.steps.last().unwrap().size, 6);
        assert_eq!(ward_linkage(&data).unwrap(), tree);
    }
}
