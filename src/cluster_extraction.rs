// src/cluster_extraction.rs
use log::{debug, warn};
use petgraph::unionfind::UnionFind;
use std::collections::HashMap;

use crate::error::PipelineError;
use crate::linkage::LinkageTree;
use crate::models::ClusterAssignment;

/// Number of flat clusters a tree with `leaf_count` leaves can provide for `k`
pub fn effective_cluster_count(leaf_count: usize, k: usize) -> usize {
    k.min(leaf_count)
}

/// Cuts the merge tree into `min(k, leaves)` flat clusters.
///
/// Ward merge costs never decrease along the sequence, so replaying the first
/// `leaves - m` merges is the same as cutting below the smallest height that
/// leaves at most `m` groups. On exact ties at the cut height the replay
/// still stops at exactly `m` groups.
///
/// Labels run `1..=m` and are numbered in order of first appearance in the
/// input rows.
pub fn extract_clusters(tree: &LinkageTree, k: usize) -> Result<ClusterAssignment, PipelineError> {
    if k == 0 {
        return Err(PipelineError::invalid_parameter(
            "k (cluster count) must be at least 1",
        ));
    }

    let n = tree.leaf_count;
    let m = effective_cluster_count(n, k);
    if m < k {
        warn!(
            "Requested {} clusters but the batch only has {} records; capping",
            k, n
        );
    }

    // Each tree node is represented by one of its leaves
    let mut representative: Vec<usize> = (0..n).collect();
    representative.reserve(tree.steps.len());
    let mut components = UnionFind::<usize>::new(n);

    for (idx, step) in tree.steps.iter().enumerate() {
        let (left, right) = (representative[step.left], representative[step.right]);
        representative.push(left);
        if idx < n - m {
            components.union(left, right);
        }
    }

    let mut labels_by_root: HashMap<usize, usize> = HashMap::new();
    let labels: Vec<usize> = (0..n)
        .map(|leaf| {
            let root = components.find(leaf);
            let next_label = labels_by_root.len() + 1;
            *labels_by_root.entry(root).or_insert(next_label)
        })
        .collect();

    debug!(
        "Cut tree with {} leaves into {} clusters",
        n,
        labels_by_root.len()
    );

    Ok(ClusterAssignment {
        labels,
        cluster_count: labels_by_root.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linkage::ward_linkage;
    use crate::models::FeatureVector;

    fn tree(points: &[f64]) -> LinkageTree {
        let rows: Vec<FeatureVector> = points.iter().map(|p| FeatureVector(vec![*p])).collect();
        ward_linkage(&rows).unwrap()
    }

    #[test]
    fn test_zero_k_is_invalid() {
        let err = extract_clusters(&tree(&[1.0, 2.0]), 0).unwrap_err();
        assert_eq!(err.kind(), "invalid_parameter");
    }

    #[test]
    fn test_cut_produces_exactly_k_groups() {
        let t = tree(&[0.0, 0.1, 5.0, 5.2, 20.0]);
        let assignment = extract_clusters(&t, 3).unwrap();
        assert_eq!(assignment.labels, vec![1, 1, 2, 2, 3]);
        assert_eq!(assignment.cluster_count, 3);

        let two = extract_clusters(&t, 2).unwrap();
        assert_eq!(two.labels, vec![1, 1, 1, 1, 2]);
    }

    #[test]
    fn test_labels_follow_first_appearance() {
        let t = tree(&[20.0, 0.0, 20.1, 0.2]);
        let assignment = extract_clusters(&t, 2).unwrap();
        assert_eq!(assignment.labels, vec![1, 2, 1, 2]);
        assert_eq!(assignment.members(2).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_k_capped_at_record_count() {
        let t = tree(&[1.0, 2.0, 3.0]);
        let assignment = extract_clusters(&t, 10).unwrap();
        assert_eq!(assignment.labels, vec![1, 2, 3]);
        assert_eq!(effective_cluster_count(3, 10), 3);
    }

    #[test]
    fn test_single_cluster() {
        let t = tree(&[1.0, 7.0, 3.0]);
        let assignment = extract_clusters(&t, 1).unwrap();
        assert_eq!(assignment.labels, vec![1, 1, 1]);
    }

    #[test]
    fn test_tied_distances_still_yield_k_groups() {
        // Four equidistant pairs along a line
        let t = tree(&[0.0, 1.0, 2.0, 3.0]);
        let assignment = extract_clusters(&t, 3).unwrap();
        assert_eq!(assignment.cluster_count, 3);
        assert_eq!(assignment.labels, vec![1, 1, 2, 3]);
    }
}
