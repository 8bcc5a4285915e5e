// src/summary.rs
use crate::models::{ClusterAssignment, Field, FieldMeans, NormalizedRecord};

/// Descriptive statistics for one flat cluster, over raw field values
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterStatistics {
    pub cluster_id: usize,
    pub count: usize,
    pub means: FieldMeans,
}

/// Computes per-cluster means of the unstandardized fields, in ascending
/// label order.
///
/// Records are the normalized but not yet imputed rows, so a missing cell
/// does not contribute to its field's mean. A field with no values among the
/// members has mean `None`.
pub fn aggregate(
    records: &[NormalizedRecord],
    assignment: &ClusterAssignment,
) -> Vec<ClusterStatistics> {
    let mut labels: Vec<usize> = assignment.labels.clone();
    labels.sort_unstable();
    labels.dedup();

    labels
        .into_iter()
        .map(|cluster_id| {
            let members: Vec<&NormalizedRecord> = assignment
                .members(cluster_id)
                .filter_map(|idx| records.get(idx))
                .collect();

            let means = Field::SUMMARY
                .iter()
                .map(|field| {
                    let present: Vec<f64> =
                        members.iter().filter_map(|r| r.get(*field).value()).collect();
                    let mean = (!present.is_empty())
                        .then(|| present.iter().sum::<f64>() / present.len() as f64);
                    (*field, mean)
                })
                .collect();

            ClusterStatistics {
                cluster_id,
                count: members.len(),
                means,
            }
        })
        .collect()
}
