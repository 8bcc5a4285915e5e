// src/pipeline.rs
use chrono::Utc;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::time::Instant;
use uuid::Uuid;

use crate::cluster_extraction::{effective_cluster_count, extract_clusters};
use crate::config::{PipelineConfig, MIN_RECORDS_FOR_CLUSTERING};
use crate::dendrogram;
use crate::error::PipelineError;
use crate::linkage::ward_linkage;
use crate::models::{
    BatchDiagnostics, ClusterMembership, ClusterRequest, ClusterSummary, ClusteringResult,
    NormalizedRecord, PipelineStats, RawRecord,
};
use crate::recommendation::recommend;
use crate::scaling::scale_features;
use crate::schema::normalize_batch;
use crate::summary::aggregate;

/// Runs the full analytics chain over one batch.
///
/// Holds only configuration; every intermediate structure is created per
/// call, so a single pipeline can serve concurrent batches.
#[derive(Debug, Clone, Default)]
pub struct ClusteringPipeline {
    config: PipelineConfig,
}

impl ClusteringPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Request using the configured default cluster count
    pub fn default_request(&self) -> ClusterRequest {
        ClusterRequest {
            k: self.config.default_cluster_count,
            include_dendrogram: false,
        }
    }

    /// Normalizes, standardizes, clusters and summarizes `records`.
    ///
    /// All validation happens before any clustering work; either the whole
    /// batch yields a result or an error is returned.
    pub fn run(
        &self,
        records: &[RawRecord],
        request: &ClusterRequest,
    ) -> Result<ClusteringResult, PipelineError> {
        if request.k == 0 {
            return Err(PipelineError::invalid_parameter(
                "k (cluster count) must be at least 1",
            ));
        }
        if records.is_empty() {
            return Err(PipelineError::EmptyBatch);
        }
        if records.len() > self.config.max_batch_size {
            return Err(PipelineError::BatchTooLarge {
                max: self.config.max_batch_size,
                actual: records.len(),
            });
        }

        let run_id = Uuid::new_v4().to_string();
        let run_timestamp = Utc::now().naive_utc();
        let start_time = Instant::now();
        info!(
            "Starting clustering run {} over {} records (k = {})",
            run_id,
            records.len(),
            request.k
        );

        // Phase 1: Schema normalization
        let phase_start = Instant::now();
        let normalized = normalize_batch(records)?;
        if normalized.records.len() < MIN_RECORDS_FOR_CLUSTERING {
            warn!(
                "Batch has {} usable records; at least {} are required",
                normalized.records.len(),
                MIN_RECORDS_FOR_CLUSTERING
            );
            return Err(PipelineError::insufficient_records(
                MIN_RECORDS_FOR_CLUSTERING,
                normalized.records.len(),
            ));
        }
        warn_on_duplicate_ids(&normalized.records);
        let normalization_time = phase_start.elapsed();
        debug!("Schema normalization finished in {:.2?}", normalization_time);

        // Phase 2: Imputation and standardization
        let phase_start = Instant::now();
        let scaled = scale_features(&normalized.records);
        let scaling_time = phase_start.elapsed();
        debug!("Feature scaling finished in {:.2?}", scaling_time);

        // Phase 3: Ward linkage
        let phase_start = Instant::now();
        let tree = ward_linkage(&scaled.features)?;
        let linkage_time = phase_start.elapsed();
        info!(
            "Linkage tree built in {:.2?} with {} merges",
            linkage_time,
            tree.steps.len()
        );

        // Phase 4: Flat cluster extraction
        let phase_start = Instant::now();
        let assignment = extract_clusters(&tree, request.k)?;
        let extraction_time = phase_start.elapsed();

        // Phase 5: Summaries and recommendations over raw values
        let phase_start = Instant::now();
        let summaries: Vec<ClusterSummary> = aggregate(&normalized.records, &assignment)
            .into_iter()
            .map(|stats| {
                let recommendation = recommend(&stats.means);
                ClusterSummary {
                    cluster_id: stats.cluster_id,
                    count: stats.count,
                    means: stats.means,
                    recommendation,
                }
            })
            .collect();
        let summary_time = phase_start.elapsed();

        let clusters: Vec<ClusterMembership> = normalized
            .records
            .iter()
            .zip(&assignment.labels)
            .map(|(record, label)| ClusterMembership {
                id: record.id.clone(),
                cluster: *label,
            })
            .collect();

        let dendrogram = request.include_dendrogram.then(|| dendrogram::layout(&tree));
        let linkage = request.include_dendrogram.then(|| tree.steps.clone());

        let stats = PipelineStats {
            run_id,
            run_timestamp,
            record_count: records.len(),
            requested_clusters: request.k,
            effective_clusters: effective_cluster_count(records.len(), request.k),
            normalization_time: normalization_time.as_secs_f64(),
            scaling_time: scaling_time.as_secs_f64(),
            linkage_time: linkage_time.as_secs_f64(),
            extraction_time: extraction_time.as_secs_f64(),
            summary_time: summary_time.as_secs_f64(),
            total_processing_time: start_time.elapsed().as_secs_f64(),
        };

        info!(
            "Run {} complete in {:.2?}: {} records in {} clusters",
            stats.run_id,
            start_time.elapsed(),
            stats.record_count,
            summaries.len()
        );

        Ok(ClusteringResult {
            clusters,
            summaries,
            linkage,
            dendrogram,
            diagnostics: BatchDiagnostics {
                scaling: scaled.parameters,
                breed_codes: normalized.breed_encoding,
            },
            stats,
        })
    }
}

/// Duplicate IDs are tolerated; both rows are clustered independently.
fn warn_on_duplicate_ids(records: &[NormalizedRecord]) {
    let mut seen = HashSet::new();
    let duplicates = records
        .iter()
        .filter(|r| !seen.insert(r.id.0.to_string()))
        .count();
    if duplicates > 0 {
        warn!(
            "Batch contains {} records with duplicate IDs; keeping all of them",
            duplicates
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(values: Vec<serde_json::Value>) -> Vec<RawRecord> {
        values
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_validation_order() {
        let pipeline = ClusteringPipeline::default();
        let zero_k = ClusterRequest {
            k: 0,
            include_dendrogram: false,
        };
        assert_eq!(
            pipeline.run(&[], &zero_k).unwrap_err().kind(),
            "invalid_parameter"
        );
        assert_eq!(
            pipeline.run(&[], &ClusterRequest::default()).unwrap_err(),
            PipelineError::EmptyBatch
        );

        let one = records(vec![json!({"ID": 1, "Breed": "Angus"})]);
        assert_eq!(
            pipeline.run(&one, &ClusterRequest::default()).unwrap_err(),
            PipelineError::insufficient_records(2, 1)
        );
    }

    #[test]
    fn test_batch_size_limit() {
        let pipeline = ClusteringPipeline::new(PipelineConfig {
            default_cluster_count: 3,
            max_batch_size: 2,
        });
        let batch = records(vec![
            json!({"ID": 1, "Breed": "Angus"}),
            json!({"ID": 2, "Breed": "Angus"}),
            json!({"ID": 3, "Breed": "Angus"}),
        ]);
        assert_eq!(
            pipeline.run(&batch, &pipeline.default_request()).unwrap_err(),
            PipelineError::BatchTooLarge { max: 2, actual: 3 }
        );
    }

    #[test]
    fn test_dendrogram_only_on_request() {
        let pipeline = ClusteringPipeline::default();
        let batch = records(vec![
            json!({"ID": 1, "Breed": "Angus", "Milk_Yield": 10}),
            json!({"ID": 2, "Breed": "Angus", "Milk_Yield": 30}),
            json!({"ID": 1, "Breed": "Angus", "Milk_Yield": 12}),
        ]);

        let plain = pipeline.run(&batch, &ClusterRequest::default()).unwrap();
        assert!(plain.linkage.is_none());
        assert!(plain.dendrogram.is_none());

        let with_tree = pipeline
            .run(
                &batch,
                &ClusterRequest {
                    k: 2,
                    include_dendrogram: true,
                },
            )
            .unwrap();
        assert_eq!(with_tree.linkage.as_ref().map(Vec::len), Some(2));
        assert_eq!(with_tree.dendrogram.as_ref().map(|d| d.leaves.len()), Some(3));
        // Duplicate IDs are kept
        assert_eq!(with_tree.clusters.len(), 3);
    }
}
