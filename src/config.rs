// src/config.rs
use anyhow::Result;
use std::env;

// Cluster count used when the caller does not supply one
pub const DEFAULT_CLUSTER_COUNT: usize = 3;

// Upper bound on records per batch. Ward linkage is cubic in the batch size.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 1000;

// Clustering needs at least one merge
pub const MIN_RECORDS_FOR_CLUSTERING: usize = 2;

// Thresholds for the recommendation rules, applied to raw cluster means
pub const PARASITE_LOAD_THRESHOLD: f64 = 3.5;
pub const FECAL_EGG_COUNT_THRESHOLD: f64 = 200.0;
pub const MOVEMENT_SCORE_THRESHOLD: f64 = 4.0;
pub const MILK_YIELD_THRESHOLD: f64 = 15.0;
pub const EAR_TEMPERATURE_THRESHOLD_C: f64 = 39.0;

/// Pipeline-wide settings shared by every batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub default_cluster_count: usize,
    pub max_batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_cluster_count: DEFAULT_CLUSTER_COUNT,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        Ok(PipelineConfig {
            default_cluster_count: env::var("HERD_DEFAULT_CLUSTERS")
                .unwrap_or_else(|_| DEFAULT_CLUSTER_COUNT.to_string())
                .parse()?,
            max_batch_size: env::var("HERD_MAX_BATCH_SIZE")
                .unwrap_or_else(|_| DEFAULT_MAX_BATCH_SIZE.to_string())
                .parse()?,
        })
    }
}
