// src/lib.rs
pub mod cluster_extraction;
pub mod config;
pub mod dendrogram;
pub mod error;
pub mod linkage;
pub mod models;
pub mod pipeline;
pub mod recommendation;
pub mod scaling;
pub mod schema;
pub mod summary;

// Re-export common types for easier access
pub use error::PipelineError;
pub use models::{
    AnimalId, ClusterAssignment, ClusterMembership, ClusterRequest, ClusterSummary,
    ClusteringResult, Field, LinkageStep, ParseOutcome, RawRecord,
};

// Re-export important functionality
pub use config::PipelineConfig;
pub use pipeline::ClusteringPipeline;
