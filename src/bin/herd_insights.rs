// src/bin/herd_insights.rs
use anyhow::{Context, Result};
use log::{info, warn};
use serde_json::json;
use std::{env, fs, path::Path, time::Instant};

use herd_insights_lib::{ClusterRequest, ClusteringPipeline, PipelineConfig, RawRecord};

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    info!("Starting herd clustering run");
    let start_time = Instant::now();

    // Try to load .env file if it exists
    let env_paths = [".env", ".env.local", "../.env"];
    let mut loaded_env = false;

    for path in env_paths.iter() {
        if Path::new(path).exists() {
            if let Err(e) = dotenv::from_path(path) {
                warn!("Failed to load environment from {}: {}", path, e);
            } else {
                info!("Loaded environment variables from {}", path);
                loaded_env = true;
                break;
            }
        }
    }

    if !loaded_env {
        info!("No .env file found, using environment variables from system");
    }

    let config = PipelineConfig::from_env().context("Invalid pipeline configuration")?;
    let pipeline = ClusteringPipeline::new(config);

    let input_path = env::args()
        .nth(1)
        .or_else(|| env::var("HERD_INPUT_PATH").ok())
        .context("No input file given (pass a path or set HERD_INPUT_PATH)")?;
    let request = ClusterRequest {
        k: match env::var("HERD_CLUSTER_COUNT") {
            Ok(val) => val.parse().context("HERD_CLUSTER_COUNT must be an integer")?,
            Err(_) => pipeline.config().default_cluster_count,
        },
        include_dendrogram: env::var("HERD_INCLUDE_DENDROGRAM")
            .map(|v| matches!(v.as_str(), "1" | "true" | "True"))
            .unwrap_or(false),
    };

    let raw = fs::read_to_string(&input_path)
        .with_context(|| format!("Failed to read batch file {}", input_path))?;
    let records: Vec<RawRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of records", input_path))?;
    info!("Loaded {} records from {}", records.len(), input_path);

    match pipeline.run(&records, &request) {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            info!(
                "Clustered {} records into {} clusters in {:.2?}",
                result.clusters.len(),
                result.summaries.len(),
                start_time.elapsed()
            );
            Ok(())
        }
        Err(e) => {
            let body = json!({
                "error": e.to_string(),
                "kind": e.kind(),
                "missing": e.offending_fields(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
            Err(anyhow::Error::from(e).context("Clustering run failed"))
        }
    }
}
