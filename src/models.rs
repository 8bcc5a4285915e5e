// src/models.rs

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::DEFAULT_CLUSTER_COUNT;
use crate::dendrogram::DendrogramData;
use crate::schema::BreedEncoding;

//------------------------------------------------------------------------------
// INPUT TYPES
//------------------------------------------------------------------------------

/// One loosely-typed animal record as delivered by the ingestion layer,
/// keyed by column name.
pub type RawRecord = Map<String, Value>;

/// Opaque animal identifier, echoed back to the caller exactly as received.
///
/// Uniqueness is not enforced: duplicates are clustered independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimalId(pub Value);

/// Columns of an animal record, in their canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "ID")]
    Id,
    Breed,
    Age,
    #[serde(rename = "Weight_kg")]
    WeightKg,
    #[serde(rename = "Milk_Yield")]
    MilkYield,
    #[serde(rename = "Fertility_Score")]
    FertilityScore,
    #[serde(rename = "Rumination_Minutes_Per_Day")]
    RuminationMinutesPerDay,
    #[serde(rename = "Ear_Temperature_C")]
    EarTemperatureC,
    #[serde(rename = "Parasite_Load_Index")]
    ParasiteLoadIndex,
    #[serde(rename = "Fecal_Egg_Count")]
    FecalEggCount,
    #[serde(rename = "Respiration_Rate_BPM")]
    RespirationRateBpm,
    #[serde(rename = "Forage_Quality_Index")]
    ForageQualityIndex,
    #[serde(rename = "Vaccination_Up_To_Date")]
    VaccinationUpToDate,
    #[serde(rename = "Movement_Score")]
    MovementScore,
    #[serde(rename = "Remaining_Months")]
    RemainingMonths,
}

/// Number of columns in a feature vector (every field except `ID`).
pub const FEATURE_COUNT: usize = 14;

impl Field {
    pub const ALL: [Field; 15] = [
        Field::Id,
        Field::Breed,
        Field::Age,
        Field::WeightKg,
        Field::MilkYield,
        Field::FertilityScore,
        Field::RuminationMinutesPerDay,
        Field::EarTemperatureC,
        Field::ParasiteLoadIndex,
        Field::FecalEggCount,
        Field::RespirationRateBpm,
        Field::ForageQualityIndex,
        Field::VaccinationUpToDate,
        Field::MovementScore,
        Field::RemainingMonths,
    ];

    /// Columns that make up the clustering space, in feature-vector order.
    pub const FEATURES: [Field; FEATURE_COUNT] = [
        Field::Breed,
        Field::Age,
        Field::WeightKg,
        Field::MilkYield,
        Field::FertilityScore,
        Field::RuminationMinutesPerDay,
        Field::EarTemperatureC,
        Field::ParasiteLoadIndex,
        Field::FecalEggCount,
        Field::RespirationRateBpm,
        Field::ForageQualityIndex,
        Field::VaccinationUpToDate,
        Field::MovementScore,
        Field::RemainingMonths,
    ];

    /// Columns averaged in cluster summaries. Breed is categorical and is left out.
    pub const SUMMARY: [Field; 13] = [
        Field::Age,
        Field::WeightKg,
        Field::MilkYield,
        Field::FertilityScore,
        Field::RuminationMinutesPerDay,
        Field::EarTemperatureC,
        Field::ParasiteLoadIndex,
        Field::FecalEggCount,
        Field::RespirationRateBpm,
        Field::ForageQualityIndex,
        Field::VaccinationUpToDate,
        Field::MovementScore,
        Field::RemainingMonths,
    ];

    /// Columns that must appear somewhere in the batch
    pub const REQUIRED: [Field; 2] = [Field::Id, Field::Breed];

    /// Column name as it appears in input records and in summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Id => "ID",
            Field::Breed => "Breed",
            Field::Age => "Age",
            Field::WeightKg => "Weight_kg",
            Field::MilkYield => "Milk_Yield",
            Field::FertilityScore => "Fertility_Score",
            Field::RuminationMinutesPerDay => "Rumination_Minutes_Per_Day",
            Field::EarTemperatureC => "Ear_Temperature_C",
            Field::ParasiteLoadIndex => "Parasite_Load_Index",
            Field::FecalEggCount => "Fecal_Egg_Count",
            Field::RespirationRateBpm => "Respiration_Rate_BPM",
            Field::ForageQualityIndex => "Forage_Quality_Index",
            Field::VaccinationUpToDate => "Vaccination_Up_To_Date",
            Field::MovementScore => "Movement_Score",
            Field::RemainingMonths => "Remaining_Months",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|field| field.as_str() == name)
    }

    /// Position of this field inside a feature vector, `None` for `ID`
    pub fn feature_index(&self) -> Option<usize> {
        Field::FEATURES.iter().position(|field| field == self)
    }
}

//------------------------------------------------------------------------------
// NORMALIZATION TYPES
//------------------------------------------------------------------------------

/// Result of parsing one cell. Malformed or absent cells are `Missing`
/// and get imputed later; they never fail the batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParseOutcome {
    Value(f64),
    Missing,
}

impl ParseOutcome {
    pub fn value(&self) -> Option<f64> {
        match self {
            ParseOutcome::Value(v) => Some(*v),
            ParseOutcome::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, ParseOutcome::Missing)
    }
}

/// A record with the full field set present and every cell coerced to a number.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub id: AnimalId,
    /// Indexed by [`Field::feature_index`]
    pub values: [ParseOutcome; FEATURE_COUNT],
}

impl NormalizedRecord {
    pub fn get(&self, field: Field) -> ParseOutcome {
        match field.feature_index() {
            Some(idx) => self.values[idx],
            None => ParseOutcome::Missing,
        }
    }
}

/// Per-column imputation and standardization parameters for one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnScaling {
    pub field: Field,
    pub median: f64,
    pub mean: f64,
    /// Already substituted with 1.0 when the column is constant
    pub std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalingParameters {
    pub columns: Vec<ColumnScaling>,
}

impl ScalingParameters {
    pub fn column(&self, field: Field) -> Option<&ColumnScaling> {
        self.columns.iter().find(|column| column.field == field)
    }
}

/// Standardized projection of one record, ordered as [`Field::FEATURES`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(pub Vec<f64>);

//------------------------------------------------------------------------------
// CLUSTERING TYPES
//------------------------------------------------------------------------------

/// One agglomeration step.
///
/// Leaves are numbered `0..n`; the cluster created by step `i` is `n + i`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkageStep {
    /// Smaller of the two merged cluster ids
    pub left: usize,
    pub right: usize,
    /// Ward merge cost on the height scale: sqrt(2 * increase in within-cluster SSE)
    pub distance: f64,
    /// Number of records in the merged cluster
    pub size: usize,
}

/// Flat cluster label (1-based) for every record, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAssignment {
    pub labels: Vec<usize>,
    pub cluster_count: usize,
}

impl ClusterAssignment {
    pub fn members(&self, label: usize) -> impl Iterator<Item = usize> + '_ {
        self.labels
            .iter()
            .enumerate()
            .filter(move |(_, l)| **l == label)
            .map(|(idx, _)| idx)
    }
}

//------------------------------------------------------------------------------
// OUTPUT TYPES
//------------------------------------------------------------------------------

/// Raw (unstandardized) mean per field; `None` when no member had a value.
pub type FieldMeans = BTreeMap<Field, Option<f64>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub cluster_id: usize,
    pub count: usize,
    #[serde(flatten)]
    pub means: FieldMeans,
    pub recommendation: String,
}

impl ClusterSummary {
    pub fn mean(&self, field: Field) -> Option<f64> {
        self.means.get(&field).copied().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterMembership {
    pub id: AnimalId,
    pub cluster: usize,
}

/// Caller-supplied parameters for one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterRequest {
    pub k: usize,
    pub include_dendrogram: bool,
}

impl Default for ClusterRequest {
    fn default() -> Self {
        Self {
            k: DEFAULT_CLUSTER_COUNT,
            include_dendrogram: false,
        }
    }
}

/// Values exposed for transparency only, never fed back into clustering
#[derive(Debug, Clone, Serialize)]
pub struct BatchDiagnostics {
    pub scaling: ScalingParameters,
    pub breed_codes: BreedEncoding,
}

/// Timing and bookkeeping for one batch run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub run_id: String,
    pub run_timestamp: NaiveDateTime,

    pub record_count: usize,
    pub requested_clusters: usize,
    pub effective_clusters: usize,

    pub normalization_time: f64,
    pub scaling_time: f64,
    pub linkage_time: f64,
    pub extraction_time: f64,
    pub summary_time: f64,
    pub total_processing_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusteringResult {
    pub clusters: Vec<ClusterMembership>,
    pub summaries: Vec<ClusterSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkage: Option<Vec<LinkageStep>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dendrogram: Option<DendrogramData>,
    pub diagnostics: BatchDiagnostics,
    pub stats: PipelineStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.as_str()), Some(field));
            let json = serde_json::to_value(field).unwrap();
            assert_eq!(json, Value::String(field.as_str().to_string()));
        }
        assert_eq!(Field::from_name("Milk_yield"), None);
    }

    #[test]
    fn test_feature_index_excludes_id() {
        assert_eq!(Field::Id.feature_index(), None);
        assert_eq!(Field::Breed.feature_index(), Some(0));
        assert_eq!(Field::RemainingMonths.feature_index(), Some(FEATURE_COUNT - 1));
        assert!(!Field::SUMMARY.contains(&Field::Breed));
    }

    #[test]
    fn test_summary_serializes_flat() {
        let mut means = FieldMeans::new();
        means.insert(Field::MilkYield, Some(11.0));
        means.insert(Field::FertilityScore, None);
        let summary = ClusterSummary {
            cluster_id: 2,
            count: 4,
            means,
            recommendation: "Review nutrition and milking protocol".to_string(),
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["cluster_id"], 2);
        assert_eq!(json["count"], 4);
        assert_eq!(json["Milk_Yield"], 11.0);
        assert!(json["Fertility_Score"].is_null());
        assert_eq!(summary.mean(Field::MilkYield), Some(11.0));
        assert_eq!(summary.mean(Field::FertilityScore), None);
    }
}
