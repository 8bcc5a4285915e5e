// src/scaling.rs
use log::{debug, warn};

use crate::models::{
    ColumnScaling, FeatureVector, Field, NormalizedRecord, ScalingParameters, FEATURE_COUNT,
};

/// Standardized features for one batch together with the parameters used
#[derive(Debug, Clone)]
pub struct ScaledBatch {
    pub features: Vec<FeatureVector>,
    pub parameters: ScalingParameters,
}

/// Imputes missing cells with the column median, then standardizes every
/// column to zero mean and unit (sample) standard deviation.
///
/// A constant column keeps `std = 1` and its mean equal to the shared value,
/// so every standardized entry is exactly zero. A column with no values at
/// all is imputed with 0 and therefore also ends up constant.
pub fn scale_features(records: &[NormalizedRecord]) -> ScaledBatch {
    let n = records.len();
    let mut matrix = vec![vec![0.0; FEATURE_COUNT]; n];
    let mut columns = Vec::with_capacity(FEATURE_COUNT);

    for (col, field) in Field::FEATURES.iter().enumerate() {
        let present: Vec<f64> = records.iter().filter_map(|r| r.values[col].value()).collect();
        let median = median(&present).unwrap_or_else(|| {
            if n > 0 {
                warn!("Column {} has no usable values; imputing 0", field.as_str());
            }
            0.0
        });

        let completed: Vec<f64> = records
            .iter()
            .map(|r| r.values[col].value().unwrap_or(median))
            .collect();
        let (mean, std) = mean_and_std(&completed);

        for (row, value) in completed.iter().enumerate() {
            matrix[row][col] = (value - mean) / std;
        }

        debug!(
            "{}: median={:.4} mean={:.4} std={:.4} imputed={}",
            field.as_str(),
            median,
            mean,
            std,
            n - present.len()
        );
        columns.push(ColumnScaling {
            field: *field,
            median,
            mean,
            std,
        });
    }

    ScaledBatch {
        features: matrix.into_iter().map(FeatureVector).collect(),
        parameters: ScalingParameters { columns },
    }
}

/// Median of the given values, averaging the two middle values for even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Mean and sample standard deviation, with a zero deviation replaced by 1.
fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let Some(&first) = values.first() else {
        return (0.0, 1.0);
    };
    // Constant columns are detected directly so rounding in the mean cannot
    // leave a tiny non-zero deviation behind.
    if values.iter().all(|v| *v == first) {
        return (first, 1.0);
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = variance.sqrt();
    if std == 0.0 {
        (mean, 1.0)
    } else {
        (mean, std)
    }
}
