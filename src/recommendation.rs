// src/recommendation.rs
use crate::config::{
    EAR_TEMPERATURE_THRESHOLD_C, FECAL_EGG_COUNT_THRESHOLD, MILK_YIELD_THRESHOLD,
    MOVEMENT_SCORE_THRESHOLD, PARASITE_LOAD_THRESHOLD,
};
use crate::models::{Field, FieldMeans};

/// Advisory attached to a cluster. Rules are independent; every rule that
/// applies fires, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    Deworming,
    PastureRotation,
    NutritionReview,
    FeverInspection,
    Routine,
}

impl Recommendation {
    pub fn message(&self) -> &'static str {
        match self {
            Recommendation::Deworming => "Consider deworming and fecal testing",
            Recommendation::PastureRotation => "Increase pasture rotation and monitor mobility",
            Recommendation::NutritionReview => "Review nutrition and milking protocol",
            Recommendation::FeverInspection => {
                "Inspect for fever/infection; check shelter and water"
            }
            Recommendation::Routine => "Normal indicators — continue routine management",
        }
    }
}

/// Evaluates the threshold rules against raw cluster means.
///
/// A `None` mean never satisfies a comparison, so a field with no data
/// cannot trigger its rule.
pub fn evaluate(means: &FieldMeans) -> Vec<Recommendation> {
    let mean = |field: Field| means.get(&field).copied().flatten();
    let above = |field: Field, threshold: f64| mean(field).is_some_and(|v| v > threshold);
    let below = |field: Field, threshold: f64| mean(field).is_some_and(|v| v < threshold);

    let mut recs = Vec::new();
    if above(Field::ParasiteLoadIndex, PARASITE_LOAD_THRESHOLD)
        || above(Field::FecalEggCount, FECAL_EGG_COUNT_THRESHOLD)
    {
        recs.push(Recommendation::Deworming);
    }
    if below(Field::MovementScore, MOVEMENT_SCORE_THRESHOLD) {
        recs.push(Recommendation::PastureRotation);
    }
    if below(Field::MilkYield, MILK_YIELD_THRESHOLD) {
        recs.push(Recommendation::NutritionReview);
    }
    if above(Field::EarTemperatureC, EAR_TEMPERATURE_THRESHOLD_C) {
        recs.push(Recommendation::FeverInspection);
    }
    if recs.is_empty() {
        recs.push(Recommendation::Routine);
    }
    recs
}

/// Single advisory string, messages joined with "; "
pub fn recommend(means: &FieldMeans) -> String {
    evaluate(means)
        .iter()
        .map(Recommendation::message)
        .collect::<Vec<_>>()
        .join("; ")
}
