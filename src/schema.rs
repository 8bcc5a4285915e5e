// src/schema.rs
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::PipelineError;
use crate::models::{
    AnimalId, Field, NormalizedRecord, ParseOutcome, RawRecord, FEATURE_COUNT,
};

/// Code given to records whose breed is absent or blank
pub const MISSING_BREED_CODE: i64 = -1;

/// Breed string -> integer code table, built once per batch.
///
/// Distinct breeds are numbered `0..` in lexicographic order, so the same
/// set of breeds always yields the same codes regardless of row order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreedEncoding {
    pub codes: BTreeMap<String, i64>,
    pub missing_code: i64,
}

impl BreedEncoding {
    fn from_breeds<'a>(breeds: impl Iterator<Item = &'a str>) -> Self {
        let distinct: BTreeSet<&str> = breeds.collect();
        let codes = distinct
            .into_iter()
            .enumerate()
            .map(|(code, breed)| (breed.to_string(), code as i64))
            .collect();
        Self {
            codes,
            missing_code: MISSING_BREED_CODE,
        }
    }

    pub fn code_for(&self, breed: Option<&str>) -> i64 {
        breed
            .and_then(|b| self.codes.get(b).copied())
            .unwrap_or(self.missing_code)
    }
}

/// Output of schema normalization for one batch
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    pub records: Vec<NormalizedRecord>,
    pub breed_encoding: BreedEncoding,
    /// Known fields that no record in the batch carried
    pub absent_fields: Vec<Field>,
}

/// Normalizes a batch so that every record exposes the full field set.
///
/// Fails only when a required column (`ID`, `Breed`) is absent from the
/// schema of the whole batch. Individual malformed cells become
/// [`ParseOutcome::Missing`].
pub fn normalize_batch(records: &[RawRecord]) -> Result<NormalizedBatch, PipelineError> {
    let cells: Vec<HashMap<Field, &Value>> = records.iter().map(index_record).collect();

    let present: BTreeSet<Field> = cells.iter().flat_map(|c| c.keys().copied()).collect();
    let missing: Vec<String> = Field::REQUIRED
        .iter()
        .filter(|field| !present.contains(field))
        .map(|field| field.as_str().to_string())
        .collect();
    if !missing.is_empty() {
        warn!("Batch schema is missing required columns: {:?}", missing);
        return Err(PipelineError::schema(missing));
    }

    let absent_fields: Vec<Field> = Field::ALL
        .iter()
        .copied()
        .filter(|field| !present.contains(field))
        .collect();
    if !absent_fields.is_empty() {
        debug!(
            "Columns absent from the whole batch, filled as missing: {:?}",
            absent_fields
        );
    }

    let breeds: Vec<Option<String>> = cells
        .iter()
        .map(|c| breed_text(c.get(&Field::Breed).copied()))
        .collect();
    let breed_encoding = BreedEncoding::from_breeds(breeds.iter().flatten().map(String::as_str));
    debug!(
        "Encoded {} distinct breeds for {} records",
        breed_encoding.codes.len(),
        records.len()
    );

    let normalized = cells
        .iter()
        .zip(&breeds)
        .map(|(cell, breed)| {
            let mut values = [ParseOutcome::Missing; FEATURE_COUNT];
            for (idx, field) in Field::FEATURES.iter().enumerate() {
                let raw = cell.get(field).copied();
                values[idx] = match field {
                    Field::Breed => {
                        ParseOutcome::Value(breed_encoding.code_for(breed.as_deref()) as f64)
                    }
                    Field::VaccinationUpToDate => ParseOutcome::Value(parse_vaccination(raw)),
                    _ => parse_numeric(raw),
                };
            }
            NormalizedRecord {
                id: AnimalId(cell.get(&Field::Id).map_or(Value::Null, |v| (*v).clone())),
                values,
            }
        })
        .collect();

    Ok(NormalizedBatch {
        records: normalized,
        breed_encoding,
        absent_fields,
    })
}

/// Maps known column names (ignoring surrounding whitespace) to their cells.
/// Unknown columns are dropped.
fn index_record(record: &RawRecord) -> HashMap<Field, &Value> {
    record
        .iter()
        .filter_map(|(key, value)| Field::from_name(key.trim()).map(|field| (field, value)))
        .collect()
}

fn breed_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Permissive numeric parser. Non-finite results count as missing.
pub fn parse_numeric(value: Option<&Value>) -> ParseOutcome {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => ParseOutcome::Value(v),
        _ => ParseOutcome::Missing,
    }
}

/// Coerces a boolean-like cell to 1.0 / 0.0. Anything unrecognized is 0.0.
pub fn parse_vaccination(value: Option<&Value>) -> f64 {
    let vaccinated = match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() == Some(1.0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("true") || s == "1"
        }
        _ => false,
    };
    if vaccinated {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_missing_required_columns_are_reported() {
        let records = vec![record(json!({"Age": 3})), record(json!({"Milk_Yield": 20}))];
        let err = normalize_batch(&records).unwrap_err();
        assert_eq!(
            err,
            PipelineError::schema(vec!["ID".to_string(), "Breed".to_string()])
        );
    }

    #[test]
    fn test_required_column_present_in_one_record_is_enough() {
        let records = vec![
            record(json!({"ID": 1, "Breed": "Angus"})),
            record(json!({"ID": 2})),
        ];
        let batch = normalize_batch(&records).unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(
            batch.records[1].get(Field::Breed),
            ParseOutcome::Value(MISSING_BREED_CODE as f64)
        );
        assert!(batch.absent_fields.contains(&Field::MilkYield));
        assert!(batch.records[0].get(Field::MilkYield).is_missing());
    }

    #[test]
    fn test_breed_codes_are_sorted_and_trimmed() {
        let records = vec![
            record(json!({"ID": "a", "Breed": "Jersey"})),
            record(json!({"ID": "b", "Breed": " Angus "})),
            record(json!({"ID": "c", "Breed": ""})),
            record(json!({"ID": "d", "Breed": "Jersey"})),
        ];
        let batch = normalize_batch(&records).unwrap();
        assert_eq!(batch.breed_encoding.codes.get("Angus"), Some(&0));
        assert_eq!(batch.breed_encoding.codes.get("Jersey"), Some(&1));

        let codes: Vec<f64> = batch
            .records
            .iter()
            .map(|r| r.get(Field::Breed).value().unwrap())
            .collect();
        assert_eq!(codes, vec![1.0, 0.0, -1.0, 1.0]);
    }

    #[test]
    fn test_vaccination_coercion() {
        let cases = [
            (json!(true), 1.0),
            (json!(false), 0.0),
            (json!("True"), 1.0),
            (json!("false"), 0.0),
            (json!(1), 1.0),
            (json!("0"), 0.0),
            (json!("maybe"), 0.0),
            (json!(2), 0.0),
            (Value::Null, 0.0),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_vaccination(Some(&input)), expected, "input {}", input);
        }
        assert_eq!(parse_vaccination(None), 0.0);
    }

    #[test]
    fn test_numeric_parser_is_permissive() {
        assert_eq!(parse_numeric(Some(&json!(12.5))), ParseOutcome::Value(12.5));
        assert_eq!(parse_numeric(Some(&json!(" 7 "))), ParseOutcome::Value(7.0));
        assert_eq!(parse_numeric(Some(&json!("1e2"))), ParseOutcome::Value(100.0));
        assert_eq!(parse_numeric(Some(&json!("n/a"))), ParseOutcome::Missing);
        assert_eq!(parse_numeric(Some(&json!("NaN"))), ParseOutcome::Missing);
        assert_eq!(parse_numeric(Some(&json!([1, 2]))), ParseOutcome::Missing);
        assert_eq!(parse_numeric(None), ParseOutcome::Missing);
    }

    #[test]
    fn test_id_is_echoed_unchanged() {
        let records = vec![
            record(json!({"ID": 17, "Breed": "Angus"})),
            record(json!({"ID": "cow-2", "Breed": "Angus"})),
        ];
        let batch = normalize_batch(&records).unwrap();
        assert_eq!(batch.records[0].id, AnimalId(json!(17)));
        assert_eq!(batch.records[1].id, AnimalId(json!("cow-2")));
    }
}
