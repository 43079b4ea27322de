//! Risk Model contract: a pre-trained classifier consumed through a fixed
//! feature schema.
//!
//! Feature names are exact and case-sensitive. Input that does not match the
//! schema is rejected with a `FeatureMismatchError` before any prediction is
//! made; no renaming or coercion is attempted.

pub mod dashboard;
pub mod heuristic;

pub use dashboard::{PatientRecord, RiskDashboard, ScoredPatient};
pub use heuristic::RelapseRiskHeuristic;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::FeatureMismatchError;

/// Model output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    /// In `[0, 1]`.
    pub confidence: f64,
}

impl Prediction {
    pub fn new(label: &str, confidence: f64) -> Self {
        Self {
            label: label.to_string(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Kind and domain of one feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureSpec {
    Categorical { options: Vec<String> },
    Numeric { min: f64, max: f64 },
}

/// A checked feature value.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Category(String),
    Numeric(f64),
}

/// Features that passed `FeatureSchema::check`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Features(BTreeMap<String, FeatureValue>);

impl Features {
    pub fn category(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(FeatureValue::Category(c)) => Some(c),
            _ => None,
        }
    }

    pub fn numeric(&self, name: &str) -> Option<f64> {
        match self.0.get(name) {
            Some(FeatureValue::Numeric(n)) => Some(*n),
            _ => None,
        }
    }
}

/// Ordered list of the features a model expects.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureSchema {
    features: Vec<(String, FeatureSpec)>,
}

impl FeatureSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn categorical(mut self, name: &str, options: &[&str]) -> Self {
        self.features.push((
            name.to_string(),
            FeatureSpec::Categorical {
                options: options.iter().map(|o| o.to_string()).collect(),
            },
        ));
        self
    }

    pub fn numeric(mut self, name: &str, min: f64, max: f64) -> Self {
        self.features
            .push((name.to_string(), FeatureSpec::Numeric { min, max }));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|(n, _)| n.as_str())
    }

    pub fn spec(&self, name: &str) -> Option<&FeatureSpec> {
        self.features
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    /// Check raw input against the schema. Reports the first problem found:
    /// missing keys in schema order, then unexpected keys, then values.
    pub fn check(&self, raw: &Map<String, Value>) -> Result<Features, FeatureMismatchError> {
        if let Some(missing) = self.names().find(|n| !raw.contains_key(*n)) {
            return Err(FeatureMismatchError::Missing(missing.to_string()));
        }
        if let Some(extra) = raw.keys().find(|k| self.spec(k).is_none()) {
            return Err(FeatureMismatchError::Unexpected(extra.clone()));
        }

        let mut checked = BTreeMap::new();
        for (name, spec) in &self.features {
            let value = &raw[name.as_str()];
            let feature = match spec {
                FeatureSpec::Categorical { options } => {
                    let s = value.as_str().ok_or_else(|| FeatureMismatchError::WrongType {
                        name: name.clone(),
                        expected: "a string".into(),
                    })?;
                    if !options.iter().any(|o| o == s) {
                        return Err(FeatureMismatchError::UnknownCategory {
                            name: name.clone(),
                            value: s.to_string(),
                        });
                    }
                    FeatureValue::Category(s.to_string())
                }
                FeatureSpec::Numeric { min, max } => {
                    let n = value.as_f64().ok_or_else(|| FeatureMismatchError::WrongType {
                        name: name.clone(),
                        expected: "a number".into(),
                    })?;
                    if n < *min || n > *max {
                        return Err(FeatureMismatchError::OutOfRange {
                            name: name.clone(),
                            value: n,
                            min: *min,
                            max: *max,
                        });
                    }
                    FeatureValue::Numeric(n)
                }
            };
            checked.insert(name.clone(), feature);
        }
        Ok(Features(checked))
    }
}

/// A pre-trained classifier. Implementations never see unchecked input.
pub trait RiskModel: Send + Sync {
    fn name(&self) -> &str;

    fn schema(&self) -> &FeatureSchema;

    /// Score checked features.
    fn score(&self, features: &Features) -> Prediction;

    /// Check `raw` against the schema, then score it.
    fn predict(&self, raw: &Map<String, Value>) -> Result<Prediction, FeatureMismatchError> {
        let features = self.schema().check(raw)?;
        Ok(self.score(&features))
    }
}
