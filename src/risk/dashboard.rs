//! Caseload dashboard: scores a batch of patient records and summarizes the
//! relapse-risk picture.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Prediction, RiskModel};
use crate::error::ValidationError;

pub const HIGH_RISK_LABEL: &str = "High";

/// One patient as submitted for the dashboard.
#[derive(Debug, Clone, Deserialize)]
pub struct PatientRecord {
    pub patient_id: String,
    pub features: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPatient {
    pub patient_id: String,
    pub substance_type: Option<String>,
    pub treatment_type: Option<String>,
    pub prediction: Prediction,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RiskDashboard {
    pub total: usize,
    /// Patient count per predicted label.
    pub distribution: BTreeMap<String, usize>,
    pub high_risk: Vec<ScoredPatient>,
    /// Patients at the requested level, when one was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered: Option<Vec<ScoredPatient>>,
}

impl RiskDashboard {
    /// Score every patient. A record that does not match the model's schema
    /// fails the whole batch and names the patient.
    pub fn build(
        model: &dyn RiskModel,
        patients: &[PatientRecord],
        level: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let mut scored = Vec::with_capacity(patients.len());
        for patient in patients {
            let features = model.schema().check(&patient.features).map_err(|e| {
                ValidationError::invalid(&format!("patient {}", patient.patient_id), e.to_string())
            })?;
            scored.push(ScoredPatient {
                patient_id: patient.patient_id.clone(),
                substance_type: features.category("substance_type").map(str::to_string),
                treatment_type: features.category("treatment_type").map(str::to_string),
                prediction: model.score(&features),
            });
        }

        let mut distribution = BTreeMap::new();
        for patient in &scored {
            *distribution
                .entry(patient.prediction.label.clone())
                .or_insert(0) += 1;
        }

        let at_level = |label: &str| -> Vec<ScoredPatient> {
            scored
                .iter()
                .filter(|p| p.prediction.label == label)
                .cloned()
                .collect()
        };

        Ok(Self {
            total: scored.len(),
            distribution,
            high_risk: at_level(HIGH_RISK_LABEL),
            filtered: level.map(at_level),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::risk::RelapseRiskHeuristic;

    fn patient(id: &str, substance: &str, support: &str, outcome: &str) -> PatientRecord {
        let features = json!({
            "age": 34,
            "gender": "Female",
            "substance_type": substance,
            "treatment_type": "Counseling",
            "support_system": support,
            "treatment_outcome": outcome,
        });
        PatientRecord {
            patient_id: id.into(),
            features: features.as_object().cloned().unwrap(),
        }
    }

    fn caseload() -> Vec<PatientRecord> {
        vec![
            patient("PID1", "Cocaine", "Strong", "Recovered"),
            patient("PID2", "Alcohol", "Strong", "Recovered"),
            patient("PID3", "Alcohol", "Moderate", "Relapsed"),
            patient("PID4", "Opioids", "Weak", "Recovered"),
        ]
    }

    #[test]
    fn counts_labels_and_lists_high_risk() {
        let dashboard =
            RiskDashboard::build(&RelapseRiskHeuristic::new(), &caseload(), None).unwrap();

        assert_eq!(dashboard.total, 4);
        assert_eq!(dashboard.distribution["High"], 2);
        assert_eq!(dashboard.distribution["Medium"], 1);
        assert_eq!(dashboard.distribution["Low"], 1);

        let high: Vec<&str> = dashboard.high_risk.iter().map(|p| p.patient_id.as_str()).collect();
        assert_eq!(high, vec!["PID1", "PID4"]);
        assert_eq!(dashboard.high_risk[0].substance_type.as_deref(), Some("Cocaine"));
        assert_eq!(dashboard.high_risk[0].treatment_type.as_deref(), Some("Counseling"));
        assert!(dashboard.filtered.is_none());
    }

    #[test]
    fn filter_selects_one_level() {
        let dashboard =
            RiskDashboard::build(&RelapseRiskHeuristic::new(), &caseload(), Some("Medium"))
                .unwrap();
        let filtered = dashboard.filtered.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].patient_id, "PID3");

        let none = RiskDashboard::build(&RelapseRiskHeuristic::new(), &caseload(), Some("Severe"))
            .unwrap();
        assert_eq!(none.filtered, Some(vec![]));
    }

    #[test]
    fn mismatched_record_names_the_patient() {
        let mut patients = caseload();
        patients[2].features.remove("age");

        let err = RiskDashboard::build(&RelapseRiskHeuristic::new(), &patients, None).unwrap_err();
        assert_eq!(err.to_string(), "patient PID3: missing feature 'age'");
    }

    #[test]
    fn empty_caseload() {
        let dashboard = RiskDashboard::build(&RelapseRiskHeuristic::new(), &[], None).unwrap();
        assert_eq!(dashboard, RiskDashboard::default());
    }
}
