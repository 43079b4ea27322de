//! Rule-based relapse risk estimate for substance-use-disorder patients.

use super::{FeatureSchema, Features, Prediction, RiskModel};

pub const GENDERS: &[&str] = &["Male", "Female"];
pub const SUBSTANCE_TYPES: &[&str] = &[
    "Alcohol",
    "Cannabis",
    "Opioids",
    "Cocaine",
    "Methamphetamine",
    "Polysubstance",
];
pub const TREATMENT_TYPES: &[&str] = &[
    "Residential Rehab",
    "Detox",
    "Counseling",
    "Medication-Assisted Treatment (MAT)",
];
pub const SUPPORT_SYSTEMS: &[&str] = &["Strong", "Moderate", "Weak"];
pub const TREATMENT_OUTCOMES: &[&str] = &["Ongoing", "Recovered", "Relapsed"];

const HIGH_RISK_SUBSTANCES: &[&str] = &["Cocaine", "Methamphetamine"];

/// Ordered rules; the first match wins.
///
/// 1. Ongoing treatment, a weak support system, or a stimulant → High (0.85)
/// 2. A relapsed outcome or age over 50 → Medium (0.65)
/// 3. Otherwise → Low (0.95)
pub struct RelapseRiskHeuristic {
    schema: FeatureSchema,
}

impl RelapseRiskHeuristic {
    pub fn new() -> Self {
        Self {
            schema: FeatureSchema::new()
                .numeric("age", 0.0, 120.0)
                .categorical("gender", GENDERS)
                .categorical("substance_type", SUBSTANCE_TYPES)
                .categorical("treatment_type", TREATMENT_TYPES)
                .categorical("support_system", SUPPORT_SYSTEMS)
                .categorical("treatment_outcome", TREATMENT_OUTCOMES),
        }
    }
}

impl Default for RelapseRiskHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskModel for RelapseRiskHeuristic {
    fn name(&self) -> &str {
        "relapse_risk_heuristic"
    }

    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn score(&self, features: &Features) -> Prediction {
        let outcome = features.category("treatment_outcome").unwrap_or_default();
        let support = features.category("support_system").unwrap_or_default();
        let substance = features.category("substance_type").unwrap_or_default();
        let age = features.numeric("age").unwrap_or_default();

        if outcome == "Ongoing" || support == "Weak" || HIGH_RISK_SUBSTANCES.contains(&substance) {
            Prediction::new("High", 0.85)
        } else if outcome == "Relapsed" || age > 50.0 {
            Prediction::new("Medium", 0.65)
        } else {
            Prediction::new("Low", 0.95)
        }
    }
}
