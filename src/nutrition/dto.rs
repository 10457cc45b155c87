use serde::Serialize;

use super::{
    aggregator::ProteinStatus,
    calculator::{ActivityLevel, Goal, ProteinInput, Sex},
};

/// Response of the stateless calculator.
#[derive(Debug, Serialize)]
pub struct ProteinRecommendation {
    pub recommended_protein_g: u32,
    pub multiplier: f64,
    pub weight_kg: f64,
    pub goal: Goal,
    pub activity_level: ActivityLevel,
    pub sex: Sex,
}

impl From<ProteinInput> for ProteinRecommendation {
    fn from(input: ProteinInput) -> Self {
        Self {
            recommended_protein_g: input.recommended_protein(),
            multiplier: input.multiplier(),
            weight_kg: input.weight_kg,
            goal: input.goal,
            activity_level: input.activity_level,
            sex: input.sex,
        }
    }
}

/// Protein target next to what was actually planned or eaten.
/// `recommended` is `None` when the profile lacks the data to compute one.
#[derive(Debug, Serialize)]
pub struct ProteinProgress {
    pub recommended: Option<u32>,
    pub consumed: f64,
    pub status: ProteinStatus,
}
