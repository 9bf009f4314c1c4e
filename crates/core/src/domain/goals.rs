use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryGoal {
    WeightLoss,
    MuscleGain,
    Endurance,
    Strength,
    #[default]
    Maintenance,
    Performance,
}

impl PrimaryGoal {
    pub const ALL: [PrimaryGoal; 6] = [
        Self::WeightLoss,
        Self::MuscleGain,
        Self::Endurance,
        Self::Strength,
        Self::Maintenance,
        Self::Performance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WeightLoss => "weight_loss",
            Self::MuscleGain => "muscle_gain",
            Self::Endurance => "endurance",
            Self::Strength => "strength",
            Self::Maintenance => "maintenance",
            Self::Performance => "performance",
        }
    }
}

impl std::str::FromStr for PrimaryGoal {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weight_loss" => Ok(Self::WeightLoss),
            "muscle_gain" => Ok(Self::MuscleGain),
            "endurance" => Ok(Self::Endurance),
            "strength" => Ok(Self::Strength),
            "maintenance" => Ok(Self::Maintenance),
            "performance" => Ok(Self::Performance),
            other => {
                Err(DomainError::UnknownEnum { field: "primary_goal", value: other.to_string() })
            }
        }
    }
}

/// Daily macronutrient targets in grams.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroTargets {
    #[serde(default)]
    pub protein_g: f64,
    #[serde(default)]
    pub carbs_g: f64,
    #[serde(default)]
    pub fat_g: f64,
    #[serde(default)]
    pub fiber_g: f64,
}

pub const PROTEIN_KCAL_PER_G: f64 = 4.0;
pub const CARB_KCAL_PER_G: f64 = 4.0;
pub const FAT_KCAL_PER_G: f64 = 9.0;

impl MacroTargets {
    /// Total energy of the three caloric macros.
    pub fn energy_kcal(&self) -> f64 {
        self.protein_g * PROTEIN_KCAL_PER_G
            + self.carbs_g * CARB_KCAL_PER_G
            + self.fat_g * FAT_KCAL_PER_G
    }

    /// Every gram value must be non-negative and the macro energy must match
    /// the calorie target within `tolerance` (fractional, e.g. 0.02).
    pub fn validate_against(&self, calorie_target: f64, tolerance: f64) -> Result<(), DomainError> {
        if self.protein_g < 0.0 || self.carbs_g < 0.0 || self.fat_g < 0.0 || self.fiber_g < 0.0 {
            return Err(DomainError::InvariantViolation(
                "macro targets must be non-negative".to_string(),
            ));
        }
        if calorie_target <= 0.0 {
            return Err(DomainError::InvariantViolation(
                "daily calorie target must be positive".to_string(),
            ));
        }
        let drift = (self.energy_kcal() - calorie_target).abs() / calorie_target;
        if drift > tolerance {
            return Err(DomainError::InvariantViolation(format!(
                "macro energy {:.0} kcal drifts {:.1}% from the {:.0} kcal target",
                self.energy_kcal(),
                drift * 100.0,
                calorie_target
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Goals {
    #[serde(default)]
    pub primary_goal: PrimaryGoal,
    #[serde(default)]
    pub target_weight_kg: Option<f64>,
    #[serde(default)]
    pub target_body_fat_percentage: Option<f64>,
    #[serde(default)]
    pub performance_goals: Vec<String>,
    #[serde(default)]
    pub timeline: Option<String>,
    #[serde(default)]
    pub daily_calorie_target: Option<f64>,
    #[serde(default)]
    pub macro_targets: Option<MacroTargets>,
}

impl Default for Goals {
    fn default() -> Self {
        Self {
            primary_goal: PrimaryGoal::Maintenance,
            target_weight_kg: None,
            target_body_fat_percentage: None,
            performance_goals: Vec::new(),
            timeline: None,
            daily_calorie_target: None,
            macro_targets: None,
        }
    }
}
