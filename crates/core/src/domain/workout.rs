use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutType {
    Cardio,
    Strength,
    Flexibility,
    SportSpecific,
    Recovery,
}

impl std::str::FromStr for WorkoutType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cardio" => Ok(Self::Cardio),
            "strength" => Ok(Self::Strength),
            "flexibility" => Ok(Self::Flexibility),
            "sport_specific" => Ok(Self::SportSpecific),
            "recovery" => Ok(Self::Recovery),
            other => {
                Err(DomainError::UnknownEnum { field: "workout_type", value: other.to_string() })
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Low,
    #[default]
    Moderate,
    High,
    Max,
}

impl std::str::FromStr for Intensity {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "moderate" => Ok(Self::Moderate),
            "high" => Ok(Self::High),
            "max" => Ok(Self::Max),
            other => {
                Err(DomainError::UnknownEnum { field: "intensity", value: other.to_string() })
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    #[serde(default)]
    pub sets: Option<u32>,
    #[serde(default)]
    pub reps: Option<u32>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub duration_minutes: Option<f64>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub calories_burned: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkoutEntry {
    pub id: String,
    pub date: DateTime<Utc>,
    pub workout_type: WorkoutType,
    pub duration_minutes: f64,
    pub intensity: Intensity,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub energy_level: Option<u8>,
    #[serde(default)]
    pub recovery_rating: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Workouts {
    #[serde(default)]
    pub logged_workouts: Vec<WorkoutEntry>,
    #[serde(default)]
    pub planned_workouts: Vec<WorkoutEntry>,
}
