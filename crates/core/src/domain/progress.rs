use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyMeasurement {
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub body_fat_percentage: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetric {
    pub date: DateTime<Utc>,
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnergyMoodEntry {
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub energy_level: Option<u8>,
    #[serde(default)]
    pub mood: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressTracking {
    #[serde(default)]
    pub body_measurements: Vec<BodyMeasurement>,
    #[serde(default)]
    pub performance_metrics: Vec<PerformanceMetric>,
    #[serde(default)]
    pub energy_mood_tracking: Vec<EnergyMoodEntry>,
}
