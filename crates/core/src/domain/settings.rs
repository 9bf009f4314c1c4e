use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitSettings {
    #[serde(default = "default_weight_unit")]
    pub weight: String,
    #[serde(default = "default_distance_unit")]
    pub distance: String,
    #[serde(default = "default_temperature_unit")]
    pub temperature: String,
}

fn default_weight_unit() -> String {
    "kg".to_string()
}

fn default_distance_unit() -> String {
    "km".to_string()
}

fn default_temperature_unit() -> String {
    "celsius".to_string()
}

impl Default for UnitSettings {
    fn default() -> Self {
        Self {
            weight: default_weight_unit(),
            distance: default_distance_unit(),
            temperature: default_temperature_unit(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(default = "default_true")]
    pub meal_reminders: bool,
    #[serde(default = "default_true")]
    pub workout_reminders: bool,
    #[serde(default = "default_true")]
    pub hydration_reminders: bool,
    #[serde(default = "default_true")]
    pub progress_check_ins: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            meal_reminders: true,
            workout_reminders: true,
            hydration_reminders: true,
            progress_check_ins: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrivacySettings {
    #[serde(default)]
    pub share_data: bool,
    #[serde(default = "default_true")]
    pub analytics: bool,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self { share_data: false, analytics: true }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub units: UnitSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub privacy: PrivacySettings,
}
