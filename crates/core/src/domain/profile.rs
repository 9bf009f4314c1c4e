use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Self-reported activity level, in ascending order of energy expenditure.
/// The ordering matters: activity multipliers must be monotonic across it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    LightlyActive,
    ModeratelyActive,
    VeryActive,
    ExtremelyActive,
}

impl ActivityLevel {
    pub const ALL: [ActivityLevel; 5] = [
        Self::Sedentary,
        Self::LightlyActive,
        Self::ModeratelyActive,
        Self::VeryActive,
        Self::ExtremelyActive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sedentary => "sedentary",
            Self::LightlyActive => "lightly_active",
            Self::ModeratelyActive => "moderately_active",
            Self::VeryActive => "very_active",
            Self::ExtremelyActive => "extremely_active",
        }
    }
}

impl std::str::FromStr for ActivityLevel {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sedentary" => Ok(Self::Sedentary),
            "lightly_active" => Ok(Self::LightlyActive),
            "moderately_active" => Ok(Self::ModeratelyActive),
            "very_active" => Ok(Self::VeryActive),
            "extremely_active" => Ok(Self::ExtremelyActive),
            other => Err(DomainError::UnknownActivityLevel(other.to_string())),
        }
    }
}

/// Declared gender category. Only used to pick the BMR equation branch;
/// `Other` deliberately falls back to an averaged constant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Other,
}

impl std::str::FromStr for Gender {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            "other" | "not_specified" | "non_binary" => Ok(Self::Other),
            other => Err(DomainError::UnknownEnum { field: "gender", value: other.to_string() }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default = "default_activity_level")]
    pub activity_level: ActivityLevel,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default = "default_experience_level")]
    pub experience_level: String,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
}

fn default_activity_level() -> ActivityLevel {
    ActivityLevel::ModeratelyActive
}

fn default_experience_level() -> String {
    "beginner".to_string()
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: None,
            age: None,
            gender: Gender::Other,
            height_cm: None,
            weight_kg: None,
            activity_level: default_activity_level(),
            sport: None,
            experience_level: default_experience_level(),
            dietary_restrictions: Vec::new(),
            allergies: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ActivityLevel, Gender};
    use crate::errors::DomainError;

    #[test]
    fn activity_levels_parse_round_trip() {
        for level in ActivityLevel::ALL {
            let parsed: ActivityLevel = level.as_str().parse().expect("known level");
            assert_eq!(parsed, level);
        }
    }

    #[test]
    fn unknown_activity_level_is_rejected() {
        let error = "super_active".parse::<ActivityLevel>().expect_err("should reject");
        assert_eq!(error, DomainError::UnknownActivityLevel("super_active".to_string()));
    }

    #[test]
    fn activity_levels_are_ordered() {
        assert!(ActivityLevel::Sedentary < ActivityLevel::ExtremelyActive);
    }

    #[test]
    fn gender_accepts_common_spellings() {
        assert_eq!("Male".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!("not_specified".parse::<Gender>().unwrap(), Gender::Other);
        assert!("xyz".parse::<Gender>().is_err());
    }
}
