use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::calendar::Calendar;
use crate::domain::conversation::AiContext;
use crate::domain::goals::Goals;
use crate::domain::nutrition::Nutrition;
use crate::domain::profile::UserProfile;
use crate::domain::progress::ProgressTracking;
use crate::domain::settings::Settings;
use crate::domain::workout::Workouts;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipes {
    #[serde(default)]
    pub saved_recipes: Vec<Value>,
}

/// The root aggregate: all state for one athlete, serialized as one JSON
/// document per `user_id`.
///
/// `user_id` and `created_at` are the only fields required on read; every
/// other field defaults so documents written by older builds still load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserDocument {
    pub user_id: String,
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default)]
    pub goals: Goals,
    #[serde(default)]
    pub workouts: Workouts,
    #[serde(default)]
    pub nutrition: Nutrition,
    #[serde(default)]
    pub recipes: Recipes,
    #[serde(default)]
    pub calendar: Calendar,
    #[serde(default)]
    pub progress_tracking: ProgressTracking,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub ai_context: AiContext,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,
}

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

impl UserDocument {
    /// A fresh document with schema defaults and empty collections.
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            profile: UserProfile::default(),
            goals: Goals::default(),
            workouts: Workouts::default(),
            nutrition: Nutrition::default(),
            recipes: Recipes::default(),
            calendar: Calendar::default(),
            progress_tracking: ProgressTracking::default(),
            settings: Settings::default(),
            ai_context: AiContext::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance `updated_at`, strictly monotonically. A wall clock that
    /// stalls or steps backwards still yields a value greater than the
    /// previous one.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::milliseconds(1)
        };
    }
}
