//! The closed set of actions the model may take against a user document.
//!
//! Every tool follows the same discipline: deserialize arguments strictly,
//! validate everything up front, then load-mutate-save in one pass. A tool
//! either applies its full effect or leaves the document untouched.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use repfuel_core::calculators::{
    adjust_calories_for_goal, apply_activity_multiplier, assess_adherence, estimate_bmr,
    estimate_workout_calories, recommend_macros, MACRO_ENERGY_TOLERANCE,
};
use repfuel_core::{
    generate_entry_id, ActivityLevel, DomainError, Exercise, Food, Gender, Intensity,
    MacroPolicy, MacroTargets, Meal, MealType, PrimaryGoal, ScheduledItem, WorkoutEntry,
    WorkoutType,
};
use repfuel_db::{DocumentStore, StoreError};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ToolError {
    /// Text safe to show the athlete. Internal detail stays in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidArguments(detail) => {
                format!("I couldn't make sense of part of that request ({detail}).")
            }
            Self::Domain(err) => err.user_message(),
            Self::Store(_) => {
                "I'm having trouble reaching your training data right now.".to_string()
            }
        }
    }

    /// Corrupt storage is the one condition a tool cannot degrade around.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Store(StoreError::Corruption { .. }))
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn execute(&self, user_id: &str, arguments: Value) -> Result<Value, ToolError>;
}

/// Closed registry: the planner may only name tools registered here.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// `(name, description)` pairs in stable order, for prompt assembly.
    pub fn catalog(&self) -> Vec<(&'static str, &'static str)> {
        self.tools.values().map(|tool| (tool.name(), tool.description())).collect()
    }

    /// The full production tool set.
    pub fn standard(store: Arc<dyn DocumentStore>, policy: MacroPolicy) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LogWorkoutTool { store: store.clone() }));
        registry.register(Arc::new(LogMealTool { store: store.clone() }));
        registry.register(Arc::new(SetGoalTool { store: store.clone(), policy }));
        registry.register(Arc::new(UpdateProfileTool { store: store.clone() }));
        registry.register(Arc::new(ScheduleItemTool { store: store.clone() }));
        registry.register(Arc::new(GetScheduleTool { store }));
        registry
    }
}

fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|err| ToolError::InvalidArguments(err.to_string()))
}

fn require_positive(field: &str, value: f64) -> Result<(), ToolError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ToolError::InvalidArguments(format!("{field} must be positive, got {value}")))
    }
}

fn require_non_negative(field: &str, value: f64) -> Result<(), ToolError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ToolError::InvalidArguments(format!("{field} must not be negative, got {value}")))
    }
}

fn require_rating(field: &str, value: Option<u8>) -> Result<(), ToolError> {
    match value {
        Some(rating) if !(1..=10).contains(&rating) => Err(ToolError::InvalidArguments(
            format!("{field} must be between 1 and 10, got {rating}"),
        )),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// log_workout

struct LogWorkoutTool {
    store: Arc<dyn DocumentStore>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LogWorkoutArgs {
    #[serde(rename = "type", alias = "workout_type")]
    workout_type: String,
    duration_minutes: f64,
    #[serde(default)]
    intensity: Option<String>,
    #[serde(default)]
    exercises: Vec<Exercise>,
    #[serde(default)]
    energy_level: Option<u8>,
    #[serde(default)]
    recovery_rating: Option<u8>,
    #[serde(default)]
    notes: Option<String>,
}

#[async_trait]
impl Tool for LogWorkoutTool {
    fn name(&self) -> &'static str {
        "log_workout"
    }

    fn description(&self) -> &'static str {
        "Record a completed workout: type, duration in minutes, optional \
         intensity, exercises, energy level and recovery rating (1-10), notes."
    }

    async fn execute(&self, user_id: &str, arguments: Value) -> Result<Value, ToolError> {
        let args: LogWorkoutArgs = parse_args(arguments)?;
        let workout_type = WorkoutType::from_str(&args.workout_type)?;
        let intensity = match &args.intensity {
            Some(raw) => Intensity::from_str(raw)?,
            None => Intensity::default(),
        };
        require_positive("duration_minutes", args.duration_minutes)?;
        require_rating("energy_level", args.energy_level)?;
        require_rating("recovery_rating", args.recovery_rating)?;
        for exercise in &args.exercises {
            if let Some(weight) = exercise.weight_kg {
                require_non_negative("exercise weight_kg", weight)?;
            }
            if let Some(duration) = exercise.duration_minutes {
                require_non_negative("exercise duration_minutes", duration)?;
            }
            if let Some(distance) = exercise.distance_km {
                require_non_negative("exercise distance_km", distance)?;
            }
        }

        let mut document = self.store.get_or_create(user_id).await?;
        let now = Utc::now();
        let estimated_calories = document
            .profile
            .weight_kg
            .map(|weight| estimate_workout_calories(&args.exercises, weight))
            .filter(|calories| *calories > 0.0);

        let entry = WorkoutEntry {
            id: generate_entry_id("workout", now),
            date: now,
            workout_type,
            duration_minutes: args.duration_minutes,
            intensity,
            exercises: args.exercises,
            energy_level: args.energy_level,
            recovery_rating: args.recovery_rating,
            notes: args.notes,
        };
        let snapshot = serde_json::to_value(&entry)
            .map_err(|err| ToolError::InvalidArguments(err.to_string()))?;
        document.workouts.logged_workouts.push(entry);
        self.store.save(&mut document).await?;

        Ok(json!({
            "entry_id": snapshot["id"],
            "workout": snapshot,
            "estimated_calories_burned": estimated_calories,
        }))
    }
}

// ---------------------------------------------------------------------------
// log_meal

struct LogMealTool {
    store: Arc<dyn DocumentStore>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LogMealArgs {
    #[serde(rename = "type", alias = "meal_type")]
    meal_type: String,
    foods: Vec<Food>,
    #[serde(default)]
    time: Option<DateTime<Utc>>,
}

#[async_trait]
impl Tool for LogMealTool {
    fn name(&self) -> &'static str {
        "log_meal"
    }

    fn description(&self) -> &'static str {
        "Record a meal: meal type (breakfast, lunch, dinner, snack, ...) and a \
         list of foods with calories and macros. Optional timestamp."
    }

    async fn execute(&self, user_id: &str, arguments: Value) -> Result<Value, ToolError> {
        let args: LogMealArgs = parse_args(arguments)?;
        let meal_type = MealType::from_str(&args.meal_type)?;
        if args.foods.is_empty() {
            return Err(ToolError::InvalidArguments("a meal needs at least one food".into()));
        }
        for food in &args.foods {
            require_positive(&format!("quantity of {}", food.name), food.quantity)?;
            require_non_negative(&format!("calories of {}", food.name), food.calories)?;
            for (field, value) in [
                ("protein_g", food.macros.protein_g),
                ("carbs_g", food.macros.carbs_g),
                ("fat_g", food.macros.fat_g),
                ("fiber_g", food.macros.fiber_g),
            ] {
                require_non_negative(&format!("{field} of {}", food.name), value)?;
            }
        }

        let mut document = self.store.get_or_create(user_id).await?;
        let time = args.time.unwrap_or_else(Utc::now);
        let total_calories: f64 = args.foods.iter().map(|food| food.calories).sum();
        let total_macros = args.foods.iter().fold(MacroTargets::default(), |acc, food| {
            MacroTargets {
                protein_g: acc.protein_g + food.macros.protein_g,
                carbs_g: acc.carbs_g + food.macros.carbs_g,
                fat_g: acc.fat_g + food.macros.fat_g,
                fiber_g: acc.fiber_g + food.macros.fiber_g,
            }
        });
        let meal = Meal {
            id: generate_entry_id("meal", time),
            meal_type,
            time,
            foods: args.foods,
            total_calories,
            total_macros,
        };
        let meal_id = meal.id.clone();

        let calorie_target = document.goals.daily_calorie_target;
        let macro_targets = document.goals.macro_targets;
        let day = document.nutrition.day_mut(time.date_naive());
        day.meals.push(meal);
        day.recompute_totals();
        day.adherence_to_goals =
            assess_adherence(&day.daily_totals, calorie_target, macro_targets.as_ref());

        let date = day.date;
        let daily_totals = day.daily_totals.clone();
        let adherence = day.adherence_to_goals.clone();
        self.store.save(&mut document).await?;

        Ok(json!({
            "meal_id": meal_id,
            "date": date,
            "daily_totals": daily_totals,
            "adherence_to_goals": adherence,
        }))
    }
}

// ---------------------------------------------------------------------------
// set_goal

struct SetGoalTool {
    store: Arc<dyn DocumentStore>,
    policy: MacroPolicy,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SetGoalArgs {
    #[serde(default)]
    primary_goal: Option<String>,
    #[serde(default)]
    target_weight_kg: Option<f64>,
    #[serde(default)]
    target_body_fat_percentage: Option<f64>,
    #[serde(default)]
    performance_goals: Option<Vec<String>>,
    #[serde(default)]
    timeline: Option<String>,
    #[serde(default)]
    daily_calorie_target: Option<f64>,
    #[serde(default)]
    macro_targets: Option<MacroTargets>,
}

#[async_trait]
impl Tool for SetGoalTool {
    fn name(&self) -> &'static str {
        "set_goal"
    }

    fn description(&self) -> &'static str {
        "Set or update training goals: primary goal (weight_loss, muscle_gain, \
         endurance, strength, maintenance, performance), target weight, body \
         fat, performance goals, timeline, calorie target, macro targets. \
         Calorie and macro targets are recomputed when only the goal changes."
    }

    async fn execute(&self, user_id: &str, arguments: Value) -> Result<Value, ToolError> {
        let args: SetGoalArgs = parse_args(arguments)?;
        let nothing_set = args.primary_goal.is_none()
            && args.target_weight_kg.is_none()
            && args.target_body_fat_percentage.is_none()
            && args.performance_goals.is_none()
            && args.timeline.is_none()
            && args.daily_calorie_target.is_none()
            && args.macro_targets.is_none();
        if nothing_set {
            return Err(ToolError::InvalidArguments("no goal fields were provided".into()));
        }

        let new_goal = args
            .primary_goal
            .as_deref()
            .map(PrimaryGoal::from_str)
            .transpose()?;
        if let Some(weight) = args.target_weight_kg {
            require_positive("target_weight_kg", weight)?;
        }
        if let Some(body_fat) = args.target_body_fat_percentage {
            if !(0.0..100.0).contains(&body_fat) {
                return Err(ToolError::InvalidArguments(format!(
                    "target_body_fat_percentage must be between 0 and 100, got {body_fat}"
                )));
            }
        }
        if let Some(target) = args.daily_calorie_target {
            require_positive("daily_calorie_target", target)?;
        }

        let mut document = self.store.get_or_create(user_id).await?;
        let mut goals = document.goals.clone();
        if let Some(goal) = new_goal {
            goals.primary_goal = goal;
        }
        if args.target_weight_kg.is_some() {
            goals.target_weight_kg = args.target_weight_kg;
        }
        if args.target_body_fat_percentage.is_some() {
            goals.target_body_fat_percentage = args.target_body_fat_percentage;
        }
        if let Some(performance_goals) = args.performance_goals {
            goals.performance_goals = performance_goals;
        }
        if args.timeline.is_some() {
            goals.timeline = args.timeline;
        }
        if args.daily_calorie_target.is_some() {
            goals.daily_calorie_target = args.daily_calorie_target;
        }

        let mut recomputed = false;
        match args.macro_targets {
            Some(macros) => {
                // Explicit macros must agree with whatever calorie target is
                // in effect, otherwise the document would violate its own plan.
                if let Some(target) = goals.daily_calorie_target {
                    macros.validate_against(target, MACRO_ENERGY_TOLERANCE)?;
                } else if macros.protein_g < 0.0
                    || macros.carbs_g < 0.0
                    || macros.fat_g < 0.0
                    || macros.fiber_g < 0.0
                {
                    return Err(ToolError::InvalidArguments(
                        "macro_targets must not be negative".into(),
                    ));
                }
                goals.macro_targets = Some(macros);
            }
            None if new_goal.is_some() || args.daily_calorie_target.is_some() => {
                // Goal or target moved without explicit macros: rebuild the plan
                // from the profile when it carries enough measurements.
                let derived_target = match goals.daily_calorie_target {
                    Some(target) => Some(target),
                    None => estimate_bmr(&document.profile)
                        .and_then(|bmr| {
                            apply_activity_multiplier(
                                bmr,
                                document.profile.activity_level.as_str(),
                            )
                        })
                        .map(|tdee| {
                            adjust_calories_for_goal(tdee, goals.primary_goal, &self.policy)
                                .round()
                        })
                        .ok(),
                };
                if let (Some(target), Some(weight)) = (derived_target, document.profile.weight_kg)
                {
                    goals.daily_calorie_target = Some(target);
                    goals.macro_targets = Some(recommend_macros(
                        target,
                        goals.primary_goal,
                        weight,
                        &self.policy,
                    )?);
                    recomputed = true;
                }
            }
            None => {}
        }

        document.goals = goals;
        self.store.save(&mut document).await?;
        let snapshot = serde_json::to_value(&document.goals)
            .map_err(|err| ToolError::InvalidArguments(err.to_string()))?;

        Ok(json!({
            "goals": snapshot,
            "macro_targets_recomputed": recomputed,
        }))
    }
}

// ---------------------------------------------------------------------------
// update_profile

struct UpdateProfileTool {
    store: Arc<dyn DocumentStore>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateProfileArgs {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    age: Option<u32>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    height_cm: Option<f64>,
    #[serde(default)]
    weight_kg: Option<f64>,
    #[serde(default)]
    activity_level: Option<String>,
    #[serde(default)]
    sport: Option<String>,
    #[serde(default)]
    experience_level: Option<String>,
    #[serde(default)]
    dietary_restrictions: Option<Vec<String>>,
    #[serde(default)]
    allergies: Option<Vec<String>>,
}

#[async_trait]
impl Tool for UpdateProfileTool {
    fn name(&self) -> &'static str {
        "update_profile"
    }

    fn description(&self) -> &'static str {
        "Update the athlete's profile: name, age, gender, height_cm, weight_kg, \
         activity_level (sedentary, lightly_active, moderately_active, \
         very_active, extremely_active), sport, experience level, dietary \
         restrictions, allergies. Only supplied fields change."
    }

    async fn execute(&self, user_id: &str, arguments: Value) -> Result<Value, ToolError> {
        let args: UpdateProfileArgs = parse_args(arguments)?;
        let nothing_set = args.name.is_none()
            && args.age.is_none()
            && args.gender.is_none()
            && args.height_cm.is_none()
            && args.weight_kg.is_none()
            && args.activity_level.is_none()
            && args.sport.is_none()
            && args.experience_level.is_none()
            && args.dietary_restrictions.is_none()
            && args.allergies.is_none();
        if nothing_set {
            return Err(ToolError::InvalidArguments("no profile fields were provided".into()));
        }

        // All parsing and validation happens before the document is touched.
        let gender = args.gender.as_deref().map(Gender::from_str).transpose()?;
        let activity_level = args
            .activity_level
            .as_deref()
            .map(ActivityLevel::from_str)
            .transpose()?;
        if let Some(age) = args.age {
            if !(13..=120).contains(&age) {
                return Err(ToolError::InvalidArguments(format!(
                    "age must be between 13 and 120, got {age}"
                )));
            }
        }
        if let Some(height) = args.height_cm {
            require_positive("height_cm", height)?;
        }
        if let Some(weight) = args.weight_kg {
            require_positive("weight_kg", weight)?;
        }

        let mut document = self.store.get_or_create(user_id).await?;
        let profile = &mut document.profile;
        if args.name.is_some() {
            profile.name = args.name;
        }
        if args.age.is_some() {
            profile.age = args.age;
        }
        if let Some(gender) = gender {
            profile.gender = gender;
        }
        if args.height_cm.is_some() {
            profile.height_cm = args.height_cm;
        }
        if args.weight_kg.is_some() {
            profile.weight_kg = args.weight_kg;
        }
        if let Some(level) = activity_level {
            profile.activity_level = level;
        }
        if args.sport.is_some() {
            profile.sport = args.sport;
        }
        if let Some(experience) = args.experience_level {
            profile.experience_level = experience;
        }
        if let Some(restrictions) = args.dietary_restrictions {
            profile.dietary_restrictions = restrictions;
        }
        if let Some(allergies) = args.allergies {
            profile.allergies = allergies;
        }

        self.store.save(&mut document).await?;
        let snapshot = serde_json::to_value(&document.profile)
            .map_err(|err| ToolError::InvalidArguments(err.to_string()))?;
        Ok(json!({ "profile": snapshot }))
    }
}

// ---------------------------------------------------------------------------
// schedule_item

struct ScheduleItemTool {
    store: Arc<dyn DocumentStore>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ScheduleItemArgs {
    title: String,
    #[serde(default)]
    item_type: Option<String>,
    start_time: DateTime<Utc>,
    #[serde(default)]
    end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    notes: Option<String>,
}

#[async_trait]
impl Tool for ScheduleItemTool {
    fn name(&self) -> &'static str {
        "schedule_item"
    }

    fn description(&self) -> &'static str {
        "Add an item to the athlete's calendar: title, optional type (workout, \
         meal, rest, event), start time, optional end time and notes."
    }

    async fn execute(&self, user_id: &str, arguments: Value) -> Result<Value, ToolError> {
        let args: ScheduleItemArgs = parse_args(arguments)?;
        if args.title.trim().is_empty() {
            return Err(ToolError::InvalidArguments("title must not be empty".into()));
        }
        if let Some(end) = args.end_time {
            if end <= args.start_time {
                return Err(ToolError::InvalidArguments(
                    "end_time must be after start_time".into(),
                ));
            }
        }

        let mut document = self.store.get_or_create(user_id).await?;
        let item = ScheduledItem {
            id: generate_entry_id("item", Utc::now()),
            title: args.title,
            item_type: args.item_type.unwrap_or_else(|| "event".to_string()),
            start_time: args.start_time,
            end_time: args.end_time,
            notes: args.notes,
        };
        let snapshot = serde_json::to_value(&item)
            .map_err(|err| ToolError::InvalidArguments(err.to_string()))?;
        document.calendar.scheduled_items.push(item);
        self.store.save(&mut document).await?;

        Ok(json!({ "item_id": snapshot["id"], "item": snapshot }))
    }
}

// ---------------------------------------------------------------------------
// get_schedule

struct GetScheduleTool {
    store: Arc<dyn DocumentStore>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct GetScheduleArgs {
    #[serde(default)]
    from: Option<DateTime<Utc>>,
    #[serde(default)]
    to: Option<DateTime<Utc>>,
}

#[async_trait]
impl Tool for GetScheduleTool {
    fn name(&self) -> &'static str {
        "get_schedule"
    }

    fn description(&self) -> &'static str {
        "Read the athlete's calendar, optionally limited to a from/to window. \
         Makes no changes."
    }

    async fn execute(&self, user_id: &str, arguments: Value) -> Result<Value, ToolError> {
        let args: GetScheduleArgs = parse_args(arguments)?;
        if let (Some(from), Some(to)) = (args.from, args.to) {
            if to < from {
                return Err(ToolError::InvalidArguments("to must not precede from".into()));
            }
        }

        // Read-only: the document is loaded but never saved.
        let document = self.store.get_or_create(user_id).await?;
        let items = document.calendar.items_in_range(args.from, args.to);
        Ok(json!({ "items": items }))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;

    use repfuel_db::InMemoryDocumentStore;

    use super::*;

    fn store() -> Arc<InMemoryDocumentStore> {
        Arc::new(InMemoryDocumentStore::default())
    }

    fn registry(store: Arc<InMemoryDocumentStore>) -> ToolRegistry {
        ToolRegistry::standard(store, MacroPolicy::default())
    }

    #[tokio::test]
    async fn registry_is_closed_and_stable() {
        let registry = registry(store());
        let names: Vec<_> = registry.catalog().into_iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            vec![
                "get_schedule",
                "log_meal",
                "log_workout",
                "schedule_item",
                "set_goal",
                "update_profile"
            ]
        );
        assert!(!registry.contains("delete_everything"));
    }

    #[tokio::test]
    async fn log_workout_appends_an_entry() {
        let store = store();
        let registry = registry(store.clone());
        let tool = registry.get("log_workout").unwrap();

        let result = tool
            .execute(
                "alex_1",
                json!({
                    "type": "cardio",
                    "duration_minutes": 45.0,
                    "intensity": "high",
                    "exercises": [{"name": "running", "duration_minutes": 45.0}],
                    "energy_level": 7
                }),
            )
            .await
            .unwrap();

        let document = store.get_or_create("alex_1").await.unwrap();
        assert_eq!(document.workouts.logged_workouts.len(), 1);
        let entry = &document.workouts.logged_workouts[0];
        assert_eq!(entry.workout_type, WorkoutType::Cardio);
        assert_eq!(entry.intensity, Intensity::High);
        assert!(entry.id.starts_with("workout_"));
        assert_eq!(result["entry_id"], Value::String(entry.id.clone()));
    }

    #[tokio::test]
    async fn log_workout_rejects_unknown_fields() {
        let registry = registry(store());
        let tool = registry.get("log_workout").unwrap();
        let err = tool
            .execute("alex_1", json!({"type": "cardio", "duration_minutes": 30, "mood": "great"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn log_workout_rejects_negative_duration() {
        let registry = registry(store());
        let tool = registry.get("log_workout").unwrap();
        let err = tool
            .execute("alex_1", json!({"type": "cardio", "duration_minutes": -10.0}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn log_meal_updates_daily_totals_and_adherence() {
        let store = store();
        let registry = registry(store.clone());

        // A calorie target first, so adherence has something to compare to.
        let mut document = store.get_or_create("alex_1").await.unwrap();
        document.goals.daily_calorie_target = Some(2000.0);
        store.save(&mut document).await.unwrap();

        let tool = registry.get("log_meal").unwrap();
        let time = Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0).unwrap();
        let result = tool
            .execute(
                "alex_1",
                json!({
                    "type": "breakfast",
                    "time": time,
                    "foods": [
                        {"name": "oatmeal", "calories": 200.0,
                         "macros": {"protein_g": 7.0, "carbs_g": 34.0, "fat_g": 4.0}},
                        {"name": "banana", "calories": 100.0,
                         "macros": {"carbs_g": 27.0}}
                    ]
                }),
            )
            .await
            .unwrap();

        assert_eq!(result["daily_totals"]["calories"], 300.0);
        let adherence = result["adherence_to_goals"]["calories"].as_f64().unwrap();
        assert_eq!(adherence, 15.0);

        let document = store.get_or_create("alex_1").await.unwrap();
        let day = &document.nutrition.daily_logs[0];
        assert_eq!(day.meals.len(), 1);
        assert_eq!(day.daily_totals.protein_g, 7.0);
        assert_eq!(day.daily_totals.carbs_g, 61.0);
    }

    #[tokio::test]
    async fn log_meal_requires_foods() {
        let registry = registry(store());
        let tool = registry.get("log_meal").unwrap();
        let err = tool
            .execute("alex_1", json!({"type": "lunch", "foods": []}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn set_goal_recomputes_targets_from_profile() {
        let store = store();
        let registry = registry(store.clone());

        let mut document = store.get_or_create("alex_1").await.unwrap();
        document.profile.age = Some(28);
        document.profile.gender = Gender::Male;
        document.profile.height_cm = Some(180.0);
        document.profile.weight_kg = Some(75.0);
        document.profile.activity_level = ActivityLevel::ModeratelyActive;
        store.save(&mut document).await.unwrap();

        let tool = registry.get("set_goal").unwrap();
        let result = tool
            .execute("alex_1", json!({"primary_goal": "endurance"}))
            .await
            .unwrap();
        assert_eq!(result["macro_targets_recomputed"], true);

        let document = store.get_or_create("alex_1").await.unwrap();
        assert_eq!(document.goals.primary_goal, PrimaryGoal::Endurance);
        // BMR 1740, moderately active -> 2697, endurance has no adjustment.
        let target = document.goals.daily_calorie_target.unwrap();
        assert_eq!(target, 2697.0);
        let macros = document.goals.macro_targets.unwrap();
        macros.validate_against(target, MACRO_ENERGY_TOLERANCE).unwrap();
        // Never below the endurance floor of 1.2 g/kg on a 75 kg athlete.
        assert!(macros.protein_g >= 90.0);
    }

    #[tokio::test]
    async fn set_goal_without_profile_sets_goal_but_skips_macros() {
        let store = store();
        let registry = registry(store.clone());
        let tool = registry.get("set_goal").unwrap();

        let result = tool
            .execute("new_user", json!({"primary_goal": "strength"}))
            .await
            .unwrap();
        assert_eq!(result["macro_targets_recomputed"], false);

        let document = store.get_or_create("new_user").await.unwrap();
        assert_eq!(document.goals.primary_goal, PrimaryGoal::Strength);
        assert!(document.goals.macro_targets.is_none());
    }

    #[tokio::test]
    async fn set_goal_rejects_inconsistent_explicit_macros() {
        let store = store();
        let registry = registry(store.clone());
        let tool = registry.get("set_goal").unwrap();

        let err = tool
            .execute(
                "alex_1",
                json!({
                    "daily_calorie_target": 2000.0,
                    "macro_targets": {"protein_g": 10.0, "carbs_g": 10.0, "fat_g": 10.0}
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Domain(DomainError::InvariantViolation(_))));
    }

    #[tokio::test]
    async fn update_profile_merges_only_supplied_fields() {
        let store = store();
        let registry = registry(store.clone());
        let tool = registry.get("update_profile").unwrap();

        tool.execute(
            "alex_1",
            json!({"name": "Alex", "weight_kg": 75.0, "activity_level": "very_active"}),
        )
        .await
        .unwrap();
        tool.execute("alex_1", json!({"weight_kg": 74.2})).await.unwrap();

        let document = store.get_or_create("alex_1").await.unwrap();
        assert_eq!(document.profile.name.as_deref(), Some("Alex"));
        assert_eq!(document.profile.weight_kg, Some(74.2));
        assert_eq!(document.profile.activity_level, ActivityLevel::VeryActive);
    }

    #[tokio::test]
    async fn unknown_activity_level_leaves_document_untouched() {
        let store = store();
        let registry = registry(store.clone());
        let tool = registry.get("update_profile").unwrap();

        let before = store.get_or_create("alex_1").await.unwrap();
        let err = tool
            .execute("alex_1", json!({"weight_kg": 80.0, "activity_level": "super_active"}))
            .await
            .unwrap_err();

        match &err {
            ToolError::Domain(DomainError::UnknownActivityLevel(value)) => {
                assert_eq!(value, "super_active");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.user_message().contains("super_active"));

        // Rejected before mutation: nothing changed, not even weight_kg.
        let after = store.get_or_create("alex_1").await.unwrap();
        assert_eq!(after, before);
        assert_eq!(after.updated_at, before.updated_at);
    }

    #[tokio::test]
    async fn schedule_item_and_get_schedule_round_trip() {
        let store = store();
        let registry = registry(store.clone());

        let start = Utc.with_ymd_and_hms(2026, 5, 10, 6, 30, 0).unwrap();
        registry
            .get("schedule_item")
            .unwrap()
            .execute(
                "alex_1",
                json!({"title": "Tempo run", "item_type": "workout", "start_time": start}),
            )
            .await
            .unwrap();

        let result = registry
            .get("get_schedule")
            .unwrap()
            .execute("alex_1", json!({}))
            .await
            .unwrap();
        let items = result["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], "Tempo run");

        let outside = registry
            .get("get_schedule")
            .unwrap()
            .execute(
                "alex_1",
                json!({"from": Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()}),
            )
            .await
            .unwrap();
        assert!(outside["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn schedule_item_rejects_inverted_window() {
        let registry = registry(store());
        let start = Utc.with_ymd_and_hms(2026, 5, 10, 8, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 5, 10, 7, 0, 0).unwrap();
        let err = registry
            .get("schedule_item")
            .unwrap()
            .execute("alex_1", json!({"title": "x", "start_time": start, "end_time": end}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn corrupt_store_surfaces_as_fatal() {
        let store = store();
        store.insert_raw("broken", "{not json").await;
        let registry = registry(store);
        let err = registry
            .get("get_schedule")
            .unwrap()
            .execute("broken", json!({}))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn tool_catalog_descriptions_are_nonempty() {
        let registry = registry(store());
        for (_, description) in registry.catalog() {
            assert!(!description.is_empty());
        }
        let _: BTreeMap<&str, &str> = registry.catalog().into_iter().collect();
    }
}
