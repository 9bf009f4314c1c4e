use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::goals::MacroTargets;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    PreWorkout,
    PostWorkout,
    DuringWorkout,
}

impl std::str::FromStr for MealType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            "snack" => Ok(Self::Snack),
            "pre_workout" => Ok(Self::PreWorkout),
            "post_workout" => Ok(Self::PostWorkout),
            "during_workout" => Ok(Self::DuringWorkout),
            other => {
                Err(DomainError::UnknownEnum { field: "meal_type", value: other.to_string() })
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub macros: MacroTargets,
}

fn default_quantity() -> f64 {
    1.0
}

fn default_unit() -> String {
    "serving".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub id: String,
    pub meal_type: MealType,
    pub time: DateTime<Utc>,
    pub foods: Vec<Food>,
    #[serde(default)]
    pub total_calories: f64,
    #[serde(default)]
    pub total_macros: MacroTargets,
}

/// Running totals for one calendar day of logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyTotals {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein_g: f64,
    #[serde(default)]
    pub carbs_g: f64,
    #[serde(default)]
    pub fat_g: f64,
    #[serde(default)]
    pub fiber_g: f64,
    #[serde(default)]
    pub water_ml: f64,
}

/// Per-nutrient adherence versus the day's targets, as percentages.
pub type Adherence = BTreeMap<String, f64>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyLog {
    pub date: NaiveDate,
    #[serde(default)]
    pub meals: Vec<Meal>,
    #[serde(default)]
    pub daily_totals: DailyTotals,
    #[serde(default)]
    pub adherence_to_goals: Adherence,
}

impl DailyLog {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            meals: Vec::new(),
            daily_totals: DailyTotals::default(),
            adherence_to_goals: Adherence::new(),
        }
    }

    /// Recompute `daily_totals` from scratch off the logged meals. Called
    /// after every mutation so repeated saves never double-count.
    pub fn recompute_totals(&mut self) {
        let mut totals = DailyTotals { water_ml: self.daily_totals.water_ml, ..Default::default() };
        for meal in &self.meals {
            for food in &meal.foods {
                totals.calories += food.calories;
                totals.protein_g += food.macros.protein_g;
                totals.carbs_g += food.macros.carbs_g;
                totals.fat_g += food.macros.fat_g;
                totals.fiber_g += food.macros.fiber_g;
            }
        }
        self.daily_totals = totals;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    #[serde(default)]
    pub daily_logs: Vec<DailyLog>,
    #[serde(default)]
    pub favorite_foods: Vec<Food>,
    #[serde(default)]
    pub meal_plans: Vec<serde_json::Value>,
}

impl Nutrition {
    /// The log bucket for `date`, creating it in chronological position if
    /// absent.
    pub fn day_mut(&mut self, date: NaiveDate) -> &mut DailyLog {
        if let Some(index) = self.daily_logs.iter().position(|log| log.date == date) {
            return &mut self.daily_logs[index];
        }
        self.daily_logs.push(DailyLog::new(date));
        self.daily_logs.sort_by_key(|log| log.date);
        let index = self
            .daily_logs
            .iter()
            .position(|log| log.date == date)
            .unwrap_or(self.daily_logs.len() - 1);
        &mut self.daily_logs[index]
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::{Food, Meal, MealType, Nutrition};
    use crate::domain::goals::MacroTargets;

    fn food(calories: f64, protein_g: f64) -> Food {
        Food {
            name: "test food".to_string(),
            quantity: 1.0,
            unit: "serving".to_string(),
            calories,
            macros: MacroTargets { protein_g, ..Default::default() },
        }
    }

    #[test]
    fn recompute_totals_is_idempotent() {
        let mut nutrition = Nutrition::default();
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let day = nutrition.day_mut(date);
        day.meals.push(Meal {
            id: "meal_1".to_string(),
            meal_type: MealType::Breakfast,
            time: Utc::now(),
            foods: vec![food(300.0, 18.0), food(120.0, 4.0)],
            total_calories: 420.0,
            total_macros: MacroTargets::default(),
        });

        day.recompute_totals();
        assert_eq!(day.daily_totals.calories, 420.0);
        assert_eq!(day.daily_totals.protein_g, 22.0);

        // Second recompute must not double-count.
        day.recompute_totals();
        assert_eq!(day.daily_totals.calories, 420.0);
    }

    #[test]
    fn day_mut_creates_buckets_in_date_order() {
        let mut nutrition = Nutrition::default();
        let later = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        let earlier = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        nutrition.day_mut(later);
        nutrition.day_mut(earlier);
        nutrition.day_mut(later);

        assert_eq!(nutrition.daily_logs.len(), 2);
        assert_eq!(nutrition.daily_logs[0].date, earlier);
    }
}
