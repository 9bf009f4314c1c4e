//! Deterministic nutrition and energy calculators.
//!
//! Pure functions over profile and goal data. Every function here is
//! side-effect free and deterministic for identical inputs, which is what
//! makes golden-output testing possible. String-typed inputs coming from
//! tool arguments are parsed at this boundary and rejected with the domain
//! error taxonomy rather than coerced.

use std::str::FromStr;

use crate::config::MacroPolicy;
use crate::domain::goals::{
    MacroTargets, PrimaryGoal, CARB_KCAL_PER_G, FAT_KCAL_PER_G, PROTEIN_KCAL_PER_G,
};
use crate::domain::nutrition::{Adherence, DailyTotals};
use crate::domain::profile::{ActivityLevel, Gender, UserProfile};
use crate::domain::workout::Exercise;
use crate::errors::DomainError;

/// Fractional tolerance between a calorie target and the energy of the
/// macro grams derived from it.
pub const MACRO_ENERGY_TOLERANCE: f64 = 0.02;

/// Basal metabolic rate via the Mifflin-St Jeor equation.
///
/// Requires weight, height and age on the profile. The `Other` gender
/// category averages the male (+5) and female (-161) constants.
pub fn estimate_bmr(profile: &UserProfile) -> Result<f64, DomainError> {
    let weight_kg = profile
        .weight_kg
        .ok_or_else(|| DomainError::Validation("profile has no weight_kg".to_string()))?;
    let height_cm = profile
        .height_cm
        .ok_or_else(|| DomainError::Validation("profile has no height_cm".to_string()))?;
    let age =
        profile.age.ok_or_else(|| DomainError::Validation("profile has no age".to_string()))?;

    if weight_kg <= 0.0 || height_cm <= 0.0 {
        return Err(DomainError::Validation(
            "weight_kg and height_cm must be positive".to_string(),
        ));
    }

    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age);
    let offset = match profile.gender {
        Gender::Male => 5.0,
        Gender::Female => -161.0,
        Gender::Other => (5.0 - 161.0) / 2.0,
    };
    Ok(base + offset)
}

/// The fixed multiplier for an enumerated activity level.
pub fn activity_multiplier(level: ActivityLevel) -> f64 {
    match level {
        ActivityLevel::Sedentary => 1.2,
        ActivityLevel::LightlyActive => 1.375,
        ActivityLevel::ModeratelyActive => 1.55,
        ActivityLevel::VeryActive => 1.725,
        ActivityLevel::ExtremelyActive => 1.9,
    }
}

/// TDEE from BMR and a (possibly untrusted, string-typed) activity level.
/// Values outside the enumerated set fail with `UnknownActivityLevel`.
pub fn apply_activity_multiplier(bmr: f64, activity_level: &str) -> Result<f64, DomainError> {
    let level = ActivityLevel::from_str(activity_level)?;
    Ok(bmr * activity_multiplier(level))
}

/// Goal-adjusted daily calorie target. The adjustment table comes from the
/// macro policy so deployments can tune it without a rebuild.
pub fn adjust_calories_for_goal(tdee: f64, goal: PrimaryGoal, policy: &MacroPolicy) -> f64 {
    tdee + policy.calorie_adjustment(goal)
}

/// Split a calorie target into macro grams for a goal.
///
/// Protein is the larger of the goal's ratio share and the g/kg body-weight
/// floor; the remaining calories are split between carbs and fat by the
/// goal's ratio pair. The result is enforced, not merely computed: grams are
/// non-negative and their energy matches `calories` within
/// [`MACRO_ENERGY_TOLERANCE`], or the call fails.
pub fn recommend_macros(
    calories: f64,
    goal: PrimaryGoal,
    body_weight_kg: f64,
    policy: &MacroPolicy,
) -> Result<MacroTargets, DomainError> {
    if calories <= 0.0 {
        return Err(DomainError::InvariantViolation(
            "calorie target must be positive".to_string(),
        ));
    }
    if body_weight_kg <= 0.0 {
        return Err(DomainError::Validation("body weight must be positive".to_string()));
    }

    let split = policy.ratio(goal);
    let ratio_protein_g = calories * split.protein / PROTEIN_KCAL_PER_G;
    let floor_protein_g = body_weight_kg * policy.protein_g_per_kg(goal);
    let protein_g = ratio_protein_g.max(floor_protein_g);

    let protein_kcal = protein_g * PROTEIN_KCAL_PER_G;
    if protein_kcal >= calories {
        return Err(DomainError::InvariantViolation(format!(
            "calorie target {calories:.0} kcal cannot cover the {floor_protein_g:.0} g protein floor"
        )));
    }

    let remaining_kcal = calories - protein_kcal;
    let carb_share = split.carbs / (split.carbs + split.fat);
    let carbs_g = remaining_kcal * carb_share / CARB_KCAL_PER_G;
    let fat_g = remaining_kcal * (1.0 - carb_share) / FAT_KCAL_PER_G;
    let fiber_g = policy.fiber_g_per_1000_kcal * calories / 1000.0;

    let targets = MacroTargets {
        protein_g: round1(protein_g),
        carbs_g: round1(carbs_g),
        fat_g: round1(fat_g),
        fiber_g: round1(fiber_g),
    };
    targets.validate_against(calories, MACRO_ENERGY_TOLERANCE)?;
    Ok(targets)
}

/// Per-nutrient adherence of a day's totals against the configured targets,
/// as percentages keyed by nutrient name. Nutrients without a target are
/// omitted rather than reported against a guessed default.
pub fn assess_adherence(
    totals: &DailyTotals,
    calorie_target: Option<f64>,
    macro_targets: Option<&MacroTargets>,
) -> Adherence {
    let mut adherence = Adherence::new();
    if let Some(target) = calorie_target {
        if target > 0.0 {
            adherence.insert("calories".to_string(), round1(totals.calories / target * 100.0));
        }
    }
    if let Some(targets) = macro_targets {
        for (name, current, target) in [
            ("protein_g", totals.protein_g, targets.protein_g),
            ("carbs_g", totals.carbs_g, targets.carbs_g),
            ("fat_g", totals.fat_g, targets.fat_g),
            ("fiber_g", totals.fiber_g, targets.fiber_g),
        ] {
            if target > 0.0 {
                adherence.insert(name.to_string(), round1(current / target * 100.0));
            }
        }
    }
    adherence
}

/// METs-based estimate of calories burned across a workout's exercises.
/// Exercises with no recognizable name fall back to a moderate 3.5 METs.
pub fn estimate_workout_calories(exercises: &[Exercise], body_weight_kg: f64) -> f64 {
    const METS_TABLE: [(&str, f64); 14] = [
        ("running", 8.0),
        ("cycling", 6.0),
        ("swimming", 7.0),
        ("weightlifting", 3.5),
        ("yoga", 2.5),
        ("walking", 3.0),
        ("rowing", 7.0),
        ("elliptical", 5.0),
        ("basketball", 6.5),
        ("soccer", 7.0),
        ("tennis", 5.0),
        ("climbing", 8.0),
        ("dancing", 4.5),
        ("hiking", 4.0),
    ];

    let mut total = 0.0;
    for exercise in exercises {
        let name = exercise.name.to_ascii_lowercase();
        let mets = METS_TABLE
            .iter()
            .find(|(activity, _)| name.contains(activity))
            .map_or(3.5, |(_, mets)| *mets);
        let minutes = exercise.duration_minutes.unwrap_or(0.0);
        total += mets * body_weight_kg * (minutes / 60.0);
    }
    round1(total)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use crate::config::MacroPolicy;
    use crate::domain::goals::PrimaryGoal;
    use crate::domain::nutrition::DailyTotals;
    use crate::domain::profile::{ActivityLevel, Gender, UserProfile};
    use crate::domain::workout::Exercise;
    use crate::errors::DomainError;

    use super::{
        activity_multiplier, adjust_calories_for_goal, apply_activity_multiplier, assess_adherence,
        estimate_bmr, estimate_workout_calories, recommend_macros, MACRO_ENERGY_TOLERANCE,
    };

    fn profile(gender: Gender) -> UserProfile {
        UserProfile {
            age: Some(28),
            gender,
            height_cm: Some(180.0),
            weight_kg: Some(75.0),
            ..Default::default()
        }
    }

    #[test]
    fn bmr_golden_values() {
        // 10*75 + 6.25*180 - 5*28 = 1735
        assert_eq!(estimate_bmr(&profile(Gender::Male)).unwrap(), 1740.0);
        assert_eq!(estimate_bmr(&profile(Gender::Female)).unwrap(), 1574.0);
        assert_eq!(estimate_bmr(&profile(Gender::Other)).unwrap(), 1657.0);
    }

    #[test]
    fn bmr_requires_measurements() {
        let incomplete = UserProfile { age: Some(28), ..Default::default() };
        assert!(matches!(estimate_bmr(&incomplete), Err(DomainError::Validation(_))));
    }

    #[test]
    fn tdee_is_monotonic_in_activity_level() {
        let bmr = 1700.0;
        let mut previous = 0.0;
        for level in ActivityLevel::ALL {
            let tdee = apply_activity_multiplier(bmr, level.as_str()).unwrap();
            assert!(tdee > previous, "{level:?} should raise TDEE");
            previous = tdee;
        }
        assert_eq!(apply_activity_multiplier(bmr, "sedentary").unwrap(), 1700.0 * 1.2);
    }

    #[test]
    fn tdee_rejects_unknown_levels() {
        let error = apply_activity_multiplier(1700.0, "super_active").expect_err("unknown");
        assert_eq!(error, DomainError::UnknownActivityLevel("super_active".to_string()));
    }

    #[test]
    fn tdee_is_deterministic() {
        for level in ActivityLevel::ALL {
            assert_eq!(activity_multiplier(level), activity_multiplier(level));
        }
    }

    #[test]
    fn calorie_adjustments_follow_policy() {
        let policy = MacroPolicy::default();
        assert_eq!(adjust_calories_for_goal(2500.0, PrimaryGoal::WeightLoss, &policy), 2000.0);
        assert_eq!(adjust_calories_for_goal(2500.0, PrimaryGoal::MuscleGain, &policy), 2800.0);
        assert_eq!(adjust_calories_for_goal(2500.0, PrimaryGoal::Maintenance, &policy), 2500.0);
    }

    #[test]
    fn macro_energy_matches_calorie_input_across_the_grid() {
        let policy = MacroPolicy::default();
        for goal in PrimaryGoal::ALL {
            for weight in [55.0, 75.0, 95.0] {
                for calories in [1800.0, 2400.0, 3200.0] {
                    let targets = recommend_macros(calories, goal, weight, &policy)
                        .unwrap_or_else(|error| panic!("{goal:?}/{weight}/{calories}: {error}"));
                    let drift = (targets.energy_kcal() - calories).abs() / calories;
                    assert!(drift <= MACRO_ENERGY_TOLERANCE, "{goal:?} drift {drift}");
                    assert!(targets.protein_g >= 0.0 && targets.fat_g >= 0.0);
                }
            }
        }
    }

    #[test]
    fn protein_floor_wins_over_ratio_share() {
        let policy = MacroPolicy::default();
        // weight_loss floor: 2.0 g/kg * 90 kg = 180 g; ratio share of 1800
        // kcal at 30% protein is only 135 g.
        let targets = recommend_macros(1800.0, PrimaryGoal::WeightLoss, 90.0, &policy).unwrap();
        assert!(targets.protein_g >= 180.0);
    }

    #[test]
    fn impossible_protein_floor_is_an_invariant_violation() {
        let policy = MacroPolicy::default();
        let error = recommend_macros(500.0, PrimaryGoal::WeightLoss, 90.0, &policy)
            .expect_err("floor exceeds calories");
        assert!(matches!(error, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn adherence_reports_percentages_only_for_known_targets() {
        let totals = DailyTotals { calories: 1800.0, protein_g: 90.0, ..Default::default() };
        let adherence = assess_adherence(&totals, Some(2000.0), None);
        assert_eq!(adherence.get("calories"), Some(&90.0));
        assert!(!adherence.contains_key("protein_g"));
    }

    #[test]
    fn workout_calories_use_the_mets_table() {
        let exercises = vec![Exercise {
            name: "easy running".to_string(),
            duration_minutes: Some(30.0),
            ..Default::default()
        }];
        // 8.0 METs * 75 kg * 0.5 h = 300 kcal
        assert_eq!(estimate_workout_calories(&exercises, 75.0), 300.0);
    }
}
