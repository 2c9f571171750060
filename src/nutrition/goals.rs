use serde::{Deserialize, Serialize};

use super::totals::MacroTotals;

const KCAL_PER_G_PROTEIN: f64 = 4.0;
const KCAL_PER_G_CARBS: f64 = 4.0;
const KCAL_PER_G_FAT: f64 = 9.0;

/// Daily targets, same shape as the totals they are compared against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Goals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl Goals {
    pub const DEFAULT: Self = Self {
        calories: 2000.0,
        protein: 150.0,
        carbs: 250.0,
        fat: 65.0,
    };
}

impl Default for Goals {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Share of macro-derived calories, in whole percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroSplit {
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
}

/// Converts grams to kcal (4/4/9) and expresses each macro as a share of
/// their sum, not of `totals.calories`. Each share is rounded on its own, so
/// the three may add up to 99 or 101.
pub fn macro_percentages_of_calories(totals: &MacroTotals) -> MacroSplit {
    let protein = totals.protein * KCAL_PER_G_PROTEIN;
    let carbs = totals.carbs * KCAL_PER_G_CARBS;
    let fat = totals.fat * KCAL_PER_G_FAT;
    let sum = protein + carbs + fat;

    if sum == 0.0 {
        return MacroSplit {
            protein: 33,
            carbs: 33,
            fat: 34,
        };
    }

    let pct = |kcal: f64| (kcal / sum * 100.0).round() as u32;
    MacroSplit {
        protein: pct(protein),
        carbs: pct(carbs),
        fat: pct(fat),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Under,
    Good,
    Over,
}

/// `Under` below 80% of goal, `Good` from 80% up to and including 110%,
/// `Over` beyond that. A non-positive goal counts anything eaten as `Over`.
pub fn goal_progress(current: f64, goal: f64) -> GoalStatus {
    if goal <= 0.0 {
        return if current > 0.0 {
            GoalStatus::Over
        } else {
            GoalStatus::Good
        };
    }
    // compare scaled values so 110/100 does not land on 110.00000000000001
    let scaled = current * 100.0;
    if scaled < 80.0 * goal {
        GoalStatus::Under
    } else if scaled <= 110.0 * goal {
        GoalStatus::Good
    } else {
        GoalStatus::Over
    }
}

/// Rounded percentage of `goal` reached by `current`; 0 when no goal is set.
pub fn percent_of_goal(current: f64, goal: f64) -> u32 {
    if goal <= 0.0 {
        return 0;
    }
    (current / goal * 100.0).round().max(0.0) as u32
}

/// Status per macro for a day's totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GoalReport {
    pub calories: GoalStatus,
    pub protein: GoalStatus,
    pub carbs: GoalStatus,
    pub fat: GoalStatus,
}

impl GoalReport {
    pub fn new(totals: &MacroTotals, goals: &Goals) -> Self {
        Self {
            calories: goal_progress(totals.calories, goals.calories),
            protein: goal_progress(totals.protein, goals.protein),
            carbs: goal_progress(totals.carbs, goals.carbs),
            fat: goal_progress(totals.fat, goals.fat),
        }
    }
}

/// Percent of each daily goal a meal covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GoalShare {
    pub calories: u32,
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
}

impl GoalShare {
    pub fn new(totals: &MacroTotals, goals: &Goals) -> Self {
        Self {
            calories: percent_of_goal(totals.calories, goals.calories),
            protein: percent_of_goal(totals.protein, goals.protein),
            carbs: percent_of_goal(totals.carbs, goals.carbs),
            fat: percent_of_goal(totals.fat, goals.fat),
        }
    }
}

/// Calories print as whole numbers with no unit, grams to one decimal.
pub fn format_nutrition_value(value: f64, unit: &str) -> String {
    match unit {
        "kcal" | "cal" => format!("{}", value.round()),
        _ => format!("{}{}", (value * 10.0).round() / 10.0, unit),
    }
}
