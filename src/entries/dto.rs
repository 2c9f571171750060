use serde::{Deserialize, Serialize};
use time::Date;

use super::types::{EntryIngredient, FoodEntry};
use crate::nutrition::{progress::DayTotals, GoalReport, GoalShare, Goals, MacroSplit, MacroTotals};

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    #[serde(default, with = "crate::dates::iso_date::option")]
    pub date: Option<Date>,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    #[serde(default, with = "crate::dates::iso_date::option")]
    pub start: Option<Date>,
    #[serde(default, with = "crate::dates::iso_date::option")]
    pub end: Option<Date>,
}

#[derive(Debug, Serialize)]
pub struct EntryView {
    #[serde(flatten)]
    pub entry: FoodEntry,
    pub ingredients: Vec<EntryIngredient>,
}

/// Everything the daily log screen shows.
#[derive(Debug, Serialize)]
pub struct DayLog {
    #[serde(with = "crate::dates::iso_date")]
    pub date: Date,
    pub entries: Vec<EntryView>,
    pub totals: MacroTotals,
    pub goals: Goals,
    pub status: GoalReport,
    pub percent: GoalShare,
    pub split: MacroSplit,
}

#[derive(Debug, Serialize)]
pub struct WeeklyProgress {
    #[serde(with = "crate::dates::iso_date")]
    pub start: Date,
    #[serde(with = "crate::dates::iso_date")]
    pub end: Date,
    pub goals: Goals,
    pub days: Vec<DayTotals>,
}
