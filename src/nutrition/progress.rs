use std::collections::BTreeMap;

use serde::Serialize;
use time::{Date, UtcOffset};

use super::totals::MacroTotals;
use crate::entries::types::FoodEntry;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DayTotals {
    #[serde(with = "crate::dates::iso_date")]
    pub date: Date,
    pub totals: MacroTotals,
}

/// Per-day totals for every UTC day in `start..=end`, zero-filled.
pub fn daily_breakdown(entries: &[FoodEntry], start: Date, end: Date) -> Vec<DayTotals> {
    let mut by_day: BTreeMap<Date, MacroTotals> = BTreeMap::new();
    for entry in entries {
        let day = entry.logged_at.to_offset(UtcOffset::UTC).date();
        if day < start || day > end {
            continue;
        }
        *by_day.entry(day).or_default() += MacroTotals::from(entry);
    }

    let mut out = Vec::new();
    let mut day = start;
    while day <= end {
        out.push(DayTotals {
            date: day,
            totals: by_day.get(&day).copied().unwrap_or_default(),
        });
        match day.next_day() {
            Some(next) => day = next,
            None => break,
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Streak {
    pub current_streak: u32,
    pub longest_streak: u32,
    #[serde(with = "crate::dates::iso_date::option")]
    pub last_logged_date: Option<Date>,
}

/// Consecutive logging days. The current streak survives until the end of
/// the day after the last log; dates after `today` are ignored.
pub fn compute_streak<I>(logged_days: I, today: Date) -> Streak
where
    I: IntoIterator<Item = Date>,
{
    let mut days: Vec<Date> = logged_days.into_iter().filter(|d| *d <= today).collect();
    days.sort_unstable();
    days.dedup();

    let Some(&last) = days.last() else {
        return Streak {
            current_streak: 0,
            longest_streak: 0,
            last_logged_date: None,
        };
    };

    let mut longest = 0;
    let mut run = 0;
    let mut prev: Option<Date> = None;
    for &day in &days {
        run = match prev {
            Some(p) if p.next_day() == Some(day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(day);
    }

    let alive = last == today || last.next_day() == Some(today);
    Streak {
        current_streak: if alive { run } else { 0 },
        longest_streak: longest,
        last_logged_date: Some(last),
    }
}
