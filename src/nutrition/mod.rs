pub mod goals;
pub mod progress;
pub mod totals;

pub use goals::{
    format_nutrition_value, macro_percentages_of_calories, GoalReport, GoalShare, Goals,
    MacroSplit,
};
pub use progress::{compute_streak, daily_breakdown};
pub use totals::{scale_ingredient, scale_recipe, sum_daily_totals, sum_ingredients, MacroTotals};
