use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{BudgetGoal, Currency};
use crate::services::aggregate::MoneyRecord;
use crate::services::currency::RateTable;

/// Progress label for goals that watch every category.
pub const ALL_CATEGORIES: &str = "All categories";

#[derive(Debug, Serialize)]
pub struct BudgetProgress {
    pub goal_id: Uuid,
    pub category: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget_amount: f64,
    pub total_spent: f64,
    pub remaining_budget: f64,
    /// `None` marks a zero-amount goal with spending against it; the division
    /// is undefined there and callers see `null` instead of NaN.
    pub percent_used: Option<f64>,
    pub is_over_budget: bool,
}

/// Sums the goal's matching spend in `display` currency and derives progress.
/// The window is inclusive on both ends; a goal category must match exactly,
/// case-sensitive, with no normalization.
pub fn evaluate(
    rates: &RateTable,
    goal: &BudgetGoal,
    expenses: &[MoneyRecord],
    display: Currency,
) -> Result<BudgetProgress, CoreError> {
    let mut total_spent = 0.0;
    for expense in expenses {
        if expense.date < goal.start_date || expense.date > goal.end_date {
            continue;
        }
        if let Some(category) = goal.category.as_deref() {
            if expense.label.as_deref() != Some(category) {
                continue;
            }
        }
        total_spent += rates.convert(expense.amount, expense.currency, display)?;
    }

    let budget_amount = rates.convert(goal.amount, goal.currency.parse()?, display)?;
    let remaining_budget = budget_amount - total_spent;
    let percent_used = if budget_amount == 0.0 {
        (total_spent == 0.0).then_some(0.0)
    } else {
        Some(total_spent / budget_amount * 100.0)
    };

    Ok(BudgetProgress {
        goal_id: goal.id,
        category: goal
            .category
            .clone()
            .unwrap_or_else(|| ALL_CATEGORIES.to_string()),
        start_date: goal.start_date,
        end_date: goal.end_date,
        budget_amount,
        total_spent,
        remaining_budget,
        percent_used,
        is_over_budget: total_spent > budget_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::aggregate::RecordKind;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn goal(amount: f64, category: Option<&str>, currency: &str) -> BudgetGoal {
        BudgetGoal {
            id: Uuid::from_u128(7),
            amount,
            start_date: date(2024, 3, 1),
            end_date: date(2024, 3, 31),
            category: category.map(str::to_string),
            currency: currency.to_string(),
        }
    }

    fn spent(id: u128, amount: f64, on: NaiveDate, category: Option<&str>, currency: Currency) -> MoneyRecord {
        MoneyRecord {
            id: Uuid::from_u128(id),
            kind: RecordKind::Expense,
            amount,
            date: on,
            label: category.map(str::to_string),
            currency,
        }
    }

    #[test]
    fn overspend_doubles_percent_and_flags_over_budget() {
        let expenses = [spent(1, 100.0, date(2024, 3, 10), None, Currency::Usd)];
        let progress = evaluate(
            &RateTable::default(),
            &goal(50.0, None, "USD"),
            &expenses,
            Currency::Usd,
        )
        .unwrap();

        assert_eq!(progress.total_spent, 100.0);
        assert_eq!(progress.budget_amount, 50.0);
        assert_eq!(progress.remaining_budget, -50.0);
        assert_eq!(progress.percent_used, Some(200.0));
        assert!(progress.is_over_budget);
        assert_eq!(progress.category, ALL_CATEGORIES);
    }

    #[test]
    fn exactly_meeting_the_budget_is_not_over() {
        let expenses = [spent(1, 50.0, date(2024, 3, 10), None, Currency::Usd)];
        let progress = evaluate(
            &RateTable::default(),
            &goal(50.0, None, "USD"),
            &expenses,
            Currency::Usd,
        )
        .unwrap();

        assert_eq!(progress.percent_used, Some(100.0));
        assert_eq!(progress.remaining_budget, 0.0);
        assert!(!progress.is_over_budget);
    }

    #[test]
    fn window_is_inclusive_on_both_ends() {
        let expenses = [
            spent(1, 1.0, date(2024, 3, 1), None, Currency::Mad),
            spent(2, 2.0, date(2024, 3, 31), None, Currency::Mad),
            spent(3, 4.0, date(2024, 2, 29), None, Currency::Mad),
            spent(4, 8.0, date(2024, 4, 1), None, Currency::Mad),
        ];
        let progress = evaluate(
            &RateTable::default(),
            &goal(100.0, None, "MAD"),
            &expenses,
            Currency::Mad,
        )
        .unwrap();

        assert_eq!(progress.total_spent, 3.0);
    }

    #[test]
    fn category_match_is_exact_and_case_sensitive() {
        let expenses = [
            spent(1, 1.0, date(2024, 3, 10), Some("Food"), Currency::Mad),
            spent(2, 2.0, date(2024, 3, 11), Some("food"), Currency::Mad),
            spent(3, 4.0, date(2024, 3, 12), None, Currency::Mad),
        ];
        let progress = evaluate(
            &RateTable::default(),
            &goal(100.0, Some("Food"), "MAD"),
            &expenses,
            Currency::Mad,
        )
        .unwrap();

        assert_eq!(progress.total_spent, 1.0);
        assert_eq!(progress.category, "Food");
    }

    #[test]
    fn goal_without_category_counts_all_spend() {
        let expenses = [
            spent(1, 1.0, date(2024, 3, 10), Some("Food"), Currency::Mad),
            spent(2, 2.0, date(2024, 3, 11), None, Currency::Mad),
        ];
        let progress = evaluate(
            &RateTable::default(),
            &goal(100.0, None, "MAD"),
            &expenses,
            Currency::Mad,
        )
        .unwrap();

        assert_eq!(progress.total_spent, 3.0);
    }

    #[test]
    fn goal_amount_is_converted_to_display_currency() {
        let expenses = [spent(1, 5.0, date(2024, 3, 10), None, Currency::Usd)];
        let progress = evaluate(
            &RateTable::default(),
            &goal(100.0, None, "MAD"),
            &expenses,
            Currency::Usd,
        )
        .unwrap();

        // 100 MAD is 10 USD.
        assert_eq!(progress.budget_amount, 10.0);
        assert_eq!(progress.percent_used, Some(50.0));
    }

    #[test]
    fn zero_budget_with_spend_uses_the_sentinel() {
        let expenses = [spent(1, 1.0, date(2024, 3, 10), None, Currency::Mad)];
        let progress = evaluate(
            &RateTable::default(),
            &goal(0.0, None, "MAD"),
            &expenses,
            Currency::Mad,
        )
        .unwrap();

        assert_eq!(progress.percent_used, None);
        assert!(progress.is_over_budget);
    }

    #[test]
    fn zero_budget_without_spend_is_zero_percent() {
        let progress = evaluate(
            &RateTable::default(),
            &goal(0.0, None, "MAD"),
            &[],
            Currency::Mad,
        )
        .unwrap();

        assert_eq!(progress.percent_used, Some(0.0));
        assert!(!progress.is_over_budget);
    }

    #[test]
    fn sentinel_reaches_json_as_null_not_nan() {
        let expenses = [spent(1, 1.0, date(2024, 3, 10), None, Currency::Mad)];
        let progress = evaluate(
            &RateTable::default(),
            &goal(0.0, None, "MAD"),
            &expenses,
            Currency::Mad,
        )
        .unwrap();

        let json = serde_json::to_value(&progress).unwrap();
        assert!(json["percent_used"].is_null());
        assert_eq!(json["is_over_budget"], serde_json::Value::Bool(true));
    }

    #[test]
    fn unknown_goal_currency_is_rejected() {
        let result = evaluate(
            &RateTable::default(),
            &goal(10.0, None, "JPY"),
            &[],
            Currency::Mad,
        );
        assert_eq!(
            result.unwrap_err(),
            CoreError::UnknownCurrency("JPY".to_string())
        );
    }
}
