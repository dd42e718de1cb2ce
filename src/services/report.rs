use axum::http::StatusCode;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::internal_error;
use crate::error::CoreError;
use crate::models::{Currency, Expense, Income, Report};
use crate::services::aggregate::{month_end, month_start, CategoryTotal, UNCATEGORIZED};
use crate::services::currency::RateTable;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl From<ReportError> for (StatusCode, String) {
    fn from(error: ReportError) -> Self {
        match error {
            ReportError::Core(error) => error.into(),
            ReportError::Db(error) => internal_error(error),
        }
    }
}

/// How a period label was turned back into a date window.
#[derive(Debug, Serialize, Copy, Clone, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PeriodResolution {
    Parsed,
    FallbackCurrentMonth,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PeriodRange {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub resolution: PeriodResolution,
}

#[derive(Debug, Serialize)]
pub struct ExpenseDetail {
    pub id: Uuid,
    pub amount: f64,
    pub date: NaiveDate,
    pub category: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IncomeDetail {
    pub id: Uuid,
    pub amount: f64,
    pub date: NaiveDate,
    pub source: Option<String>,
    pub description: Option<String>,
}

/// Per-request breakdown shipped alongside a snapshot. Only the scalar
/// snapshot fields are persisted; this payload is rebuilt on every read.
#[derive(Debug, Serialize)]
pub struct ReportDetails {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub resolution: PeriodResolution,
    pub expenses: Vec<ExpenseDetail>,
    pub incomes: Vec<IncomeDetail>,
    pub expenses_by_category: Vec<CategoryTotal>,
}

#[derive(Debug, Serialize)]
pub struct ReportWithDetails {
    #[serde(flatten)]
    pub report: Report,
    pub details: ReportDetails,
}

/// Rejects an inverted window. Equal start and end is a valid single-day range.
pub fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<(), CoreError> {
    if end < start {
        return Err(CoreError::InvalidDateRange { start, end });
    }
    Ok(())
}

/// Re-derives the date window behind a period label. Two shapes parse:
/// `"2024-03-01 - 2024-03-31"` and `"March 2024"`. Anything else resolves to
/// the current calendar month, tagged as a fallback so callers can tell a
/// guess from a parse.
pub fn resolve_period(label: &str, today: NaiveDate) -> PeriodRange {
    if let Some((start, end)) = label.split_once(" - ") {
        if let (Ok(start), Ok(end)) = (
            NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d"),
            NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d"),
        ) {
            return PeriodRange {
                period_start: start,
                period_end: end,
                resolution: PeriodResolution::Parsed,
            };
        }
    }

    if let Ok(first) = NaiveDate::parse_from_str(&format!("{} 1", label.trim()), "%B %Y %d") {
        return PeriodRange {
            period_start: first,
            period_end: month_end(first),
            resolution: PeriodResolution::Parsed,
        };
    }

    tracing::debug!(label, "period label did not parse; falling back to current month");
    let start = month_start(today);
    PeriodRange {
        period_start: start,
        period_end: month_end(start),
        resolution: PeriodResolution::FallbackCurrentMonth,
    }
}

/// Builds (or rebuilds) the snapshot for `(user, period)` over an inclusive
/// date range. The insert is a single conditional upsert, so two concurrent
/// requests for the same period cannot race into duplicate rows.
pub async fn generate(
    pool: &PgPool,
    rates: &RateTable,
    user_id: Uuid,
    display: Currency,
    start: NaiveDate,
    end: NaiveDate,
    period: &str,
) -> Result<ReportWithDetails, ReportError> {
    validate_range(start, end)?;

    let expenses = expenses_between(pool, user_id, start, end).await?;
    let incomes = incomes_between(pool, user_id, start, end).await?;

    let mut total_expense = 0.0;
    for row in &expenses {
        total_expense += rates.convert(row.amount, row.currency.parse()?, display)?;
    }
    let mut total_income = 0.0;
    for row in &incomes {
        total_income += rates.convert(row.amount, row.currency.parse()?, display)?;
    }
    let balance = total_income - total_expense;

    let report = sqlx::query_as::<_, Report>(
        r#"
        INSERT INTO reports (id, user_id, period, total_expense, total_income, balance, date_generated)
        VALUES ($1, $2, $3, $4, $5, $6, NOW())
        ON CONFLICT (user_id, period) DO UPDATE
        SET total_expense = EXCLUDED.total_expense,
            total_income = EXCLUDED.total_income,
            balance = EXCLUDED.balance,
            date_generated = NOW()
        RETURNING id, period, total_expense, total_income, balance, date_generated
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(period)
    .bind(total_expense)
    .bind(total_income)
    .bind(balance)
    .fetch_one(pool)
    .await?;

    let range = PeriodRange {
        period_start: start,
        period_end: end,
        resolution: PeriodResolution::Parsed,
    };
    let details = build_details(rates, display, &range, &expenses, &incomes)?;

    Ok(ReportWithDetails { report, details })
}

pub async fn expenses_between(
    pool: &PgPool,
    user_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Expense>, sqlx::Error> {
    sqlx::query_as::<_, Expense>(
        r#"
        SELECT id, amount, date, category, description, currency
        FROM expenses
        WHERE user_id = $1 AND date BETWEEN $2 AND $3
        ORDER BY date DESC
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}

pub async fn incomes_between(
    pool: &PgPool,
    user_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Income>, sqlx::Error> {
    sqlx::query_as::<_, Income>(
        r#"
        SELECT id, amount, date, source, description, currency
        FROM incomes
        WHERE user_id = $1 AND date BETWEEN $2 AND $3
        ORDER BY date DESC
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}

/// Converts every record to the display currency and groups expense totals by
/// category, first occurrence first.
pub fn build_details(
    rates: &RateTable,
    display: Currency,
    range: &PeriodRange,
    expenses: &[Expense],
    incomes: &[Income],
) -> Result<ReportDetails, CoreError> {
    let mut expense_details = Vec::with_capacity(expenses.len());
    let mut expenses_by_category: Vec<CategoryTotal> = Vec::new();
    for row in expenses {
        let amount = rates.convert(row.amount, row.currency.parse()?, display)?;
        let label = match row.category.as_deref() {
            Some(category) if !category.is_empty() => category.to_string(),
            _ => UNCATEGORIZED.to_string(),
        };
        match expenses_by_category
            .iter_mut()
            .find(|entry| entry.category == label)
        {
            Some(entry) => entry.total += amount,
            None => expenses_by_category.push(CategoryTotal {
                category: label,
                total: amount,
            }),
        }
        expense_details.push(ExpenseDetail {
            id: row.id,
            amount,
            date: row.date,
            category: row.category.clone(),
            description: row.description.clone(),
        });
    }

    let mut income_details = Vec::with_capacity(incomes.len());
    for row in incomes {
        let amount = rates.convert(row.amount, row.currency.parse()?, display)?;
        income_details.push(IncomeDetail {
            id: row.id,
            amount,
            date: row.date,
            source: row.source.clone(),
            description: row.description.clone(),
        });
    }

    Ok(ReportDetails {
        period_start: range.period_start,
        period_end: range.period_end,
        resolution: range.resolution,
        expenses: expense_details,
        incomes: income_details,
        expenses_by_category,
    })
}
