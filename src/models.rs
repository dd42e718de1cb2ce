use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::CoreError;

/// The three supported currency codes. Anything else is rejected when parsed.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Mad,
    Usd,
    Eur,
}

impl Currency {
    pub const fn as_str(self) -> &'static str {
        match self {
            Currency::Mad => "MAD",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }
}

impl FromStr for Currency {
    type Err = CoreError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "MAD" => Ok(Currency::Mad),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            other => Err(CoreError::UnknownCurrency(other.to_string())),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An expense as stored. `currency` is whatever was active when the record
/// was created; read paths convert it, storage never rewrites it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub amount: f64,
    pub date: NaiveDate,
    pub category: Option<String>,
    pub description: Option<String>,
    pub currency: String,
}

#[derive(Deserialize)]
pub struct CreateExpenseRequest {
    pub amount: f64,
    pub date: NaiveDate,
    pub category: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Income {
    pub id: Uuid,
    pub amount: f64,
    pub date: NaiveDate,
    pub source: Option<String>,
    pub description: Option<String>,
    pub currency: String,
}

#[derive(Deserialize)]
pub struct CreateIncomeRequest {
    pub amount: f64,
    pub date: NaiveDate,
    pub source: Option<String>,
    pub description: Option<String>,
}

/// A spending target over an inclusive date window. A goal without a
/// category watches all spending in the window.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BudgetGoal {
    pub id: Uuid,
    pub amount: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub category: Option<String>,
    pub currency: String,
}

#[derive(Deserialize)]
pub struct CreateBudgetGoalRequest {
    pub amount: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub category: Option<String>,
}

/// The persisted report snapshot. One row per (owner, period label);
/// regenerating overwrites in place.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Report {
    pub id: Uuid,
    pub period: String,
    pub total_expense: f64,
    pub total_income: f64,
    pub balance: f64,
    pub date_generated: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct GenerateReportRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub period: String,
}
