use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{Currency, Expense, Income};
use crate::services::currency::RateTable;

/// Bucket label for records with no category or source.
pub const UNCATEGORIZED: &str = "Uncategorized";

const TRAILING_MONTHS: u32 = 6;
const RECENT_LIMIT: usize = 5;

#[derive(Debug, Serialize, Copy, Clone, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Expense,
    Income,
}

/// A stored money record lifted into memory. The currency is whatever was
/// active when the record was created; conversion happens here, at read time.
#[derive(Debug, Clone)]
pub struct MoneyRecord {
    pub id: Uuid,
    pub kind: RecordKind,
    pub amount: f64,
    pub date: NaiveDate,
    pub label: Option<String>,
    pub currency: Currency,
}

impl MoneyRecord {
    pub fn from_expense(row: &Expense) -> Result<Self, CoreError> {
        Ok(Self {
            id: row.id,
            kind: RecordKind::Expense,
            amount: row.amount,
            date: row.date,
            label: row.category.clone(),
            currency: row.currency.parse()?,
        })
    }

    pub fn from_income(row: &Income) -> Result<Self, CoreError> {
        Ok(Self {
            id: row.id,
            kind: RecordKind::Income,
            amount: row.amount,
            date: row.date,
            label: row.source.clone(),
            currency: row.currency.parse()?,
        })
    }

    fn bucket_label(&self) -> String {
        match self.label.as_deref() {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => UNCATEGORIZED.to_string(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SourceTotal {
    pub source: String,
    pub total: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MonthlyBucket {
    pub month: String,
    pub expenses: f64,
    pub incomes: f64,
}

#[derive(Debug, Serialize)]
pub struct RecentItem {
    pub id: Uuid,
    pub kind: RecordKind,
    pub amount: f64,
    pub date: NaiveDate,
    pub label: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AggregateResult {
    pub total_expenses: f64,
    pub total_incomes: f64,
    pub total_savings: f64,
    pub by_category: Vec<CategoryTotal>,
    pub by_source: Vec<SourceTotal>,
    pub monthly_data: Vec<MonthlyBucket>,
    pub recent_items: Vec<RecentItem>,
}

/// Normalizes every record to `display` and derives the dashboard figures.
/// Raw amounts are never summed across mixed currencies.
pub fn aggregate(
    rates: &RateTable,
    records: &[MoneyRecord],
    display: Currency,
    today: NaiveDate,
) -> Result<AggregateResult, CoreError> {
    let mut total_expenses = 0.0;
    let mut total_incomes = 0.0;
    let mut by_category: Vec<CategoryTotal> = Vec::new();
    let mut by_source: Vec<SourceTotal> = Vec::new();

    for record in records {
        let amount = rates.convert(record.amount, record.currency, display)?;
        let label = record.bucket_label();
        match record.kind {
            RecordKind::Expense => {
                total_expenses += amount;
                match by_category.iter_mut().find(|entry| entry.category == label) {
                    Some(entry) => entry.total += amount,
                    None => by_category.push(CategoryTotal {
                        category: label,
                        total: amount,
                    }),
                }
            }
            RecordKind::Income => {
                total_incomes += amount;
                match by_source.iter_mut().find(|entry| entry.source == label) {
                    Some(entry) => entry.total += amount,
                    None => by_source.push(SourceTotal {
                        source: label,
                        total: amount,
                    }),
                }
            }
        }
    }

    Ok(AggregateResult {
        total_expenses,
        total_incomes,
        total_savings: total_incomes - total_expenses,
        by_category,
        by_source,
        monthly_data: monthly_series(rates, records, display, today)?,
        recent_items: recent_items(rates, records, display)?,
    })
}

/// Trailing six calendar months ending at `today`'s month, oldest first.
/// Every month is present even when it holds no records.
fn monthly_series(
    rates: &RateTable,
    records: &[MoneyRecord],
    display: Currency,
    today: NaiveDate,
) -> Result<Vec<MonthlyBucket>, CoreError> {
    let current = month_start(today);
    let mut buckets = Vec::with_capacity(TRAILING_MONTHS as usize);

    for back in (0..TRAILING_MONTHS).rev() {
        let start = current - Months::new(back);
        let end = month_end(start);
        let mut expenses = 0.0;
        let mut incomes = 0.0;
        for record in records {
            if record.date < start || record.date > end {
                continue;
            }
            let amount = rates.convert(record.amount, record.currency, display)?;
            match record.kind {
                RecordKind::Expense => expenses += amount,
                RecordKind::Income => incomes += amount,
            }
        }
        buckets.push(MonthlyBucket {
            month: start.format("%b %Y").to_string(),
            expenses,
            incomes,
        });
    }

    Ok(buckets)
}

/// Most recent records, date descending with the id as tie-break so equal
/// dates still order deterministically.
fn recent_items(
    rates: &RateTable,
    records: &[MoneyRecord],
    display: Currency,
) -> Result<Vec<RecentItem>, CoreError> {
    let mut ordered: Vec<&MoneyRecord> = records.iter().collect();
    ordered.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
    ordered.truncate(RECENT_LIMIT);

    ordered
        .into_iter()
        .map(|record| {
            Ok(RecentItem {
                id: record.id,
                kind: record.kind,
                amount: rates.convert(record.amount, record.currency, display)?,
                date: record.date,
                label: record.label.clone(),
            })
        })
        .collect()
}

pub(crate) fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub(crate) fn month_end(month_start: NaiveDate) -> NaiveDate {
    (month_start + Months::new(1)).pred_opt().unwrap_or(month_start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn expense(
        id: u128,
        amount: f64,
        on: NaiveDate,
        category: Option<&str>,
        currency: Currency,
    ) -> MoneyRecord {
        MoneyRecord {
            id: Uuid::from_u128(id),
            kind: RecordKind::Expense,
            amount,
            date: on,
            label: category.map(str::to_string),
            currency,
        }
    }

    fn income(
        id: u128,
        amount: f64,
        on: NaiveDate,
        source: Option<&str>,
        currency: Currency,
    ) -> MoneyRecord {
        MoneyRecord {
            id: Uuid::from_u128(id),
            kind: RecordKind::Income,
            amount,
            date: on,
            label: source.map(str::to_string),
            currency,
        }
    }

    #[test]
    fn empty_input_yields_zeroes_and_a_full_series() {
        let result =
            aggregate(&RateTable::default(), &[], Currency::Mad, date(2024, 6, 15)).unwrap();

        assert_eq!(result.total_expenses, 0.0);
        assert_eq!(result.total_incomes, 0.0);
        assert_eq!(result.total_savings, 0.0);
        assert!(result.by_category.is_empty());
        assert!(result.by_source.is_empty());
        assert!(result.recent_items.is_empty());
        assert_eq!(result.monthly_data.len(), 6);
        assert!(result
            .monthly_data
            .iter()
            .all(|bucket| bucket.expenses == 0.0 && bucket.incomes == 0.0));
        assert_eq!(result.monthly_data[0].month, "Jan 2024");
        assert_eq!(result.monthly_data[5].month, "Jun 2024");
    }

    #[test]
    fn mixed_currencies_are_normalized_before_summing() {
        let today = date(2024, 6, 15);
        let records = [
            expense(1, 100.0, date(2024, 6, 1), Some("Food"), Currency::Mad),
            expense(2, 10.0, date(2024, 6, 2), Some("Food"), Currency::Usd),
            income(3, 27.0, date(2024, 6, 3), Some("Salary"), Currency::Eur),
        ];
        let result = aggregate(&RateTable::default(), &records, Currency::Mad, today).unwrap();

        // 10 USD is 100 MAD; 27 EUR is 300 MAD.
        assert_eq!(result.total_expenses, 200.0);
        assert!((result.total_incomes - 300.0).abs() < 1e-9);
        assert!((result.total_savings - 100.0).abs() < 1e-9);
        assert_eq!(result.by_category.len(), 1);
        assert_eq!(result.by_category[0].category, "Food");
        assert_eq!(result.by_category[0].total, 200.0);
    }

    #[test]
    fn missing_category_lands_in_uncategorized() {
        let today = date(2024, 6, 15);
        let records = [
            expense(1, 10.0, date(2024, 6, 1), None, Currency::Mad),
            expense(2, 20.0, date(2024, 6, 2), Some(""), Currency::Mad),
            expense(3, 5.0, date(2024, 6, 3), Some("Food"), Currency::Mad),
        ];
        let result = aggregate(&RateTable::default(), &records, Currency::Mad, today).unwrap();

        assert_eq!(
            result.by_category,
            vec![
                CategoryTotal {
                    category: UNCATEGORIZED.to_string(),
                    total: 30.0
                },
                CategoryTotal {
                    category: "Food".to_string(),
                    total: 5.0
                },
            ]
        );
    }

    #[test]
    fn grouping_preserves_first_occurrence_order() {
        let today = date(2024, 6, 15);
        let records = [
            expense(1, 1.0, date(2024, 6, 1), Some("Food"), Currency::Mad),
            expense(2, 2.0, date(2024, 6, 2), Some("Rent"), Currency::Mad),
            expense(3, 4.0, date(2024, 6, 3), Some("Food"), Currency::Mad),
        ];
        let result = aggregate(&RateTable::default(), &records, Currency::Mad, today).unwrap();

        assert_eq!(result.by_category[0].category, "Food");
        assert_eq!(result.by_category[0].total, 5.0);
        assert_eq!(result.by_category[1].category, "Rent");
    }

    #[test]
    fn monthly_buckets_include_both_month_edges() {
        let today = date(2024, 6, 15);
        let records = [
            expense(1, 10.0, date(2024, 4, 1), None, Currency::Mad),
            expense(2, 20.0, date(2024, 4, 30), None, Currency::Mad),
            // Outside the trailing window entirely.
            expense(3, 99.0, date(2023, 12, 31), None, Currency::Mad),
        ];
        let result = aggregate(&RateTable::default(), &records, Currency::Mad, today).unwrap();

        let april = result
            .monthly_data
            .iter()
            .find(|bucket| bucket.month == "Apr 2024")
            .unwrap();
        assert_eq!(april.expenses, 30.0);
        assert_eq!(
            result
                .monthly_data
                .iter()
                .map(|bucket| bucket.expenses)
                .sum::<f64>(),
            30.0
        );
    }

    #[test]
    fn recent_items_are_limited_and_tie_broken_by_id() {
        let today = date(2024, 6, 15);
        let mut records: Vec<MoneyRecord> = (1..=6)
            .map(|day| expense(day as u128, 1.0, date(2024, 6, day), None, Currency::Mad))
            .collect();
        records.push(expense(99, 1.0, date(2024, 6, 6), None, Currency::Mad));

        let result = aggregate(&RateTable::default(), &records, Currency::Mad, today).unwrap();

        assert_eq!(result.recent_items.len(), 5);
        // Two records share the newest date; the higher id wins the tie.
        assert_eq!(result.recent_items[0].id, Uuid::from_u128(99));
        assert_eq!(result.recent_items[1].id, Uuid::from_u128(6));
        assert_eq!(result.recent_items[4].id, Uuid::from_u128(3));
    }

    #[test]
    fn recent_items_are_individually_converted() {
        let today = date(2024, 6, 15);
        let records = [expense(1, 10.0, date(2024, 6, 1), None, Currency::Usd)];
        let result = aggregate(&RateTable::default(), &records, Currency::Mad, today).unwrap();

        assert_eq!(result.recent_items[0].amount, 100.0);
    }

    #[test]
    fn unknown_stored_currency_surfaces_as_an_error() {
        let row = Expense {
            id: Uuid::from_u128(1),
            amount: 10.0,
            date: date(2024, 6, 1),
            category: None,
            description: None,
            currency: "GBP".to_string(),
        };
        assert_eq!(
            MoneyRecord::from_expense(&row).unwrap_err(),
            CoreError::UnknownCurrency("GBP".to_string())
        );
    }
}
