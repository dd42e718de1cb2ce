use std::collections::HashMap;

use axum::http::StatusCode;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::internal_error;
use crate::error::CoreError;
use crate::models::Currency;

/// Conversion rates expressed as units of the keyed currency per one unit of
/// the anchor currency (MAD). Injectable so tests can run against synthetic
/// tables; `Default` carries the reference rates.
#[derive(Debug, Clone)]
pub struct RateTable {
    rates: HashMap<Currency, f64>,
}

impl Default for RateTable {
    fn default() -> Self {
        Self::new([
            (Currency::Mad, 1.0),
            (Currency::Usd, 0.10),
            (Currency::Eur, 0.09),
        ])
    }
}

impl RateTable {
    pub fn new(rates: impl IntoIterator<Item = (Currency, f64)>) -> Self {
        Self {
            rates: rates.into_iter().collect(),
        }
    }

    fn rate(&self, currency: Currency) -> Result<f64, CoreError> {
        self.rates
            .get(&currency)
            .copied()
            .ok_or_else(|| CoreError::UnknownCurrency(currency.to_string()))
    }

    /// Converts through the anchor currency: `(amount / rate[from]) * rate[to]`.
    ///
    /// A same-currency conversion and a zero amount both return the input
    /// unchanged. The zero case is leniency, not validation; callers must not
    /// rely on it to reject bad input.
    pub fn convert(&self, amount: f64, from: Currency, to: Currency) -> Result<f64, CoreError> {
        if from == to || amount == 0.0 {
            return Ok(amount);
        }
        let in_anchor = amount / self.rate(from)?;
        Ok(in_anchor * self.rate(to)?)
    }
}

/// The currency every aggregated amount is presented in for this user.
pub async fn display_currency(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Currency, (StatusCode, String)> {
    let code: String = sqlx::query_scalar(
        r#"
        SELECT currency
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .map_err(internal_error)?;

    let currency = code.parse::<Currency>()?;
    Ok(currency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_currency_is_identity() {
        let rates = RateTable::default();
        for currency in [Currency::Mad, Currency::Usd, Currency::Eur] {
            assert_eq!(rates.convert(123.45, currency, currency).unwrap(), 123.45);
        }
    }

    #[test]
    fn reference_rates_round_trip() {
        let rates = RateTable::default();
        assert_eq!(rates.convert(100.0, Currency::Mad, Currency::Usd).unwrap(), 10.0);
        assert_eq!(rates.convert(10.0, Currency::Usd, Currency::Mad).unwrap(), 100.0);
    }

    #[test]
    fn conversion_is_transitive_through_anchor() {
        let rates = RateTable::default();
        let direct = rates.convert(250.0, Currency::Usd, Currency::Eur).unwrap();
        let hop = rates
            .convert(
                rates.convert(250.0, Currency::Usd, Currency::Mad).unwrap(),
                Currency::Mad,
                Currency::Eur,
            )
            .unwrap();
        assert!((direct - hop).abs() < 1e-9);
    }

    #[test]
    fn zero_amount_is_returned_unchanged() {
        // The zero fast path short-circuits before any rate lookup, so even a
        // table with no rates accepts it.
        let rates = RateTable::new([]);
        assert_eq!(rates.convert(0.0, Currency::Usd, Currency::Eur).unwrap(), 0.0);
    }

    #[test]
    fn missing_rate_is_rejected() {
        let rates = RateTable::new([(Currency::Mad, 1.0), (Currency::Usd, 0.10)]);
        assert_eq!(
            rates.convert(5.0, Currency::Eur, Currency::Mad),
            Err(CoreError::UnknownCurrency("EUR".into()))
        );
        assert_eq!(
            rates.convert(5.0, Currency::Mad, Currency::Eur),
            Err(CoreError::UnknownCurrency("EUR".into()))
        );
    }

    #[test]
    fn synthetic_table_overrides_reference_rates() {
        let rates = RateTable::new([(Currency::Mad, 1.0), (Currency::Usd, 0.5)]);
        assert_eq!(rates.convert(10.0, Currency::Mad, Currency::Usd).unwrap(), 5.0);
    }
}
