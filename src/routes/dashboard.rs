use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;

use crate::{
    auth::AuthenticatedUser,
    models::{Expense, Income},
    services::{
        aggregate::{self, AggregateResult, MoneyRecord},
        currency,
    },
    state::AppState,
};

pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<AggregateResult>, (StatusCode, String)> {
    let display = currency::display_currency(&state.pool, user.id).await?;

    let expenses = sqlx::query_as::<_, Expense>(
        r#"
        SELECT id, amount, date, category, description, currency
        FROM expenses
        WHERE user_id = $1
        "#,
    )
    .bind(user.id)
    .fetch_all(&state.pool)
    .await
    .map_err(crate::auth::internal_error)?;

    let incomes = sqlx::query_as::<_, Income>(
        r#"
        SELECT id, amount, date, source, description, currency
        FROM incomes
        WHERE user_id = $1
        "#,
    )
    .bind(user.id)
    .fetch_all(&state.pool)
    .await
    .map_err(crate::auth::internal_error)?;

    let mut records = Vec::with_capacity(expenses.len() + incomes.len());
    for row in &expenses {
        records.push(MoneyRecord::from_expense(row)?);
    }
    for row in &incomes {
        records.push(MoneyRecord::from_income(row)?);
    }

    let today = Utc::now().date_naive();
    let summary = aggregate::aggregate(&state.rates, &records, display, today)?;

    Ok(Json(summary))
}
