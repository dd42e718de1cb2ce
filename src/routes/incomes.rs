use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    models::{CreateIncomeRequest, Currency, Income},
    services::currency,
    state::AppState,
};

fn validate(payload: &CreateIncomeRequest) -> Result<(), (StatusCode, String)> {
    if payload.amount <= 0.0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Amount must be a positive number".into(),
        ));
    }
    if payload.date > Utc::now().date_naive() {
        return Err((StatusCode::BAD_REQUEST, "Date must not be in the future".into()));
    }
    Ok(())
}

pub async fn list_incomes(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Income>>, (StatusCode, String)> {
    let display = currency::display_currency(&state.pool, user.id).await?;
    let mut records = sqlx::query_as::<_, Income>(
        r#"
        SELECT id, amount, date, source, description, currency
        FROM incomes
        WHERE user_id = $1
        ORDER BY date DESC
        "#,
    )
    .bind(user.id)
    .fetch_all(&state.pool)
    .await
    .map_err(crate::auth::internal_error)?;

    for record in &mut records {
        let stored = record.currency.parse::<Currency>()?;
        record.amount = state.rates.convert(record.amount, stored, display)?;
    }

    Ok(Json(records))
}

pub async fn get_income(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(income_id): Path<Uuid>,
) -> Result<Json<Income>, (StatusCode, String)> {
    let display = currency::display_currency(&state.pool, user.id).await?;
    let record = sqlx::query_as::<_, Income>(
        r#"
        SELECT id, amount, date, source, description, currency
        FROM incomes
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(income_id)
    .bind(user.id)
    .fetch_optional(&state.pool)
    .await
    .map_err(crate::auth::internal_error)?;

    let Some(mut record) = record else {
        return Err((StatusCode::NOT_FOUND, "Income not found".into()));
    };

    let stored = record.currency.parse::<Currency>()?;
    record.amount = state.rates.convert(record.amount, stored, display)?;

    Ok(Json(record))
}

pub async fn create_income(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateIncomeRequest>,
) -> Result<Json<Income>, (StatusCode, String)> {
    validate(&payload)?;

    let display = currency::display_currency(&state.pool, user.id).await?;
    let id = Uuid::new_v4();
    let record = sqlx::query_as::<_, Income>(
        r#"
        INSERT INTO incomes (id, user_id, amount, date, source, description, currency)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, amount, date, source, description, currency
        "#,
    )
    .bind(id)
    .bind(user.id)
    .bind(payload.amount)
    .bind(payload.date)
    .bind(payload.source)
    .bind(payload.description)
    .bind(display.as_str())
    .fetch_one(&state.pool)
    .await
    .map_err(crate::auth::internal_error)?;

    Ok(Json(record))
}

pub async fn update_income(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(income_id): Path<Uuid>,
    Json(payload): Json<CreateIncomeRequest>,
) -> Result<Json<Income>, (StatusCode, String)> {
    validate(&payload)?;

    let record = sqlx::query_as::<_, Income>(
        r#"
        UPDATE incomes
        SET amount = $1,
            date = $2,
            source = $3,
            description = $4
        WHERE id = $5 AND user_id = $6
        RETURNING id, amount, date, source, description, currency
        "#,
    )
    .bind(payload.amount)
    .bind(payload.date)
    .bind(payload.source)
    .bind(payload.description)
    .bind(income_id)
    .bind(user.id)
    .fetch_optional(&state.pool)
    .await
    .map_err(crate::auth::internal_error)?;

    let Some(mut record) = record else {
        return Err((StatusCode::NOT_FOUND, "Income not found".into()));
    };

    let display = currency::display_currency(&state.pool, user.id).await?;
    let stored = record.currency.parse::<Currency>()?;
    record.amount = state.rates.convert(record.amount, stored, display)?;

    Ok(Json(record))
}

pub async fn delete_income(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(income_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let result = sqlx::query(
        r#"
        DELETE FROM incomes
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(income_id)
    .bind(user.id)
    .execute(&state.pool)
    .await
    .map_err(crate::auth::internal_error)?;

    if result.rows_affected() == 0 {
        return Err((StatusCode::NOT_FOUND, "Income not found".into()));
    }

    Ok(StatusCode::NO_CONTENT)
}
