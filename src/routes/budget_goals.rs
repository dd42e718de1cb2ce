use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    models::{BudgetGoal, CreateBudgetGoalRequest, Currency},
    services::{
        aggregate::MoneyRecord,
        budget_progress::{self, BudgetProgress},
        currency,
    },
    state::AppState,
};

fn validate(payload: &CreateBudgetGoalRequest) -> Result<(), (StatusCode, String)> {
    if payload.amount <= 0.0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Amount must be a positive number".into(),
        ));
    }
    if payload.end_date <= payload.start_date {
        return Err((
            StatusCode::BAD_REQUEST,
            "End date must be after start date".into(),
        ));
    }
    Ok(())
}

pub async fn list_budget_goals(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<BudgetGoal>>, (StatusCode, String)> {
    let display = currency::display_currency(&state.pool, user.id).await?;
    let mut records = sqlx::query_as::<_, BudgetGoal>(
        r#"
        SELECT id, amount, start_date, end_date, category, currency
        FROM budget_goals
        WHERE user_id = $1
        ORDER BY start_date DESC
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

pub async fn get_budget_goal(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(goal_id): Path<Uuid>,
) -> Result<Json<BudgetGoal>, (StatusCode, String)> {
    let display = currency::display_currency(&state.pool, user.id).await?;
    let record = sqlx::query_as::<_, BudgetGoal>(
        r#"
        SELECT id, amount, start_date, end_date, category, currency
        FROM budget_goals
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(goal_id)
    .bind(user.id)
    .fetch_optional(&state.pool)
    .await
    .map_err(crate::auth::internal_error)?;

    let Some(mut record) = record else {
        return Err((StatusCode::NOT_FOUND, "Budget goal not found".into()));
    };

    let stored = record.currency.parse::<Currency>()?;
    record.amount = state.rates.convert(record.amount, stored, display)?;

    Ok(Json(record))
}

pub async fn create_budget_goal(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateBudgetGoalRequest>,
) -> Result<Json<BudgetGoal>, (StatusCode, String)> {
    validate(&payload)?;

    // Goals carry the currency the owner was displaying when they were set,
    // same as money records.
    let display = currency::display_currency(&state.pool, user.id).await?;
    let id = Uuid::new_v4();
    let record = sqlx::query_as::<_, BudgetGoal>(
        r#"
        INSERT INTO budget_goals (id, user_id, amount, start_date, end_date, category, currency)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, amount, start_date, end_date, category, currency
        "#,
    )
    .bind(id)
    .bind(user.id)
    .bind(payload.amount)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.category)
    .bind(display.as_str())
    .fetch_one(&state.pool)
    .await
    .map_err(crate::auth::internal_error)?;

    Ok(Json(record))
}

pub async fn update_budget_goal(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(goal_id): Path<Uuid>,
    Json(payload): Json<CreateBudgetGoalRequest>,
) -> Result<Json<BudgetGoal>, (StatusCode, String)> {
    validate(&payload)?;

    let record = sqlx::query_as::<_, BudgetGoal>(
        r#"
        UPDATE budget_goals
        SET amount = $1,
            start_date = $2,
            end_date = $3,
            category = $4
        WHERE id = $5 AND user_id = $6
        RETURNING id, amount, start_date, end_date, category, currency
        "#,
    )
    .bind(payload.amount)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.category)
    .bind(goal_id)
    .bind(user.id)
    .fetch_optional(&state.pool)
    .await
    .map_err(crate::auth::internal_error)?;

    let Some(mut record) = record else {
        return Err((StatusCode::NOT_FOUND, "Budget goal not found".into()));
    };

    let display = currency::display_currency(&state.pool, user.id).await?;
    let stored = record.currency.parse::<Currency>()?;
    record.amount = state.rates.convert(record.amount, stored, display)?;

    Ok(Json(record))
}

pub async fn delete_budget_goal(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(goal_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let result = sqlx::query(
        r#"
        DELETE FROM budget_goals
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(goal_id)
    .bind(user.id)
    .execute(&state.pool)
    .await
    .map_err(crate::auth::internal_error)?;

    if result.rows_affected() == 0 {
        return Err((StatusCode::NOT_FOUND, "Budget goal not found".into()));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn progress(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<BudgetProgress>>, (StatusCode, String)> {
    let display = currency::display_currency(&state.pool, user.id).await?;

    let goals = sqlx::query_as::<_, BudgetGoal>(
        r#"
        SELECT id, amount, start_date, end_date, category, currency
        FROM budget_goals
        WHERE user_id = $1
        ORDER BY start_date DESC
        "#,
    )
    .bind(user.id)
    .fetch_all(&state.pool)
    .await
    .map_err(crate::auth::internal_error)?;

    let expenses = sqlx::query_as::<_, crate::models::Expense>(
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

    let mut records = Vec::with_capacity(expenses.len());
    for row in &expenses {
        records.push(MoneyRecord::from_expense(row)?);
    }

    let mut results = Vec::with_capacity(goals.len());
    for goal in &goals {
        results.push(budget_progress::evaluate(
            &state.rates,
            goal,
            &records,
            display,
        )?);
    }

    Ok(Json(results))
}
