use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    models::{GenerateReportRequest, Report},
    services::{
        currency,
        report::{self, ReportWithDetails},
    },
    state::AppState,
};

pub async fn generate_report(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<GenerateReportRequest>,
) -> Result<Json<ReportWithDetails>, (StatusCode, String)> {
    if payload.period.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Period label must not be empty".into()));
    }

    let display = currency::display_currency(&state.pool, user.id).await?;
    let report = report::generate(
        &state.pool,
        &state.rates,
        user.id,
        display,
        payload.start_date,
        payload.end_date,
        &payload.period,
    )
    .await?;

    Ok(Json(report))
}

pub async fn list_reports(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Report>>, (StatusCode, String)> {
    let records = sqlx::query_as::<_, Report>(
        r#"
        SELECT id, period, total_expense, total_income, balance, date_generated
        FROM reports
        WHERE user_id = $1
        ORDER BY date_generated DESC
        "#,
    )
    .bind(user.id)
    .fetch_all(&state.pool)
    .await
    .map_err(crate::auth::internal_error)?;

    Ok(Json(records))
}

pub async fn get_report(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(report_id): Path<Uuid>,
) -> Result<Json<ReportWithDetails>, (StatusCode, String)> {
    let record = sqlx::query_as::<_, Report>(
        r#"
        SELECT id, period, total_expense, total_income, balance, date_generated
        FROM reports
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(report_id)
    .bind(user.id)
    .fetch_optional(&state.pool)
    .await
    .map_err(crate::auth::internal_error)?;

    let Some(record) = record else {
        return Err((StatusCode::NOT_FOUND, "Report not found".into()));
    };

    let display = currency::display_currency(&state.pool, user.id).await?;

    // The stored snapshot only keeps the period label; the window is
    // re-derived from it (or guessed, with the guess tagged in the response).
    let range = report::resolve_period(&record.period, Utc::now().date_naive());
    let expenses = report::expenses_between(
        &state.pool,
        user.id,
        range.period_start,
        range.period_end,
    )
    .await
    .map_err(crate::auth::internal_error)?;
    let incomes = report::incomes_between(
        &state.pool,
        user.id,
        range.period_start,
        range.period_end,
    )
    .await
    .map_err(crate::auth::internal_error)?;

    let details = report::build_details(&state.rates, display, &range, &expenses, &incomes)?;

    Ok(Json(ReportWithDetails {
        report: record,
        details,
    }))
}
