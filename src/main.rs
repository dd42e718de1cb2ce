mod auth;
mod error;
mod models;
mod routes;
mod services;
mod state;

use axum::{routing::get, routing::post, Router};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::services::currency::RateTable;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://spendbook:spendbook@db:5432/spendbook".into());
    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| "change-me".into());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("failed to connect to database");

    auth::ensure_database(&pool)
        .await
        .expect("database not reachable");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    let state = AppState {
        pool,
        jwt_secret,
        rates: RateTable::default(),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/me", get(auth::me).put(auth::update_me))
        .route(
            "/api/expenses",
            get(routes::expenses::list_expenses).post(routes::expenses::create_expense),
        )
        .route(
            "/api/expenses/{id}",
            get(routes::expenses::get_expense)
                .put(routes::expenses::update_expense)
                .delete(routes::expenses::delete_expense),
        )
        .route(
            "/api/incomes",
            get(routes::incomes::list_incomes).post(routes::incomes::create_income),
        )
        .route(
            "/api/incomes/{id}",
            get(routes::incomes::get_income)
                .put(routes::incomes::update_income)
                .delete(routes::incomes::delete_income),
        )
        .route(
            "/api/budget-goals",
            get(routes::budget_goals::list_budget_goals)
                .post(routes::budget_goals::create_budget_goal),
        )
        .route(
            "/api/budget-goals/progress",
            get(routes::budget_goals::progress),
        )
        .route(
            "/api/budget-goals/{id}",
            get(routes::budget_goals::get_budget_goal)
                .put(routes::budget_goals::update_budget_goal)
                .delete(routes::budget_goals::delete_budget_goal),
        )
        .route("/api/dashboard", get(routes::dashboard::dashboard))
        .route(
            "/api/reports",
            get(routes::reports::list_reports).post(routes::reports::generate_report),
        )
        .route("/api/reports/{id}", get(routes::reports::get_report))
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 8080));
    tracing::info!("Spendbook API listening on {}", addr);

    axum::serve(
        tokio::net::TcpListener::bind(addr)
            .await
            .expect("failed to bind address"),
        app,
    )
    .await
    .expect("server error");
}

async fn health() -> &'static str {
    "ok"
}
