use sqlx::PgPool;

use crate::services::currency::RateTable;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub jwt_secret: String,
    pub rates: RateTable,
}
