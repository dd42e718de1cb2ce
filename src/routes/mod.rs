pub mod budget_goals;
pub mod dashboard;
pub mod expenses;
pub mod incomes;
pub mod reports;
