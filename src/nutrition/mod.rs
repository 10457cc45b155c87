//! Protein targets and meal roll-ups. Everything in here is pure and
//! synchronous; handlers fetch the data and hand it over.

pub mod aggregator;
pub mod calculator;
pub mod dto;
pub mod handlers;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::nutrition_routes()
}
