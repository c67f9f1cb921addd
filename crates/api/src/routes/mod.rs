//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::caller_middleware};

pub mod approval_chain;
pub mod approval_rules;
pub mod approvals;
pub mod expenses;
pub mod health;
pub mod manager_relationships;

/// Creates the API router; everything but health requires a caller.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let caller_routes = Router::new()
        .merge(approval_chain::routes())
        .merge(approval_rules::routes())
        .merge(manager_relationships::routes())
        .merge(expenses::routes())
        .merge(approvals::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            caller_middleware,
        ));

    Router::new().merge(health::routes()).merge(caller_routes)
}
