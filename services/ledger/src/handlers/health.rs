use axum::{extract::State, http::StatusCode};

use quota_core::health::readiness;

use crate::state::AppState;

/// `GET /readyz`: ready when the database answers a ping.
pub async fn readyz(State(state): State<AppState>) -> StatusCode {
    let probe = state.db.ping().await;
    if let Err(ref e) = probe {
        tracing::warn!(error = %e, "database ping failed");
    }
    readiness(probe)
}
