use axum::{
    Router,
    routing::{get, post},
};

use quota_core::health::healthz;
use quota_core::middleware::{cors_layer, with_http_layers};

use crate::handlers::{
    access_code::{
        access_code_statistics, create_access_code, delete_access_code, get_access_code,
        list_access_codes, update_access_code,
    },
    health::readyz,
    ledger::{consume_access_code, validate_access_code},
    usage::{list_usage_records, usage_statistics},
};
use crate::state::AppState;

/// `allowed_origins` feeds the CORS policy; see [`cors_layer`].
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let router = Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Ledger
        .route("/access-codes/validate", post(validate_access_code))
        .route("/access-codes/consume", post(consume_access_code))
        // Access codes
        .route(
            "/access-codes",
            post(create_access_code).get(list_access_codes),
        )
        .route("/access-codes/statistics", get(access_code_statistics))
        .route(
            "/access-codes/{id}",
            get(get_access_code)
                .patch(update_access_code)
                .delete(delete_access_code),
        )
        // Usage records
        .route("/access-codes/{id}/usage-records", get(list_usage_records))
        .route("/usage-records/statistics", get(usage_statistics))
        .with_state(state);
    with_http_layers(router, cors_layer(allowed_origins))
}
