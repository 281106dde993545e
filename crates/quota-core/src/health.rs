use axum::http::StatusCode;

/// Handler for `GET /healthz`. The process is up if it can answer at all;
/// dependency checks belong in each service's readiness handler.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Map a dependency probe result onto a readiness status code.
pub fn readiness<E>(probe: Result<(), E>) -> StatusCode {
    match probe {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
