use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dogpack_core::{IsolationError, TenancyError};

#[derive(Debug)]
pub struct TenancyAxumError(pub anyhow::Error);

impl From<anyhow::Error> for TenancyAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<TenancyError> for TenancyAxumError {
    fn from(e: TenancyError) -> Self {
        Self(e.into_anyhow())
    }
}

impl TenancyAxumError {
    /// The structured error behind this response, even when wrapped in anyhow contexts.
    fn to_tenancy_error(&self) -> TenancyError {
        if let Some(tenancy) = TenancyError::from_anyhow(&self.0) {
            return tenancy.sanitize_for_client();
        }
        if let Some(isolation) = self
            .0
            .chain()
            .find_map(|e| e.downcast_ref::<IsolationError>())
        {
            return TenancyError::from(isolation.clone()).sanitize_for_client();
        }
        TenancyError::general_error("Internal error")
    }
}

impl IntoResponse for TenancyAxumError {
    fn into_response(self) -> Response {
        let safe = self.to_tenancy_error();
        if safe.code() >= 500 {
            tracing::error!(error = %self.0, "Request failed");
        }

        let status =
            StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(safe.to_json())).into_response()
    }
}
