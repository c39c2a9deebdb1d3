//! Maps `VdbError` (and this crate's own embedding-client error) onto HTTP
//! status codes and a uniform error response body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use vdb_core::VdbError;

use crate::embedding::EmbeddingError;

pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { success: false, error: ErrorDetail { code: self.code, message: self.message } };
        (self.status, Json(body)).into_response()
    }
}

impl From<VdbError> for ApiError {
    fn from(err: VdbError) -> Self {
        let (status, code) = match &err {
            VdbError::ParentMissing { .. } | VdbError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            VdbError::DimensionMismatch { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "DIMENSION_MISMATCH"),
            VdbError::InvalidUpdate(_) => (StatusCode::CONFLICT, "INVALID_UPDATE"),
            VdbError::UnsupportedIndex(_) => (StatusCode::BAD_REQUEST, "UNSUPPORTED_INDEX"),
            VdbError::NotTrained => (StatusCode::CONFLICT, "NOT_TRAINED"),
            VdbError::NoIndex => (StatusCode::CONFLICT, "NO_INDEX"),
            VdbError::NothingToTrain => (StatusCode::CONFLICT, "NOTHING_TO_TRAIN"),
            VdbError::Storage(_) | VdbError::Internal(_) | VdbError::Config(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };
        Self { status, code, message: err.to_string() }
    }
}

impl From<EmbeddingError> for ApiError {
    fn from(err: EmbeddingError) -> Self {
        Self { status: StatusCode::BAD_GATEWAY, code: "EMBEDDING_PROVIDER_ERROR", message: err.to_string() }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, code: "BAD_REQUEST", message: message.into() }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_mismatch_maps_to_422() {
        let err: ApiError = VdbError::dimension_mismatch(4, 2).into();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn not_found_maps_to_404() {
        let err: ApiError = VdbError::not_found("chunk", "abc").into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn unsupported_index_maps_to_400() {
        let err: ApiError = VdbError::unsupported_index("bogus").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_trained_maps_to_409() {
        let err: ApiError = VdbError::NotTrained.into();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }
}
