use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;

/// Error taxonomy for the whole HTTP surface. Every variant renders as
/// `{"error": "<message>"}` with its mapped status code.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Database(ref e) = self {
            tracing::error!("Database failure: {}", e);
        }
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// JSON body extractor whose rejection renders through [`ApiError`], so a
/// structurally malformed payload answers with the same 400
/// `{"error": ...}` shape as a failed presence check.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| ApiError::validation(e.body_text()))?;
        Ok(ApiJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::validation("missing field").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::not_found("no such session").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::conflict("in use").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_message_passthrough() {
        let err = ApiError::conflict("Cannot delete division as it is being used");
        assert_eq!(err.to_string(), "Cannot delete division as it is being used");
    }

    #[tokio::test]
    async fn test_malformed_body_maps_to_validation() {
        #[derive(serde::Deserialize)]
        struct Payload {
            #[allow(dead_code)]
            name: String,
        }

        let req = axum::http::Request::builder()
            .method("POST")
            .header(axum::http::header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(r#"{"name": 5}"#))
            .unwrap();

        let err = ApiJson::<Payload>::from_request(req, &())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_well_formed_body_extracts() {
        #[derive(serde::Deserialize)]
        struct Payload {
            name: String,
        }

        let req = axum::http::Request::builder()
            .method("POST")
            .header(axum::http::header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(r#"{"name": "Ops"}"#))
            .unwrap();

        let ApiJson(payload) = ApiJson::<Payload>::from_request(req, &())
            .await
            .ok()
            .unwrap();
        assert_eq!(payload.name, "Ops");
    }
}
