//! JSON body extractor with the API's error shape.
//!
//! Wraps [`axum::Json`] so malformed, mistyped or missing bodies answer
//! 400 with a `{message}` body instead of axum's plain-text rejection.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Request body deserialized from JSON.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{StatusCode, header};
    use axum::response::IntoResponse;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Counter {
        count: i32,
    }

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body() {
        let ApiJson(body) = ApiJson::<Counter>::from_request(json_request(r#"{"count":3}"#), &())
            .await
            .unwrap();
        assert_eq!(body.count, 3);
    }

    #[tokio::test]
    async fn test_mistyped_field_is_bad_request() {
        let err = ApiJson::<Counter>::from_request(json_request(r#"{"count":"three"}"#), &())
            .await
            .err()
            .unwrap();
        assert!(matches!(&err, AppError::BadRequest(msg) if msg.contains("count")));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
