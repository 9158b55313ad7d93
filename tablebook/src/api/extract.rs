//! Request extractors that report failures through [`Error`].

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;

use crate::errors::Error;

/// [`Json`] whose rejections surface as `400 Bad Request` with the usual `{"error": ..}`
/// body, instead of axum's plain-text 415/422.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::bad_request(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{StatusCode, header},
    };
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        number: i32,
    }

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = axum::http::Request::builder().method("POST").uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn test_accepts_valid_body() {
        let ApiJson(body) = ApiJson::<Payload>::from_request(request(Some("application/json"), r#"{"number": 3}"#), &())
            .await
            .unwrap();
        assert_eq!(body.number, 3);
    }

    #[tokio::test]
    async fn test_rejections_are_bad_requests() {
        let cases = [
            (Some("application/json"), r#"{"number": "five"}"#),
            (Some("application/json"), r#"{"number": 3"#),
            (Some("text/plain"), r#"{"number": 3}"#),
            (None, r#"{"number": 3}"#),
        ];

        for (content_type, body) in cases {
            let err = ApiJson::<Payload>::from_request(request(content_type, body), &())
                .await
                .unwrap_err();
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST, "{content_type:?} {body}");
        }
    }
}
