//! Request body extraction with rejections rendered as the API's error envelope.

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::core::error::AppError;

/// JSON request body. Malformed bodies become `BAD_REQUEST` in the usual
/// `{ success: false, code, message }` shape instead of axum's plain text.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| Self(value))
            .map_err(body_rejection)
    }
}

fn body_rejection(rejection: JsonRejection) -> AppError {
    tracing::debug!("Rejected request body: {}", rejection.body_text());

    let message = match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Request body must be sent as application/json".to_string()
        }
        JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON".to_string(),
        JsonRejection::JsonDataError(err) => {
            format!("Request body has missing or mistyped fields: {}", err.body_text())
        }
        _ => "Request body could not be read".to_string(),
    };
    AppError::BadRequest(message)
}
