use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// The `{status, response, data}` body every endpoint answers with.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: u16,
    pub response: String,
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(status: StatusCode, response: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status: status.as_u16(),
            response: response.into(),
            data,
        }
    }

    pub fn ok(response: impl Into<String>, data: T) -> Self {
        Self::new(StatusCode::OK, response, Some(data))
    }

    pub fn created(response: impl Into<String>, data: T) -> Self {
        Self::new(StatusCode::CREATED, response, Some(data))
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_null_data() {
        let body = Envelope::<()>::new(StatusCode::NOT_FOUND, "Post Not Found", None);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], 404);
        assert_eq!(json["response"], "Post Not Found");
        assert!(json["data"].is_null());
    }

    #[test]
    fn created_envelope_uses_201() {
        let response = Envelope::created("done", 5).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
