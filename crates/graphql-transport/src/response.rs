use axum::body::Body;
use http::{header, HeaderValue, StatusCode};
use serde_json::{Map, Value};

use crate::error::GraphqlError;

/// A GraphQL response as sent to the client.
///
/// `errors` comes first and is omitted when empty, `data` is always present and `null` when the
/// operation never produced any.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphqlError>,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl Response {
    pub fn from_data(data: impl Into<Value>) -> Self {
        Response {
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn from_errors(errors: Vec<GraphqlError>) -> Self {
        Response {
            errors,
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::from_errors(vec![GraphqlError::new(message)])
    }
}

const SERIALIZATION_FAILURE: &[u8] = br#"{"errors":[{"message":"Internal Server Error"}],"data":null}"#;

/// Serializes the response as JSON with the given status.
pub(crate) fn json(status: StatusCode, response: &Response) -> http::Response<Body> {
    match serde_json::to_vec(response) {
        Ok(bytes) => with_json_body(status, bytes),
        Err(err) => {
            tracing::error!("Failed to serialize response: {err}");
            with_json_body(StatusCode::INTERNAL_SERVER_ERROR, SERIALIZATION_FAILURE.to_vec())
        }
    }
}

/// `{"errors":[{"message":...}],"data":null}`
pub(crate) fn error(status: StatusCode, message: impl Into<String>) -> http::Response<Body> {
    json(status, &Response::error(message))
}

pub(crate) fn errors(status: StatusCode, errors: Vec<GraphqlError>) -> http::Response<Body> {
    json(status, &Response::from_errors(errors))
}

pub(crate) fn empty(status: StatusCode) -> http::Response<Body> {
    let mut response = http::Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

fn with_json_body(status: StatusCode, bytes: Vec<u8>) -> http::Response<Body> {
    let mut response = http::Response::new(Body::from(bytes));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
