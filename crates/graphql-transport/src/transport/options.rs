use axum::body::Body;
use http::{header, HeaderValue, Method, Request, StatusCode};

use super::Transport;
use crate::{executor::GraphExecutor, response};

/// Answers `OPTIONS` with the allowed methods and refuses `HEAD`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options;

#[async_trait::async_trait]
impl Transport for Options {
    fn name(&self) -> &'static str {
        "options"
    }

    fn supports(&self, request: &Request<Body>) -> bool {
        matches!(*request.method(), Method::OPTIONS | Method::HEAD)
    }

    async fn execute(&self, request: Request<Body>, _executor: &dyn GraphExecutor) -> http::Response<Body> {
        if request.method() == Method::HEAD {
            return response::empty(StatusCode::METHOD_NOT_ALLOWED);
        }

        let mut response = response::empty(StatusCode::OK);
        response
            .headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static("OPTIONS, GET, POST"));
        response
    }
}
