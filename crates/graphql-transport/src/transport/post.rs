use axum::body::Body;
use http::{Method, Request, StatusCode};

use super::{is_upgrade, media_type, Transport};
use crate::{
    dispatch,
    executor::GraphExecutor,
    request::{RawParams, TraceTiming},
    response,
};

/// A single request sent as an `application/json` body.
#[derive(Debug, Clone, Copy, Default)]
pub struct Post;

#[async_trait::async_trait]
impl Transport for Post {
    fn name(&self) -> &'static str {
        "post"
    }

    fn supports(&self, request: &Request<Body>) -> bool {
        request.method() == Method::POST
            && !is_upgrade(request.headers())
            && media_type(request.headers()).is_some_and(|media_type| {
                media_type.type_() == mime::APPLICATION && media_type.subtype() == mime::JSON
            })
    }

    async fn execute(&self, request: Request<Body>, executor: &dyn GraphExecutor) -> http::Response<Body> {
        let (parts, body) = request.into_parts();
        let mut read_time = TraceTiming::start();

        let bytes = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(err) => {
                return response::error(StatusCode::BAD_REQUEST, format!("could not read request body: {err}"));
            }
        };

        let mut params: RawParams = match serde_json::from_slice(&bytes) {
            Ok(params) => params,
            Err(err) => {
                return response::error(StatusCode::BAD_REQUEST, format!("json body could not be decoded: {err}"));
            }
        };

        read_time.finish();
        params.read_time = read_time;

        dispatch::run(executor, &parts, params).await
    }
}
