use axum::body::Body;
use http::{Method, Request, StatusCode};
use serde_json::{Map, Value};

use super::{is_upgrade, Transport};
use crate::{
    dispatch,
    executor::{GraphExecutor, OperationType},
    request::{RawParams, TraceTiming},
    response,
};

/// Queries sent as URL query parameters, `variables` and `extensions` being JSON encoded.
///
/// Only query operations may be sent this way. A request whose operation the executor cannot
/// resolve up front, such as a bare persisted query hash, is refused as well since it could turn
/// out to be a mutation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Get;

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryParams {
    query: Option<String>,
    operation_name: Option<String>,
    variables: Option<String>,
    extensions: Option<String>,
}

#[async_trait::async_trait]
impl Transport for Get {
    fn name(&self) -> &'static str {
        "get"
    }

    fn supports(&self, request: &Request<Body>) -> bool {
        request.method() == Method::GET && !is_upgrade(request.headers())
    }

    async fn execute(&self, request: Request<Body>, executor: &dyn GraphExecutor) -> http::Response<Body> {
        let (parts, _) = request.into_parts();
        let mut read_time = TraceTiming::start();

        let query_params: QueryParams = match serde_urlencoded::from_str(parts.uri.query().unwrap_or_default()) {
            Ok(query_params) => query_params,
            Err(err) => {
                tracing::debug!("invalid query string: {err}");
                return response::error(StatusCode::BAD_REQUEST, "query parameters could not be decoded");
            }
        };

        let Ok(variables) = decode_json(query_params.variables.as_deref()) else {
            return response::error(StatusCode::BAD_REQUEST, "variables could not be decoded");
        };

        let Ok(extensions) = decode_json(query_params.extensions.as_deref()) else {
            return response::error(StatusCode::BAD_REQUEST, "extensions could not be decoded");
        };

        read_time.finish();

        let params = RawParams {
            query: query_params.query.unwrap_or_default(),
            operation_name: query_params.operation_name.filter(|name| !name.is_empty()),
            variables,
            extensions,
            uploads: Vec::new(),
            read_time,
        };

        let context = match dispatch::prepare(executor, &parts, params).await {
            Ok(context) => context,
            Err(response) => return response,
        };

        if context.operation_type != Some(OperationType::Query) {
            return response::error(StatusCode::NOT_ACCEPTABLE, "GET requests only allow query operations");
        }

        dispatch::execute(executor, context).await
    }
}

/// Absent or empty means no entries. A JSON `null` is accepted as well.
fn decode_json(value: Option<&str>) -> serde_json::Result<Map<String, Value>> {
    match value.filter(|value| !value.is_empty()) {
        Some(value) => Ok(serde_json::from_str::<Option<_>>(value)?.unwrap_or_default()),
        None => Ok(Map::new()),
    }
}
