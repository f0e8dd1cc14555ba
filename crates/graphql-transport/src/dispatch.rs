use axum::body::Body;
use http::request::Parts;

use crate::{
    error::status_for,
    executor::{GraphExecutor, OperationContext},
    request::RawParams,
    response,
};

/// Lets the executor validate the request. On failure the error response is ready to be sent.
pub(crate) async fn prepare(
    executor: &dyn GraphExecutor,
    parts: &Parts,
    params: RawParams,
) -> Result<OperationContext, http::Response<Body>> {
    tracing::debug!(read_time = ?params.read_time.duration(), "request decoded");

    executor
        .create_operation_context(parts, params)
        .await
        .map_err(|errors| {
            let status = status_for(&errors);
            tracing::debug!(%status, "operation rejected: {}", errors.first().map(|error| error.message.as_str()).unwrap_or_default());
            response::json(status, &executor.dispatch_error(errors))
        })
}

/// Runs a prepared operation. Execution errors are part of the result and answered with 200,
/// protocol errors the executor only detects while dispatching still map to 422.
pub(crate) async fn execute(executor: &dyn GraphExecutor, context: OperationContext) -> http::Response<Body> {
    let response = executor.dispatch_operation(context).await;
    response::json(status_for(&response.errors), &response)
}

pub(crate) async fn run(executor: &dyn GraphExecutor, parts: &Parts, params: RawParams) -> http::Response<Body> {
    match prepare(executor, parts, params).await {
        Ok(context) => execute(executor, context).await,
        Err(response) => response,
    }
}
