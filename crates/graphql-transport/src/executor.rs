use std::any::Any;

use http::{request::Parts, HeaderMap};

use crate::{error::GraphqlError, request::RawParams, response::Response};

mod schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OperationType::Query => "query",
            OperationType::Mutation => "mutation",
            OperationType::Subscription => "subscription",
        })
    }
}

/// A validated operation, ready to be dispatched.
#[derive(Debug)]
pub struct OperationContext {
    pub params: RawParams,
    pub headers: HeaderMap,
    /// `None` when the document is not known yet, for example a persisted query hash the
    /// executor resolves at dispatch time. GET requests refuse those.
    pub operation_type: Option<OperationType>,
}

impl OperationContext {
    pub fn new(params: RawParams, headers: HeaderMap, operation_type: Option<OperationType>) -> Self {
        OperationContext {
            params,
            headers,
            operation_type,
        }
    }

    pub fn operation_name(&self) -> Option<&str> {
        self.params.operation_name()
    }
}

/// Everything the transports need from a GraphQL engine.
///
/// An implementation is provided for [`async_graphql::Schema`].
#[async_trait::async_trait]
pub trait GraphExecutor: Send + Sync + 'static {
    /// Parses and validates the request, and resolves which operation it runs.
    ///
    /// Errors returned here are sent back as is, their kinds decide the status code.
    async fn create_operation_context(
        &self,
        parts: &Parts,
        params: RawParams,
    ) -> Result<OperationContext, Vec<GraphqlError>>;

    /// Executes a prepared operation. Execution errors belong in the response, and a response
    /// carrying a [`Protocol`](crate::ErrorKind::Protocol) error is answered with 422.
    async fn dispatch_operation(&self, context: OperationContext) -> Response;

    /// Builds the response sent when [`GraphExecutor::create_operation_context`] failed.
    fn dispatch_error(&self, errors: Vec<GraphqlError>) -> Response {
        Response::from_errors(errors)
    }

    /// Turns a panic caught while serving a request into the single error sent to the client.
    fn present_recovered_error(&self, panic: Box<dyn Any + Send>) -> GraphqlError {
        tracing::error!("recovered from a panic while serving a GraphQL request: {}", panic_message(&*panic));
        GraphqlError::new("internal system error")
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}
