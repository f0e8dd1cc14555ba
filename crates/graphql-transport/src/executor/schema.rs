//! [`GraphExecutor`] for an `async_graphql::Schema`.

use async_graphql::{
    parser::{
        parse_query,
        types::{DocumentOperations, OperationType as ParsedOperationType},
    },
    ObjectType, Schema, ServerError, SubscriptionType, UploadValue,
};
use http::request::Parts;
use serde_json::{json, Map, Value};

use super::{GraphExecutor, OperationContext, OperationType};
use crate::{
    error::{ErrorKind, GraphqlError, Location, PARSE_FAILED, VALIDATION_FAILED},
    request::{AttachedUpload, RawParams},
    response::Response,
    upload::Spool,
};

#[async_trait::async_trait]
impl<Query, Mutation, Subscription> GraphExecutor for Schema<Query, Mutation, Subscription>
where
    Query: ObjectType + 'static,
    Mutation: ObjectType + 'static,
    Subscription: SubscriptionType + 'static,
{
    async fn create_operation_context(
        &self,
        parts: &Parts,
        params: RawParams,
    ) -> Result<OperationContext, Vec<GraphqlError>> {
        let operation_type = operation_type(&params).map_err(|error| vec![error])?;
        Ok(OperationContext::new(params, parts.headers.clone(), operation_type))
    }

    async fn dispatch_operation(&self, context: OperationContext) -> Response {
        let document_known = context.operation_type.is_some();

        let request = match into_request(context).await {
            Ok(request) => request,
            Err(error) => return Response::from_errors(vec![error]),
        };

        into_response(self.execute(request).await, document_known)
    }
}

/// Parses the document and picks the operation that will run.
///
/// A request without a document is only accepted when it carries a persisted query hash, in
/// which case the operation type stays unknown until the schema resolves it.
fn operation_type(params: &RawParams) -> Result<Option<OperationType>, GraphqlError> {
    if params.query.trim().is_empty() {
        if params.extensions.contains_key("persistedQuery") {
            return Ok(None);
        }
        return Err(GraphqlError::protocol("no operation provided").with_code(PARSE_FAILED));
    }

    let document = parse_query(&params.query).map_err(|err| {
        let error = GraphqlError::protocol(err.to_string()).with_code(PARSE_FAILED);
        err.positions().fold(error, |error, pos| {
            error.with_location(Location {
                line: pos.line,
                column: pos.column,
            })
        })
    })?;

    let operation = match (document.operations, params.operation_name()) {
        (DocumentOperations::Single(_), Some(_)) => None,
        (DocumentOperations::Multiple(mut operations), Some(name)) => operations.remove(name),
        (DocumentOperations::Single(operation), None) => Some(operation),
        (DocumentOperations::Multiple(operations), None) => {
            if operations.len() != 1 {
                return Err(
                    GraphqlError::protocol("Operation name required in request.").with_code(VALIDATION_FAILED)
                );
            }
            operations.into_values().next()
        }
    };

    let operation = operation.ok_or_else(|| {
        GraphqlError::protocol(format!(
            "Unknown operation named \"{}\".",
            params.operation_name().unwrap_or_default()
        ))
        .with_code(VALIDATION_FAILED)
    })?;

    Ok(Some(match operation.node.ty {
        ParsedOperationType::Query => OperationType::Query,
        ParsedOperationType::Mutation => OperationType::Mutation,
        ParsedOperationType::Subscription => OperationType::Subscription,
    }))
}

async fn into_request(context: OperationContext) -> Result<async_graphql::Request, GraphqlError> {
    let OperationContext { params, headers, .. } = context;
    let RawParams {
        query,
        operation_name,
        variables,
        extensions,
        uploads,
        ..
    } = params;

    let mut request: async_graphql::Request = serde_json::from_value(json!({
        "query": query,
        "operationName": operation_name.filter(|name| !name.is_empty()),
        "variables": variables,
        "extensions": extensions,
    }))
    .map_err(|err| GraphqlError::protocol(format!("request could not be decoded: {err}")))?;

    for (path, upload) in spool(uploads).await? {
        request.set_upload(&path, upload);
    }

    Ok(request.data(headers))
}

/// The engine reads uploads from files, in-memory ones are written to disk on a blocking thread.
async fn spool(uploads: Vec<AttachedUpload>) -> Result<Vec<(String, UploadValue)>, GraphqlError> {
    if uploads.is_empty() {
        return Ok(Vec::new());
    }

    let spooled = tokio::task::spawn_blocking(move || {
        let mut spool = Spool::default();

        uploads
            .into_iter()
            .map(|AttachedUpload { key, path, upload }| {
                let filename = upload.filename.clone();
                let content_type = upload.content_type.clone();

                let content = spool.file(upload).map_err(|err| {
                    tracing::error!("failed to prepare upload for key {key}: {err}");
                    GraphqlError::new(format!("failed to read file for key {key}"))
                })?;

                let upload = UploadValue {
                    filename,
                    content_type,
                    content,
                };

                Ok((path, upload))
            })
            .collect::<Result<Vec<_>, GraphqlError>>()
    })
    .await;

    spooled.unwrap_or_else(|err| {
        tracing::error!("upload spooling task failed: {err}");
        Err(GraphqlError::new("failed to read uploaded files"))
    })
}

/// Errors of a response without data and without any path were raised before execution
/// started: they reject the request itself. When the document was known those are validation
/// failures. A bare persisted query hash can also fail its lookup, and that error carries no
/// location since there is no document to point into.
fn into_response(response: async_graphql::Response, document_known: bool) -> Response {
    let rejected = matches!(response.data, async_graphql::Value::Null)
        && response.errors.iter().all(|error| error.path.is_empty());

    let data = serde_json::to_value(&response.data).unwrap_or_default();
    let extensions = (!response.extensions.is_empty()).then(|| {
        response
            .extensions
            .into_iter()
            .filter_map(|(key, value)| Some((key, serde_json::to_value(value).ok()?)))
            .collect::<Map<String, Value>>()
    });

    Response {
        errors: response
            .errors
            .into_iter()
            .map(|error| {
                let invalid = rejected && (document_known || !error.locations.is_empty());
                let error = into_graphql_error(error);

                if !invalid {
                    error
                } else if error.code().is_some() {
                    error.with_kind(ErrorKind::Protocol)
                } else {
                    error.with_kind(ErrorKind::Protocol).with_code(VALIDATION_FAILED)
                }
            })
            .collect(),
        data,
        extensions,
    }
}

fn into_graphql_error(error: ServerError) -> GraphqlError {
    let locations = error
        .locations
        .iter()
        .map(|pos| Location {
            line: pos.line,
            column: pos.column,
        })
        .collect();

    let path = (!error.path.is_empty()).then(|| {
        error
            .path
            .iter()
            .filter_map(|segment| serde_json::to_value(segment).ok())
            .collect()
    });

    let extensions = match error.extensions.as_ref().map(serde_json::to_value) {
        Some(Ok(Value::Object(extensions))) if !extensions.is_empty() => Some(extensions),
        _ => None,
    };

    GraphqlError {
        message: error.message,
        locations,
        path,
        extensions,
        kind: Default::default(),
    }
}
