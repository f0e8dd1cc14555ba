use std::{
    io::Read,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use axum::body::Body;
use bytes::Bytes;
use graphql_transport::{
    GraphExecutor, GraphqlError, OperationContext, OperationType, RawParams, Response, Server,
};
use http::{header, request::Parts, HeaderMap, Request, StatusCode};
use serde_json::{json, Map, Value};
use tower::ServiceExt;

#[derive(Default)]
struct Calls {
    prepared: AtomicUsize,
    dispatched: AtomicUsize,
}

/// Echoes what it receives instead of executing anything.
///
/// - `"invalid"` as query is rejected as a protocol error,
/// - a query containing `panic` panics at dispatch,
/// - the operation type is the first word of the query, `query` for anything else.
///
/// Every attached upload is read back, all of them a byte at a time first, to make sure
/// they don't share a read position.
#[derive(Clone, Default)]
pub struct EchoExecutor {
    calls: Arc<Calls>,
}

impl EchoExecutor {
    pub fn prepared(&self) -> usize {
        self.calls.prepared.load(Ordering::SeqCst)
    }

    pub fn dispatched(&self) -> usize {
        self.calls.dispatched.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl GraphExecutor for EchoExecutor {
    async fn create_operation_context(
        &self,
        parts: &Parts,
        params: RawParams,
    ) -> Result<OperationContext, Vec<GraphqlError>> {
        self.calls.prepared.fetch_add(1, Ordering::SeqCst);

        match params.query.trim() {
            "" => return Err(vec![GraphqlError::protocol("no operation provided")]),
            "invalid" => return Err(vec![GraphqlError::protocol("syntax error")]),
            _ => (),
        }

        let operation_type = match params.query.split_whitespace().next() {
            Some("mutation") => OperationType::Mutation,
            Some("subscription") => OperationType::Subscription,
            _ => OperationType::Query,
        };

        Ok(OperationContext::new(params, parts.headers.clone(), Some(operation_type)))
    }

    #[allow(clippy::panic)]
    async fn dispatch_operation(&self, mut context: OperationContext) -> Response {
        self.calls.dispatched.fetch_add(1, Ordering::SeqCst);

        if context.params.query.contains("panic") {
            panic!("resolver panicked");
        }

        let mut first_bytes = Vec::new();
        for attached in &mut context.params.uploads {
            let mut byte = [0; 1];
            let read = attached.upload.read(&mut byte).unwrap();
            first_bytes.push(byte[..read].to_vec());
        }

        let mut uploads = Map::new();
        for (attached, mut content) in context.params.uploads.iter_mut().zip(first_bytes) {
            attached.upload.read_to_end(&mut content).unwrap();
            uploads.insert(
                attached.path.clone(),
                json!({
                    "key": attached.key,
                    "filename": attached.upload.filename,
                    "contentType": attached.upload.content_type,
                    "size": attached.upload.size,
                    "content": String::from_utf8(content).unwrap(),
                }),
            );
        }

        Response::from_data(json!({
            "operationType": context.operation_type.map(|operation_type| operation_type.to_string()),
            "operationName": context.operation_name(),
            "query": context.params.query,
            "variables": context.params.variables,
            "uploads": uploads,
        }))
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE)?.to_str().ok()
    }
}

pub async fn send(server: &Server, request: Request<Body>) -> TestResponse {
    let response = server.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();

    TestResponse { status, headers, body }
}

pub fn get(path_and_query: &str) -> Request<Body> {
    Request::get(path_and_query).body(Body::empty()).unwrap()
}

/// `/query?...` with every parameter URL encoded.
pub fn get_with(params: &[(&str, &str)]) -> Request<Body> {
    get(&format!("/query?{}", serde_urlencoded::to_string(params).unwrap()))
}

pub fn post_json(body: impl Into<String>) -> Request<Body> {
    Request::post("/query")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.into()))
        .unwrap()
}

const BOUNDARY: &str = "------------------------graphql-transport";

/// Builds `multipart/form-data` bodies by hand.
#[derive(Default)]
pub struct Multipart {
    body: Vec<u8>,
    without_content_length: bool,
}

impl Multipart {
    pub fn operations(self, operations: Value) -> Self {
        self.text("operations", &operations.to_string())
    }

    pub fn map(self, map: Value) -> Self {
        self.text("map", &map.to_string())
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: text/plain\r\n\r\n{content}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    /// Streams the body without announcing its length.
    pub fn without_content_length(mut self) -> Self {
        self.without_content_length = true;
        self
    }

    pub fn into_request(mut self) -> Request<Body> {
        self.body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::post("/query").header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
        if !self.without_content_length {
            builder = builder.header(header::CONTENT_LENGTH, self.body.len());
        }

        builder.body(Body::from(self.body)).unwrap()
    }
}
