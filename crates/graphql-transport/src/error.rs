use http::StatusCode;
use serde_json::{Map, Value};

/// Error code attached to errors produced while parsing an operation document.
pub const PARSE_FAILED: &str = "GRAPHQL_PARSE_FAILED";

/// Error code attached to errors produced while selecting or validating an operation.
pub const VALIDATION_FAILED: &str = "GRAPHQL_VALIDATION_FAILED";

/// What went wrong, from the point of view of the client.
///
/// Kinds are ordered: a response is classified by the most severe kind it contains.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    /// Raised while executing a well-formed operation, reported alongside (partial) data.
    #[default]
    User,
    /// The request itself is malformed: bad JSON, an unparsable document, an unknown operation.
    Protocol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// A single entry of the `errors` list of a GraphQL response.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct GraphqlError {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
    /// Never serialized, only drives the HTTP status code.
    #[serde(skip)]
    pub kind: ErrorKind,
}

impl GraphqlError {
    pub fn new(message: impl Into<String>) -> Self {
        GraphqlError {
            message: message.into(),
            locations: Vec::new(),
            path: None,
            extensions: None,
            kind: ErrorKind::User,
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(message).with_kind(ErrorKind::Protocol)
    }

    #[must_use]
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.locations.push(location);
        self
    }

    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions
            .get_or_insert_with(Default::default)
            .insert(key.into(), value.into());
        self
    }

    /// Sets `extensions.code`.
    #[must_use]
    pub fn with_code(self, code: &str) -> Self {
        self.with_extension("code", code)
    }

    pub fn code(&self) -> Option<&str> {
        self.extensions.as_ref()?.get("code")?.as_str()
    }
}

impl std::fmt::Display for GraphqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for GraphqlError {}

/// HTTP status code for a list of errors: 422 as soon as one of them is a protocol error, 200
/// otherwise. An empty list is a success.
pub fn status_for(errors: &[GraphqlError]) -> StatusCode {
    match errors.iter().map(|error| error.kind).max() {
        Some(ErrorKind::Protocol) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(ErrorKind::User) | None => StatusCode::OK,
    }
}
