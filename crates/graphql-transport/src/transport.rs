//! The ways a GraphQL request can reach the server over HTTP.

use axum::body::Body;
use http::{header, HeaderMap, Request};

use crate::executor::GraphExecutor;

mod get;
mod multipart;
mod options;
mod post;

pub use get::Get;
pub use multipart::MultipartForm;
pub use options::Options;
pub use post::Post;

/// One way of carrying GraphQL over HTTP.
///
/// The server asks every registered transport, in registration order, whether it supports the
/// request and hands it to the first one that does.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Must not consume or inspect the body.
    fn supports(&self, request: &Request<Body>) -> bool;

    /// Produces the complete response. Failures are reported as responses, never returned.
    async fn execute(&self, request: Request<Body>, executor: &dyn GraphExecutor) -> http::Response<Body>;
}

/// Whether the client asks to switch protocols, as a websocket handshake does.
fn is_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .is_some_and(|value| !value.as_bytes().is_empty())
}

fn media_type(headers: &HeaderMap) -> Option<mime::Mime> {
    headers.get(header::CONTENT_TYPE)?.to_str().ok()?.parse().ok()
}
