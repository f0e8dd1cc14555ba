use std::{
    convert::Infallible,
    panic::AssertUnwindSafe,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    body::{Body, HttpBody},
    BoxError,
};
use bytes::Bytes;
use futures_util::{future::BoxFuture, FutureExt};
use http::{Request, StatusCode};
use tower_service::Service;
use tracing::Instrument;

use crate::{
    executor::GraphExecutor,
    response,
    transport::{Get, MultipartForm, Options, Post, Transport},
};

/// Serves GraphQL over HTTP with a fixed list of transports.
///
/// Cloning is cheap, all clones share the same transports and executor.
#[derive(Clone)]
pub struct Server {
    transports: Arc<[Box<dyn Transport>]>,
    executor: Arc<dyn GraphExecutor>,
}

pub struct ServerBuilder {
    transports: Vec<Box<dyn Transport>>,
    executor: Arc<dyn GraphExecutor>,
}

impl ServerBuilder {
    /// Registers a transport. Transports are tried in registration order and the first one
    /// supporting a request handles it.
    #[must_use]
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transports.push(Box::new(transport));
        self
    }

    pub fn build(self) -> Server {
        Server {
            transports: self.transports.into(),
            executor: self.executor,
        }
    }
}

impl Server {
    /// A server without any transport, every request is rejected until some are registered.
    pub fn builder(executor: impl GraphExecutor) -> ServerBuilder {
        ServerBuilder {
            transports: Vec::new(),
            executor: Arc::new(executor),
        }
    }

    /// Registers, in this order, [`Options`], [`Get`], [`Post`] and a [`MultipartForm`] with
    /// the default limits.
    pub fn new_default(executor: impl GraphExecutor) -> Self {
        Self::builder(executor)
            .transport(Options)
            .transport(Get)
            .transport(Post)
            .transport(MultipartForm::default())
            .build()
    }

    /// Handles a single request.
    ///
    /// A panic raised anywhere while handling it is turned into a 422 response carrying the
    /// error built by [`GraphExecutor::present_recovered_error`].
    pub async fn serve(&self, request: Request<Body>) -> http::Response<Body> {
        match AssertUnwindSafe(self.dispatch(request)).catch_unwind().await {
            Ok(response) => response,
            Err(panic) => {
                let error = self.executor.present_recovered_error(panic);
                response::errors(StatusCode::UNPROCESSABLE_ENTITY, vec![error])
            }
        }
    }

    async fn dispatch(&self, request: Request<Body>) -> http::Response<Body> {
        let Some(transport) = self.transports.iter().find(|transport| transport.supports(&request)) else {
            tracing::warn!(method = %request.method(), "no transport supports the request");
            return response::error(StatusCode::BAD_REQUEST, "transport not supported");
        };

        let span = tracing::debug_span!("graphql-request", method = %request.method(), transport = transport.name());

        async {
            tracing::debug!("transport selected");
            let response = transport.execute(request, self.executor.as_ref()).await;
            tracing::debug!(status = %response.status(), "request handled");
            response
        }
        .instrument(span)
        .await
    }
}

impl<B> Service<Request<B>> for Server
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    type Response = http::Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let server = self.clone();
        let request = request.map(Body::new);

        Box::pin(async move { Ok(server.serve(request).await) })
    }
}
