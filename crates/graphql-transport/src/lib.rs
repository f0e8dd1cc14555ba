//! GraphQL over HTTP.
//!
//! A [`Server`] owns an ordered list of [`Transport`]s and a single [`GraphExecutor`]. Every
//! incoming request is handed to the first transport that claims it, which decodes the request
//! into [`RawParams`], lets the executor prepare and run the operation, and writes the JSON
//! [`Response`] back with the status code derived from the errors it carries.
//!
//! ```no_run
//! # async fn run(schema: async_graphql::Schema<async_graphql::EmptyMutation, async_graphql::EmptyMutation, async_graphql::EmptySubscription>) {
//! let server = graphql_transport::Server::new_default(schema);
//! let app: axum::Router = axum::Router::new().route_service("/query", server);
//! # }
//! ```

mod dispatch;
mod error;
mod executor;
mod request;
mod response;
mod server;
pub mod transport;
mod upload;

pub use error::{status_for, ErrorKind, GraphqlError, Location, PARSE_FAILED, VALIDATION_FAILED};
pub use executor::{GraphExecutor, OperationContext, OperationType};
pub use request::{AttachedUpload, RawParams, TraceTiming};
pub use response::Response;
pub use server::{Server, ServerBuilder};
pub use transport::Transport;
pub use upload::Upload;
