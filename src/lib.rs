//! # lambda-chain
//!
//! Composable middleware for AWS Lambda handlers.
//!
//! ## The contract
//!
//! A handler is an async function `(Context, E) -> Result<(), BoxError>`, or
//! `(Context, E) -> Result<R, BoxError>` when the function answers with a
//! response. Middleware wraps that function in another one of exactly the
//! same shape. A list of middleware nests first-entry-outermost, so
//! `[context, metrics]` means the context middleware sees the event first
//! and the response last.
//!
//! What ships in the box:
//!
//! - [`middleware::RequestContext`]: request ids and API Gateway details on
//!   the request [`Context`], `x-request-id` on gateway responses
//! - [`middleware::Metrics`]: start/complete records with latency and
//!   status code, written to any [`metrics::Outputter`]
//! - [`response`]: plain, JSON and error API Gateway responses
//! - [`lambda::start`] / [`lambda::start_with_response`]: compose and run
//!   against the Lambda Runtime API, with shutdown callbacks on SIGTERM
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use lambda_chain::events::{ApiGatewayProxyRequest, ApiGatewayProxyResponse};
//! use lambda_chain::metrics::TracingOutputter;
//! use lambda_chain::{BoxError, Context, lambda, logging, middleware, response};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), lambda_chain::Error> {
//!     logging::init();
//!
//!     let middlewares = middleware::common_api_gateway_v1(Arc::new(TracingOutputter));
//!     lambda::start_with_response(get_order, middlewares, Vec::new()).await
//! }
//!
//! async fn get_order(
//!     _ctx: Context,
//!     req: ApiGatewayProxyRequest,
//! ) -> Result<ApiGatewayProxyResponse, BoxError> {
//!     match req.path_parameters.get("id") {
//!         Some(id) => Ok(response::json(200, Some(&serde_json::json!({ "id": id })))),
//!         None => Ok(response::error(400, "missing order id")),
//!     }
//! }
//! ```

mod context;
mod error;
mod handler;

pub mod clock;
pub mod events;
pub mod lambda;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod response;
pub mod runtime;

pub use context::{Context, LambdaContext, LogField};
pub use error::{BoxError, Error};
pub use handler::{BoxFuture, Handler, HandlerFn, HandlerWithResponse, HandlerWithResponseFn};
