//! Request context middleware.
//!
//! Attaches request identifiers to the [`Context`] handed to the rest of the
//! chain, so every log line and metrics record emitted further down carries
//! them. At the very least that is:
//!
//! | Field | Source |
//! |---|---|
//! | `request_id` | canonical id: the API Gateway request id, else the Lambda request id |
//! | `lambda_request_id` | `Lambda-Runtime-Aws-Request-Id` |
//!
//! API Gateway v1 events add `amzn_request_id`, `request_method`,
//! `request_domain` and `request_path`. For API Gateway v1 responses the
//! canonical id is echoed back in the `x-request-id` header.

use std::sync::Arc;

use crate::context::{Context, LogField};
use crate::error::BoxError;
use crate::events::{EventShape, ResponseShape};
use crate::handler::{BoxFuture, HandlerFn, HandlerWithResponseFn};

use super::{NoResponse, WithResponse};

/// The header the canonical request id is written to.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware that enriches the request context with request identifiers.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestContext;

impl RequestContext {
    pub fn new() -> Self {
        Self
    }
}

impl<E> NoResponse<E> for RequestContext
where
    E: EventShape + Send + 'static,
{
    fn wrap(&self, next: HandlerFn<E>) -> HandlerFn<E> {
        Arc::new(move |ctx: Context, event: E| -> BoxFuture<Result<(), BoxError>> {
            let (_, ctx) = context_from_event(&ctx, &event);
            next(ctx, event)
        })
    }
}

impl<E, R> WithResponse<E, R> for RequestContext
where
    E: EventShape + Send + 'static,
    R: ResponseShape + Send + 'static,
{
    fn wrap(&self, next: HandlerWithResponseFn<E, R>) -> HandlerWithResponseFn<E, R> {
        Arc::new(move |ctx: Context, event: E| -> BoxFuture<Result<R, BoxError>> {
            let (request_id, ctx) = context_from_event(&ctx, &event);
            let fut = next(ctx, event);
            Box::pin(async move {
                let mut response = fut.await?;
                attach_request_id(&mut response, &request_id);
                Ok(response)
            })
        })
    }
}

/// Returns the canonical request id and a context forked from `ctx` with
/// the request fields attached.
pub(crate) fn context_from_event<E: EventShape>(ctx: &Context, event: &E) -> (String, Context) {
    let lambda_request_id = ctx
        .lambda()
        .map(|l| l.request_id.clone())
        .unwrap_or_default();
    let mut request_id = lambda_request_id.clone();

    let mut gateway_fields = Vec::new();
    if let Some(req) = event.api_gateway_request() {
        let rc = &req.request_context;
        if !rc.request_id.is_empty() {
            request_id = rc.request_id.clone();
        }
        gateway_fields = vec![
            LogField::new("amzn_request_id", rc.request_id.as_str()),
            LogField::new("request_method", rc.http_method.as_str()),
            LogField::new("request_domain", rc.domain_name.as_str()),
            LogField::new("request_path", rc.path.as_str()),
        ];
    }

    let ctx = ctx.with_fields(
        [
            LogField::new("request_id", request_id.as_str()),
            LogField::new("lambda_request_id", lambda_request_id),
        ]
        .into_iter()
        .chain(gateway_fields),
    );

    (request_id, ctx)
}

/// Writes the request id header onto API Gateway responses. Any other
/// response type is left as is.
pub(crate) fn attach_request_id<R: ResponseShape>(response: &mut R, request_id: &str) {
    if let Some(res) = response.api_gateway_response_mut() {
        res.headers.insert(REQUEST_ID_HEADER.to_owned(), request_id.to_owned());
    }
}
