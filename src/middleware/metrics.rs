//! Metrics middleware.
//!
//! Emits two records per invocation through an [`Outputter`]:
//!
//! - `"Request started"` with the incoming event, before `next` runs;
//! - `"Request complete"` with the elapsed duration once `next` returns,
//!   whether it succeeded or not. API Gateway v1 responses add their
//!   `status_code`.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::clock::{Clock, SystemClock};
use crate::context::Context;
use crate::error::BoxError;
use crate::events::ResponseShape;
use crate::handler::{BoxFuture, HandlerFn, HandlerWithResponseFn};
use crate::metrics::{Field, Outputter};

use super::{NoResponse, WithResponse};

pub const REQUEST_STARTED: &str = "Request started";
pub const REQUEST_COMPLETE: &str = "Request complete";

/// Middleware that records request start, completion and latency.
#[derive(Clone)]
pub struct Metrics {
    clock: Arc<dyn Clock>,
    outputter: Arc<dyn Outputter>,
}

impl Metrics {
    /// Metrics timed with the system clock.
    pub fn new(outputter: Arc<dyn Outputter>) -> Self {
        Self::with_clock(outputter, Arc::new(SystemClock))
    }

    pub fn with_clock(outputter: Arc<dyn Outputter>, clock: Arc<dyn Clock>) -> Self {
        Self { clock, outputter }
    }
}

impl<E> NoResponse<E> for Metrics
where
    E: Serialize + Send + 'static,
{
    fn wrap(&self, next: HandlerFn<E>) -> HandlerFn<E> {
        let clock = Arc::clone(&self.clock);
        let outputter = Arc::clone(&self.outputter);
        Arc::new(move |ctx: Context, event: E| -> BoxFuture<Result<(), BoxError>> {
            let start = clock.now();
            outputter.output(&ctx, REQUEST_STARTED, vec![Field::new("event", event_value(&event))]);

            let fut = next(ctx.clone(), event);
            let clock = Arc::clone(&clock);
            let outputter = Arc::clone(&outputter);
            Box::pin(async move {
                let res = fut.await;
                let elapsed = clock.since(start);
                outputter.output(&ctx, REQUEST_COMPLETE, vec![Field::new("duration", elapsed)]);
                res
            })
        })
    }
}

impl<E, R> WithResponse<E, R> for Metrics
where
    E: Serialize + Send + 'static,
    R: ResponseShape + Send + 'static,
{
    fn wrap(&self, next: HandlerWithResponseFn<E, R>) -> HandlerWithResponseFn<E, R> {
        let clock = Arc::clone(&self.clock);
        let outputter = Arc::clone(&self.outputter);
        Arc::new(move |ctx: Context, event: E| -> BoxFuture<Result<R, BoxError>> {
            let start = clock.now();
            outputter.output(&ctx, REQUEST_STARTED, vec![Field::new("event", event_value(&event))]);

            let fut = next(ctx.clone(), event);
            let clock = Arc::clone(&clock);
            let outputter = Arc::clone(&outputter);
            Box::pin(async move {
                let res = fut.await;
                let mut fields = vec![Field::new("duration", clock.since(start))];
                if let Some(gw) = res.as_ref().ok().and_then(ResponseShape::api_gateway_response) {
                    fields.push(Field::new("status_code", gw.status_code));
                }
                outputter.output(&ctx, REQUEST_COMPLETE, fields);
                res
            })
        })
    }
}

fn event_value<E: Serialize>(event: &E) -> Value {
    serde_json::to_value(event).unwrap_or_else(|e| {
        warn!(error = %e, "event could not be serialised for metrics");
        Value::Null
    })
}
