//! Middleware layer.
//!
//! Middleware wraps a handler and is the right place for cross-cutting
//! concerns: request-id propagation, structured context, latency metrics.
//! A middleware takes the `next` function in the chain and returns a
//! replacement function of exactly the same shape.
//!
//! # Ordering
//!
//! A chain built from `[m1, m2, m3]` nests the first entry outermost:
//!
//! ```text
//! m1.pre → m2.pre → m3.pre → handler → m3.post → m2.post → m1.post
//! ```
//!
//! # Contract
//!
//! The returned function must call `next` exactly once and pass its result
//! on, unless it deliberately short-circuits. A validation middleware that
//! rejects an event without calling `next` is a supported pattern.
//!
//! Middleware instances are shared by every concurrent invocation, so they
//! hold only read-only collaborators (a [`Clock`](crate::clock::Clock), an
//! [`Outputter`]) and never per-invocation state.

mod context;
mod metrics;

use std::sync::Arc;

use serde::Serialize;

use crate::events::{
    ApiGatewayProxyRequest, ApiGatewayProxyResponse, EventShape, ResponseShape, S3Event, SnsEvent,
    SqsEvent,
};
use crate::handler::{HandlerFn, HandlerWithResponseFn};
use crate::metrics::Outputter;

pub use context::{REQUEST_ID_HEADER, RequestContext};
pub use metrics::{Metrics, REQUEST_COMPLETE, REQUEST_STARTED};

/// Middleware for handlers of events `E` that return no response.
pub trait NoResponse<E>: Send + Sync + 'static {
    fn wrap(&self, next: HandlerFn<E>) -> HandlerFn<E>;
}

/// Middleware for handlers of events `E` that return a response `R`.
pub trait WithResponse<E, R>: Send + Sync + 'static {
    fn wrap(&self, next: HandlerWithResponseFn<E, R>) -> HandlerWithResponseFn<E, R>;
}

/// Nests `handler` inside `middlewares`, first entry outermost.
pub fn chain<E: 'static>(handler: HandlerFn<E>, middlewares: &[Box<dyn NoResponse<E>>]) -> HandlerFn<E> {
    middlewares.iter().rev().fold(handler, |next, mw| mw.wrap(next))
}

/// Nests `handler` inside `middlewares`, first entry outermost.
pub fn chain_with_response<E, R>(
    handler: HandlerWithResponseFn<E, R>,
    middlewares: &[Box<dyn WithResponse<E, R>>],
) -> HandlerWithResponseFn<E, R>
where
    E: 'static,
    R: 'static,
{
    middlewares.iter().rev().fold(handler, |next, mw| mw.wrap(next))
}

// ── Presets ───────────────────────────────────────────────────────────────────

/// Context enrichment followed by metrics, for handlers without a response.
pub fn common<E>(outputter: Arc<dyn Outputter>) -> Vec<Box<dyn NoResponse<E>>>
where
    E: EventShape + Serialize + Send + 'static,
{
    vec![Box::new(RequestContext::new()), Box::new(Metrics::new(outputter))]
}

/// Context enrichment followed by metrics, for handlers with a response.
pub fn common_with_response<E, R>(outputter: Arc<dyn Outputter>) -> Vec<Box<dyn WithResponse<E, R>>>
where
    E: EventShape + Serialize + Send + 'static,
    R: ResponseShape + Send + 'static,
{
    vec![Box::new(RequestContext::new()), Box::new(Metrics::new(outputter))]
}

pub type S3 = Vec<Box<dyn NoResponse<S3Event>>>;
pub type Sns = Vec<Box<dyn NoResponse<SnsEvent>>>;
pub type Sqs = Vec<Box<dyn NoResponse<SqsEvent>>>;
pub type ApiGatewayV1 = Vec<Box<dyn WithResponse<ApiGatewayProxyRequest, ApiGatewayProxyResponse>>>;

pub fn common_s3(outputter: Arc<dyn Outputter>) -> S3 {
    common(outputter)
}

pub fn common_sns(outputter: Arc<dyn Outputter>) -> Sns {
    common(outputter)
}

pub fn common_sqs(outputter: Arc<dyn Outputter>) -> Sqs {
    common(outputter)
}

pub fn common_api_gateway_v1(outputter: Arc<dyn Outputter>) -> ApiGatewayV1 {
    common_with_response(outputter)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::context::{Context, LambdaContext};
    use crate::error::BoxError;
    use crate::handler::{BoxFuture, Handler, HandlerWithResponse};

    /// Records `name.pre` / `name.post` around `next`.
    struct Trace {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl NoResponse<u32> for Trace {
        fn wrap(&self, next: HandlerFn<u32>) -> HandlerFn<u32> {
            let name = self.name;
            let log = Arc::clone(&self.log);
            Arc::new(move |ctx: Context, event: u32| -> BoxFuture<Result<(), BoxError>> {
                let next = Arc::clone(&next);
                let log = Arc::clone(&log);
                Box::pin(async move {
                    log.lock().unwrap().push(format!("{name}.pre"));
                    let res = next(ctx, event).await;
                    log.lock().unwrap().push(format!("{name}.post"));
                    res
                })
            })
        }
    }

    /// Rejects every event without calling `next`.
    struct Reject;

    impl WithResponse<u32, String> for Reject {
        fn wrap(&self, _next: HandlerWithResponseFn<u32, String>) -> HandlerWithResponseFn<u32, String> {
            Arc::new(|_ctx: Context, event: u32| -> BoxFuture<Result<String, BoxError>> {
                Box::pin(async move { Err(format!("event {event} rejected").into()) })
            })
        }
    }

    #[tokio::test]
    async fn chain_runs_pre_and_post_logic_in_nested_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler_log = Arc::clone(&log);
        let handler = move |_ctx: Context, _event: u32| {
            let log = Arc::clone(&handler_log);
            async move {
                log.lock().unwrap().push("handler".to_owned());
                Ok::<_, BoxError>(())
            }
        };
        let middlewares: Vec<Box<dyn NoResponse<u32>>> = ["m1", "m2", "m3"]
            .into_iter()
            .map(|name| Box::new(Trace { name, log: Arc::clone(&log) }) as Box<dyn NoResponse<u32>>)
            .collect();

        let composed = chain(handler.into_handler_fn(), &middlewares);
        composed(Context::new(), 7).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            ["m1.pre", "m2.pre", "m3.pre", "handler", "m3.post", "m2.post", "m1.post"]
        );
    }

    #[tokio::test]
    async fn post_logic_runs_when_handler_fails() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = |_ctx: Context, _event: u32| async { Err::<(), BoxError>("boom".into()) };
        let middlewares: Vec<Box<dyn NoResponse<u32>>> =
            vec![Box::new(Trace { name: "outer", log: Arc::clone(&log) })];

        let err = chain(handler.into_handler_fn(), &middlewares)(Context::new(), 1)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "boom");
        assert_eq!(*log.lock().unwrap(), ["outer.pre", "outer.post"]);
    }

    #[tokio::test]
    async fn short_circuit_skips_handler() {
        let called = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&called);
        let handler = move |_ctx: Context, _event: u32| {
            let flag = Arc::clone(&flag);
            async move {
                *flag.lock().unwrap() = true;
                Ok::<_, BoxError>("ok".to_owned())
            }
        };
        let middlewares: Vec<Box<dyn WithResponse<u32, String>>> = vec![Box::new(Reject)];

        let err = chain_with_response(handler.into_handler_with_response_fn(), &middlewares)(Context::new(), 3)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "event 3 rejected");
        assert!(!*called.lock().unwrap());
    }

    /// Remembers the `request_id` each record was written under.
    #[derive(Default)]
    struct RequestIds(Mutex<Vec<(String, String)>>);

    impl Outputter for RequestIds {
        fn output(&self, ctx: &Context, label: &str, _fields: Vec<crate::metrics::Field>) {
            let id = ctx.field("request_id").unwrap_or_default().to_owned();
            self.0.lock().unwrap().push((label.to_owned(), id));
        }
    }

    #[tokio::test]
    async fn shared_chain_keeps_overlapping_invocations_apart() {
        let recorder = Arc::new(RequestIds::default());
        // Every invocation waits for the others, so all three are in flight
        // inside the same chain at once.
        let barrier = Arc::new(tokio::sync::Barrier::new(3));
        let handler = move |ctx: Context, _req: ApiGatewayProxyRequest| {
            let barrier = Arc::clone(&barrier);
            let id = ctx.field("request_id").unwrap_or_default().to_owned();
            async move {
                barrier.wait().await;
                Ok::<_, BoxError>(crate::response::new(200, id))
            }
        };
        let composed = chain_with_response(
            handler.into_handler_with_response_fn(),
            &common_api_gateway_v1(recorder.clone()),
        );

        let invoke = |n: u32| {
            let ctx = Context::with_lambda(LambdaContext::new(format!("lambda-{n}")));
            let mut req = ApiGatewayProxyRequest::default();
            req.request_context.request_id = format!("amzn-{n}");
            composed(ctx, req)
        };
        let (r1, r2, r3) = tokio::join!(invoke(1), invoke(2), invoke(3));

        for (n, res) in [(1, r1), (2, r2), (3, r3)] {
            let res = res.unwrap();
            assert_eq!(res.body, format!("amzn-{n}"));
            assert_eq!(res.headers[REQUEST_ID_HEADER], format!("amzn-{n}"));
        }

        let records = recorder.0.lock().unwrap();
        let ids = |label: &str| {
            let mut ids: Vec<&str> = records
                .iter()
                .filter(|(l, _)| l == label)
                .map(|(_, id)| id.as_str())
                .collect();
            ids.sort_unstable();
            ids
        };
        assert_eq!(ids(REQUEST_STARTED), ["amzn-1", "amzn-2", "amzn-3"]);
        assert_eq!(ids(REQUEST_COMPLETE), ["amzn-1", "amzn-2", "amzn-3"]);
    }

    #[test]
    fn presets_hold_context_and_metrics() {
        let outputter: Arc<dyn Outputter> = Arc::new(crate::metrics::TracingOutputter);

        assert_eq!(common_sqs(Arc::clone(&outputter)).len(), 2);
        assert_eq!(common_sns(Arc::clone(&outputter)).len(), 2);
        assert_eq!(common_s3(Arc::clone(&outputter)).len(), 2);
        assert_eq!(common_api_gateway_v1(outputter).len(), 2);
    }
}
