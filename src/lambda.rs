//! Entry points: compose a handler with its middleware and hand the result
//! to the Lambda runtime.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use lambda_chain::events::SqsEvent;
//! use lambda_chain::metrics::TracingOutputter;
//! use lambda_chain::runtime::ShutdownCallback;
//! use lambda_chain::{BoxError, Context, lambda, logging, middleware};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), lambda_chain::Error> {
//!     logging::init();
//!
//!     let middlewares = middleware::common_sqs(Arc::new(TracingOutputter));
//!     let on_shutdown: Vec<ShutdownCallback> = vec![Box::new(|| tracing::info!("bye"))];
//!     lambda::start(handle, middlewares, on_shutdown).await
//! }
//!
//! async fn handle(_ctx: Context, event: SqsEvent) -> Result<(), BoxError> {
//!     for record in event.records {
//!         tracing::info!(message_id = %record.message_id, "processing");
//!     }
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::context::Context;
use crate::error::{BoxError, Error};
use crate::handler::{BoxFuture, Handler, HandlerFn, HandlerWithResponse, HandlerWithResponseFn};
use crate::middleware::{self, NoResponse, WithResponse};
use crate::runtime::{Runtime, ShutdownCallback};

/// Composes `handler` with `middlewares`, first entry outermost.
pub fn wrap_handler<E, H>(handler: H, middlewares: &[Box<dyn NoResponse<E>>]) -> HandlerFn<E>
where
    E: 'static,
    H: Handler<E>,
{
    middleware::chain(handler.into_handler_fn(), middlewares)
}

/// Composes `handler` with `middlewares`, first entry outermost.
pub fn wrap_handler_with_response<E, R, H>(
    handler: H,
    middlewares: &[Box<dyn WithResponse<E, R>>],
) -> HandlerWithResponseFn<E, R>
where
    E: 'static,
    R: 'static,
    H: HandlerWithResponse<E, R>,
{
    middleware::chain_with_response(handler.into_handler_with_response_fn(), middlewares)
}

/// Runs a handler of events `E` that returns no response.
///
/// Returns after the runtime receives SIGTERM and every
/// `on_shutdown` callback has run.
pub async fn start<E, H>(
    handler: H,
    middlewares: Vec<Box<dyn NoResponse<E>>>,
    on_shutdown: Vec<ShutdownCallback>,
) -> Result<(), Error>
where
    E: DeserializeOwned + Send + 'static,
    H: Handler<E>,
{
    let runtime = Runtime::from_env()?;
    let entry = entry_point(wrap_handler(handler, &middlewares));
    runtime.run(entry, on_shutdown).await
}

/// Runs a handler of events `E` that returns a response `R`.
pub async fn start_with_response<E, R, H>(
    handler: H,
    middlewares: Vec<Box<dyn WithResponse<E, R>>>,
    on_shutdown: Vec<ShutdownCallback>,
) -> Result<(), Error>
where
    E: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    H: HandlerWithResponse<E, R>,
{
    let runtime = Runtime::from_env()?;
    let entry = entry_point_with_response(wrap_handler_with_response(handler, &middlewares));
    runtime.run(entry, on_shutdown).await
}

/// Adapts a composed handler to the raw payloads [`Runtime`] works with.
/// The event is decoded from JSON; success is acknowledged with `null`.
pub fn entry_point<E>(
    handler: HandlerFn<E>,
) -> impl Fn(Context, Bytes) -> BoxFuture<Result<Bytes, BoxError>> + Send + Sync + 'static
where
    E: DeserializeOwned + Send + 'static,
{
    move |ctx: Context, payload: Bytes| -> BoxFuture<Result<Bytes, BoxError>> {
        let handler = Arc::clone(&handler);
        Box::pin(async move {
            let event: E = serde_json::from_slice(&payload)?;
            handler(ctx, event).await?;
            Ok(Bytes::from_static(b"null"))
        })
    }
}

/// Adapts a composed handler to the raw payloads [`Runtime`] works with.
/// The event is decoded from JSON and the response encoded to JSON.
pub fn entry_point_with_response<E, R>(
    handler: HandlerWithResponseFn<E, R>,
) -> impl Fn(Context, Bytes) -> BoxFuture<Result<Bytes, BoxError>> + Send + Sync + 'static
where
    E: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
{
    move |ctx: Context, payload: Bytes| -> BoxFuture<Result<Bytes, BoxError>> {
        let handler = Arc::clone(&handler);
        Box::pin(async move {
            let event: E = serde_json::from_slice(&payload)?;
            let response = handler(ctx, event).await?;
            Ok(Bytes::from(serde_json::to_vec(&response)?))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Appends its id to the event on the way in and to the response on the
    /// way out.
    struct Tag(&'static str);

    impl NoResponse<Vec<String>> for Tag {
        fn wrap(&self, next: HandlerFn<Vec<String>>) -> HandlerFn<Vec<String>> {
            let id = self.0;
            Arc::new(move |ctx: Context, mut event: Vec<String>| -> BoxFuture<Result<(), BoxError>> {
                event.push(id.to_owned());
                next(ctx, event)
            })
        }
    }

    impl WithResponse<Vec<String>, Vec<String>> for Tag {
        fn wrap(
            &self,
            next: HandlerWithResponseFn<Vec<String>, Vec<String>>,
        ) -> HandlerWithResponseFn<Vec<String>, Vec<String>> {
            let id = self.0;
            Arc::new(move |ctx: Context, mut event: Vec<String>| -> BoxFuture<Result<Vec<String>, BoxError>> {
                event.push(id.to_owned());
                let fut = next(ctx, event);
                Box::pin(async move {
                    let mut response = fut.await?;
                    response.push(id.to_owned());
                    Ok(response)
                })
            })
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    fn tags(ids: &[&'static str]) -> Vec<Tag> {
        ids.iter().map(|id| Tag(*id)).collect()
    }

    fn no_response(ids: &[&'static str]) -> Vec<Box<dyn NoResponse<Vec<String>>>> {
        tags(ids).into_iter().map(|t| Box::new(t) as Box<dyn NoResponse<Vec<String>>>).collect()
    }

    fn with_response(ids: &[&'static str]) -> Vec<Box<dyn WithResponse<Vec<String>, Vec<String>>>> {
        tags(ids)
            .into_iter()
            .map(|t| Box::new(t) as Box<dyn WithResponse<Vec<String>, Vec<String>>>)
            .collect()
    }

    /// A handler recording the event it saw, failing when `fail` is set.
    fn recording_handler(
        seen: &Arc<Mutex<Vec<String>>>,
        fail: bool,
    ) -> impl Fn(Context, Vec<String>) -> BoxFuture<Result<(), BoxError>> + Send + Sync + 'static {
        let seen = Arc::clone(seen);
        move |_ctx: Context, event: Vec<String>| -> BoxFuture<Result<(), BoxError>> {
            *seen.lock().unwrap() = event;
            Box::pin(async move { if fail { Err("errHandler".into()) } else { Ok(()) } })
        }
    }

    #[tokio::test]
    async fn wrap_handler_passes_event_through_middleware_in_order() {
        let cases: &[(&[&'static str], &[&str])] = &[
            (&[], &["event"]),
            (&["middleware-1"], &["event", "middleware-1"]),
            (
                &["middleware-1", "middleware-2", "middleware-3"],
                &["event", "middleware-1", "middleware-2", "middleware-3"],
            ),
        ];

        for (ids, want) in cases {
            for fail in [false, true] {
                let seen = Arc::new(Mutex::new(Vec::new()));
                let composed = wrap_handler(recording_handler(&seen, fail), &no_response(ids));

                let res = composed(Context::new(), strings(&["event"])).await;

                assert_eq!(res.is_err(), fail, "middlewares {ids:?}");
                assert_eq!(*seen.lock().unwrap(), strings(want), "middlewares {ids:?}");
            }
        }
    }

    #[tokio::test]
    async fn wrap_handler_with_response_unwinds_in_reverse() {
        let cases: &[(&[&'static str], &[&str], &[&str])] = &[
            (&[], &["event"], &["response"]),
            (&["m1"], &["event", "m1"], &["response", "m1"]),
            (
                &["m1", "m2", "m3"],
                &["event", "m1", "m2", "m3"],
                &["response", "m3", "m2", "m1"],
            ),
        ];

        for (ids, want_event, want_response) in cases {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&seen);
            let handler = move |_ctx: Context, event: Vec<String>| {
                *sink.lock().unwrap() = event;
                async { Ok::<_, BoxError>(vec!["response".to_owned()]) }
            };

            let composed = wrap_handler_with_response(handler, &with_response(ids));
            let response = composed(Context::new(), strings(&["event"])).await.unwrap();

            assert_eq!(*seen.lock().unwrap(), strings(want_event));
            assert_eq!(response, strings(want_response));
        }
    }

    #[tokio::test]
    async fn wrap_handler_with_response_propagates_error() {
        let handler = |_ctx: Context, _event: Vec<String>| async {
            Err::<Vec<String>, BoxError>("errHandler".into())
        };

        let composed = wrap_handler_with_response(handler, &with_response(&["m1", "m2"]));
        let err = composed(Context::new(), strings(&["event"])).await.unwrap_err();

        assert_eq!(err.to_string(), "errHandler");
    }

    #[tokio::test]
    async fn entry_point_decodes_event_and_acknowledges_with_null() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let entry = entry_point(wrap_handler(recording_handler(&seen, false), &no_response(&["m1"])));

        let body = entry(Context::new(), Bytes::from_static(br#"["event"]"#)).await.unwrap();

        assert_eq!(body, Bytes::from_static(b"null"));
        assert_eq!(*seen.lock().unwrap(), strings(&["event", "m1"]));
    }

    #[tokio::test]
    async fn entry_point_rejects_undecodable_event() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let entry = entry_point(wrap_handler(recording_handler(&seen, false), &no_response(&[])));

        let res = entry(Context::new(), Bytes::from_static(b"{not json")).await;

        assert!(res.is_err());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn entry_point_with_response_encodes_response() {
        let handler = |_ctx: Context, event: Vec<String>| async move { Ok::<_, BoxError>(event.len()) };
        let none: &[Box<dyn WithResponse<Vec<String>, usize>>] = &[];
        let entry = entry_point_with_response(wrap_handler_with_response(handler, none));

        let body = entry(Context::new(), Bytes::from_static(br#"["a","b"]"#)).await.unwrap();

        assert_eq!(body, Bytes::from_static(b"2"));
    }
}
