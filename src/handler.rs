//! Handler traits and type erasure.
//!
//! # The two call shapes
//!
//! Lambda functions come in two flavours: those that only acknowledge an
//! event (SQS, SNS, S3) and those that answer with a response (API Gateway).
//! Each shape has its own erased function type, and middleware is written
//! against one shape or the other:
//!
//! ```text
//! HandlerFn<E>                = Fn(Context, E) -> BoxFuture<Result<(), BoxError>>
//! HandlerWithResponseFn<E, R> = Fn(Context, E) -> BoxFuture<Result<R, BoxError>>
//! ```
//!
//! # How async handlers are stored
//!
//! A composed chain is a stack of closures, each capturing the next one.
//! Every layer has a different concrete type, so each is erased behind an
//! `Arc<dyn Fn …>`:
//!
//! ```text
//! async fn handle(ctx: Context, event: E) -> Result<(), BoxError>  ← user writes this
//!        ↓ handle.into_handler_fn()                                ← Handler blanket impl
//! Arc::new(move |ctx, event| Box::pin(handle(ctx, event)))         ← HandlerFn<E>
//!        ↓ middleware.wrap(next)
//! Arc::new(move |ctx, event| { …pre…; next(ctx, event).await; …post… })
//! ```
//!
//! The per-invocation cost is one boxed future and one virtual call per
//! layer, negligible next to a Runtime API round trip.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::error::BoxError;

/// A heap-allocated, type-erased future.
///
/// `Send + 'static` lets tokio move the future onto a spawned task.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Erased handler that does not produce a response.
pub type HandlerFn<E> =
    Arc<dyn Fn(Context, E) -> BoxFuture<Result<(), BoxError>> + Send + Sync + 'static>;

/// Erased handler that produces a response of type `R`.
pub type HandlerWithResponseFn<E, R> =
    Arc<dyn Fn(Context, E) -> BoxFuture<Result<R, BoxError>> + Send + Sync + 'static>;

/// Implemented for every handler of events `E` that returns no response.
///
/// You never implement this yourself. It is satisfied by any function or
/// closure with the signature:
///
/// ```text
/// async fn name(ctx: Context, event: E) -> Result<(), BoxError>
/// ```
pub trait Handler<E>: private::SealedHandler<E> + Send + Sync + 'static {
    fn into_handler_fn(self) -> HandlerFn<E>;
}

/// Implemented for every handler of events `E` that returns a response `R`.
///
/// Satisfied by any function or closure with the signature:
///
/// ```text
/// async fn name(ctx: Context, event: E) -> Result<R, BoxError>
/// ```
pub trait HandlerWithResponse<E, R>:
    private::SealedHandlerWithResponse<E, R> + Send + Sync + 'static
{
    fn into_handler_with_response_fn(self) -> HandlerWithResponseFn<E, R>;
}

/// Private seals. External crates cannot name them, so the blanket impls
/// below are the only way to satisfy the public traits.
mod private {
    pub trait SealedHandler<E> {}
    pub trait SealedHandlerWithResponse<E, R> {}
}

impl<E, F, Fut> private::SealedHandler<E> for F
where
    E: 'static,
    F: Fn(Context, E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
}

impl<E, F, Fut> Handler<E> for F
where
    E: 'static,
    F: Fn(Context, E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    fn into_handler_fn(self) -> HandlerFn<E> {
        Arc::new(move |ctx: Context, event: E| -> BoxFuture<Result<(), BoxError>> {
            Box::pin(self(ctx, event))
        })
    }
}

impl<E, R, F, Fut> private::SealedHandlerWithResponse<E, R> for F
where
    E: 'static,
    R: 'static,
    F: Fn(Context, E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
{
}

impl<E, R, F, Fut> HandlerWithResponse<E, R> for F
where
    E: 'static,
    R: 'static,
    F: Fn(Context, E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
{
    fn into_handler_with_response_fn(self) -> HandlerWithResponseFn<E, R> {
        Arc::new(move |ctx: Context, event: E| -> BoxFuture<Result<R, BoxError>> {
            Box::pin(self(ctx, event))
        })
    }
}
