//! Lambda Runtime API client and invocation loop.
//!
//! # The loop
//!
//! A Lambda execution environment hands out one event at a time:
//!
//! ```text
//! GET  /2018-06-01/runtime/invocation/next            ← blocks until an event arrives
//! POST /2018-06-01/runtime/invocation/{id}/response   ← handler succeeded
//! POST /2018-06-01/runtime/invocation/{id}/error      ← handler failed or panicked
//! ```
//!
//! # Shutdown
//!
//! Lambda only sends **SIGTERM** to functions with at least one extension
//! registered; everyone else is killed outright. So when shutdown callbacks
//! are given, the runtime first registers itself as an internal extension
//! subscribed to no events:
//!
//! ```text
//! POST /2020-01-01/extension/register      ← Lambda-Extension-Name, {"events":[]}
//! GET  /2020-01-01/extension/event/next    ← parked for the life of the process
//! ```
//!
//! On SIGTERM the loop then:
//! 1. Finishes the invocation in flight, if any. It is never cancelled.
//! 2. Stops asking for events.
//! 3. Runs the shutdown callbacks in registration order.
//! 4. Returns from [`Runtime::run`], which lets `main` exit cleanly.

mod config;

use std::any::Any;
use std::future::Future;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Request};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::Serialize;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::context::{Context, LambdaContext};
use crate::error::{BoxError, Error};

pub use config::{Config, FUNCTION_NAME, FUNCTION_VERSION, LOG_FORMAT, LOG_LEVEL, RUNTIME_API};

const API_VERSION: &str = "2018-06-01";
const EXTENSION_API_VERSION: &str = "2020-01-01";

/// Name the runtime registers under to have SIGTERM delivered.
pub const EXTENSION_NAME: &str = "lambda-chain-sigterm";
const EXTENSION_NAME_HEADER: &str = "lambda-extension-name";
const EXTENSION_ID_HEADER: &str = "lambda-extension-identifier";

const REQUEST_ID: &str = "lambda-runtime-aws-request-id";
const DEADLINE_MS: &str = "lambda-runtime-deadline-ms";
const FUNCTION_ARN: &str = "lambda-runtime-invoked-function-arn";
const TRACE_ID: &str = "lambda-runtime-trace-id";

/// A callback run once after the runtime receives its shutdown signal.
pub type ShutdownCallback = Box<dyn FnOnce() + Send + 'static>;

/// Body posted to the Runtime API error endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorReport {
    error_message: String,
    error_type: &'static str,
}

struct Invocation {
    lambda: LambdaContext,
    payload: Bytes,
}

/// Client for one Lambda Runtime API endpoint.
pub struct Runtime {
    client: Client<HttpConnector, Full<Bytes>>,
    base: String,
    extension_base: String,
}

impl Runtime {
    /// Builds a client for the Runtime API named in `config`.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let api = config.runtime_api()?;
        let base = format!("http://{api}/{API_VERSION}/runtime");
        if base.parse::<http::Uri>().is_err() {
            return Err(Error::InvalidAddress(api.to_owned()));
        }

        let client = Client::builder(TokioExecutor::new()).build_http();
        let extension_base = format!("http://{api}/{EXTENSION_API_VERSION}/extension");
        Ok(Self { client, base, extension_base })
    }

    /// Builds a client from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::new(&Config::from_env())
    }

    /// Serves invocations until SIGTERM.
    ///
    /// `invoke` receives the request context and the raw event payload and
    /// returns the raw response payload.
    pub async fn run<F, Fut>(&self, invoke: F, on_shutdown: Vec<ShutdownCallback>) -> Result<(), Error>
    where
        F: Fn(Context, Bytes) -> Fut,
        Fut: Future<Output = Result<Bytes, BoxError>> + Send + 'static,
    {
        let sigterm = sigterm()?;
        self.run_until(invoke, on_shutdown, sigterm).await
    }

    /// Serves invocations until `shutdown` resolves.
    ///
    /// With a non-empty `on_shutdown` the runtime registers as an extension
    /// first. A failed registration is logged and the loop starts anyway.
    pub async fn run_until<F, Fut, S>(
        &self,
        invoke: F,
        on_shutdown: Vec<ShutdownCallback>,
        shutdown: S,
    ) -> Result<(), Error>
    where
        F: Fn(Context, Bytes) -> Fut,
        Fut: Future<Output = Result<Bytes, BoxError>> + Send + 'static,
        S: Future<Output = ()>,
    {
        info!(api = %self.base, "lambda runtime started");

        if !on_shutdown.is_empty() {
            if let Err(e) = self.register_extension().await {
                warn!("extension registration failed, SIGTERM will not be delivered: {e}");
            }
        }

        tokio::pin!(shutdown);

        loop {
            let next = tokio::select! {
                // Checked first so a pending signal wins over the next event.
                biased;

                () = &mut shutdown => {
                    info!(callbacks = on_shutdown.len(), "shutdown signal received");
                    break;
                }

                next = self.next_invocation() => next,
            };

            let invocation = next.inspect_err(|e| error!("next invocation: {e}"))?;
            self.invoke(&invoke, invocation)
                .await
                .inspect_err(|e| error!("reporting invocation result: {e}"))?;
        }

        for callback in on_shutdown {
            callback();
        }

        info!("lambda runtime stopped");
        Ok(())
    }

    /// Reports a failure that happened before the first invocation.
    ///
    /// [`lambda::start`](crate::lambda::start) builds its runtime itself. To
    /// report setup failures, build the runtime by hand and drive it with
    /// the same entry point `start` uses:
    ///
    /// ```rust,no_run
    /// use lambda_chain::middleware::NoResponse;
    /// use lambda_chain::runtime::Runtime;
    /// use lambda_chain::{BoxError, Context, lambda};
    ///
    /// async fn connect() -> Result<String, BoxError> {
    ///     Ok("postgres://orders".to_owned())
    /// }
    ///
    /// # async fn run() -> Result<(), lambda_chain::Error> {
    /// let runtime = Runtime::from_env()?;
    /// let dsn = match connect().await {
    ///     Ok(dsn) => dsn,
    ///     Err(e) => return runtime.init_error(e.as_ref()).await,
    /// };
    ///
    /// let handler = move |_ctx: Context, order_id: u64| {
    ///     let dsn = dsn.clone();
    ///     async move {
    ///         tracing::info!(%dsn, order_id, "cancelling order");
    ///         Ok::<_, BoxError>(())
    ///     }
    /// };
    /// let none: Vec<Box<dyn NoResponse<u64>>> = Vec::new();
    /// let entry = lambda::entry_point(lambda::wrap_handler(handler, &none));
    /// runtime.run(entry, Vec::new()).await
    /// # }
    /// ```
    pub async fn init_error(&self, err: &(dyn std::error::Error + 'static)) -> Result<(), Error> {
        let report = ErrorReport { error_message: err.to_string(), error_type: "Runtime.InitError" };
        self.post("/init/error", Bytes::from(serde_json::to_vec(&report)?)).await
    }

    async fn invoke<F, Fut>(&self, invoke: &F, invocation: Invocation) -> Result<(), Error>
    where
        F: Fn(Context, Bytes) -> Fut,
        Fut: Future<Output = Result<Bytes, BoxError>> + Send + 'static,
    {
        let request_id = invocation.lambda.request_id.clone();
        let span = info_span!("invocation", request_id = %request_id);
        let fut = invoke(Context::with_lambda(invocation.lambda), invocation.payload);

        // Spawned so a panicking handler is reported instead of taking the
        // runtime down.
        let report = match tokio::spawn(fut.instrument(span)).await {
            Ok(Ok(body)) => {
                debug!(%request_id, "invocation succeeded");
                return self.post(&format!("/invocation/{request_id}/response"), body).await;
            }
            Ok(Err(e)) => {
                error!(%request_id, "handler error: {e}");
                ErrorReport { error_message: e.to_string(), error_type: "Runtime.HandlerError" }
            }
            Err(e) if e.is_panic() => {
                let message = panic_message(e.into_panic());
                error!(%request_id, "handler panicked: {message}");
                ErrorReport { error_message: message, error_type: "Runtime.Panic" }
            }
            Err(e) => {
                error!(%request_id, "handler task failed: {e}");
                ErrorReport { error_message: e.to_string(), error_type: "Runtime.Cancelled" }
            }
        };

        let body = Bytes::from(serde_json::to_vec(&report)?);
        self.post(&format!("/invocation/{request_id}/error"), body).await
    }

    /// Registers an internal extension with no event subscriptions and parks
    /// its `event/next` poll on a background task.
    async fn register_extension(&self) -> Result<(), Error> {
        let path = format!("{}/register", self.extension_base);
        let req = Request::post(path.as_str())
            .header(EXTENSION_NAME_HEADER, EXTENSION_NAME)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from_static(br#"{"events":[]}"#)))?;
        let res = self.client.request(req).await?;

        let status = res.status();
        let id = res.headers().get(EXTENSION_ID_HEADER).cloned();
        res.into_body().collect().await?;

        if !status.is_success() {
            return Err(Error::UnexpectedStatus { status, path });
        }
        let id = id.ok_or(Error::BadHeader(EXTENSION_ID_HEADER))?;
        info!(name = EXTENSION_NAME, "registered extension");

        // Lambda holds init until every extension has asked for its next
        // event. With no subscriptions the poll only returns at shutdown.
        let req = Request::get(format!("{}/event/next", self.extension_base))
            .header(EXTENSION_ID_HEADER, id)
            .body(Full::new(Bytes::new()))?;
        let client = self.client.clone();
        tokio::spawn(async move {
            match client.request(req).await {
                Ok(res) => debug!(status = %res.status(), "extension event poll returned"),
                Err(e) => debug!("extension event poll failed: {e}"),
            }
        });
        Ok(())
    }

    async fn next_invocation(&self) -> Result<Invocation, Error> {
        let path = "/invocation/next";
        let req = Request::get(self.uri(path)).body(Full::new(Bytes::new()))?;
        let res = self.client.request(req).await?;

        let status = res.status();
        if !status.is_success() {
            return Err(Error::UnexpectedStatus { status, path: path.to_owned() });
        }

        let lambda = lambda_context(res.headers())?;
        let payload = res.into_body().collect().await?.to_bytes();
        debug!(request_id = %lambda.request_id, bytes = payload.len(), "invocation received");

        Ok(Invocation { lambda, payload })
    }

    async fn post(&self, path: &str, body: Bytes) -> Result<(), Error> {
        let req = Request::post(self.uri(path))
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(body))?;
        let res = self.client.request(req).await?;

        let status = res.status();
        // Drain the body so the connection goes back to the pool.
        res.into_body().collect().await?;

        if !status.is_success() {
            return Err(Error::UnexpectedStatus { status, path: path.to_owned() });
        }
        Ok(())
    }

    fn uri(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }
}

fn lambda_context(headers: &HeaderMap) -> Result<LambdaContext, Error> {
    let text = |name: &'static str| headers.get(name).and_then(|v| v.to_str().ok());

    let request_id = text(REQUEST_ID)
        .filter(|id| !id.is_empty())
        .ok_or(Error::BadHeader(REQUEST_ID))?;
    let deadline_ms = text(DEADLINE_MS)
        .and_then(|ms| ms.parse().ok())
        .ok_or(Error::BadHeader(DEADLINE_MS))?;

    Ok(LambdaContext {
        request_id: request_id.to_owned(),
        invoked_function_arn: text(FUNCTION_ARN).unwrap_or_default().to_owned(),
        deadline_ms,
        trace_id: text(TRACE_ID).map(str::to_owned),
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_owned()
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Installs the SIGTERM listener and returns a future resolving on the
/// first signal. Installed before the loop starts so an early signal is
/// not lost.
#[cfg(unix)]
fn sigterm() -> Result<impl Future<Output = ()>, Error> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    Ok(async move {
        term.recv().await;
    })
}

/// Lambda only runs on Linux; elsewhere Ctrl-C stands in for SIGTERM.
#[cfg(not(unix))]
fn sigterm() -> Result<impl Future<Output = ()>, Error> {
    Ok(async {
        let _ = tokio::signal::ctrl_c().await;
    })
}
