//! Request-scoped context carried through every call in a chain.
//!
//! A [`Context`] is immutable. Middleware that wants to attach information
//! derives a new value with [`Context::with_fields`] and hands that to
//! `next`; the context it received stays untouched, so enclosing middleware
//! never observe fields added further down the chain.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Invocation metadata supplied by the hosting runtime.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LambdaContext {
    /// `Lambda-Runtime-Aws-Request-Id`.
    pub request_id: String,
    /// `Lambda-Runtime-Invoked-Function-Arn`.
    pub invoked_function_arn: String,
    /// `Lambda-Runtime-Deadline-Ms`, milliseconds since the Unix epoch.
    pub deadline_ms: u64,
    /// `Lambda-Runtime-Trace-Id`, when X-Ray tracing is active.
    pub trace_id: Option<String>,
}

impl LambdaContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self { request_id: request_id.into(), ..Self::default() }
    }

    /// Absolute deadline of the invocation.
    pub fn deadline(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.deadline_ms)
    }
}

/// A single structured key/value pair attached to a [`Context`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogField {
    pub key: &'static str,
    pub value: String,
}

impl LogField {
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self { key, value: value.into() }
    }
}

/// The request-scoped carrier passed to every middleware and handler.
///
/// Cloning is two reference-count increments.
#[derive(Clone, Debug, Default)]
pub struct Context {
    lambda: Option<Arc<LambdaContext>>,
    fields: Arc<Vec<LogField>>,
}

impl Context {
    /// An empty context, as seen outside the hosting runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context carrying runtime invocation metadata.
    pub fn with_lambda(lambda: LambdaContext) -> Self {
        Self { lambda: Some(Arc::new(lambda)), fields: Arc::default() }
    }

    pub fn lambda(&self) -> Option<&LambdaContext> {
        self.lambda.as_deref()
    }

    /// Structured fields in the order they were attached.
    pub fn fields(&self) -> &[LogField] {
        &self.fields
    }

    /// Value of the most recently attached field named `key`.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
    }

    /// Derives a new context with `fields` appended after the existing ones.
    #[must_use]
    pub fn with_fields(&self, fields: impl IntoIterator<Item = LogField>) -> Self {
        let mut all = Vec::clone(&self.fields);
        all.extend(fields);
        Self { lambda: self.lambda.clone(), fields: Arc::new(all) }
    }

    /// Time left before the runtime deadline, if one is known.
    pub fn remaining(&self) -> Option<Duration> {
        let lambda = self.lambda.as_ref()?;
        Some(
            lambda
                .deadline()
                .duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO),
        )
    }
}
