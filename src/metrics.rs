//! Metrics records and the sink they are written to.
//!
//! A record is a label plus an ordered list of [`Field`]s, handed to an
//! [`Outputter`] in one call. Sinks are fire-and-forget: they return nothing
//! and must not fail the invocation that produced the record.

use std::time::Duration;

use serde_json::{Map, Value};
use tracing::info;

use crate::context::Context;

/// Value carried by a metrics [`Field`].
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Json(Value),
    Duration(Duration),
    Int(i64),
    Str(String),
}

impl FieldValue {
    /// JSON rendering; durations become fractional milliseconds.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Json(v) => v.clone(),
            Self::Duration(d) => Value::from(d.as_secs_f64() * 1000.0),
            Self::Int(i) => Value::from(*i),
            Self::Str(s) => Value::from(s.as_str()),
        }
    }
}

impl From<Duration> for FieldValue {
    fn from(d: Duration) -> Self { Self::Duration(d) }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self { Self::Int(i) }
}

impl From<u16> for FieldValue {
    fn from(i: u16) -> Self { Self::Int(i64::from(i)) }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self { Self::Str(s) }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self { Self::Str(s.to_owned()) }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self { Self::Json(v) }
}

/// A name/value pair inside a metrics record.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub value: FieldValue,
}

impl Field {
    pub fn new(name: &'static str, value: impl Into<FieldValue>) -> Self {
        Self { name, value: value.into() }
    }
}

/// Destination for metrics records.
///
/// Implementations are shared across concurrent invocations and must
/// synchronise any internal state themselves.
pub trait Outputter: Send + Sync + 'static {
    fn output(&self, ctx: &Context, label: &str, fields: Vec<Field>);
}

/// Writes every record as a `tracing` event at `INFO`.
///
/// The context's structured fields and the record's fields are each
/// rendered as a JSON object, so log pipelines can parse them without
/// knowing the field set in advance.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingOutputter;

impl Outputter for TracingOutputter {
    fn output(&self, ctx: &Context, label: &str, fields: Vec<Field>) {
        let context: Map<String, Value> = ctx
            .fields()
            .iter()
            .map(|f| (f.key.to_owned(), Value::from(f.value.as_str())))
            .collect();
        let record: Map<String, Value> = fields
            .iter()
            .map(|f| (f.name.to_owned(), f.value.to_json()))
            .collect();

        let context = Value::Object(context);
        let record = Value::Object(record);
        info!(target: "lambda_chain::metrics", %context, fields = %record, "{label}");
    }
}
