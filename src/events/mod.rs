//! AWS event payloads and the shape predicates middleware uses to
//! recognise them.
//!
//! Middleware is generic over any event `E` and response `R`, but a few of
//! them behave differently for API Gateway traffic. Rather than inspecting
//! types at runtime, every event and response type states what it is by
//! implementing [`EventShape`] / [`ResponseShape`]. The default methods say
//! "not a gateway payload", so opting a custom type in is one line:
//!
//! ```rust
//! use lambda_chain::events::{EventShape, ResponseShape};
//!
//! #[derive(serde::Serialize, serde::Deserialize)]
//! struct OrderPlaced { order_id: u64 }
//!
//! impl EventShape for OrderPlaced {}
//! impl ResponseShape for OrderPlaced {}
//! ```

mod apigw;
mod s3;
mod sns;
mod sqs;

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

pub use apigw::{ApiGatewayProxyRequest, ApiGatewayProxyRequestContext, ApiGatewayProxyResponse};
pub use s3::{S3Bucket, S3Entity, S3Event, S3EventRecord, S3Object};
pub use sns::{SnsEntity, SnsEvent, SnsEventRecord};
pub use sqs::{SqsEvent, SqsMessage};

/// Capability check for incoming events.
pub trait EventShape {
    /// `Some` when this event is an API Gateway v1 proxy request.
    fn api_gateway_request(&self) -> Option<&ApiGatewayProxyRequest> {
        None
    }
}

/// Capability check for handler responses.
pub trait ResponseShape {
    /// `Some` when this response is an API Gateway v1 proxy response.
    fn api_gateway_response(&self) -> Option<&ApiGatewayProxyResponse> {
        None
    }

    fn api_gateway_response_mut(&mut self) -> Option<&mut ApiGatewayProxyResponse> {
        None
    }
}

impl EventShape for ApiGatewayProxyRequest {
    fn api_gateway_request(&self) -> Option<&ApiGatewayProxyRequest> {
        Some(self)
    }
}

impl ResponseShape for ApiGatewayProxyResponse {
    fn api_gateway_response(&self) -> Option<&ApiGatewayProxyResponse> {
        Some(self)
    }

    fn api_gateway_response_mut(&mut self) -> Option<&mut ApiGatewayProxyResponse> {
        Some(self)
    }
}

macro_rules! plain_shape {
    ($($ty:ty),* $(,)?) => {
        $(
            impl EventShape for $ty {}
            impl ResponseShape for $ty {}
        )*
    };
}

plain_shape!(
    (),
    bool,
    i64,
    u64,
    String,
    serde_json::Value,
    SqsEvent,
    SnsEvent,
    S3Event,
);

impl<T> EventShape for Vec<T> {}
impl<T> ResponseShape for Vec<T> {}
impl<V> EventShape for HashMap<String, V> {}
impl<V> ResponseShape for HashMap<String, V> {}

/// Deserializes JSON `null` as `T::default()`. AWS sends `null` for empty
/// maps such as `queryStringParameters`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
