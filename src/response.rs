//! Helpers for building API Gateway v1 responses.
//!
//! ```rust
//! use lambda_chain::response;
//!
//! #[derive(serde::Serialize)]
//! struct Order { id: u64 }
//!
//! response::new(204, "");
//! response::json(200, Some(&Order { id: 42 }));
//! response::error(404, "order not found");
//! ```
//!
//! Every response starts with an empty, non-null header map so middleware
//! can add headers such as `x-request-id` without checking.

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use crate::events::ApiGatewayProxyResponse;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const APPLICATION_JSON: &str = "application/json";

/// Body of [`error`] responses.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: u16,
    message: &'a str,
}

/// Plain response with `body` as-is and no content type.
pub fn new(status: u16, body: impl Into<String>) -> ApiGatewayProxyResponse {
    ApiGatewayProxyResponse {
        status_code: status,
        headers: HashMap::new(),
        body: body.into(),
        ..Default::default()
    }
}

/// JSON response.
///
/// With `Some(body)` the value is serialised and `Content-Type:
/// application/json` is set. If serialisation fails the response is left
/// blank: empty body, no content type. `None` also yields a blank body.
pub fn json<T: Serialize + ?Sized>(status: u16, body: Option<&T>) -> ApiGatewayProxyResponse {
    let mut res = new(status, String::new());
    let Some(body) = body else {
        return res;
    };

    match serde_json::to_string(body) {
        Ok(encoded) => {
            res.body = encoded;
            res.headers.insert(CONTENT_TYPE.to_owned(), APPLICATION_JSON.to_owned());
        }
        Err(e) => warn!(status, error = %e, "response body could not be serialised, sending it blank"),
    }
    res
}

/// JSON error response: `{"code": <status>, "message": <message>}`.
pub fn error(status: u16, message: &str) -> ApiGatewayProxyResponse {
    json(status, Some(&ErrorBody { code: status, message }))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::ser::Error as _;

    use super::*;

    #[derive(Serialize)]
    struct TestBody {
        num: i32,
        str: &'static str,
    }

    /// Refuses to serialise.
    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("nope"))
        }
    }

    fn json_headers() -> HashMap<String, String> {
        HashMap::from([(CONTENT_TYPE.to_owned(), APPLICATION_JSON.to_owned())])
    }

    #[test]
    fn new_sets_status_and_body_without_headers() {
        assert_eq!(
            new(123, "test-123"),
            ApiGatewayProxyResponse {
                status_code: 123,
                body: "test-123".to_owned(),
                headers: HashMap::new(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn new_with_empty_values() {
        let res = new(0, "");
        assert_eq!(res.status_code, 0);
        assert_eq!(res.body, "");
        assert!(res.headers.is_empty());
    }

    #[test]
    fn json_serialises_body_and_sets_content_type() {
        let res = json(123, Some(&TestBody { num: 456, str: "test-789" }));

        assert_eq!(res.status_code, 123);
        assert_eq!(res.body, r#"{"num":456,"str":"test-789"}"#);
        assert_eq!(res.headers, json_headers());
    }

    #[test]
    fn json_without_body_is_blank() {
        let res = json::<TestBody>(200, None);

        assert_eq!(res.status_code, 200);
        assert_eq!(res.body, "");
        assert!(res.headers.is_empty());
    }

    #[test]
    fn json_serialisation_failure_is_blank() {
        let res = json(500, Some(&Unserializable));

        assert_eq!(res.body, "");
        assert!(res.headers.is_empty());
    }

    #[test]
    fn json_accepts_maps() {
        let body = BTreeMap::from([("num", serde_json::json!(456)), ("str", serde_json::json!("test-789"))]);
        assert_eq!(json(200, Some(&body)).body, r#"{"num":456,"str":"test-789"}"#);
    }

    #[test]
    fn error_wraps_code_and_message() {
        let res = error(404, "not found");

        assert_eq!(res.status_code, 404);
        assert_eq!(res.body, r#"{"code":404,"message":"not found"}"#);
        assert_eq!(res.headers, json_headers());
    }
}
