//! Environment configuration supplied by the Lambda execution environment.

use std::collections::HashMap;

use crate::error::Error;

const PREFIX: &str = "AWS_LAMBDA_";

pub const RUNTIME_API: &str = "AWS_LAMBDA_RUNTIME_API";
pub const FUNCTION_NAME: &str = "AWS_LAMBDA_FUNCTION_NAME";
pub const FUNCTION_VERSION: &str = "AWS_LAMBDA_FUNCTION_VERSION";
pub const LOG_LEVEL: &str = "AWS_LAMBDA_LOG_LEVEL";
pub const LOG_FORMAT: &str = "AWS_LAMBDA_LOG_FORMAT";

/// Snapshot of every `AWS_LAMBDA_*` environment variable.
#[derive(Clone, Debug, Default)]
pub struct Config {
    kv: HashMap<String, String>,
}

impl Config {
    /// Reads the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let kv = std::env::vars()
            .filter(|(k, _)| k.starts_with(PREFIX))
            .collect();
        Self { kv }
    }

    /// Builds a config from explicit pairs instead of the environment.
    pub fn from_map(kv: HashMap<String, String>) -> Self {
        Self { kv }
    }

    pub fn optional(&self, key: &str) -> Option<&str> {
        self.kv.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str, Error> {
        self.optional(key)
            .ok_or_else(|| Error::MissingConfig(key.to_owned()))
    }

    /// `host:port` of the Runtime API.
    pub fn runtime_api(&self) -> Result<&str, Error> {
        self.require(RUNTIME_API)
    }

    pub fn function_name(&self) -> Option<&str> {
        self.optional(FUNCTION_NAME)
    }

    pub fn function_version(&self) -> Option<&str> {
        self.optional(FUNCTION_VERSION)
    }

    /// `true` when the function is configured for JSON log output.
    pub fn json_logs(&self) -> bool {
        self.optional(LOG_FORMAT)
            .is_some_and(|f| f.eq_ignore_ascii_case("json"))
    }

    pub fn log_level(&self) -> Option<&str> {
        self.optional(LOG_LEVEL)
    }
}
