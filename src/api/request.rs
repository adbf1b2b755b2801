//! Request view handed to route handlers

use std::collections::HashMap;
use std::str::FromStr;

use axum::body::Bytes;
use serde::de::DeserializeOwned;

use super::error::{ApiError, ApiResult};
use super::router::HttpMethod;

/// Everything a handler may look at: method, raw path, decoded query and body
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Bytes,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: HashMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Query value, with an empty value treated as absent
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Parse a query parameter; present but unparsable is a bad request
    pub fn query_param<T: FromStr>(&self, key: &str) -> ApiResult<Option<T>> {
        self.query_value(key)
            .map(|raw| {
                raw.parse().map_err(|_| {
                    ApiError::InvalidRequest(format!("invalid value for '{key}': {raw}"))
                })
            })
            .transpose()
    }

    /// Deserialize the JSON body
    pub fn json_body<T: DeserializeOwned>(&self) -> ApiResult<T> {
        if self.body.is_empty() {
            return Err(ApiError::InvalidRequest(
                "request body is required".to_string(),
            ));
        }

        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::InvalidRequest(format!("invalid JSON body: {e}")))
    }

    /// Path segments, ignoring empty ones
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|segment| !segment.is_empty())
    }

    /// Segment at `index` counted from the start of the path
    pub fn segment(&self, index: usize) -> Option<&str> {
        self.segments().nth(index)
    }

    pub fn last_segment(&self) -> Option<&str> {
        self.segments().last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde::Deserialize;

    #[test]
    fn test_query_param_parsing() {
        let request = ApiRequest::new(HttpMethod::Get, "/api/database/snapshots")
            .with_query("limit", "25")
            .with_query("offset", "")
            .with_query("bad", "abc");

        assert_eq!(request.query_param::<u32>("limit").unwrap(), Some(25));
        assert_eq!(request.query_param::<u32>("offset").unwrap(), None);
        assert_eq!(request.query_param::<u32>("missing").unwrap(), None);
        assert_matches!(
            request.query_param::<u32>("bad"),
            Err(ApiError::InvalidRequest(_))
        );
    }

    #[test]
    fn test_negative_number_is_invalid_for_unsigned() {
        let request = ApiRequest::new(HttpMethod::Get, "/").with_query("limit", "-5");
        assert_matches!(
            request.query_param::<u32>("limit"),
            Err(ApiError::InvalidRequest(_))
        );
        assert_eq!(request.query_param::<i64>("limit").unwrap(), Some(-5));
    }

    #[test]
    fn test_json_body() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Entry {
            key: String,
        }

        let request = ApiRequest::new(HttpMethod::Post, "/").with_body(r#"{"key":"a"}"#);
        assert_eq!(
            request.json_body::<Entry>().unwrap(),
            Entry {
                key: "a".to_string()
            }
        );

        let empty = ApiRequest::new(HttpMethod::Post, "/");
        assert_matches!(empty.json_body::<Entry>(), Err(ApiError::InvalidRequest(_)));

        let broken = ApiRequest::new(HttpMethod::Post, "/").with_body("{");
        assert_matches!(broken.json_body::<Entry>(), Err(ApiError::InvalidRequest(_)));
    }

    #[test]
    fn test_segments() {
        let request = ApiRequest::new(HttpMethod::Get, "/api/database/snapshots/42/processes");

        assert_eq!(request.segment(3), Some("42"));
        assert_eq!(request.last_segment(), Some("processes"));
        assert_eq!(request.segments().count(), 5);
    }
}
