//! Per-call request options and header normalization

use std::collections::{BTreeMap, HashMap};

use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;

/// Caller-supplied headers in any of the accepted shapes.
///
/// All shapes are normalized the same way: names are case-insensitive and a
/// later value for a name replaces any earlier one.
#[derive(Debug, Clone)]
pub enum Headers {
    Map(HashMap<String, String>),
    Pairs(Vec<(String, String)>),
    Collection(HeaderMap),
}

impl Headers {
    /// Write these headers into `target`, overriding existing values
    pub fn apply_to(&self, target: &mut HeaderMap) -> Result<(), ApiError> {
        match self {
            Headers::Map(map) => {
                for (name, value) in map {
                    insert_pair(target, name, value)?;
                }
            }
            Headers::Pairs(pairs) => {
                for (name, value) in pairs {
                    insert_pair(target, name, value)?;
                }
            }
            Headers::Collection(map) => {
                for name in map.keys() {
                    target.remove(name);
                }
                for (name, value) in map {
                    target.append(name.clone(), value.clone());
                }
            }
        }
        Ok(())
    }
}

fn insert_pair(target: &mut HeaderMap, name: &str, value: &str) -> Result<(), ApiError> {
    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|e| ApiError::InvalidRequest(format!("invalid header name '{}': {}", name, e)))?;
    let value = HeaderValue::from_str(value.trim())
        .map_err(|e| ApiError::InvalidRequest(format!("invalid value for '{}': {}", name, e)))?;
    target.insert(name, value);
    Ok(())
}

impl From<HashMap<String, String>> for Headers {
    fn from(map: HashMap<String, String>) -> Self {
        Headers::Map(map)
    }
}

impl From<BTreeMap<String, String>> for Headers {
    fn from(map: BTreeMap<String, String>) -> Self {
        Headers::Pairs(map.into_iter().collect())
    }
}

impl From<Vec<(String, String)>> for Headers {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Headers::Pairs(pairs)
    }
}

impl From<&[(&str, &str)]> for Headers {
    fn from(pairs: &[(&str, &str)]) -> Self {
        Headers::Pairs(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Headers {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Headers::from(&pairs[..])
    }
}

impl From<HeaderMap> for Headers {
    fn from(map: HeaderMap) -> Self {
        Headers::Collection(map)
    }
}

/// Build the outgoing header set: JSON content type and the auth token
/// first, then each caller-supplied set in order.
pub fn normalize_headers(
    auth_token: Option<&str>,
    caller: &[Headers],
) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(token) = auth_token {
        insert_pair(&mut headers, AUTH_HEADER, token)?;
    }
    for set in caller {
        set.apply_to(&mut headers)?;
    }
    Ok(headers)
}

/// Header carrying the static auth token
pub const AUTH_HEADER: &str = "Authorization";

/// Options for a single executor call
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: Vec<Headers>,
    pub query: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    /// Caller-owned cancellation. When present the executor applies no
    /// timeout of its own.
    pub signal: Option<CancellationToken>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
            signal: None,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    /// POST with a JSON-serialized body
    pub fn post_json<T: Serialize + ?Sized>(body: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(Method::POST).body(serde_json::to_vec(body)?))
    }

    pub fn headers(mut self, headers: impl Into<Headers>) -> Self {
        self.headers.push(headers.into());
        self
    }

    pub fn header(self, name: &str, value: &str) -> Self {
        self.headers([(name, value)])
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn signal(mut self, token: CancellationToken) -> Self {
        self.signal = Some(token);
        self
    }
}
