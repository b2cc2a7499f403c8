//! Normalized HTTP response and payload decoding.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{NuageError, Result};

/// Status codes the session gives a meaning to.
pub mod codes {
    pub const SUCCESS: u16 = 200;
    pub const CREATED: u16 = 201;
    pub const EMPTY: u16 = 204;
    pub const MULTIPLE_CHOICES: u16 = 300;
    pub const CONFLICT: u16 = 409;
    pub const AUTHENTICATION_EXPIRED: u16 = 419;
}

/// Outcome of decoding a response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<T> {
    /// The server sent no body.
    Empty,
    Value(T),
}

impl<T> Payload<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Payload::Empty => None,
            Payload::Value(value) => Some(value),
        }
    }
}

/// A response as seen by the session: status code, headers and raw body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub code: u16,
    headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(code: u16) -> Self {
        Self {
            code,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Header names are case-insensitive.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self.code,
            codes::SUCCESS | codes::CREATED | codes::EMPTY
        )
    }

    /// Whether the body carries anything besides whitespace.
    pub fn has_body(&self) -> bool {
        self.body.iter().any(|b| !b.is_ascii_whitespace())
    }

    /// Decode the body.
    ///
    /// An empty body is [`Payload::Empty`]; anything that fails to parse is
    /// [`NuageError::MalformedPayload`].
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Payload<T>> {
        if !self.has_body() {
            return Ok(Payload::Empty);
        }
        serde_json::from_slice(&self.body)
            .map(Payload::Value)
            .map_err(NuageError::MalformedPayload)
    }

    /// Decode a body that wraps a single object in an array.
    ///
    /// The server answers single-object calls with `[{...}]`. A bare object is
    /// accepted too, an empty array is [`Payload::Empty`].
    pub fn decode_single(&self) -> Result<Payload<Value>> {
        let value = match self.decode::<Value>()? {
            Payload::Empty => return Ok(Payload::Empty),
            Payload::Value(value) => value,
        };

        match value {
            Value::Array(items) => Ok(items
                .into_iter()
                .next()
                .map_or(Payload::Empty, Payload::Value)),
            Value::Null => Ok(Payload::Empty),
            other => Ok(Payload::Value(other)),
        }
    }
}
