//! Outbound request value object.

use std::collections::BTreeMap;

use reqwest::Method;
use url::Url;

use crate::error::Result;

/// Query parameter the server expects after answering 300 Multiple Choices.
pub const RESPONSE_CHOICE_PARAMETER: &str = "responseChoice";

/// A request to be sent through a [`Transport`](crate::Transport).
///
/// Built fresh for every logical operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub method: Method,
    pub headers: BTreeMap<String, String>,
    pub parameters: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl Request {
    /// A GET request to `url` with no headers, parameters or body.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            headers: BTreeMap::new(),
            parameters: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parameters.insert(name.into(), value.into());
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Pick the first representation offered by a 300 response.
    ///
    /// Idempotent: the parameter is set once no matter how many redirects
    /// are answered.
    pub fn choose_response(&mut self) {
        self.set_parameter(RESPONSE_CHOICE_PARAMETER, "1");
    }

    /// The URL with the query parameters appended.
    ///
    /// A parameter already present with the same value in the URL's own
    /// query is not repeated.
    pub fn full_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.url)?;

        let present: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let missing: Vec<_> = self
            .parameters
            .iter()
            .filter(|(name, value)| !present.iter().any(|(n, v)| n == *name && v == *value))
            .collect();

        if !missing.is_empty() {
            url.query_pairs_mut().extend_pairs(missing);
        }
        Ok(url)
    }
}
