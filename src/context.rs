//! Outbound request context shared by signing and sending.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::{Method, Url};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::config::DEFAULT_API_VERSION;

/// A storage request being prepared: everything the SharedKey signature
/// covers, plus the body.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Client request ID, sent as `x-ms-client-request-id`.
    pub request_id: String,
    /// HTTP method.
    pub method: Method,
    /// Fully encoded request URL.
    pub url: Url,
    /// Storage account the request is signed for.
    pub account: String,
    /// Request headers keyed by lowercase name.
    pub headers: BTreeMap<String, String>,
    /// Request body.
    pub body: Bytes,
    /// Request timestamp.
    pub timestamp: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a request carrying the standard `x-ms-*` headers.
    pub fn new(method: Method, url: Url, account: impl Into<String>) -> Self {
        let request_id = Uuid::new_v4().to_string();
        let timestamp = Utc::now();

        let mut headers = BTreeMap::new();
        headers.insert("x-ms-date".to_string(), format_http_date(&timestamp));
        headers.insert("x-ms-version".to_string(), DEFAULT_API_VERSION.to_string());
        headers.insert("x-ms-client-request-id".to_string(), request_id.clone());

        Self {
            request_id,
            method,
            url,
            account: account.into(),
            headers,
            body: Bytes::new(),
            timestamp,
        }
    }

    /// Adds or replaces a header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    /// Sets the request body.
    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    /// Returns the value of a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    /// Returns the x-ms-* headers sorted alphabetically.
    pub fn ms_headers(&self) -> Vec<(&str, &str)> {
        // BTreeMap iteration is already ordered by name.
        self.headers
            .iter()
            .filter(|(name, _)| name.starts_with("x-ms-"))
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect()
    }

    /// Length of the body as the transport will send it. Bodies are only
    /// attached to PUT requests, which always carry a Content-Length.
    pub fn content_length(&self) -> Option<u64> {
        if self.method == Method::PUT {
            Some(self.body.len() as u64)
        } else {
            None
        }
    }

    /// Decoded query parameters in URL order.
    pub fn query_params(&self) -> Vec<(String, String)> {
        self.url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Builds the reqwest request, attaching the given Authorization value.
    pub fn into_request(
        self,
        client: &reqwest::Client,
        authorization: String,
    ) -> reqwest::RequestBuilder {
        let has_body = self.method == Method::PUT;
        let mut request = client.request(self.method, self.url);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request = request.header("authorization", authorization);
        if has_body {
            request = request.body(self.body);
        }
        request
    }
}

/// Formats a `Range`/`x-ms-range` value covering `length` bytes from `offset`.
pub fn format_range(offset: u64, length: u64) -> String {
    format!("bytes={}-{}", offset, offset + length.saturating_sub(1))
}

/// Formats a DateTime as RFC 1123 format for HTTP headers.
pub fn format_http_date(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
