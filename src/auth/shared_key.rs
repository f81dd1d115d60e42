//! SharedKey request signing for the Blob and File REST APIs.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

use crate::context::RequestContext;
use crate::error::{ErrorCode, StorageError, StorageResult};

type HmacSha256 = Hmac<Sha256>;

/// Account name plus decoded account key.
#[derive(Clone)]
pub struct SharedKeyCredential {
    account: String,
    key: Vec<u8>,
}

impl SharedKeyCredential {
    /// Creates a credential from a base64 account key.
    pub fn new(account: impl Into<String>, access_key: &str) -> StorageResult<Self> {
        let key = BASE64.decode(access_key).map_err(|_| {
            StorageError::with_message(
                ErrorCode::InvalidAuthenticationInfo,
                "Invalid account key encoding",
            )
        })?;
        Ok(Self {
            account: account.into(),
            key,
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Returns the `Authorization` header value for the request.
    pub fn sign(&self, ctx: &RequestContext) -> StorageResult<String> {
        let string_to_sign = build_string_to_sign(ctx);
        let signature = compute_signature(&string_to_sign, &self.key)?;
        tracing::trace!(string_to_sign = ?string_to_sign, "Signed storage request");
        Ok(format!("SharedKey {}:{}", self.account, signature))
    }
}

impl fmt::Debug for SharedKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeyCredential")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

/// Builds the string-to-sign for SharedKey authentication.
fn build_string_to_sign(ctx: &RequestContext) -> String {
    let mut parts = Vec::new();

    // VERB
    parts.push(ctx.method.as_str().to_uppercase());

    // Content headers (must be in this exact order)
    let content_headers = [
        "content-encoding",
        "content-language",
        "content-length",
        "content-md5",
        "content-type",
    ];

    for header in &content_headers {
        let value = if *header == "content-length" {
            // Content-Length is an empty string when zero or absent
            match ctx.content_length() {
                Some(0) | None => String::new(),
                Some(len) => len.to_string(),
            }
        } else {
            ctx.header(header).unwrap_or("").to_string()
        };
        parts.push(value);
    }

    // Date stays empty; x-ms-date is always sent and lands in the canonicalized headers
    let date = if ctx.header("x-ms-date").is_some() {
        ""
    } else {
        ctx.header("date").unwrap_or("")
    };
    parts.push(date.to_string());

    // Conditional headers
    let conditional_headers = [
        "if-modified-since",
        "if-match",
        "if-none-match",
        "if-unmodified-since",
        "range",
    ];

    for header in &conditional_headers {
        parts.push(ctx.header(header).unwrap_or("").to_string());
    }

    // [headers].join("\n") + "\n" + canonicalizedHeaders + canonicalizedResource
    let headers_str = parts.join("\n");
    let canonicalized_headers = build_canonicalized_headers_with_trailing_newline(ctx);
    let canonicalized_resource = build_canonicalized_resource(ctx);

    format!("{}\n{}{}", headers_str, canonicalized_headers, canonicalized_resource)
}

/// Builds canonicalized headers string with trailing newline after each header.
fn build_canonicalized_headers_with_trailing_newline(ctx: &RequestContext) -> String {
    let mut result = String::new();
    for (name, value) in ctx.ms_headers() {
        let normalized_value = value.split_whitespace().collect::<Vec<_>>().join(" ");
        result.push_str(name);
        result.push(':');
        result.push_str(&normalized_value);
        result.push('\n');
    }
    result
}

/// Builds canonicalized resource string: `/{account}{encoded path}` followed
/// by the query parameters sorted by lowercase name.
fn build_canonicalized_resource(ctx: &RequestContext) -> String {
    let mut resource = format!("/{}{}", ctx.account, ctx.url.path());

    let mut params: Vec<(String, String)> = ctx
        .query_params()
        .into_iter()
        .map(|(k, v)| (k.to_lowercase(), v))
        .collect();
    params.sort_by(|a, b| a.0.cmp(&b.0));

    for (key, value) in params {
        resource.push('\n');
        resource.push_str(&key);
        resource.push(':');
        resource.push_str(&value);
    }

    resource
}

/// Computes HMAC-SHA256 signature.
fn compute_signature(string_to_sign: &str, key: &[u8]) -> StorageResult<String> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| {
        StorageError::with_message(ErrorCode::InvalidAuthenticationInfo, "Failed to create HMAC")
    })?;

    mac.update(string_to_sign.as_bytes());
    let result = mac.finalize();

    Ok(BASE64.encode(result.into_bytes()))
}
