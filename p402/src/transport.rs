//! HTTP transport capability.
//!
//! The payment flow depends only on this request/response shape; the
//! concrete HTTP client lives in `p402-http`. Keeping the seam here lets
//! tests drive the whole pipeline with a scripted transport.

use async_trait::async_trait;

use crate::proto::{CHALLENGE_HEADER, STATUS_PAYMENT_REQUIRED};

/// An outbound request to a paid service.
#[derive(Debug, Clone)]
pub struct ServiceRequest {
    /// Absolute request URL.
    pub url: String,
    /// HTTP method.
    pub method: String,
    /// Additional request headers as `(name, value)` pairs.
    pub headers: Vec<(String, String)>,
    /// Optional request body.
    pub body: Option<String>,
}

impl ServiceRequest {
    /// Creates a request with no extra headers and no body.
    #[must_use]
    pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Appends a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A response from a paid service.
#[derive(Debug, Clone)]
pub struct ServiceResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers with lowercased names.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: String,
}

impl ServiceResponse {
    /// Returns the first header with the given name, matched
    /// case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the payment challenge header, if any.
    #[must_use]
    pub fn challenge(&self) -> Option<&str> {
        self.header(CHALLENGE_HEADER)
    }

    /// Whether the response demands payment.
    #[must_use]
    pub const fn is_payment_required(&self) -> bool {
        self.status == STATUS_PAYMENT_REQUIRED
    }

    /// Whether the response status indicates acceptance (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Error from the underlying HTTP client.
///
/// Carries only a message; the payment flow treats any transport failure as
/// terminal for the attempt and never retries automatically.
#[derive(Debug, Clone, thiserror::Error)]
#[error("transport error: {message}")]
pub struct TransportError {
    /// What went wrong.
    pub message: String,
}

impl TransportError {
    /// Creates a new transport error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Sends HTTP requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request and returns the response.
    ///
    /// Implementations must bound the call with a timeout so a hung service
    /// cannot block a payment forever.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on connection, timeout, or protocol
    /// failures.
    async fn send(&self, request: &ServiceRequest) -> Result<ServiceResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let response = ServiceResponse {
            status: 402,
            headers: vec![("www-authenticate".to_owned(), "x402 ...".to_owned())],
            body: String::new(),
        };
        assert_eq!(response.header("WWW-Authenticate"), Some("x402 ..."));
        assert!(response.is_payment_required());
        assert!(!response.is_success());
    }

    #[test]
    fn any_2xx_is_success() {
        for status in [200, 201, 204, 299] {
            let response = ServiceResponse {
                status,
                headers: Vec::new(),
                body: String::new(),
            };
            assert!(response.is_success());
        }
    }
}
