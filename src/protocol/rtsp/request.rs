use super::{Headers, headers::names};
use crate::protocol::{Method, RTSP_VERSION};

/// An RTSP request message
#[derive(Debug, Clone)]
pub struct RtspRequest {
    /// RTSP method
    pub method: Method,
    /// Request URI (e.g., `rtsp://192.168.49.1/wfd1.0/streamid=0`)
    pub uri: String,
    /// Request headers
    pub headers: Headers,
    /// Request body (may be empty)
    pub body: Vec<u8>,
}

impl RtspRequest {
    /// Create a new request
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// Create a builder for constructing requests
    pub fn builder(method: Method, uri: impl Into<String>) -> RtspRequestBuilder {
        RtspRequestBuilder::new(method, uri)
    }

    /// Get `CSeq` from the request
    #[must_use]
    pub fn cseq(&self) -> Option<u32> {
        self.headers.cseq()
    }

    /// Get session ID from the request
    #[must_use]
    pub fn session(&self) -> Option<&str> {
        self.headers.session()
    }

    /// Encode request to bytes
    ///
    /// Returns the complete RTSP request ready for transmission.
    /// `Content-Length` is computed from the body and rendered last, before
    /// the blank line.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut output = Vec::with_capacity(256 + self.body.len());

        // Request line: METHOD uri RTSP/1.0\r\n
        output.extend_from_slice(self.method.as_str().as_bytes());
        output.push(b' ');
        output.extend_from_slice(self.uri.as_bytes());
        output.push(b' ');
        output.extend_from_slice(RTSP_VERSION.as_bytes());
        output.extend_from_slice(b"\r\n");

        // Headers
        for (name, value) in self.headers.iter() {
            output.extend_from_slice(name.as_bytes());
            output.extend_from_slice(b": ");
            output.extend_from_slice(value.as_bytes());
            output.extend_from_slice(b"\r\n");
        }

        // Content-Length if body present
        if !self.body.is_empty() {
            let len_header = format!("{}: {}\r\n", names::CONTENT_LENGTH, self.body.len());
            output.extend_from_slice(len_header.as_bytes());
        }

        // End of headers
        output.extend_from_slice(b"\r\n");

        // Body
        output.extend_from_slice(&self.body);

        output
    }
}

/// Builder for RTSP requests
#[derive(Debug)]
pub struct RtspRequestBuilder {
    request: RtspRequest,
}

impl RtspRequestBuilder {
    /// Create a new builder
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            request: RtspRequest::new(method, uri),
        }
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.insert(name, value);
        self
    }

    /// Set `CSeq` header
    #[must_use]
    pub fn cseq(self, seq: u32) -> Self {
        self.header(names::CSEQ, seq.to_string())
    }

    /// Set User-Agent header
    #[must_use]
    pub fn user_agent(self, agent: &str) -> Self {
        self.header(names::USER_AGENT, agent)
    }

    /// Set Require header
    #[must_use]
    pub fn require(self, feature: &str) -> Self {
        self.header(names::REQUIRE, feature)
    }

    /// Set Session header
    #[must_use]
    pub fn session(self, session_id: &str) -> Self {
        self.header(names::SESSION, session_id)
    }

    /// Set a `text/parameters` body
    #[must_use]
    pub fn text_body(mut self, body: &str) -> Self {
        self.request.body = body.as_bytes().to_vec();
        self.request
            .headers
            .insert(names::CONTENT_TYPE, "text/parameters");
        self
    }

    /// Build the request
    #[must_use]
    pub fn build(self) -> RtspRequest {
        self.request
    }
}
