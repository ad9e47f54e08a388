use super::{Headers, headers::names};
use crate::protocol::RTSP_VERSION;

/// RTSP status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(pub u16);

impl StatusCode {
    /// 200 OK
    pub const OK: StatusCode = StatusCode(200);
    /// 400 Bad Request
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    /// 404 Not Found
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    /// 405 Method Not Allowed
    pub const METHOD_NOT_ALLOWED: StatusCode = StatusCode(405);
    /// 406 Not Acceptable
    pub const NOT_ACCEPTABLE: StatusCode = StatusCode(406);
    /// 454 Session Not Found
    pub const SESSION_NOT_FOUND: StatusCode = StatusCode(454);
    /// 455 Method Not Valid in This State
    pub const METHOD_NOT_VALID: StatusCode = StatusCode(455);
    /// 500 Internal Server Error
    pub const INTERNAL_ERROR: StatusCode = StatusCode(500);
    /// 501 Not Implemented
    pub const NOT_IMPLEMENTED: StatusCode = StatusCode(501);

    /// Check if this is a success status (2xx)
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Get status code as u16
    #[must_use]
    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

/// An RTSP response message
#[derive(Debug, Clone)]
pub struct RtspResponse {
    /// RTSP version (usually "RTSP/1.0")
    pub version: String,
    /// Status code
    pub status: StatusCode,
    /// Reason phrase (e.g., "OK")
    pub reason: String,
    /// Response headers
    pub headers: Headers,
    /// Response body (may be empty)
    pub body: Vec<u8>,
}

impl RtspResponse {
    /// Check if response indicates success
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Get `CSeq` from response
    #[must_use]
    pub fn cseq(&self) -> Option<u32> {
        self.headers.cseq()
    }

    /// Get session ID from response
    #[must_use]
    pub fn session(&self) -> Option<&str> {
        self.headers.session()
    }

    /// Get the body as UTF-8 text (lossy)
    #[must_use]
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Builder for RTSP responses
///
/// Headers render in insertion order, so method-specific trailers such as
/// `Transport` (M6) and `Range` (M7) land after the generic headers and
/// before the terminating blank line, which WFD sinks parse strictly.
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Headers,
    body: Option<Vec<u8>>,
}

impl ResponseBuilder {
    /// Create a new response builder with the given status
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: None,
        }
    }

    /// Create an OK (200) response
    #[must_use]
    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    /// Create an error response
    #[must_use]
    pub fn error(status: StatusCode) -> Self {
        Self::new(status)
    }

    /// Set the `CSeq` header (must match the request being answered)
    #[must_use]
    pub fn cseq(mut self, cseq: u32) -> Self {
        self.headers.insert(names::CSEQ, cseq.to_string());
        self
    }

    /// Set the Session header
    #[must_use]
    pub fn session(mut self, session_id: &str) -> Self {
        self.headers.insert(names::SESSION, session_id);
        self
    }

    /// Set the Session header with a timeout suffix
    #[must_use]
    pub fn session_with_timeout(mut self, session_id: &str, timeout_secs: u64) -> Self {
        self.headers
            .insert(names::SESSION, format!("{session_id};timeout={timeout_secs}"));
        self
    }

    /// Set the Transport header
    #[must_use]
    pub fn transport(mut self, transport: &str) -> Self {
        self.headers.insert(names::TRANSPORT, transport);
        self
    }

    /// Set the Range header
    #[must_use]
    pub fn range(mut self, range: &str) -> Self {
        self.headers.insert(names::RANGE, range);
        self
    }

    /// Add a custom header
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set a text body (sets Content-Type to text/parameters)
    #[must_use]
    pub fn text_body(mut self, body: &str) -> Self {
        self.body = Some(body.as_bytes().to_vec());
        self.headers.insert(names::CONTENT_TYPE, "text/parameters");
        self
    }

    /// Build into an `RtspResponse`
    #[must_use]
    pub fn build(mut self) -> RtspResponse {
        // Add Content-Length if body present
        if let Some(ref body) = self.body {
            self.headers
                .insert(names::CONTENT_LENGTH, body.len().to_string());
        }

        RtspResponse {
            version: RTSP_VERSION.to_string(),
            status: self.status,
            reason: status_reason(self.status).to_string(),
            headers: self.headers,
            body: self.body.unwrap_or_default(),
        }
    }

    /// Encode directly to bytes
    #[must_use]
    pub fn encode(self) -> Vec<u8> {
        let response = self.build();
        encode_response(&response)
    }
}

/// Encode an RTSP response to bytes
#[must_use]
pub fn encode_response(response: &RtspResponse) -> Vec<u8> {
    let mut output = Vec::with_capacity(256 + response.body.len());

    // Status line
    output.extend_from_slice(
        format!(
            "{} {} {}\r\n",
            response.version,
            response.status.as_u16(),
            response.reason
        )
        .as_bytes(),
    );

    // Headers, in insertion order
    for (name, value) in response.headers.iter() {
        output.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
    }

    // Separator
    output.extend_from_slice(b"\r\n");

    // Body
    if !response.body.is_empty() {
        output.extend_from_slice(&response.body);
    }

    output
}

/// Get reason phrase for status code
fn status_reason(status: StatusCode) -> &'static str {
    match status.as_u16() {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        451 => "Parameter Not Understood",
        454 => "Session Not Found",
        455 => "Method Not Valid in This State",
        461 => "Unsupported Transport",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_builder_basic() {
        let encoded = ResponseBuilder::ok().cseq(2).encode();
        let text = String::from_utf8_lossy(&encoded);

        assert!(text.starts_with("RTSP/1.0 200 OK\r\n"));
        assert!(text.contains("CSeq: 2\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_transport_header_rendered_last() {
        let encoded = ResponseBuilder::ok()
            .cseq(3)
            .session_with_timeout("7C9A1E04", 30)
            .transport("RTP/AVP/UDP;unicast;client_port=6700;server_port=5004")
            .encode();
        let text = String::from_utf8_lossy(&encoded);

        let transport_pos = text.find("Transport:").unwrap();
        let session_pos = text.find("Session:").unwrap();
        assert!(transport_pos > session_pos);
        assert!(text.contains("Session: 7C9A1E04;timeout=30\r\n"));
        assert!(
            text.ends_with("Transport: RTP/AVP/UDP;unicast;client_port=6700;server_port=5004\r\n\r\n")
        );
    }

    #[test]
    fn test_text_body_sets_lengths() {
        let response = ResponseBuilder::ok()
            .cseq(4)
            .text_body("wfd_idr_request\r\n")
            .build();

        assert_eq!(response.headers.content_type(), Some("text/parameters"));
        assert_eq!(response.headers.content_length(), Some(17));
    }

    #[test]
    fn test_error_reason_phrases() {
        let response = ResponseBuilder::error(StatusCode::METHOD_NOT_VALID).cseq(1).build();
        assert_eq!(response.reason, "Method Not Valid in This State");
        assert!(!response.is_success());
    }
}
