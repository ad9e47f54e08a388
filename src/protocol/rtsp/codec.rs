//! Incremental RTSP codec for both message directions
//!
//! A single TCP read may contain zero, one, or fragments of several RTSP
//! messages, and the Source must accept responses to its own requests
//! interleaved with fresh requests from the Sink on the same stream. The
//! codec therefore parses whatever the start line says the next message is:
//! a line beginning `RTSP/` is a response, anything else is a request.
//!
//! # Sans-IO Design
//!
//! No I/O is performed here. `feed()` appends bytes to the internal buffer,
//! `decode()` attempts to parse one complete message. `Ok(None)` means the
//! buffer holds an incomplete message; the bytes stay buffered and the
//! caller retries after the next read.

use super::{Headers, RtspRequest, RtspResponse, StatusCode};
use crate::protocol::Method;
use bytes::BytesMut;
use std::str;

/// Errors during RTSP parsing
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Message framing is broken: no parsable start line, or a header block
    /// without at least one header after the start line
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Request carries a method outside the known RTSP method set
    #[error("invalid method: {0}")]
    InvalidMethod(String),

    /// Header line without a `name: value` shape
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Content-Length header is not a number
    #[error("invalid Content-Length: {0}")]
    InvalidContentLength(String),

    /// Message exceeds the size bound
    #[error("message too large: {size} > {max}")]
    MessageTooLarge {
        /// Observed size
        size: usize,
        /// Allowed maximum
        max: usize,
    },

    /// Header block is not valid UTF-8
    #[error("invalid UTF-8 in headers")]
    InvalidUtf8,
}

/// A decoded RTSP message, either direction
#[derive(Debug, Clone)]
pub enum RtspMessage {
    /// A request from the peer
    Request(RtspRequest),
    /// A response to one of our requests
    Response(RtspResponse),
}

/// Maximum allowed body size (64 KB is generous for text/parameters)
const MAX_BODY_SIZE: usize = 64 * 1024;

/// Maximum header section size
const MAX_HEADER_SIZE: usize = 16 * 1024;

/// Incremental RTSP message codec
pub struct RtspCodec {
    buffer: BytesMut,
}

impl RtspCodec {
    /// Create a new codec
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Feed bytes into the internal buffer
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Get current buffer length
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Attempt to decode one complete RTSP message
    ///
    /// Returns:
    /// - `Ok(Some(message))` if a complete message was parsed
    /// - `Ok(None)` if more data is needed (partial message stays buffered)
    /// - `Err(e)` if the buffered message is malformed
    ///
    /// # Errors
    /// Returns `ParseError` if the message at the head of the buffer cannot
    /// be parsed as either an RTSP request or response. The malformed
    /// message is discarded from the buffer, so a subsequent `decode()`
    /// resumes at the next buffered message.
    pub fn decode(&mut self) -> Result<Option<RtspMessage>, ParseError> {
        // Interleaved binary frames ($ channel length) are not part of the
        // control conversation; skip them.
        while self.buffer.first() == Some(&b'$') {
            if self.buffer.len() < 4 {
                return Ok(None);
            }
            let frame_len = usize::from(u16::from_be_bytes([self.buffer[2], self.buffer[3]]));
            if self.buffer.len() < 4 + frame_len {
                return Ok(None);
            }
            let _ = self.buffer.split_to(4 + frame_len);
        }

        // Find header/body separator
        let Some(header_end) = self.find_header_end() else {
            if self.buffer.len() > MAX_HEADER_SIZE {
                let size = self.buffer.len();
                // No framing to resync on; drop the oversized garbage
                self.buffer.clear();
                return Err(ParseError::MessageTooLarge {
                    size,
                    max: MAX_HEADER_SIZE,
                });
            }
            return Ok(None); // Need more data
        };

        // A malformed header block is discarded up to its separator so valid
        // messages buffered behind it survive the error.
        let head = match Self::parse_head(&self.buffer[..header_end]) {
            Ok(head) => head,
            Err(error) => {
                let _ = self.buffer.split_to(header_end + 4);
                return Err(error);
            }
        };
        let (start_line, headers, content_length) = head;

        if content_length > MAX_BODY_SIZE {
            let _ = self.buffer.split_to(header_end + 4);
            return Err(ParseError::MessageTooLarge {
                size: content_length,
                max: MAX_BODY_SIZE,
            });
        }

        // Total message size: headers + \r\n\r\n + body. A declared length
        // beyond what has arrived is the splicing case: leave everything
        // buffered and wait for the rest.
        let total_size = header_end + 4 + content_length;
        if self.buffer.len() < total_size {
            return Ok(None);
        }

        let parsed = if start_line.starts_with("RTSP/") {
            Self::parse_status_line(&start_line).map(|(version, status, reason)| {
                RtspMessage::Response(RtspResponse {
                    version,
                    status,
                    reason,
                    headers,
                    body: Vec::new(),
                })
            })
        } else {
            Self::parse_request_line(&start_line).map(|(method, uri)| {
                RtspMessage::Request(RtspRequest {
                    method,
                    uri,
                    headers,
                    body: Vec::new(),
                })
            })
        };
        let message = match parsed {
            Ok(message) => message,
            Err(error) => {
                // The whole message is buffered at this point; skip it
                let _ = self.buffer.split_to(total_size);
                return Err(error);
            }
        };

        // Consume the buffer only once the whole message is parsable
        let _ = self.buffer.split_to(header_end + 4);
        let body = if content_length > 0 {
            self.buffer.split_to(content_length).to_vec()
        } else {
            Vec::new()
        };

        Ok(Some(match message {
            RtspMessage::Request(mut r) => {
                r.body = body;
                RtspMessage::Request(r)
            }
            RtspMessage::Response(mut r) => {
                r.body = body;
                RtspMessage::Response(r)
            }
        }))
    }

    /// Parse the header section into its start line, headers, and body length
    fn parse_head(header_bytes: &[u8]) -> Result<(String, Headers, usize), ParseError> {
        let header_str = str::from_utf8(header_bytes).map_err(|_| ParseError::InvalidUtf8)?;

        let mut lines = header_str.split("\r\n");
        let start_line = lines
            .next()
            .filter(|l| !l.is_empty())
            .ok_or_else(|| ParseError::InvalidMessage("empty start line".into()))?;

        let headers = Self::parse_header_lines(lines)?;
        if headers.is_empty() {
            // Start line alone is not a message; CSeq at minimum is expected
            return Err(ParseError::InvalidMessage(
                "header block has no headers".into(),
            ));
        }

        let content_length = match headers.get("Content-Length") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .map_err(|_| ParseError::InvalidContentLength(v.to_string()))?,
            None => 0,
        };

        Ok((start_line.to_string(), headers, content_length))
    }

    /// Find the position of the header/body separator (`\r\n\r\n`)
    fn find_header_end(&self) -> Option<usize> {
        let needle = b"\r\n\r\n";
        self.buffer
            .windows(needle.len())
            .position(|window| window == needle)
    }

    /// Parse "RTSP/1.0 200 OK"
    fn parse_status_line(line: &str) -> Result<(String, StatusCode, String), ParseError> {
        let mut parts = line.splitn(3, ' ');

        let version = parts
            .next()
            .ok_or_else(|| ParseError::InvalidMessage(line.to_string()))?
            .to_string();

        let status = parts
            .next()
            .ok_or_else(|| ParseError::InvalidMessage(line.to_string()))?
            .parse::<u16>()
            .map_err(|_| ParseError::InvalidMessage(line.to_string()))?;

        let reason = parts.next().unwrap_or("").to_string();

        Ok((version, StatusCode(status), reason))
    }

    /// Parse "METHOD uri RTSP/1.0"
    fn parse_request_line(line: &str) -> Result<(Method, String), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            return Err(ParseError::InvalidMessage(line.to_string()));
        }

        let method =
            Method::from_str(parts[0]).ok_or_else(|| ParseError::InvalidMethod(parts[0].to_string()))?;
        let uri = parts[1].to_string();

        if !parts[2].starts_with("RTSP/") {
            return Err(ParseError::InvalidMessage(format!(
                "invalid protocol: {}",
                parts[2]
            )));
        }

        Ok((method, uri))
    }

    fn parse_header_lines<'a>(
        lines: impl Iterator<Item = &'a str>,
    ) -> Result<Headers, ParseError> {
        let mut headers = Headers::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }

            let colon_pos = line
                .find(':')
                .ok_or_else(|| ParseError::InvalidHeader(line.to_string()))?;

            let name = line[..colon_pos].trim().to_string();
            let value = line[colon_pos + 1..].trim().to_string();
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

impl Default for RtspCodec {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_one(codec: &mut RtspCodec) -> RtspMessage {
        codec.decode().unwrap().expect("complete message")
    }

    #[test]
    fn test_decode_request() {
        let mut codec = RtspCodec::new();
        codec.feed(b"OPTIONS * RTSP/1.0\r\nCSeq: 1\r\nRequire: org.wfa.wfd1.0\r\n\r\n");

        let RtspMessage::Request(request) = decode_one(&mut codec) else {
            panic!("expected request");
        };
        assert_eq!(request.method, Method::Options);
        assert_eq!(request.uri, "*");
        assert_eq!(request.cseq(), Some(1));
        assert_eq!(codec.buffered_len(), 0);
    }

    #[test]
    fn test_decode_response_with_body() {
        let mut codec = RtspCodec::new();
        let body = "wfd_content_protection: none\r\n";
        codec.feed(
            format!("RTSP/1.0 200 OK\r\nCSeq: 2\r\nContent-Length: {}\r\n\r\n{body}", body.len())
                .as_bytes(),
        );

        let RtspMessage::Response(response) = decode_one(&mut codec) else {
            panic!("expected response");
        };
        assert!(response.is_success());
        assert_eq!(response.cseq(), Some(2));
        assert_eq!(response.body, body.as_bytes());
    }

    #[test]
    fn test_incomplete_body_buffers_until_remainder_arrives() {
        let mut codec = RtspCodec::new();

        // Declares 200 bytes of body, delivers 50
        let partial = "X".repeat(50);
        codec.feed(
            format!("RTSP/1.0 200 OK\r\nCSeq: 3\r\nContent-Length: 200\r\n\r\n{partial}").as_bytes(),
        );
        assert!(codec.decode().unwrap().is_none());
        assert!(codec.buffered_len() > 0);

        // Remainder concatenates with the buffered prefix
        codec.feed("Y".repeat(150).as_bytes());
        let RtspMessage::Response(response) = decode_one(&mut codec) else {
            panic!("expected response");
        };
        assert_eq!(response.body.len(), 200);
        assert_eq!(&response.body[..50], "X".repeat(50).as_bytes());
    }

    #[test]
    fn test_truncated_headers_need_more_data() {
        let mut codec = RtspCodec::new();
        codec.feed(b"RTSP/1.0 200 OK\r\nCSeq: 4\r\n");
        assert!(codec.decode().unwrap().is_none());

        codec.feed(b"\r\n");
        assert!(matches!(decode_one(&mut codec), RtspMessage::Response(_)));
    }

    #[test]
    fn test_spliced_response_then_partial_request() {
        let mut codec = RtspCodec::new();

        // One read: a complete response followed by the front half of a request
        codec.feed(b"RTSP/1.0 200 OK\r\nCSeq: 5\r\n\r\nSETUP rtsp://10.0.0.2/wfd1.0 RTSP/1.0\r\nCSeq: 10\r\nTran");

        let RtspMessage::Response(response) = decode_one(&mut codec) else {
            panic!("expected response first");
        };
        assert_eq!(response.cseq(), Some(5));

        // Request is incomplete until the rest of the splice arrives
        assert!(codec.decode().unwrap().is_none());
        codec.feed(b"sport: RTP/AVP/UDP;unicast;client_port=6700\r\n\r\n");

        let RtspMessage::Request(request) = decode_one(&mut codec) else {
            panic!("expected request");
        };
        assert_eq!(request.method, Method::Setup);
        assert_eq!(request.cseq(), Some(10));
    }

    #[test]
    fn test_two_messages_in_one_read() {
        let mut codec = RtspCodec::new();
        codec.feed(b"RTSP/1.0 200 OK\r\nCSeq: 1\r\n\r\nPLAY rtsp://10.0.0.2/wfd1.0 RTSP/1.0\r\nCSeq: 2\r\n\r\n");

        assert!(matches!(decode_one(&mut codec), RtspMessage::Response(_)));
        assert!(matches!(decode_one(&mut codec), RtspMessage::Request(_)));
        assert!(codec.decode().unwrap().is_none());
    }

    #[test]
    fn test_unknown_method_rejected() {
        let mut codec = RtspCodec::new();
        codec.feed(b"RECORD rtsp://10.0.0.2/ RTSP/1.0\r\nCSeq: 1\r\n\r\n");

        assert!(matches!(codec.decode(), Err(ParseError::InvalidMethod(_))));
    }

    #[test]
    fn test_start_line_without_headers_rejected() {
        let mut codec = RtspCodec::new();
        codec.feed(b"OPTIONS * RTSP/1.0\r\n\r\n\r\n");

        assert!(matches!(codec.decode(), Err(ParseError::InvalidMessage(_))));
    }

    #[test]
    fn test_interleaved_frame_skipped() {
        let mut codec = RtspCodec::new();
        // $ frame: channel 0, 3 payload bytes, then a normal request
        codec.feed(b"$\x00\x00\x03abcPAUSE rtsp://10.0.0.2/wfd1.0 RTSP/1.0\r\nCSeq: 7\r\n\r\n");

        let RtspMessage::Request(request) = decode_one(&mut codec) else {
            panic!("expected request");
        };
        assert_eq!(request.method, Method::Pause);
    }

    #[test]
    fn test_valid_message_behind_malformed_one_survives() {
        let mut codec = RtspCodec::new();

        // One read: an unknown-method request spliced with a valid response
        codec.feed(b"RECORD rtsp://10.0.0.2/ RTSP/1.0\r\nCSeq: 8\r\n\r\nRTSP/1.0 200 OK\r\nCSeq: 9\r\n\r\n");

        assert!(matches!(codec.decode(), Err(ParseError::InvalidMethod(_))));
        let RtspMessage::Response(response) = decode_one(&mut codec) else {
            panic!("expected the buffered response to survive");
        };
        assert_eq!(response.cseq(), Some(9));
    }

    #[test]
    fn test_bad_content_length_rejected() {
        let mut codec = RtspCodec::new();
        codec.feed(b"RTSP/1.0 200 OK\r\nCSeq: 1\r\nContent-Length: banana\r\n\r\n");

        assert!(matches!(
            codec.decode(),
            Err(ParseError::InvalidContentLength(_))
        ));
    }
}
