//! Sans-IO RTSP message layer
//!
//! Requests and responses share the `Headers` map; the codec parses both
//! directions incrementally from a byte buffer, which is what makes spliced
//! and partial TCP reads safe to feed in as they arrive.

pub mod codec;
pub mod headers;
pub mod request;
pub mod response;

pub use codec::{ParseError, RtspCodec, RtspMessage};
pub use headers::Headers;
pub use request::{RtspRequest, RtspRequestBuilder};
pub use response::{ResponseBuilder, RtspResponse, StatusCode, encode_response};
