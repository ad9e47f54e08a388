use std::io;
use thiserror::Error;

use crate::protocol::rtsp::ParseError;
use crate::source::session::SessionError;

/// Errors that can occur during Wi-Fi Display source operations
#[derive(Debug, Error)]
pub enum WfdError {
    /// RTSP message could not be parsed
    #[error("RTSP parse error: {0}")]
    Parse(#[from] ParseError),

    /// A negotiation step failed
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// The source is already running
    #[error("source already running")]
    AlreadyRunning,

    /// The control-port listener could not be created
    #[error("failed to start RTSP listener on port {port}: {source}")]
    ListenFailed {
        /// Requested control port
        port: u16,
        /// Underlying bind/listen failure
        #[source]
        source: io::Error,
    },

    /// IO error on an established connection
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
