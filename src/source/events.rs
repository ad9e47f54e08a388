//! Notification bridge toward the media pipeline
//!
//! The session never calls the media pipeline directly: protocol outcomes
//! are translated into events and fanned out on a broadcast channel. Sends
//! are fire-and-forget; a lagging or absent subscriber never affects the
//! control flow.

use std::net::SocketAddr;

use crate::protocol::wfd::audio::AudioFormat;
use crate::protocol::wfd::video::VideoFormat;

/// Lifecycle notifications for the downstream media producer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProsumerNotify {
    /// Create the media producer (formats are negotiated)
    Create,
    /// Start streaming
    Start,
    /// Pause streaming
    Pause,
    /// Resume after a pause
    Resume,
    /// Destroy the producer
    Destroy,
}

/// Error classes surfaced to the session-management layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Listener could not be created or the connection dropped
    ConnectionFailure,
    /// A protocol step failed (bad status, unsupported peer, bad payload)
    InteractionFailure,
    /// Keep-alive budget exhausted with no peer response
    PeerUnresponsive,
}

/// Events emitted by the source
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// Listener started
    Started {
        /// Actual bound control port
        port: u16,
    },

    /// Listener stopped
    Stopped,

    /// Sink connected to the control port
    PeerConnected {
        /// Peer address
        address: SocketAddr,
    },

    /// Sink connection closed
    PeerDisconnected {
        /// Peer address
        address: SocketAddr,
        /// Disconnect reason
        reason: String,
    },

    /// Media producer lifecycle notification
    Prosumer(ProsumerNotify),

    /// Capability exchange finished
    NegotiationComplete {
        /// Negotiated video format
        video: VideoFormat,
        /// Negotiated audio format
        audio: AudioFormat,
        /// RTP port the sink listens on
        sink_rtp_port: u16,
        /// Peer address
        peer: SocketAddr,
    },

    /// Sink asked for an IDR keyframe
    KeyframeRequested,

    /// Peer acknowledged our TEARDOWN; upstream should drop the connection
    TeardownRequested {
        /// MAC address of the peer, when known
        peer_mac: Option<String>,
    },

    /// Error occurred
    Error {
        /// Error class
        code: ErrorCode,
        /// Human-readable description
        message: String,
    },
}
