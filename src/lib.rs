//! # wfd-source
//!
//! A pure Rust implementation of the Wi-Fi Display (Miracast) Source-side
//! RTSP session negotiation.
//!
//! A Source is the device casting its screen; a Sink is the device rendering
//! it. This crate owns the RTSP control channel between the two: it runs the
//! Source's RTSP listener, drives the WFD handshake (messages M1 through M8),
//! keeps the peer alive with M16 GET_PARAMETER probes, and republishes every
//! protocol outcome (negotiated formats, RTP ports, teardown, errors) as
//! events for the surrounding media pipeline to consume. The RTP media stream
//! itself is out of scope; the pipeline is only ever notified, never driven
//! directly.
//!
//! ## Example
//!
//! ```rust,no_run
//! use wfd_source::{SourceConfig, SourceEvent, WfdSource};
//!
//! # async fn example() -> Result<(), wfd_source::WfdError> {
//! let mut source = WfdSource::new(SourceConfig::default());
//! let mut events = source.subscribe();
//!
//! source.start().await?;
//!
//! while let Ok(event) = events.recv().await {
//!     if let SourceEvent::NegotiationComplete { video, audio, .. } = event {
//!         println!("sink accepted {video:?} / {audio:?}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Wire**: `protocol::rtsp` - generic RTSP text codec, sans-IO
//! - **Messages**: `protocol::wfd` - WFD parameter bodies and M1-M16 builders
//! - **Session**: `source` - the Source state machine and its TCP server

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Error types
pub mod error;
/// Wire protocol: RTSP framing and WFD message definitions
pub mod protocol;
/// Source-side session machinery
pub mod source;

pub use error::WfdError;
pub use protocol::wfd::audio::AudioFormat;
pub use protocol::wfd::video::{VideoFormat, VideoFormatsInfo};
pub use source::config::SourceConfig;
pub use source::events::{ErrorCode, ProsumerNotify, SourceEvent};
pub use source::server::{SessionOperation, WfdSource};
pub use source::session::{WfdSessionState, WfdSourceSession};
