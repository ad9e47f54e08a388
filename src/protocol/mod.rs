//! Wire protocol for Wi-Fi Display session control
//!
//! RTSP 1.0 over TCP with the WFD extensions layered on top. The `rtsp`
//! module is deliberately sans-IO so the session machine can be tested
//! without sockets.

pub mod rtsp;
pub mod wfd;

/// RTSP methods used in Wi-Fi Display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Initiate session options negotiation (M1/M2)
    Options,
    /// Query peer parameters (M3, M16 keep-alive)
    GetParameter,
    /// Push parameters or trigger a method on the peer (M4, M5)
    SetParameter,
    /// Set up transport and session (M6)
    Setup,
    /// Start the media stream (M7)
    Play,
    /// Pause the media stream
    Pause,
    /// Tear down the session (M8)
    Teardown,
}

impl Method {
    /// Convert to RTSP method string
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Options => "OPTIONS",
            Method::GetParameter => "GET_PARAMETER",
            Method::SetParameter => "SET_PARAMETER",
            Method::Setup => "SETUP",
            Method::Play => "PLAY",
            Method::Pause => "PAUSE",
            Method::Teardown => "TEARDOWN",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OPTIONS" => Some(Method::Options),
            "GET_PARAMETER" => Some(Method::GetParameter),
            "SET_PARAMETER" => Some(Method::SetParameter),
            "SETUP" => Some(Method::Setup),
            "PLAY" => Some(Method::Play),
            "PAUSE" => Some(Method::Pause),
            "TEARDOWN" => Some(Method::Teardown),
            _ => None,
        }
    }
}

/// RTSP protocol version used on the wire
pub const RTSP_VERSION: &str = "RTSP/1.0";

/// WFD capability token carried in `Require` and `Public` headers
pub const WFD_FEATURE: &str = "org.wfa.wfd1.0";
