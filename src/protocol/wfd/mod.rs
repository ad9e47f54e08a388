//! WFD-specific message layer
//!
//! Parameter bodies (`text/parameters`), capability encodings, and the
//! builders for the numbered handshake messages M1 through M8 plus the M16
//! keep-alive.

pub mod audio;
pub mod messages;
pub mod params;
pub mod video;

/// WFD parameter keys, preserved verbatim as wire tokens
pub mod keys {
    /// Video capability bitfields
    pub const WFD_VIDEO_FORMATS: &str = "wfd_video_formats";
    /// Audio codec list
    pub const WFD_AUDIO_CODECS: &str = "wfd_audio_codecs";
    /// Sink RTP port advertisement
    pub const WFD_CLIENT_RTP_PORTS: &str = "wfd_client_rtp_ports";
    /// HDCP support
    pub const WFD_CONTENT_PROTECTION: &str = "wfd_content_protection";
    /// Coupled sink status
    pub const WFD_COUPLED_SINK: &str = "wfd_coupled_sink";
    /// User input back channel capability
    pub const WFD_UIBC_CAPABILITY: &str = "wfd_uibc_capability";
    /// Standby/resume support
    pub const WFD_STANDBY_RESUME_CAPABILITY: &str = "wfd_standby_resume_capability";
    /// Method the peer should initiate next
    pub const WFD_TRIGGER_METHOD: &str = "wfd_trigger_method";
    /// Keyframe request
    pub const WFD_IDR_REQUEST: &str = "wfd_idr_request";
    /// Stream URL pushed in M4
    pub const WFD_PRESENTATION_URL: &str = "wfd_presentation_URL";
}
