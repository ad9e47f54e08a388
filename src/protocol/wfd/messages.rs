//! Builders for the numbered WFD handshake messages
//!
//! Names follow the WFD specification: M1/M2 are the OPTIONS exchange, M3/M4
//! the capability negotiation, M5 the SETUP trigger, M6/M7 the transport and
//! play replies, M8 teardown, M16 the keep-alive probe. The Source builds
//! M1, M3, M4, M5, M8 and M16 as requests and M2, M6, M7 as replies to
//! Sink-initiated requests.

use super::audio::AudioFormat;
use super::keys;
use super::params::Parameters;
use super::video::VideoFormatsInfo;
use crate::protocol::rtsp::{ResponseBuilder, RtspRequest, RtspResponse};
use crate::protocol::{Method, WFD_FEATURE};

/// Methods advertised in the M2 `Public` header
const PUBLIC_METHODS: &str =
    "org.wfa.wfd1.0, GET_PARAMETER, SET_PARAMETER, SETUP, PLAY, PAUSE, TEARDOWN";

/// Build the control URI for a peer
#[must_use]
pub fn control_uri(peer_ip: &str) -> String {
    format!("rtsp://{peer_ip}/wfd1.0/streamid=0")
}

/// M1: OPTIONS request opening the handshake
#[must_use]
pub fn m1_options(cseq: u32, user_agent: &str) -> RtspRequest {
    RtspRequest::builder(Method::Options, "*")
        .cseq(cseq)
        .user_agent(user_agent)
        .require(WFD_FEATURE)
        .build()
}

/// M2: reply to the Sink's OPTIONS request
#[must_use]
pub fn m2_options_reply(cseq: u32) -> RtspResponse {
    ResponseBuilder::ok()
        .cseq(cseq)
        .header("Public", PUBLIC_METHODS)
        .build()
}

/// M3: GET_PARAMETER capability query
#[must_use]
pub fn m3_get_parameter(cseq: u32, uri: &str, user_agent: &str) -> RtspRequest {
    let mut body = Parameters::new();
    body.query(keys::WFD_VIDEO_FORMATS);
    body.query(keys::WFD_AUDIO_CODECS);
    body.query(keys::WFD_CLIENT_RTP_PORTS);
    body.query(keys::WFD_CONTENT_PROTECTION);
    body.query(keys::WFD_COUPLED_SINK);
    body.query(keys::WFD_UIBC_CAPABILITY);
    body.query(keys::WFD_STANDBY_RESUME_CAPABILITY);

    RtspRequest::builder(Method::GetParameter, uri)
        .cseq(cseq)
        .user_agent(user_agent)
        .text_body(&body.encode())
        .build()
}

/// M4: SET_PARAMETER pushing the negotiated session format
#[must_use]
pub fn m4_set_parameter(
    cseq: u32,
    uri: &str,
    user_agent: &str,
    video: &VideoFormatsInfo,
    audio: AudioFormat,
    source_ip: &str,
    sink_rtp_port: u16,
) -> RtspRequest {
    let mut body = Parameters::new();
    body.set(keys::WFD_VIDEO_FORMATS, video.encode());
    body.set(keys::WFD_AUDIO_CODECS, audio.encode());
    body.set(
        keys::WFD_PRESENTATION_URL,
        format!("rtsp://{source_ip}/wfd1.0/streamid=0 none"),
    );
    body.set(
        keys::WFD_CLIENT_RTP_PORTS,
        format!("RTP/AVP/UDP;unicast {sink_rtp_port} 0 mode=play"),
    );

    RtspRequest::builder(Method::SetParameter, uri)
        .cseq(cseq)
        .user_agent(user_agent)
        .text_body(&body.encode())
        .build()
}

/// M5: SET_PARAMETER telling the Sink to initiate SETUP
#[must_use]
pub fn m5_trigger_setup(cseq: u32, uri: &str, user_agent: &str) -> RtspRequest {
    let mut body = Parameters::new();
    body.set(keys::WFD_TRIGGER_METHOD, "SETUP");

    RtspRequest::builder(Method::SetParameter, uri)
        .cseq(cseq)
        .user_agent(user_agent)
        .text_body(&body.encode())
        .build()
}

/// M6: reply to the Sink's SETUP request with transport and session
///
/// `Transport` is the trailing header; Sinks parse its position strictly.
#[must_use]
pub fn m6_setup_reply(
    cseq: u32,
    session_id: &str,
    timeout_secs: u64,
    sink_rtp_port: u16,
    source_rtp_port: u16,
) -> RtspResponse {
    ResponseBuilder::ok()
        .cseq(cseq)
        .session_with_timeout(session_id, timeout_secs)
        .transport(&format!(
            "RTP/AVP/UDP;unicast;client_port={sink_rtp_port};server_port={source_rtp_port}"
        ))
        .build()
}

/// M7: reply to the Sink's PLAY request
#[must_use]
pub fn m7_play_reply(cseq: u32, session_id: &str) -> RtspResponse {
    ResponseBuilder::ok()
        .cseq(cseq)
        .session(session_id)
        .range("npt=now-")
        .build()
}

/// M8: source-initiated TEARDOWN request
#[must_use]
pub fn m8_teardown(cseq: u32, uri: &str, user_agent: &str, session_id: &str) -> RtspRequest {
    RtspRequest::builder(Method::Teardown, uri)
        .cseq(cseq)
        .user_agent(user_agent)
        .session(session_id)
        .build()
}

/// M16: GET_PARAMETER keep-alive probe (empty body)
#[must_use]
pub fn m16_keepalive(cseq: u32, uri: &str, user_agent: &str, session_id: &str) -> RtspRequest {
    RtspRequest::builder(Method::GetParameter, uri)
        .cseq(cseq)
        .user_agent(user_agent)
        .session(session_id)
        .build()
}

/// Generic 200 OK reply carrying the session header
#[must_use]
pub fn generic_ok(cseq: u32, session_id: &str) -> RtspResponse {
    ResponseBuilder::ok().cseq(cseq).session(session_id).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wfd::video::VideoFormat;

    #[test]
    fn test_m1_requires_wfd_feature() {
        let m1 = m1_options(1, "wfd-source/0.1");
        let text = String::from_utf8_lossy(&m1.encode()).to_string();

        assert!(text.starts_with("OPTIONS * RTSP/1.0\r\n"));
        assert!(text.contains("Require: org.wfa.wfd1.0\r\n"));
    }

    #[test]
    fn test_m2_advertises_wfd_methods() {
        let m2 = m2_options_reply(1);
        let public = m2.headers.get("Public").unwrap();

        assert!(public.contains("org.wfa.wfd1.0"));
        assert!(public.contains("SET_PARAMETER"));
        assert!(public.contains("GET_PARAMETER"));
    }

    #[test]
    fn test_m3_queries_all_capability_keys() {
        let m3 = m3_get_parameter(2, "rtsp://10.0.0.2/wfd1.0/streamid=0", "wfd-source/0.1");
        let body = String::from_utf8_lossy(&m3.body).to_string();

        for key in [
            keys::WFD_VIDEO_FORMATS,
            keys::WFD_AUDIO_CODECS,
            keys::WFD_CLIENT_RTP_PORTS,
            keys::WFD_CONTENT_PROTECTION,
            keys::WFD_COUPLED_SINK,
            keys::WFD_UIBC_CAPABILITY,
            keys::WFD_STANDBY_RESUME_CAPABILITY,
        ] {
            assert!(body.contains(key), "missing {key}");
        }
    }

    #[test]
    fn test_m4_carries_negotiated_formats() {
        let video = VideoFormatsInfo::from_format(VideoFormat::V1920x1080F30);
        let m4 = m4_set_parameter(
            3,
            "rtsp://10.0.0.2/wfd1.0/streamid=0",
            "wfd-source/0.1",
            &video,
            AudioFormat::Aac48000B16C2,
            "10.0.0.1",
            6700,
        );
        let body = String::from_utf8_lossy(&m4.body).to_string();

        assert!(body.contains(&format!("wfd_video_formats: {}", video.encode())));
        assert!(body.contains("wfd_audio_codecs: AAC 00000001 00"));
        assert!(body.contains("wfd_presentation_URL: rtsp://10.0.0.1/wfd1.0/streamid=0 none"));
        assert!(body.contains("wfd_client_rtp_ports: RTP/AVP/UDP;unicast 6700 0 mode=play"));
    }

    #[test]
    fn test_m6_transport_ports() {
        let m6 = m6_setup_reply(4, "1A2B3C4D", 30, 6700, 5004);
        let text = String::from_utf8_lossy(&crate::protocol::rtsp::encode_response(&m6)).to_string();

        assert!(text.contains("Session: 1A2B3C4D;timeout=30\r\n"));
        assert!(text.ends_with(
            "Transport: RTP/AVP/UDP;unicast;client_port=6700;server_port=5004\r\n\r\n"
        ));
    }

    #[test]
    fn test_m7_range_now() {
        let m7 = m7_play_reply(5, "1A2B3C4D");
        assert_eq!(m7.headers.get("Range"), Some("npt=now-"));
        assert_eq!(m7.session(), Some("1A2B3C4D"));
    }

    #[test]
    fn test_m16_has_session_and_no_body() {
        let m16 = m16_keepalive(9, "rtsp://10.0.0.2/wfd1.0/streamid=0", "wfd-source/0.1", "1A2B3C4D");
        assert_eq!(m16.session(), Some("1A2B3C4D"));
        assert!(m16.body.is_empty());
    }
}
