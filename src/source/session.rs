//! Source-side WFD session state machine
//!
//! Drives one peer negotiation per accepted TCP connection, from M1 through
//! teardown, while staying receptive to Sink-initiated requests (SETUP,
//! PLAY, PAUSE, TEARDOWN, IDR) that interleave with the Source's own
//! outbound messages on the same stream.
//!
//! The machine is sans-IO: entry points consume bytes or timer ticks and
//! return the [`Action`]s the transport shell must apply. The shell holds
//! the session behind one lock per connection and calls in from the read
//! task, the keep-alive task, and the control path, so every entry point
//! runs with the whole session state exclusively borrowed.

use std::net::SocketAddr;

use tracing::{debug, info, warn};

use super::config::SourceConfig;
use super::events::{ErrorCode, ProsumerNotify, SourceEvent};
use crate::protocol::rtsp::{
    ResponseBuilder, RtspCodec, RtspMessage, RtspRequest, RtspResponse, StatusCode,
    encode_response,
};
use crate::protocol::wfd::audio::AudioFormat;
use crate::protocol::wfd::video::{VideoFormat, VideoFormatsInfo};
use crate::protocol::wfd::{keys, messages, params::Parameters};
use crate::protocol::{Method, WFD_FEATURE};

/// Progress of the WFD handshake
///
/// The state only advances on successful protocol steps; a failed step
/// aborts the negotiation instead of retrying in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WfdSessionState {
    /// Initial state, before the handshake begins
    M0,
    /// M1 OPTIONS sent, awaiting the Sink's reply
    M1,
    /// Sink's OPTIONS answered with M2
    M2,
    /// M3 capability query sent
    M3,
    /// M4 negotiated format sent
    M4,
    /// M5 SETUP trigger sent
    M5,
    /// Sink's SETUP received
    M6,
    /// M6 reply queued for transmission
    M6Sent,
    /// M6 reply acknowledged by transport
    M6Done,
    /// Awaiting the Sink's PLAY
    M7Wait,
    /// M7 reply queued for transmission
    M7Sent,
    /// M7 reply acknowledged by transport
    M7Done,
    /// Playing
    M7,
    /// Teardown acknowledged (terminal)
    M8,
}

/// Lifecycle flag for the downstream media pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProsumerState {
    /// Not yet created or created but idle
    Init,
    /// Told to start
    Start,
    /// Told to pause
    Pause,
    /// Told to stop
    Stop,
    /// Told to destroy
    Destroy,
}

/// Side effects the transport shell must apply, in order
#[derive(Debug)]
pub enum Action {
    /// Write these bytes to the peer
    Send(Vec<u8>),
    /// Publish an event on the notification bridge
    Notify(SourceEvent),
    /// Start the periodic M16 keep-alive timer
    ArmKeepAlive,
    /// Stop the keep-alive timer
    DisarmKeepAlive,
    /// Close the connection
    Close,
}

/// Errors from individual negotiation steps
///
/// Fatal to the current negotiation attempt, not to the process: the shell
/// translates them into an error notification and closes the connection.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Peer answered a handshake request with a non-success status
    #[error("{step} failed with status {status}")]
    BadStatus {
        /// Handshake step name
        step: &'static str,
        /// RTSP status code received
        status: u16,
    },

    /// Peer does not advertise a required capability
    #[error("peer missing required capability: {0}")]
    MissingCapability(String),

    /// Peer omitted a parameter the handshake cannot proceed without
    #[error("peer response missing required parameter: {0}")]
    MissingParameter(&'static str),
}

/// The Source-side WFD RTSP session
pub struct WfdSourceSession {
    config: SourceConfig,
    state: WfdSessionState,
    prosumer: ProsumerState,
    codec: RtspCodec,
    /// CSeq of the last request we sent; responses must match it
    cseq: u32,
    session_id: String,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
    /// Negotiated records, populated from the Sink's M3 response
    video: VideoFormatsInfo,
    audio: AudioFormat,
    sink_rtp_port: u16,
    keepalive_armed: bool,
    keepalive_budget: u32,
}

impl WfdSourceSession {
    /// Create a session for a freshly accepted connection
    #[must_use]
    pub fn new(config: SourceConfig, local_addr: SocketAddr, peer_addr: SocketAddr) -> Self {
        let keepalive_budget = config.max_keepalive_misses;
        Self {
            config,
            state: WfdSessionState::M0,
            prosumer: ProsumerState::Init,
            codec: RtspCodec::new(),
            cseq: 0,
            session_id: generate_session_id(),
            local_addr,
            peer_addr,
            video: VideoFormatsInfo::default(),
            audio: AudioFormat::default(),
            sink_rtp_port: 0,
            keepalive_armed: false,
            keepalive_budget,
        }
    }

    /// Current handshake state
    #[must_use]
    pub fn state(&self) -> WfdSessionState {
        self.state
    }

    /// RTSP session ID presented to the peer
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Negotiated video format
    #[must_use]
    pub fn video_format(&self) -> VideoFormat {
        self.video.format()
    }

    /// Negotiated audio format
    #[must_use]
    pub fn audio_format(&self) -> AudioFormat {
        self.audio
    }

    /// Connection accepted: open the handshake with M1
    #[must_use]
    pub fn on_connected(&mut self) -> Vec<Action> {
        debug!(peer = %self.peer_addr, "connection accepted, sending M1");
        let m1 = messages::m1_options(self.next_cseq(), &self.config.user_agent);
        self.state = WfdSessionState::M1;
        vec![Action::Send(m1.encode())]
    }

    /// Bytes arrived from the peer
    ///
    /// Partial messages stay buffered in the codec across calls, which is
    /// what makes spliced and coalesced TCP reads safe.
    #[must_use]
    pub fn on_data(&mut self, data: &[u8]) -> Vec<Action> {
        let mut actions = Vec::new();
        self.codec.feed(data);

        loop {
            match self.codec.decode() {
                Ok(Some(RtspMessage::Response(response))) => {
                    self.handle_response(&response, &mut actions);
                }
                Ok(Some(RtspMessage::Request(request))) => {
                    self.handle_request(&request, &mut actions);
                }
                Ok(None) => break,
                Err(error) => {
                    // The codec discards the malformed message; anything
                    // buffered behind it still decodes on the next pass
                    debug!(peer = %self.peer_addr, %error, "dropping malformed message");
                }
            }
            if actions.iter().any(|a| matches!(a, Action::Close)) {
                break;
            }
        }

        actions
    }

    /// Keep-alive timer fired
    ///
    /// Sends one M16 probe and burns one unit of budget. An exhausted budget
    /// means the peer answered none of the previous probes: report a
    /// liveness failure instead of probing again.
    #[must_use]
    pub fn on_keepalive_tick(&mut self) -> Vec<Action> {
        if !self.keepalive_armed {
            return Vec::new();
        }

        if self.keepalive_budget == 0 {
            warn!(peer = %self.peer_addr, "keep-alive budget exhausted, peer unresponsive");
            self.keepalive_armed = false;
            return vec![
                Action::Notify(SourceEvent::Error {
                    code: ErrorCode::PeerUnresponsive,
                    message: "sink stopped answering keep-alive probes".to_string(),
                }),
                Action::DisarmKeepAlive,
                Action::Close,
            ];
        }

        self.keepalive_budget -= 1;
        let m16 = messages::m16_keepalive(
            self.next_cseq(),
            &self.control_uri(),
            &self.config.user_agent,
            &self.session_id,
        );
        vec![Action::Send(m16.encode())]
    }

    /// Source-initiated teardown (M8), used on orderly shutdown
    #[must_use]
    pub fn begin_teardown(&mut self) -> Vec<Action> {
        if self.state == WfdSessionState::M8 {
            return Vec::new();
        }

        let m8 = messages::m8_teardown(
            self.next_cseq(),
            &self.control_uri(),
            &self.config.user_agent,
            &self.session_id,
        );
        self.state = WfdSessionState::M8;
        self.keepalive_armed = false;
        vec![Action::DisarmKeepAlive, Action::Send(m8.encode())]
    }

    // Response path

    fn handle_response(&mut self, response: &RtspResponse, actions: &mut Vec<Action>) {
        // Liveness: any response during the playing phase proves the peer is
        // still there, whatever it answers to.
        if self.in_playing_phase() {
            self.keepalive_budget = self.config.max_keepalive_misses;
        }

        if response.cseq() != Some(self.cseq) {
            debug!(
                got = ?response.cseq(),
                want = self.cseq,
                "dropping response with stale CSeq"
            );
            return;
        }

        let result = match self.state {
            WfdSessionState::M1 => self.handle_m1_response(response, actions),
            WfdSessionState::M3 => self.handle_m3_response(response, actions),
            WfdSessionState::M4 => self.handle_m4_response(response, actions),
            WfdSessionState::M5 => self.handle_m5_response(response),
            WfdSessionState::M7Wait => {
                self.handle_play_ack(response);
                Ok(())
            }
            WfdSessionState::M8 => {
                self.handle_m8_ack(response, actions);
                Ok(())
            }
            _ => {
                debug!(state = ?self.state, "ignoring response not expected in this state");
                Ok(())
            }
        };

        if let Err(error) = result {
            warn!(peer = %self.peer_addr, %error, "negotiation step failed, aborting");
            actions.push(Action::Notify(SourceEvent::Error {
                code: ErrorCode::InteractionFailure,
                message: error.to_string(),
            }));
            actions.push(Action::Close);
        }
    }

    /// M1 acknowledged: the peer must speak WFD and both parameter methods
    fn handle_m1_response(
        &mut self,
        response: &RtspResponse,
        actions: &mut Vec<Action>,
    ) -> Result<(), SessionError> {
        check_status("M1", response)?;

        let public = response.headers.public_tokens();
        for required in [WFD_FEATURE, "SET_PARAMETER", "GET_PARAMETER"] {
            if !public.contains(&required) {
                return Err(SessionError::MissingCapability(required.to_string()));
            }
        }

        self.send_m3(actions);
        Ok(())
    }

    /// M3 answered: lock in the negotiated formats and push M4
    fn handle_m3_response(
        &mut self,
        response: &RtspResponse,
        actions: &mut Vec<Action>,
    ) -> Result<(), SessionError> {
        check_status("M3", response)?;

        let params = Parameters::parse(&response.body_text());

        // Unparseable capability offers fall back to the policy defaults
        // rather than failing the session.
        self.video = match params.get(keys::WFD_VIDEO_FORMATS).map(VideoFormatsInfo::parse) {
            Some(Some(info)) => info,
            _ => {
                warn!("sink video formats missing or unreadable, using default");
                VideoFormatsInfo::default()
            }
        };
        self.audio = params
            .get(keys::WFD_AUDIO_CODECS)
            .map(AudioFormat::parse)
            .unwrap_or_default();

        // The RTP port has no sane default; without it M6 cannot be built.
        self.sink_rtp_port = params
            .get(keys::WFD_CLIENT_RTP_PORTS)
            .and_then(|v| v.split_whitespace().nth(1))
            .and_then(|p| p.parse().ok())
            .ok_or(SessionError::MissingParameter(keys::WFD_CLIENT_RTP_PORTS))?;

        match params.get(keys::WFD_CONTENT_PROTECTION) {
            Some("none") | None => {
                info!(peer = %self.peer_addr, "sink offers no content protection, streaming unprotected");
            }
            Some(scheme) => {
                info!(peer = %self.peer_addr, scheme, "content protection offered but not supported");
            }
        }

        actions.push(Action::Notify(SourceEvent::NegotiationComplete {
            video: self.video.format(),
            audio: self.audio,
            sink_rtp_port: self.sink_rtp_port,
            peer: self.peer_addr,
        }));

        let m4 = messages::m4_set_parameter(
            self.next_cseq(),
            &self.control_uri(),
            &self.config.user_agent,
            &self.video,
            self.audio,
            &self.local_addr.ip().to_string(),
            self.sink_rtp_port,
        );
        self.state = WfdSessionState::M4;
        actions.push(Action::Send(m4.encode()));
        Ok(())
    }

    /// M4 acknowledged: the producer can be created; trigger SETUP with M5
    fn handle_m4_response(
        &mut self,
        response: &RtspResponse,
        actions: &mut Vec<Action>,
    ) -> Result<(), SessionError> {
        check_status("M4", response)?;

        actions.push(Action::Notify(SourceEvent::Prosumer(ProsumerNotify::Create)));

        let m5 = messages::m5_trigger_setup(
            self.next_cseq(),
            &self.control_uri(),
            &self.config.user_agent,
        );
        self.state = WfdSessionState::M5;
        actions.push(Action::Send(m5.encode()));
        Ok(())
    }

    /// M5 acknowledged: nothing more to send, the Sink initiates SETUP next
    fn handle_m5_response(&mut self, response: &RtspResponse) -> Result<(), SessionError> {
        check_status("M5", response)
    }

    /// PLAY ack while we were the requester; failure re-opens the SETUP step
    fn handle_play_ack(&mut self, response: &RtspResponse) {
        if response.is_success() {
            self.state = WfdSessionState::M7;
        } else {
            debug!(status = response.status.as_u16(), "PLAY rejected, back to M6");
            self.state = WfdSessionState::M6;
        }
    }

    /// TEARDOWN ack: hand the cleanup decision upstream
    fn handle_m8_ack(&mut self, response: &RtspResponse, actions: &mut Vec<Action>) {
        if !response.is_success() {
            debug!(status = response.status.as_u16(), "teardown not acknowledged cleanly");
        }
        actions.push(Action::Notify(SourceEvent::TeardownRequested {
            peer_mac: self.config.peer_mac.clone(),
        }));
        actions.push(Action::Close);
    }

    // Request path (Sink-initiated)

    fn handle_request(&mut self, request: &RtspRequest, actions: &mut Vec<Action>) {
        let cseq = request.cseq().unwrap_or(0);

        match request.method {
            Method::Options => {
                let m2 = messages::m2_options_reply(cseq);
                actions.push(Action::Send(encode_response(&m2)));
                // M3 goes out once. A sink that both acks M1 and sends its
                // own OPTIONS must not get a second capability query, and a
                // late OPTIONS must not regress an established session.
                if self.state < WfdSessionState::M3 {
                    self.state = WfdSessionState::M2;
                    self.send_m3(actions);
                }
            }

            Method::Setup => self.handle_setup_request(cseq, actions),

            Method::Play => self.handle_play_request(cseq, actions),

            Method::Pause => {
                self.prosumer = ProsumerState::Pause;
                actions.push(Action::Notify(SourceEvent::Prosumer(ProsumerNotify::Pause)));
                actions.push(self.reply_ok(cseq));
            }

            Method::Teardown => {
                self.prosumer = ProsumerState::Destroy;
                self.keepalive_armed = false;
                self.state = WfdSessionState::M8;
                actions.push(Action::Notify(SourceEvent::Prosumer(ProsumerNotify::Destroy)));
                actions.push(Action::DisarmKeepAlive);
                actions.push(self.reply_ok(cseq));
                actions.push(Action::Close);
            }

            Method::SetParameter => self.handle_set_parameter_request(request, cseq, actions),

            Method::GetParameter => {
                // Lossless echo: whatever keys the peer asked about come
                // back verbatim.
                let body = Parameters::parse(&String::from_utf8_lossy(&request.body));
                let reply = if body.is_empty() {
                    messages::generic_ok(cseq, &self.session_id)
                } else {
                    ResponseBuilder::ok()
                        .cseq(cseq)
                        .session(&self.session_id)
                        .text_body(&body.encode())
                        .build()
                };
                actions.push(Action::Send(encode_response(&reply)));
            }
        }
    }

    /// SETUP: answer with the negotiated transport (M6)
    fn handle_setup_request(&mut self, cseq: u32, actions: &mut Vec<Action>) {
        if !matches!(self.state, WfdSessionState::M5 | WfdSessionState::M6) {
            debug!(state = ?self.state, "SETUP before trigger, rejecting");
            actions.push(reply_error(cseq, StatusCode::METHOD_NOT_VALID));
            return;
        }

        let m6 = messages::m6_setup_reply(
            cseq,
            &self.session_id,
            self.config.session_timeout.as_secs(),
            self.sink_rtp_port,
            self.config.rtp_port,
        );
        self.state = WfdSessionState::M7Wait;
        actions.push(Action::Send(encode_response(&m6)));
    }

    /// PLAY: notify the pipeline and answer with M7
    ///
    /// The Sink-initiated PLAY is the authoritative entry into the playing
    /// phase; the response-direction handler above only covers a peer that
    /// answers a PLAY we sent ourselves.
    fn handle_play_request(&mut self, cseq: u32, actions: &mut Vec<Action>) {
        if !matches!(self.state, WfdSessionState::M7Wait | WfdSessionState::M7) {
            debug!(state = ?self.state, "PLAY before SETUP, rejecting");
            actions.push(reply_error(cseq, StatusCode::METHOD_NOT_VALID));
            return;
        }

        if self.prosumer == ProsumerState::Pause {
            actions.push(Action::Notify(SourceEvent::Prosumer(ProsumerNotify::Resume)));
        } else {
            actions.push(Action::Notify(SourceEvent::Prosumer(ProsumerNotify::Start)));
            actions.push(Action::ArmKeepAlive);
            self.keepalive_armed = true;
        }
        self.prosumer = ProsumerState::Start;
        self.keepalive_budget = self.config.max_keepalive_misses;

        let m7 = messages::m7_play_reply(cseq, &self.session_id);
        self.state = WfdSessionState::M7;
        actions.push(Action::Send(encode_response(&m7)));
    }

    /// SET_PARAMETER from the Sink, notably the IDR keyframe request
    fn handle_set_parameter_request(
        &mut self,
        request: &RtspRequest,
        cseq: u32,
        actions: &mut Vec<Action>,
    ) {
        let body = Parameters::parse(&String::from_utf8_lossy(&request.body));

        if body.contains(keys::WFD_IDR_REQUEST) {
            if request.session() == Some(self.session_id.as_str()) {
                actions.push(Action::Notify(SourceEvent::KeyframeRequested));
                actions.push(self.reply_ok(cseq));
            } else {
                debug!(got = ?request.session(), "IDR request for unknown session");
                actions.push(reply_error(cseq, StatusCode::SESSION_NOT_FOUND));
            }
            return;
        }

        actions.push(self.reply_ok(cseq));
    }

    // Helpers

    fn send_m3(&mut self, actions: &mut Vec<Action>) {
        let m3 = messages::m3_get_parameter(
            self.next_cseq(),
            &self.control_uri(),
            &self.config.user_agent,
        );
        self.state = WfdSessionState::M3;
        actions.push(Action::Send(m3.encode()));
    }

    fn next_cseq(&mut self) -> u32 {
        self.cseq += 1;
        self.cseq
    }

    fn control_uri(&self) -> String {
        messages::control_uri(&self.peer_addr.ip().to_string())
    }

    fn in_playing_phase(&self) -> bool {
        matches!(
            self.state,
            WfdSessionState::M7 | WfdSessionState::M7Sent | WfdSessionState::M7Done
        )
    }

    fn reply_ok(&self, cseq: u32) -> Action {
        Action::Send(encode_response(&messages::generic_ok(cseq, &self.session_id)))
    }

}

fn reply_error(cseq: u32, status: StatusCode) -> Action {
    Action::Send(ResponseBuilder::error(status).cseq(cseq).encode())
}

fn check_status(step: &'static str, response: &RtspResponse) -> Result<(), SessionError> {
    if response.is_success() {
        Ok(())
    } else {
        Err(SessionError::BadStatus {
            step,
            status: response.status.as_u16(),
        })
    }
}

fn generate_session_id() -> String {
    use rand::Rng;
    let id: u64 = rand::thread_rng().r#gen();
    format!("{id:016X}")
}
