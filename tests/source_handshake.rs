//! End-to-end handshake tests against a live listener
//!
//! A scripted sink connects over real TCP and walks the source through the
//! numbered message exchange, asserting both the wire traffic and the
//! events published on the notification channel.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time::timeout;

use wfd_source::{ProsumerNotify, SourceConfig, SourceEvent, VideoFormat, WfdSource};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

const SINK_CAPS: &str = "\
wfd_video_formats: 38, 00, 02, 08, 00000080, 00000000, 00000000, 00, 0000, 0000\r\n\
wfd_audio_codecs: AAC 00000001 00\r\n\
wfd_client_rtp_ports: RTP/AVP/UDP;unicast 6700 0 mode=play\r\n\
wfd_content_protection: none\r\n";

/// Read one complete RTSP message (headers plus declared body) off the stream
async fn read_message(stream: &mut TcpStream, buf: &mut Vec<u8>) -> String {
    loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let header_end = pos + 4;
            let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
            let content_length = head
                .lines()
                .find_map(|line| line.strip_prefix("Content-Length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            let total = header_end + content_length;
            if buf.len() >= total {
                let message = String::from_utf8_lossy(&buf[..total]).to_string();
                buf.drain(..total);
                return message;
            }
        }
        let mut chunk = [0u8; 2048];
        let n = stream.read(&mut chunk).await.expect("read from source");
        assert!(n > 0, "source closed the connection unexpectedly");
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn cseq_of(message: &str) -> u32 {
    message
        .lines()
        .find_map(|line| line.strip_prefix("CSeq:"))
        .and_then(|value| value.trim().parse().ok())
        .expect("message without CSeq")
}

fn session_of(message: &str) -> String {
    message
        .lines()
        .find_map(|line| line.strip_prefix("Session:"))
        .map(|value| value.trim().split(';').next().unwrap_or("").to_string())
        .expect("message without Session")
}

async fn send(stream: &mut TcpStream, data: &str) {
    stream.write_all(data.as_bytes()).await.expect("write to source");
}

async fn ok_reply(stream: &mut TcpStream, cseq: u32, extra: &str, body: &str) {
    let mut message = format!("RTSP/1.0 200 OK\r\nCSeq: {cseq}\r\n{extra}");
    if body.is_empty() {
        message.push_str("\r\n");
    } else {
        message.push_str(&format!(
            "Content-Type: text/parameters\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        ));
    }
    send(stream, &message).await;
}

async fn next_event(events: &mut broadcast::Receiver<SourceEvent>) -> SourceEvent {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Drive the sink side of the exchange up to and including PLAY.
/// Returns the session ID the source assigned.
async fn run_handshake(stream: &mut TcpStream, buf: &mut Vec<u8>) -> String {
    // M1: source opens with OPTIONS
    let m1 = read_message(stream, buf).await;
    assert!(m1.starts_with("OPTIONS * RTSP/1.0"), "unexpected M1: {m1}");
    assert!(m1.contains("Require: org.wfa.wfd1.0"));
    ok_reply(
        stream,
        cseq_of(&m1),
        "Public: org.wfa.wfd1.0, GET_PARAMETER, SET_PARAMETER, SETUP, PLAY\r\n",
        "",
    )
    .await;

    // M3: capability query
    let m3 = read_message(stream, buf).await;
    assert!(m3.starts_with("GET_PARAMETER"), "unexpected M3: {m3}");
    assert!(m3.contains("wfd_video_formats"));
    assert!(m3.contains("wfd_client_rtp_ports"));
    ok_reply(stream, cseq_of(&m3), "", SINK_CAPS).await;

    // M4: negotiated formats pushed back
    let m4 = read_message(stream, buf).await;
    assert!(m4.starts_with("SET_PARAMETER"), "unexpected M4: {m4}");
    assert!(m4.contains("wfd_presentation_URL"));
    assert!(m4.contains("wfd_client_rtp_ports: RTP/AVP/UDP;unicast 6700 0 mode=play"));
    ok_reply(stream, cseq_of(&m4), "", "").await;

    // M5: SETUP trigger
    let m5 = read_message(stream, buf).await;
    assert!(m5.contains("wfd_trigger_method: SETUP"), "unexpected M5: {m5}");
    ok_reply(stream, cseq_of(&m5), "", "").await;

    // M6: sink sends SETUP, source answers with transport
    send(
        stream,
        "SETUP rtsp://127.0.0.1/wfd1.0/streamid=0 RTSP/1.0\r\nCSeq: 100\r\n\r\n",
    )
    .await;
    let m6 = read_message(stream, buf).await;
    assert!(m6.starts_with("RTSP/1.0 200 OK"), "unexpected M6: {m6}");
    assert!(m6.contains("Transport: RTP/AVP/UDP;unicast;client_port=6700;server_port=5004"));
    assert!(m6.contains(";timeout="));
    let session_id = session_of(&m6);

    // M7: sink sends PLAY
    send(
        stream,
        &format!(
            "PLAY rtsp://127.0.0.1/wfd1.0/streamid=0 RTSP/1.0\r\nCSeq: 101\r\nSession: {session_id}\r\n\r\n"
        ),
    )
    .await;
    let m7 = read_message(stream, buf).await;
    assert!(m7.starts_with("RTSP/1.0 200 OK"), "unexpected M7: {m7}");
    assert!(m7.contains("Range: npt=now-"));

    session_id
}

#[tokio::test]
async fn full_handshake_reaches_playing() {
    init_logging();
    let mut source = WfdSource::new(SourceConfig::default().control_port(0));
    let mut events = source.subscribe();
    let port = source.start().await.expect("start source");

    assert!(matches!(
        next_event(&mut events).await,
        SourceEvent::Started { port: p } if p == port
    ));

    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.expect("connect");
    let mut buf = Vec::new();

    assert!(matches!(
        next_event(&mut events).await,
        SourceEvent::PeerConnected { .. }
    ));

    run_handshake(&mut stream, &mut buf).await;

    match next_event(&mut events).await {
        SourceEvent::NegotiationComplete {
            video,
            sink_rtp_port,
            ..
        } => {
            assert_eq!(video, VideoFormat::V1920x1080F30);
            assert_eq!(sink_rtp_port, 6700);
        }
        other => panic!("expected negotiation event, got {other:?}"),
    }
    assert!(matches!(
        next_event(&mut events).await,
        SourceEvent::Prosumer(ProsumerNotify::Create)
    ));
    assert!(matches!(
        next_event(&mut events).await,
        SourceEvent::Prosumer(ProsumerNotify::Start)
    ));

    source.stop().await.expect("stop source");
}

#[tokio::test]
async fn handshake_survives_spliced_reads() {
    init_logging();
    let mut source = WfdSource::new(SourceConfig::default().control_port(0));
    let port = source.start().await.expect("start source");

    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.expect("connect");
    let mut buf = Vec::new();

    let m1 = read_message(&mut stream, &mut buf).await;
    let reply = format!(
        "RTSP/1.0 200 OK\r\nCSeq: {}\r\nPublic: org.wfa.wfd1.0, GET_PARAMETER, SET_PARAMETER\r\n\r\n",
        cseq_of(&m1)
    );

    // Deliver the M1 reply in two fragments split inside the header block
    let (head, tail) = reply.split_at(reply.len() / 2);
    send(&mut stream, head).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    send(&mut stream, tail).await;

    // The source must still produce M3 from the reassembled reply
    let m3 = read_message(&mut stream, &mut buf).await;
    assert!(m3.starts_with("GET_PARAMETER"), "unexpected M3: {m3}");

    source.stop().await.expect("stop source");
}

#[tokio::test]
async fn sink_teardown_destroys_session() {
    init_logging();
    let mut source = WfdSource::new(SourceConfig::default().control_port(0));
    let mut events = source.subscribe();
    let port = source.start().await.expect("start source");

    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.expect("connect");
    let mut buf = Vec::new();
    let session_id = run_handshake(&mut stream, &mut buf).await;

    send(
        &mut stream,
        &format!(
            "TEARDOWN rtsp://127.0.0.1/wfd1.0/streamid=0 RTSP/1.0\r\nCSeq: 102\r\nSession: {session_id}\r\n\r\n"
        ),
    )
    .await;
    let reply = read_message(&mut stream, &mut buf).await;
    assert!(reply.starts_with("RTSP/1.0 200 OK"));

    // The source closes the connection after acknowledging teardown
    let mut chunk = [0u8; 64];
    let n = timeout(Duration::from_secs(5), stream.read(&mut chunk))
        .await
        .expect("timed out waiting for close")
        .expect("read");
    assert_eq!(n, 0, "expected EOF after teardown");

    let mut saw_destroy = false;
    let mut saw_disconnect = false;
    while !(saw_destroy && saw_disconnect) {
        match next_event(&mut events).await {
            SourceEvent::Prosumer(ProsumerNotify::Destroy) => saw_destroy = true,
            SourceEvent::PeerDisconnected { .. } => saw_disconnect = true,
            _ => {}
        }
    }

    source.stop().await.expect("stop source");
}

#[tokio::test]
async fn keyframe_request_is_republished() {
    init_logging();
    let mut source = WfdSource::new(SourceConfig::default().control_port(0));
    let mut events = source.subscribe();
    let port = source.start().await.expect("start source");

    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.expect("connect");
    let mut buf = Vec::new();
    let session_id = run_handshake(&mut stream, &mut buf).await;

    let body = "wfd_idr_request\r\n";
    send(
        &mut stream,
        &format!(
            "SET_PARAMETER rtsp://127.0.0.1/wfd1.0/streamid=0 RTSP/1.0\r\n\
             CSeq: 102\r\nSession: {session_id}\r\n\
             Content-Type: text/parameters\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        ),
    )
    .await;
    let reply = read_message(&mut stream, &mut buf).await;
    assert!(reply.starts_with("RTSP/1.0 200 OK"));

    loop {
        match next_event(&mut events).await {
            SourceEvent::KeyframeRequested => break,
            SourceEvent::Error { code, message } => panic!("error {code:?}: {message}"),
            _ => {}
        }
    }

    source.stop().await.expect("stop source");
}
