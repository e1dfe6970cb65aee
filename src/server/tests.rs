use super::*;
use crate::camera::mock::MockCamera;
use crate::camera::CameraDevice;
use crate::error::CameraError;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn test_config() -> CamstreamConfig {
    let mut config = CamstreamConfig::default();
    config.server.ip = "127.0.0.1".to_string();
    config.server.port = 0;
    config.stream.capture_backoff_ms = 1;
    config
}

async fn start_server(device: Box<dyn CameraDevice>) -> SocketAddr {
    let source = Arc::new(FrameSource::initialize(device).await.unwrap());
    let server = StreamServer::bind(&test_config(), source).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.serve());
    addr
}

/// Read from the stream until `marker` has been seen, returning all
/// bytes read so far.
async fn read_until(stream: &mut TcpStream, received: &mut Vec<u8>, marker: &[u8]) {
    let mut buf = [0u8; 512];
    while !received.windows(marker.len()).any(|w| w == marker) {
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed before marker was seen");
        received.extend_from_slice(&buf[..n]);
    }
}

#[tokio::test]
async fn test_stream_request_gets_multipart_response() {
    let addr = start_server(Box::new(MockCamera::test_pattern((64, 48)))).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /stream HTTP/1.1\r\nHost: cam\r\n\r\n")
        .await
        .unwrap();

    let mut received = Vec::new();
    read_until(&mut stream, &mut received, b"\r\n\r\n").await;

    let text = String::from_utf8_lossy(&received);
    let first_line = text.split("\r\n").next().unwrap();
    assert_eq!(first_line, "HTTP/1.1 200 OK");
    assert!(text.contains("Content-Type: multipart/x-mixed-replace; boundary=bf"));
    assert!(text.contains("Cache-Control: no-cache"));
    assert!(text.contains("Connection: close"));
}

#[tokio::test]
async fn test_root_request_gets_complete_page_then_close() {
    let addr = start_server(Box::new(MockCamera::test_pattern((64, 48)))).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: cam\r\n\r\n")
        .await
        .unwrap();

    // The handler closes the connection after one complete response.
    let mut received = Vec::new();
    stream.read_to_end(&mut received).await.unwrap();

    let text = String::from_utf8(received).unwrap();
    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("Content-Type: text/html\r\n"));
    assert!(text.contains("Connection: close\r\n"));

    let body = text.split("\r\n\r\n").nth(1).unwrap();
    assert_eq!(body, crate::http::VIEWER_PAGE);
    assert!(text.contains(&format!("Content-Length: {}\r\n", body.len())));
}

#[tokio::test]
async fn test_accept_loop_survives_connection_errors() {
    let addr = start_server(Box::new(MockCamera::test_pattern((64, 48)))).await;

    // Connections that vanish before sending anything must not take
    // the listener down.
    for _ in 0..5 {
        let stream = TcpStream::connect(addr).await.unwrap();
        drop(stream);
    }

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
    let mut received = Vec::new();
    stream.read_to_end(&mut received).await.unwrap();
    assert!(received.starts_with(b"HTTP/1.1 200 OK\r\n"));
}

#[tokio::test]
async fn test_end_to_end_one_part_after_empty_frames() {
    // Three empty captures, then an 8-byte JPEG stand-in repeatedly.
    let mut script: Vec<std::result::Result<Bytes, CameraError>> = vec![
        Ok(Bytes::new()),
        Ok(Bytes::new()),
        Ok(Bytes::new()),
    ];
    for _ in 0..20 {
        script.push(Ok(Bytes::from_static(b"\xFF\xD8\x01\x02\x03\x04\xFF\xD9")));
    }
    let addr = start_server(Box::new(MockCamera::scripted(script))).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /stream HTTP/1.1\r\nHost: cam\r\n\r\n")
        .await
        .unwrap();

    // Response preamble.
    let mut received = Vec::new();
    read_until(&mut stream, &mut received, b"\r\n\r\n").await;
    let preamble_end = received
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .unwrap()
        + 4;

    // First part: headers.
    let mut part = received.split_off(preamble_end);
    read_until(&mut stream, &mut part, b"\r\n\r\n").await;
    let header_end = part.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
    let header = String::from_utf8_lossy(&part[..header_end]).to_string();

    assert!(header.starts_with("--bf\r\n"));
    assert!(header.contains("Content-Type: image/jpeg\r\n"));
    assert!(header.contains("Content-Length: 8\r\n"));

    // First part: exactly the 8-byte payload plus the trailing CRLF.
    let mut payload = part.split_off(header_end);
    while payload.len() < 10 {
        let mut buf = [0u8; 512];
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0);
        payload.extend_from_slice(&buf[..n]);
    }
    assert_eq!(&payload[..8], b"\xFF\xD8\x01\x02\x03\x04\xFF\xD9");
    assert_eq!(&payload[8..10], b"\r\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_concurrent_streams_share_one_camera() {
    let camera = MockCamera::test_pattern((64, 48))
        .with_capture_delay(std::time::Duration::from_millis(1));
    let overlap = camera.overlap_flag();
    let addr = start_server(Box::new(camera)).await;

    let mut tasks = Vec::new();
    for _ in 0..2 {
        tasks.push(tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream
                .write_all(b"GET /stream HTTP/1.1\r\nHost: cam\r\n\r\n")
                .await
                .unwrap();

            // Read a few frames' worth of stream data.
            let mut received = Vec::new();
            let mut buf = [0u8; 2048];
            while received.len() < 8192 {
                let n = stream.read(&mut buf).await.unwrap();
                assert!(n > 0);
                received.extend_from_slice(&buf[..n]);
            }
            received
        }));
    }

    for task in tasks {
        let received = task.await.unwrap();
        // Every part boundary in the stream is intact.
        let text = String::from_utf8_lossy(&received);
        assert!(text.contains("--bf\r\nContent-Type: image/jpeg\r\n"));
    }

    assert!(
        !overlap.load(std::sync::atomic::Ordering::SeqCst),
        "camera observed overlapping capture calls"
    );
}
