//! Minimal hand-rolled HTTP surface for the MJPEG stream.
//!
//! Everything here is byte-exact framing: the `multipart/x-mixed-replace`
//! response preamble, one multipart part per frame, and the static viewer
//! page response. The payload is binary and length-delimited, so no
//! escaping is needed; correctness depends solely on `Content-Length`
//! matching the payload byte count.

/// HTML viewer page served for any non-stream request.
pub const VIEWER_PAGE: &str = "<!DOCTYPE html>\
<html>\
<head>\
<meta name=\"viewport\" content=\"width=device-width\">\
<title>Camstream</title>\
<style>\
body{margin:0;background:#000;display:flex;flex-direction:column;align-items:center;justify-content:center;height:100vh;font-family:Arial,sans-serif}\
h1{color:#fff;margin:10px;font-size:1.5em}\
img{max-width:95%;max-height:85vh;border:2px solid #333;box-shadow:0 4px 8px rgba(0,0,0,0.5)}\
.info{color:#888;margin-top:10px;font-size:0.9em}\
</style>\
</head>\
<body>\
<h1>Live Camera Stream</h1>\
<img src=\"/stream\" alt=\"Camera Stream\">\
<div class=\"info\">MJPEG over multipart HTTP</div>\
</body>\
</html>";

/// Response headers that upgrade a connection to an unbounded MJPEG
/// stream. Sent once, before the first part.
pub fn stream_preamble(boundary: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: multipart/x-mixed-replace; boundary={boundary}\r\n\
         Cache-Control: no-cache\r\n\
         Connection: close\r\n\
         \r\n"
    )
    .into_bytes()
}

/// Encode one frame as a single multipart part: boundary line, content
/// headers, payload, trailing CRLF.
pub fn encode_part(boundary: &str, payload: &[u8]) -> Vec<u8> {
    let header = format!(
        "--{boundary}\r\n\
         Content-Type: image/jpeg\r\n\
         Content-Length: {}\r\n\
         \r\n",
        payload.len()
    );

    let mut part = Vec::with_capacity(header.len() + payload.len() + 2);
    part.extend_from_slice(header.as_bytes());
    part.extend_from_slice(payload);
    part.extend_from_slice(b"\r\n");
    part
}

/// Complete HTTP response carrying the static viewer page.
pub fn viewer_page_response() -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/html\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        VIEWER_PAGE.len(),
        VIEWER_PAGE
    )
    .into_bytes()
}
