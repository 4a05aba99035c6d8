// ============================================================================
// TRANSFORM SERVICE — threaded HTTP endpoint over TcpListener
// ============================================================================
//
// Routes (the same surface the web client speaks):
//   POST /api/transform   one edit, JSON in / JSON out
//   GET  /api/health      fixed liveness payload, no side effects
//
// Each connection gets its own thread and carries exactly one request
// (`Connection: close`). A request touches nothing but its own buffers, so
// concurrent clients are safe by construction. Engine rejections come back
// as `{"success":false,"error":…}` with HTTP 200; unreadable HTTP and
// malformed JSON bodies are a 400 with the same JSON shape, and a panic
// inside a handler is caught and returned as a well-formed 500 body rather
// than a dropped connection.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Instant;

use crate::engine;
use crate::error::EditError;
use crate::protocol::{WireRequest, WireResponse, encode_payload};

/// Bound on an accepted HTTP body. Image payloads are size-checked again
/// after base64 decode; this only caps the socket read.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

pub struct TransformServer {
    listener: TcpListener,
}

impl TransformServer {
    /// Bind the service socket. Port 0 picks an ephemeral port.
    pub fn bind(addr: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop: one thread per connection, until the process exits.
    pub fn run(self) -> std::io::Result<()> {
        log::info!(
            "transform service listening on {}",
            self.listener.local_addr()?
        );
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    thread::spawn(move || handle_connection(stream));
                }
                Err(e) => {
                    log::warn!("accept failed: {}", e);
                }
            }
        }
        Ok(())
    }
}

struct HttpRequest {
    method: String,
    path: String,
    body: Vec<u8>,
}

fn handle_connection(mut stream: TcpStream) {
    let parsed = {
        let mut reader = BufReader::new(&mut stream);
        read_request(&mut reader)
    };

    let request = match parsed {
        Ok(r) => r,
        Err(msg) => {
            let body = serde_json::to_vec(&WireResponse::failure(msg)).unwrap_or_default();
            let _ = write_response(&mut stream, 400, "Bad Request", &body);
            return;
        }
    };

    // A panic inside a handler must still yield a well-formed failure body.
    let (status, reason, body) =
        match panic::catch_unwind(AssertUnwindSafe(|| route(&request))) {
            Ok(resp) => resp,
            Err(_) => {
                log::error!("handler panicked on {} {}", request.method, request.path);
                let body = serde_json::to_vec(&WireResponse::failure("internal server error"))
                    .unwrap_or_default();
                (500, "Internal Server Error", body)
            }
        };
    let _ = write_response(&mut stream, status, reason, &body);
}

fn route(request: &HttpRequest) -> (u16, &'static str, Vec<u8>) {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/api/health") => {
            let body = serde_json::json!({
                "status": "ok",
                "service": "blurbrush",
                "version": env!("CARGO_PKG_VERSION"),
            });
            (200, "OK", serde_json::to_vec(&body).unwrap_or_default())
        }
        ("POST", "/api/transform") => {
            let (status, reason, response) = handle_transform(&request.body);
            (status, reason, serde_json::to_vec(&response).unwrap_or_default())
        }
        _ => {
            let body = serde_json::to_vec(&WireResponse::failure("endpoint not found"))
                .unwrap_or_default();
            (404, "Not Found", body)
        }
    }
}

/// A body that does not parse as a request is a 400; a request the engine
/// rejects is still a 200 whose JSON carries the failure.
fn handle_transform(body: &[u8]) -> (u16, &'static str, WireResponse) {
    let wire: WireRequest = match serde_json::from_slice(body) {
        Ok(w) => w,
        Err(e) => {
            return (
                400,
                "Bad Request",
                WireResponse::failure(format!("malformed request body: {}", e)),
            );
        }
    };
    match run_edit(&wire) {
        Ok(result) => (200, "OK", WireResponse::ok(result)),
        Err(e) => {
            log::warn!("transform rejected: {}", e);
            (200, "OK", WireResponse::failure(e.to_string()))
        }
    }
}

fn run_edit(wire: &WireRequest) -> Result<String, EditError> {
    let request = wire.to_request()?;
    let started = Instant::now();
    let output = engine::transform(
        &request.image,
        &request.mask,
        request.mode,
        request.kernel_size,
    )?;
    log::info!(
        "{} {}x{} k={} in {:.0}ms",
        request.mode.as_str(),
        request.image.width(),
        request.image.height(),
        request.kernel_size,
        started.elapsed().as_secs_f64() * 1000.0
    );
    let png = crate::io::encode_png(&output)?;
    Ok(encode_payload(&png))
}

/// Parse one HTTP/1.1 request: request line, headers (only Content-Length
/// matters here), then exactly Content-Length body bytes.
fn read_request<R: BufRead>(reader: &mut R) -> Result<HttpRequest, String> {
    let mut request_line = String::new();
    reader
        .read_line(&mut request_line)
        .map_err(|e| format!("read failed: {}", e))?;
    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| "empty request line".to_string())?
        .to_string();
    let path = parts
        .next()
        .ok_or_else(|| "request line without a path".to_string())?
        .to_string();

    let mut content_length: usize = 0;
    loop {
        let mut line = String::new();
        let n = reader
            .read_line(&mut line)
            .map_err(|e| format!("read failed: {}", e))?;
        if n == 0 || line.trim_end().is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':')
            && name.trim().eq_ignore_ascii_case("content-length")
        {
            content_length = value
                .trim()
                .parse()
                .map_err(|_| "invalid Content-Length".to_string())?;
        }
    }
    if content_length > MAX_BODY_BYTES {
        return Err(format!(
            "body of {} bytes exceeds the {} byte limit",
            content_length, MAX_BODY_BYTES
        ));
    }

    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader
            .read_exact(&mut body)
            .map_err(|e| format!("body read failed: {}", e))?;
    }
    Ok(HttpRequest { method, path, body })
}

fn write_response<W: Write>(
    stream: &mut W,
    status: u16,
    reason: &str,
    body: &[u8],
) -> std::io::Result<()> {
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason,
        body.len()
    );
    stream.write_all(head.as_bytes())?;
    stream.write_all(body)?;
    stream.flush()
}
