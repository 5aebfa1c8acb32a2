//! Minimal HTTP/1.1 server for integration tests.
//!
//! Routes:
//! - `/status/<code>`: empty response with that status
//! - `/truncated`: advertises 100 bytes, sends 10, then closes
//! - `/stalled`: advertises 100 bytes, sends 4, then stalls for `STALL`
//! - `/echo`: 200 with the request body echoed back
//! - anything else: 200 with a `DEFAULT_BODY_LEN` byte body

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

pub const DEFAULT_BODY_LEN: usize = 64;

/// How long `/stalled` holds the connection open mid-body
pub const STALL: Duration = Duration::from_secs(3);

/// Start the server on an ephemeral port. Returns the base URL, e.g.
/// "http://127.0.0.1:12345/". The server runs until the process exits.
pub fn start() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            thread::spawn(move || handle(stream));
        }
    });
    format!("http://127.0.0.1:{}/", port)
}

/// A URL nothing listens on
pub fn unreachable() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/", port)
}

fn handle(mut stream: TcpStream) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));

    let Some((path, body)) = read_request(&mut stream) else {
        return;
    };

    let response: Vec<u8> = if let Some(code) = path.strip_prefix("/status/") {
        format!(
            "HTTP/1.1 {} Test\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            code
        )
        .into_bytes()
    } else if path == "/truncated" {
        let mut r =
            b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\n".to_vec();
        r.extend_from_slice(&[b'x'; 10]);
        r
    } else if path == "/stalled" {
        let _ = stream.write_all(
            b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\nxxxx",
        );
        let _ = stream.flush();
        thread::sleep(STALL);
        return;
    } else if path == "/echo" {
        let mut r = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        r.extend_from_slice(&body);
        r
    } else {
        let mut r = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            DEFAULT_BODY_LEN
        )
        .into_bytes();
        r.extend_from_slice(&[b'a'; DEFAULT_BODY_LEN]);
        r
    };

    let _ = stream.write_all(&response);
    let _ = stream.flush();
}

/// Read the request head and any Content-Length body; returns (path, body).
fn read_request(stream: &mut TcpStream) -> Option<(String, Vec<u8>)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let path = head.split_whitespace().nth(1)?.to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[head_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    Some((path, body))
}
