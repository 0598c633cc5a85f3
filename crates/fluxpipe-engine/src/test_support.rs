//! Minimal in-process HTTP stub for exercising providers without network
//! access. Each queued response answers exactly one connection.

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::Value;

pub(crate) struct StubResponse {
    status: u16,
    body: String,
    delay: Duration,
}

impl StubResponse {
    pub(crate) fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SeenRequest {
    pub head: String,
    pub body: String,
}

pub(crate) struct StubListener(TcpListener);

pub(crate) struct StubServer {
    handle: JoinHandle<Vec<SeenRequest>>,
}

pub(crate) fn bind_stub() -> io::Result<(StubListener, String)> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let base = format!("http://{}", listener.local_addr()?);
    Ok((StubListener(listener), base))
}

impl StubListener {
    pub(crate) fn serve(self, responses: Vec<StubResponse>) -> StubServer {
        let listener = self.0;
        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for response in responses {
                let Ok((mut stream, _)) = listener.accept() else {
                    break;
                };
                if let Ok(request) = read_request(&mut stream) {
                    seen.push(request);
                }
                thread::sleep(response.delay);
                let _ = write_response(&mut stream, &response);
            }
            seen
        });
        StubServer { handle }
    }
}

impl StubServer {
    pub(crate) fn finish(self) -> Vec<SeenRequest> {
        self.handle.join().unwrap_or_default()
    }
}

fn read_request(stream: &mut TcpStream) -> io::Result<SeenRequest> {
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    let mut raw = Vec::new();
    let mut chunk = [0_u8; 4096];
    let head_end = loop {
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "closed"));
        }
        raw.extend_from_slice(&chunk[..read]);
        if let Some(pos) = raw.windows(4).position(|window| window == &b"\r\n\r\n"[..]) {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&raw[..head_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while raw.len() < head_end + content_length {
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..read]);
    }
    let body_end = raw.len().min(head_end + content_length);
    let body = String::from_utf8_lossy(&raw[head_end..body_end]).to_string();
    Ok(SeenRequest { head, body })
}

fn write_response(stream: &mut TcpStream, response: &StubResponse) -> io::Result<()> {
    let reason = match response.status {
        200 => "OK",
        201 => "Created",
        401 => "Unauthorized",
        422 => "Unprocessable Entity",
        _ => "Status",
    };
    let text = format!(
        "HTTP/1.1 {} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        response.body.len(),
        response.body
    );
    stream.write_all(text.as_bytes())?;
    stream.flush()
}
