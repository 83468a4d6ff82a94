//! Minimal HTTP/1.1 server standing in for the platform REST API.
//!
//! Every request's path and JSON body is recorded. Responses are scripted per
//! path: each request pops the next `(status, body)` for its path, and the last
//! entry keeps being served once the script runs out. Unknown paths get 404.

use std::collections::{HashMap, VecDeque};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub body: serde_json::Value,
}

type Script = HashMap<String, VecDeque<(u32, String)>>;

pub struct MockPlatform {
    base: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockPlatform {
    /// Base URL ending in `/`, e.g. `http://127.0.0.1:40123/`.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests sent to `path` (without the leading `/`).
    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        let path = format!("/{path}");
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

/// Start the server. `routes` pairs a path (without the leading `/`) with
/// the responses to serve for it, in order.
pub fn start(routes: Vec<(&str, Vec<(u32, &str)>)>) -> MockPlatform {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let script: Script = routes
        .into_iter()
        .map(|(path, responses)| {
            let responses = responses
                .into_iter()
                .map(|(status, body)| (status, body.to_string()))
                .collect();
            (format!("/{path}"), responses)
        })
        .collect();
    let script = Arc::new(Mutex::new(script));
    let requests = Arc::new(Mutex::new(Vec::new()));

    let recorded = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let script = Arc::clone(&script);
            let recorded = Arc::clone(&recorded);
            thread::spawn(move || handle(stream, &script, &recorded));
        }
    });

    MockPlatform {
        base: format!("http://127.0.0.1:{}/", port),
        requests,
    }
}

fn handle(mut stream: TcpStream, script: &Mutex<Script>, recorded: &Mutex<Vec<Recorded>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));

    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    let header_end = loop {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => data.extend_from_slice(&buf[..n]),
        }
        if let Some(pos) = find(&data, b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let content_length = header(&head, "content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    if header(&head, "expect").is_some_and(|v| v.eq_ignore_ascii_case("100-continue")) {
        let _ = stream.write_all(b"HTTP/1.1 100 Continue\r\n\r\n");
    }
    while data.len() < header_end + content_length {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => data.extend_from_slice(&buf[..n]),
        }
    }
    let body_end = data.len().min(header_end + content_length);
    let body = serde_json::from_slice(&data[header_end..body_end]).unwrap_or(serde_json::Value::Null);
    recorded.lock().unwrap().push(Recorded {
        path: path.clone(),
        body,
    });

    let (status, body) = {
        let mut script = script.lock().unwrap();
        match script.get_mut(&path) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or((500, String::new())),
            Some(queue) => queue.front().cloned().unwrap_or((500, String::new())),
            None => (404, "no such route".to_string()),
        }
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason(status),
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn header<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().skip(1).find_map(|line| {
        let (k, v) = line.split_once(':')?;
        k.trim().eq_ignore_ascii_case(name).then(|| v.trim())
    })
}

fn reason(status: u32) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        429 => "Too Many Requests",
        503 => "Service Unavailable",
        _ => "Status",
    }
}
