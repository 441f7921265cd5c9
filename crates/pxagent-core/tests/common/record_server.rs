//! Minimal HTTP/1.1 server standing in for ProteomeCentral in integration
//! tests.
//!
//! Answers `GET /cgi/GetDataset?ID=<id>&outputMode=json` with the canned
//! record for `<id>`, and 404 for anything else. The `Accept` header of the
//! last request is kept so tests can check content negotiation.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

pub struct RecordServer {
    /// Endpoint template with `{}` where the dataset id goes.
    pub endpoint: String,
    pub last_accept: Arc<Mutex<Option<String>>>,
}

/// Starts a server in a background thread serving `records` (id, JSON body).
/// The server runs until the process exits.
pub fn start(records: &[(&str, &str)]) -> RecordServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let records: Arc<HashMap<String, String>> = Arc::new(
        records
            .iter()
            .map(|(id, body)| (id.to_string(), body.to_string()))
            .collect(),
    );
    let last_accept = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&last_accept);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let records = Arc::clone(&records);
            let seen = Arc::clone(&seen);
            thread::spawn(move || handle(stream, &records, &seen));
        }
    });
    RecordServer {
        endpoint: format!(
            "http://127.0.0.1:{}/cgi/GetDataset?ID={{}}&outputMode=json",
            port
        ),
        last_accept,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    records: &HashMap<String, String>,
    seen: &Mutex<Option<String>>,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, target, accept) = parse_request(request);
    if let Ok(mut slot) = seen.lock() {
        *slot = accept.map(str::to_string);
    }
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }
    let body = dataset_id(target).and_then(|id| records.get(id));
    let response = match body {
        Some(body) => format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        ),
        None => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n".to_string(),
    };
    let _ = stream.write_all(response.as_bytes());
}

/// `ID` query parameter of a `/cgi/GetDataset` request target.
fn dataset_id(target: &str) -> Option<&str> {
    let (path, query) = target.split_once('?')?;
    if path != "/cgi/GetDataset" {
        return None;
    }
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == "ID")
        .map(|(_, v)| v)
}

/// Returns (method, request target, Accept header value).
fn parse_request(request: &str) -> (&str, &str, Option<&str>) {
    let mut method = "";
    let mut target = "";
    let mut accept = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            let mut parts = line.split_whitespace();
            method = parts.next().unwrap_or("");
            target = parts.next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("accept") {
                accept = Some(value.trim());
            }
        }
    }
    (method, target, accept)
}
