//! Minimal HTTP/1.1 server for exercising the client without network access.
//! Each accepted connection is answered with the next canned response and
//! then closed; once the list is used up the listener is dropped, so later
//! connects are refused.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use providers::groq::GroqConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Duration;

#[derive(Clone, Debug)]
pub struct Canned {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// Advertise more body than is sent, then hang up mid-response.
    pub truncate: bool,
    /// Advertise more body than is sent, then keep the socket open until the
    /// client goes away.
    pub stall: bool,
}

impl Canned {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::raw(status, &body.to_string()).header("Content-Type", "application/json")
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
            truncate: false,
            stall: false,
        }
    }

    pub fn completion(text: &str, tokens: u64) -> Self {
        Self::json(
            200,
            serde_json::json!({
                "id": "chatcmpl-test",
                "object": "chat.completion",
                "model": "llama-3.3-70b-versatile",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": text},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 5, "completion_tokens": tokens.saturating_sub(5), "total_tokens": tokens}
            }),
        )
    }

    pub fn sse(lines: &[&str]) -> Self {
        let mut body = String::new();
        for l in lines {
            body.push_str(l);
            body.push('\n');
        }
        Self::raw(200, &body).header("Content-Type", "text/event-stream")
    }

    pub fn rate_limited(retry_after: Option<&str>) -> Self {
        let c = Self::json(
            429,
            serde_json::json!({"error": {"message": "Rate limit reached", "type": "tokens"}}),
        );
        match retry_after {
            Some(v) => c.header("Retry-After", v),
            None => c,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn truncated(mut self) -> Self {
        self.truncate = true;
        self
    }

    pub fn stalled(mut self) -> Self {
        self.stall = true;
        self
    }
}

#[derive(Clone, Debug)]
pub struct CapturedRequest {
    pub head: String,
    pub body: String,
}

impl CapturedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

pub struct MockServer {
    pub base_url: String,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    hangups: Arc<AtomicUsize>,
}

impl MockServer {
    pub async fn start(responses: Vec<Canned>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let captured: Arc<Mutex<Vec<CapturedRequest>>> = Arc::default();
        let sink = captured.clone();
        let hangups: Arc<AtomicUsize> = Arc::default();
        let seen_hangup = hangups.clone();
        tokio::spawn(async move {
            for canned in responses {
                let Ok((mut sock, _)) = listener.accept().await else {
                    return;
                };
                let req = read_request(&mut sock).await;
                sink.lock().unwrap().push(req);
                write_response(&mut sock, &canned).await;
                if canned.stall && wait_for_hangup(&mut sock).await {
                    seen_hangup.fetch_add(1, Ordering::SeqCst);
                }
            }
        });
        Self {
            base_url: format!("http://{}/v1", addr),
            captured,
            hangups,
        }
    }

    /// Stalled connections the client has closed.
    pub fn hangups(&self) -> usize {
        self.hangups.load(Ordering::SeqCst)
    }

    pub fn hits(&self) -> usize {
        self.captured.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().unwrap().clone()
    }

    pub fn config(&self) -> GroqConfig {
        test_config(&self.base_url)
    }
}

pub fn test_config(base_url: &str) -> GroqConfig {
    let mut cfg = GroqConfig::new("gsk_test");
    cfg.base_url = base_url.to_string();
    cfg.max_retries = 3;
    cfg.backoff_base = Duration::from_millis(5);
    cfg.timeout = Duration::from_secs(5);
    cfg
}

/// A base URL nothing listens on.
pub async fn refused_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/v1", addr)
}

async fn read_request(sock: &mut TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];
    let head_end = loop {
        if let Some(p) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break p + 4;
        }
        let n = sock.read(&mut tmp).await.unwrap_or(0);
        if n == 0 {
            break buf.len();
        }
        buf.extend_from_slice(&tmp[..n]);
    };
    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let len = head
        .lines()
        .find_map(|l| {
            let (k, v) = l.split_once(':')?;
            if k.trim().eq_ignore_ascii_case("content-length") {
                v.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);
    while buf.len() < head_end + len {
        let n = sock.read(&mut tmp).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
    }
    let end = buf.len().min(head_end + len);
    CapturedRequest {
        head,
        body: String::from_utf8_lossy(&buf[head_end..end]).to_string(),
    }
}

async fn write_response(sock: &mut TcpStream, canned: &Canned) {
    let reason = match canned.status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    };
    let declared = if canned.truncate || canned.stall {
        canned.body.len() + 64
    } else {
        canned.body.len()
    };
    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        canned.status, reason, declared
    );
    for (k, v) in &canned.headers {
        head.push_str(&format!("{}: {}\r\n", k, v));
    }
    head.push_str("\r\n");
    let _ = sock.write_all(head.as_bytes()).await;
    let _ = sock.write_all(canned.body.as_bytes()).await;
    let _ = sock.flush().await;
    if !canned.stall {
        let _ = sock.shutdown().await;
    }
}

/// True once the peer closes the socket; false if it is still open after 10s.
async fn wait_for_hangup(sock: &mut TcpStream) -> bool {
    let mut tmp = [0u8; 1024];
    let closed = async {
        loop {
            match sock.read(&mut tmp).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(10), closed)
        .await
        .is_ok()
}
