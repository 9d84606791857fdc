use crate::groq::config::GroqConfig;
use crate::groq::sse::{self, LineBuffer, SseEvent};
use futures::StreamExt;
use reqwest::{header, Client, Response, StatusCode};
use serde_json::Value;
use std::ops::Deref;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, error, info, warn};
use tutor_core::llm::{
    self, ChatError, FragmentStream, GenerationRequest, GenerationResult, Message, ModelClient,
    StreamFragment,
};

/// Handle to the Groq chat-completions API.
///
/// Clones share one connection pool. [`close`](Self::close) releases it for
/// every clone; calls made afterwards fail with [`ChatError::Api`]. Dropping a
/// pending call aborts its HTTP request and any backoff sleep, so a cancelled
/// caller never triggers another attempt.
#[derive(Clone)]
pub struct GroqClient {
    transport: Arc<Transport>,
    cfg: GroqConfig,
}

struct Transport {
    http: Mutex<Option<Client>>,
}

/// Scoped client: the transport is closed when the guard goes out of scope,
/// whichever way the scope is left.
pub struct ClientGuard {
    client: GroqClient,
}

impl Deref for ClientGuard {
    type Target = GroqClient;

    fn deref(&self) -> &GroqClient {
        &self.client
    }
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.client.close();
    }
}

impl GroqClient {
    pub fn new(cfg: GroqConfig) -> anyhow::Result<Self> {
        cfg.validate()?;
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", cfg.api_key))?;
        auth.set_sensitive(true);
        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        let mut builder = Client::builder()
            .default_headers(headers)
            .use_rustls_tls()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(4)
            .connect_timeout(cfg.timeout);
        if let Some(p) = &cfg.proxy {
            builder = builder.proxy(reqwest::Proxy::all(p)?);
        }
        let http = builder.build()?;
        info!(target:"providers::groq","client ready base_url={} model={} max_retries={}", cfg.base_url, cfg.model, cfg.max_retries);
        Ok(Self {
            transport: Arc::new(Transport {
                http: Mutex::new(Some(http)),
            }),
            cfg,
        })
    }

    pub fn open(cfg: GroqConfig) -> anyhow::Result<ClientGuard> {
        Ok(ClientGuard {
            client: Self::new(cfg)?,
        })
    }

    pub fn config(&self) -> &GroqConfig {
        &self.cfg
    }

    /// Releases the connection pool. Safe to call any number of times.
    pub fn close(&self) {
        let mut slot = self
            .transport
            .http
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.take().is_some() {
            debug!(target:"providers::groq","transport closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.transport
            .http
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Approximate token count (four characters per token), not a tokenizer.
    pub fn count_tokens_approx(&self, text: &str) -> usize {
        llm::count_tokens_approx(text)
    }

    fn http(&self) -> Result<Client, ChatError> {
        self.transport
            .http
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| ChatError::Api {
                status: None,
                detail: "client is closed".to_string(),
            })
    }

    fn payload(&self, req: &GenerationRequest, stream: bool) -> Value {
        serde_json::json!({
            "model": req.model(),
            "messages": map_messages(req.messages()),
            "temperature": req.temperature(),
            "max_tokens": req.max_tokens(),
            "top_p": req.top_p(),
            "stream": stream,
        })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.cfg
            .backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    fn max_attempts(&self) -> u32 {
        self.cfg.max_retries.max(1)
    }

    async fn open_stream(&self, http: &Client, url: &str, body: &Value) -> Result<Response, ChatError> {
        let max_attempts = self.max_attempts();
        let mut attempt = 0u32;
        loop {
            let sent = match timeout(self.cfg.timeout, http.post(url).json(body).send()).await {
                Ok(r) => r.map_err(map_reqwest_err),
                Err(_) => Err(ChatError::Transport {
                    reason: format!("no response headers within {:?}", self.cfg.timeout),
                }),
            };
            match sent {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => {
                    let status = resp.status();
                    let detail = error_detail(status, &resp.text().await.unwrap_or_default());
                    error!(target:"providers::groq","stream non-200 status={} detail={}", status, detail);
                    return Err(ChatError::Api {
                        status: Some(status.as_u16()),
                        detail,
                    });
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_attempts {
                        error!(target:"providers::groq","stream open failed after {} attempts: {}", attempt, e);
                        return Err(exhausted(attempt, e));
                    }
                    let wait = self.backoff(attempt - 1);
                    warn!(target:"providers::groq","stream open attempt {} failed: {}; retrying in {:?}", attempt, e, wait);
                    sleep(wait).await;
                }
            }
        }
    }
}

#[allow(async_fn_in_trait)]
impl ModelClient for GroqClient {
    async fn generate(&self, req: &GenerationRequest) -> Result<GenerationResult, ChatError> {
        let http = self.http()?;
        let url = self.cfg.endpoint();
        let body = self.payload(req, false);
        let max_attempts = self.max_attempts();
        info!(target:"providers::groq","generate model={} messages={} url={}", req.model(), req.messages().len(), url);

        let mut attempt = 0u32;
        loop {
            let sent = http
                .post(&url)
                .timeout(self.cfg.timeout)
                .json(&body)
                .send()
                .await;
            attempt += 1;
            match sent {
                Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let wait = retry_after(resp.headers()).unwrap_or_else(|| self.backoff(attempt - 1));
                    if attempt >= max_attempts {
                        let detail = error_detail(
                            StatusCode::TOO_MANY_REQUESTS,
                            &resp.text().await.unwrap_or_default(),
                        );
                        error!(target:"providers::groq","rate limited after {} attempts: {}", attempt, detail);
                        return Err(ChatError::RateLimited {
                            attempts: attempt,
                            detail,
                        });
                    }
                    warn!(target:"providers::groq","rate limited (attempt {}/{}); retrying in {:?}", attempt, max_attempts, wait);
                    sleep(wait).await;
                }
                Ok(resp) if !resp.status().is_success() => {
                    let status = resp.status();
                    let detail = error_detail(status, &resp.text().await.unwrap_or_default());
                    error!(target:"providers::groq","api error status={} detail={}", status, detail);
                    return Err(ChatError::Api {
                        status: Some(status.as_u16()),
                        detail,
                    });
                }
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let v: Value = resp.json().await.map_err(|e| ChatError::Api {
                        status: Some(status),
                        detail: format!("unreadable response body: {}", e),
                    })?;
                    let result = parse_completion(&v, req.model())?;
                    debug!(target:"providers::groq","generate ok attempts={} tokens={}", attempt, result.tokens_used);
                    return Ok(result);
                }
                Err(e) => {
                    let e = map_reqwest_err(e);
                    if attempt >= max_attempts {
                        error!(target:"providers::groq","request failed after {} attempts: {}", attempt, e);
                        return Err(exhausted(attempt, e));
                    }
                    let wait = self.backoff(attempt - 1);
                    warn!(target:"providers::groq","request attempt {} failed: {}; retrying in {:?}", attempt, e, wait);
                    sleep(wait).await;
                }
            }
        }
    }

    async fn generate_streaming<'a>(
        &'a self,
        req: GenerationRequest,
    ) -> Result<FragmentStream<'a>, ChatError> {
        let http = self.http()?;
        let url = self.cfg.endpoint();
        info!(target:"providers::groq","start chat stream model={} url={}", req.model(), url);
        let body = self.payload(&req, true);
        let resp = self.open_stream(&http, &url, &body).await?;
        let idle = self.cfg.timeout;

        let s = async_stream::stream! {
            let mut bytes = resp.bytes_stream();
            let mut lines = LineBuffer::default();
            let mut delivered = 0usize;
            'outer: loop {
                let next = match timeout(idle, bytes.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        error!(target:"providers::groq","chat stream idle for {:?}", idle);
                        yield Err(ChatError::Transport { reason: format!("stream idle for {:?}", idle) });
                        break 'outer;
                    }
                };
                match next {
                    Some(Ok(chunk)) => {
                        lines.push(&chunk);
                        while let Some(line) = lines.next_line() {
                            match step(&line) {
                                Step::Emit(f) => { delivered += 1; yield Ok(f); }
                                Step::Skip => {}
                                Step::Stop => { debug!(target:"providers::groq","chat stream done fragments={}", delivered); break 'outer; }
                                Step::Fail(e) => { yield Err(e); break 'outer; }
                            }
                        }
                    }
                    Some(Err(e)) => {
                        error!(target:"providers::groq","chat stream read error after {} fragments: {}", delivered, e);
                        yield Err(map_reqwest_err(e));
                        break 'outer;
                    }
                    None => {
                        if let Some(line) = lines.take_rest() {
                            match step(&line) {
                                Step::Emit(f) => { delivered += 1; yield Ok(f); }
                                Step::Fail(e) => { yield Err(e); }
                                Step::Skip | Step::Stop => {}
                            }
                        }
                        debug!(target:"providers::groq","chat stream closed by peer fragments={}", delivered);
                        break 'outer;
                    }
                }
            }
        };
        Ok(Box::pin(s))
    }

    async fn health_check(&self) -> bool {
        let req = GenerationRequest::new(vec![Message::user("hi")])
            .with_model(self.cfg.model.clone())
            .with_max_tokens(5);
        match self.generate(&req).await {
            Ok(_) => true,
            Err(e) => {
                error!(target:"providers::groq","health check failed: {}", e);
                false
            }
        }
    }
}

enum Step {
    Emit(StreamFragment),
    Skip,
    Stop,
    Fail(ChatError),
}

fn step(line: &str) -> Step {
    match sse::parse_line(line) {
        Ok(Some(SseEvent::Fragment(f))) => Step::Emit(f),
        Ok(Some(SseEvent::Done)) => Step::Stop,
        Ok(None) => Step::Skip,
        Err(ChatError::MalformedChunk { line, reason }) => {
            warn!(target:"providers::groq","skipping malformed chunk {:?}: {}", line, reason);
            Step::Skip
        }
        Err(e) => {
            error!(target:"providers::groq","provider error in stream: {}", e);
            Step::Fail(e)
        }
    }
}

fn map_messages(msgs: &[Message]) -> Vec<Value> {
    msgs.iter()
        .map(|m| serde_json::json!({"role": m.role.as_str(), "content": m.content}))
        .collect()
}

fn map_reqwest_err(e: reqwest::Error) -> ChatError {
    let reason = if e.is_timeout() {
        format!("timeout: {}", e)
    } else if e.is_connect() {
        format!("connect: {}", e)
    } else {
        e.to_string()
    };
    ChatError::Transport { reason }
}

fn exhausted(attempts: u32, last: ChatError) -> ChatError {
    let reason = match last {
        ChatError::Transport { reason } => reason,
        other => other.to_string(),
    };
    ChatError::Api {
        status: None,
        detail: format!("request failed after {} attempts: {}", attempts, reason),
    }
}

/// Seconds from a `Retry-After` header. HTTP-date values are not supported
/// and fall back to exponential backoff.
fn retry_after(headers: &header::HeaderMap) -> Option<Duration> {
    let raw = headers.get(header::RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
}

/// Human-readable message from an error body: `error.message` when the body
/// is the usual envelope, otherwise the JSON or raw text as received.
fn error_detail(status: StatusCode, body: &str) -> String {
    let detail = match serde_json::from_str::<Value>(body) {
        Ok(v) => match v.get("error") {
            Some(Value::String(s)) => s.clone(),
            Some(err) => err
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| v.to_string()),
            None => v.to_string(),
        },
        Err(_) => body.trim().to_string(),
    };
    if detail.is_empty() {
        status.to_string()
    } else {
        detail
    }
}

fn parse_completion(v: &Value, requested_model: &str) -> Result<GenerationResult, ChatError> {
    let choice = v["choices"]
        .as_array()
        .and_then(|c| c.first())
        .ok_or_else(|| ChatError::Api {
            status: Some(200),
            detail: "response has no choices".to_string(),
        })?;
    let text = choice["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string();
    let tokens_used = v["usage"]["total_tokens"]
        .as_u64()
        .map(|t| u32::try_from(t).unwrap_or(u32::MAX))
        .unwrap_or(0);
    let model = v["model"].as_str().unwrap_or(requested_model).to_string();
    Ok(GenerationResult {
        text,
        tokens_used,
        model,
    })
}
