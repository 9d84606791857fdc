use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system<S: Into<String>>(s: S) -> Self {
        Self {
            role: Role::System,
            content: s.into(),
        }
    }
    pub fn user<S: Into<String>>(s: S) -> Self {
        Self {
            role: Role::User,
            content: s.into(),
        }
    }
    pub fn assistant<S: Into<String>>(s: S) -> Self {
        Self {
            role: Role::Assistant,
            content: s.into(),
        }
    }
}

/// A single chat-completion call. Built once through the `with_*` methods and
/// then handed to a [`ModelClient`]; out-of-range sampling values are clamped.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    messages: Vec<Message>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
}

impl GenerationRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: DEFAULT_MAX_TOKENS,
            top_p: 1.0,
            stream: false,
        }
    }

    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens.max(1);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p.clamp(0.0, 1.0);
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
    pub fn model(&self) -> &str {
        &self.model
    }
    pub fn temperature(&self) -> f32 {
        self.temperature
    }
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
    pub fn top_p(&self) -> f32 {
        self.top_p
    }
    pub fn stream(&self) -> bool {
        self.stream
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationResult {
    pub text: String,
    pub tokens_used: u32,
    pub model: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Usage {
    pub tokens_used: u32,
}

/// One element of a streamed completion. A parsed chunk without text (role
/// announcements, usage-only trailers) still yields a fragment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamFragment {
    pub delta_text: Option<String>,
    pub usage: Option<Usage>,
    pub finish_reason: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// The provider kept answering 429 until the retry budget ran out.
    #[error("rate limited after {attempts} attempts: {detail}")]
    RateLimited { attempts: u32, detail: String },

    /// Non-success status, exhausted transport retries, or a body that does
    /// not look like a completion. `status` is `None` when no HTTP status was
    /// received.
    #[error("api error{}: {detail}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Api { status: Option<u16>, detail: String },

    #[error("transport: {reason}")]
    Transport { reason: String },

    /// A streamed `data:` line that is not JSON. Callers log and skip it.
    #[error("malformed chunk: {reason}")]
    MalformedChunk { line: String, reason: String },
}

impl ChatError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ChatError::RateLimited { .. } => Some(429),
            ChatError::Api { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ChatError::RateLimited { .. } | ChatError::Transport { .. })
    }
}

pub type FragmentStream<'a> =
    Pin<Box<dyn Stream<Item = Result<StreamFragment, ChatError>> + Send + 'a>>;

#[allow(async_fn_in_trait)]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, req: &GenerationRequest) -> Result<GenerationResult, ChatError>;

    /// Opens the stream. Status errors surface here; transport failures after
    /// the first byte surface as the stream's last item.
    async fn generate_streaming<'a>(
        &'a self,
        req: GenerationRequest,
    ) -> Result<FragmentStream<'a>, ChatError>;

    /// Cheap liveness probe. Never fails; any error reads as unhealthy.
    async fn health_check(&self) -> bool;
}

/// Rough token estimate: one token per four characters. Not a tokenizer.
pub fn count_tokens_approx(text: &str) -> usize {
    text.chars().count() / 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_estimate_floors_by_four() {
        assert_eq!(count_tokens_approx("abcd"), 1);
        assert_eq!(count_tokens_approx(""), 0);
        assert_eq!(count_tokens_approx("abcdefg"), 1);
        assert_eq!(count_tokens_approx("héllo wörld!"), 3);
    }

    #[test]
    fn request_clamps_sampling_values() {
        let req = GenerationRequest::new(vec![Message::user("x")])
            .with_temperature(3.5)
            .with_top_p(-1.0)
            .with_max_tokens(0);
        assert_eq!(req.temperature(), 2.0);
        assert_eq!(req.top_p(), 0.0);
        assert_eq!(req.max_tokens(), 1);
        assert!(!req.stream());
        assert_eq!(req.model(), DEFAULT_MODEL);
    }

    #[test]
    fn role_serializes_lowercase() {
        let m = Message::assistant("ok");
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["role"], "assistant");
        let back: Message = serde_json::from_value(v).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn error_display_and_status() {
        let e = ChatError::Api {
            status: Some(401),
            detail: "Invalid API Key".into(),
        };
        assert_eq!(e.to_string(), "api error (401): Invalid API Key");
        assert_eq!(e.status(), Some(401));
        assert!(!e.is_retryable());

        let e = ChatError::Api {
            status: None,
            detail: "connection refused".into(),
        };
        assert_eq!(e.to_string(), "api error: connection refused");

        let e = ChatError::RateLimited {
            attempts: 3,
            detail: "slow down".into(),
        };
        assert_eq!(e.status(), Some(429));
        assert!(e.is_retryable());
    }
}
