use serde::Serialize;
use tracing::{debug, error, info};

use super::{ComplexityLevel, Mode, ModeSelection, ProjectType};
use crate::llm::{
    ChatError, FragmentStream, GenerationRequest, Message, ModelClient, Role, StreamFragment,
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryMetadata {
    pub tokens_used: u32,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity_level: Option<ComplexityLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_type: Option<ProjectType>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryResponse {
    pub response: String,
    pub mode: Mode,
    pub suggestions: Vec<String>,
    pub metadata: QueryMetadata,
}

/// Turns a mode selection plus conversation into provider calls.
#[derive(Clone, Debug)]
pub struct ModeDispatcher {
    model: String,
    max_tokens: u32,
}

impl Default for ModeDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

impl ModeDispatcher {
    pub fn new<S: Into<String>>(model: S) -> Self {
        Self {
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// System prompt, then the prior turns in order, then the new user turn.
    /// System entries in `history` are dropped so the request carries exactly
    /// one system message.
    pub fn build_request(
        &self,
        query: &str,
        selection: &ModeSelection,
        history: &[Message],
    ) -> GenerationRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(selection.system_prompt()));
        for m in history {
            if m.role == Role::System {
                debug!(target: "core::modes", "dropping system message from history");
                continue;
            }
            messages.push(m.clone());
        }
        messages.push(Message::user(query));

        GenerationRequest::new(messages)
            .with_model(self.model.clone())
            .with_temperature(selection.mode.temperature())
            .with_max_tokens(self.max_tokens)
    }

    pub async fn process_query<C: ModelClient>(
        &self,
        client: &C,
        query: &str,
        selection: &ModeSelection,
        history: &[Message],
    ) -> Result<QueryResponse, ChatError> {
        let req = self.build_request(query, selection, history);
        info!(
            target: "core::modes",
            "process query mode={} history={} temperature={}",
            selection.mode,
            history.len(),
            req.temperature()
        );
        let result = client.generate(&req).await.map_err(|e| {
            error!(target: "core::modes", "query failed in {} mode: {}", selection.mode, e);
            e
        })?;

        Ok(QueryResponse {
            response: result.text,
            mode: selection.mode,
            suggestions: selection.mode.suggestions(),
            metadata: QueryMetadata {
                tokens_used: result.tokens_used,
                model: result.model,
                complexity_level: selection.complexity,
                project_type: selection.project_type,
            },
        })
    }

    /// Streaming counterpart of [`process_query`](Self::process_query). Feed
    /// the fragments through a [`StreamSummary`] to get the closing response.
    pub async fn stream_query<'a, C: ModelClient>(
        &self,
        client: &'a C,
        query: &str,
        selection: &ModeSelection,
        history: &[Message],
    ) -> Result<FragmentStream<'a>, ChatError> {
        let req = self.build_request(query, selection, history).with_stream(true);
        info!(
            target: "core::modes",
            "stream query mode={} history={}",
            selection.mode,
            history.len()
        );
        client.generate_streaming(req).await
    }
}

/// Accumulates streamed fragments into the same shape a batch call returns.
#[derive(Clone, Debug)]
pub struct StreamSummary {
    selection: ModeSelection,
    model: String,
    text: String,
    tokens_used: u32,
    finish_reason: Option<String>,
}

impl StreamSummary {
    pub fn new<S: Into<String>>(selection: &ModeSelection, model: S) -> Self {
        Self {
            selection: selection.clone(),
            model: model.into(),
            text: String::new(),
            tokens_used: 0,
            finish_reason: None,
        }
    }

    pub fn absorb(&mut self, fragment: &StreamFragment) {
        if let Some(t) = &fragment.delta_text {
            self.text.push_str(t);
        }
        if let Some(u) = fragment.usage {
            self.tokens_used = u.tokens_used;
        }
        if let Some(fr) = &fragment.finish_reason {
            self.finish_reason = Some(fr.clone());
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens_used(&self) -> u32 {
        self.tokens_used
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.finish_reason.as_deref()
    }

    pub fn finish(self) -> QueryResponse {
        let mode = self.selection.mode;
        QueryResponse {
            response: self.text,
            mode,
            suggestions: mode.suggestions(),
            metadata: QueryMetadata {
                tokens_used: self.tokens_used,
                model: self.model,
                complexity_level: self.selection.complexity,
                project_type: self.selection.project_type,
            },
        }
    }
}
