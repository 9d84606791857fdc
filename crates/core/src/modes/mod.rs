//! Learning modes: the closed set of pedagogical strategies a chat can run
//! under, plus the prompt catalogue and the dispatcher that applies them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod dispatcher;
mod prompts;

pub use dispatcher::{ModeDispatcher, QueryMetadata, QueryResponse, StreamSummary};
pub use prompts::system_prompt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Socratic,
    Inventor,
    Explainer,
    #[default]
    Default,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Web,
    Mobile,
    Data,
    Hardware,
    AiMl,
    General,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModeError {
    #[error("unknown mode '{0}' (expected socratic, inventor, explainer or default)")]
    UnknownMode(String),
    #[error("unknown complexity level '{0}' (expected beginner, intermediate or advanced)")]
    UnknownComplexity(String),
    #[error("unknown project type '{0}' (expected web, mobile, data, hardware, ai_ml or general)")]
    UnknownProjectType(String),
}

/// User-facing summary of a mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ModeDescription {
    pub name: &'static str,
    pub description: &'static str,
    pub best_for: &'static str,
    pub approach: &'static str,
}

/// Everything that shapes the system prompt for one query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModeSelection {
    pub mode: Mode,
    pub complexity: Option<ComplexityLevel>,
    pub project_type: Option<ProjectType>,
    pub extra_context: Option<String>,
}

impl ModeSelection {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_complexity(mut self, level: ComplexityLevel) -> Self {
        self.complexity = Some(level);
        self
    }

    pub fn with_project_type(mut self, project_type: ProjectType) -> Self {
        self.project_type = Some(project_type);
        self
    }

    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        self.extra_context = Some(context.into());
        self
    }

    pub fn system_prompt(&self) -> String {
        system_prompt(
            self.mode,
            self.complexity,
            self.project_type,
            self.extra_context.as_deref(),
        )
    }
}

const SOCRATIC_SUGGESTIONS: &[&str] = &[
    "Reflect on the question and share your thoughts",
    "Try to answer the question step by step",
    "Ask for clarification if you're unsure",
    "Request a hint if you're stuck",
];

const INVENTOR_SUGGESTIONS: &[&str] = &[
    "Ask for a more detailed implementation plan",
    "Request specific code examples",
    "Explore alternative technologies",
    "Discuss scaling and deployment strategies",
    "Ask about potential challenges",
];

const EXPLAINER_SUGGESTIONS: &[&str] = &[
    "Ask for a simpler explanation",
    "Request more advanced details",
    "Ask for real-world examples",
    "Explore related concepts",
    "Request visual aids or diagrams",
];

const DEFAULT_SUGGESTIONS: &[&str] = &[
    "Ask for more details",
    "Try a different learning mode",
    "Request examples",
    "Explore related topics",
];

pub const MAX_SUGGESTIONS: usize = 3;

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Socratic, Mode::Inventor, Mode::Explainer, Mode::Default];

    /// Lenient lookup: anything unrecognised degrades to [`Mode::Default`].
    /// Use `str::parse` when the caller should reject unknown names instead.
    pub fn from_name(name: &str) -> Mode {
        name.parse().unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Socratic => "socratic",
            Mode::Inventor => "inventor",
            Mode::Explainer => "explainer",
            Mode::Default => "default",
        }
    }

    pub fn temperature(&self) -> f32 {
        match self {
            Mode::Socratic => 0.8,
            Mode::Inventor => 0.9,
            Mode::Explainer => 0.6,
            Mode::Default => 0.7,
        }
    }

    /// Follow-up prompts shown after a reply, in display order.
    pub fn suggestions(&self) -> Vec<String> {
        let all = match self {
            Mode::Socratic => SOCRATIC_SUGGESTIONS,
            Mode::Inventor => INVENTOR_SUGGESTIONS,
            Mode::Explainer => EXPLAINER_SUGGESTIONS,
            Mode::Default => DEFAULT_SUGGESTIONS,
        };
        all.iter()
            .take(MAX_SUGGESTIONS)
            .map(|s| s.to_string())
            .collect()
    }

    pub fn describe(&self) -> ModeDescription {
        match self {
            Mode::Socratic => ModeDescription {
                name: "Socratic Mode",
                description: "Learn through guided questions and discovery",
                best_for: "Developing critical thinking and deep understanding",
                approach: "Questions and self-discovery instead of direct answers",
            },
            Mode::Inventor => ModeDescription {
                name: "Inventor Mode",
                description: "Transform ideas into practical projects",
                best_for: "Building real-world applications and prototypes",
                approach: "Step-by-step project planning with specific technologies",
            },
            Mode::Explainer => ModeDescription {
                name: "Explainer Mode",
                description: "Clear explanations at multiple levels",
                best_for: "Understanding complex concepts thoroughly",
                approach: "Multi-level breakdowns with analogies and examples",
            },
            Mode::Default => ModeDescription {
                name: "Default Mode",
                description: "General-purpose AI assistance",
                best_for: "Quick answers and general help",
                approach: "Direct, helpful responses to your questions",
            },
        }
    }
}

impl ComplexityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplexityLevel::Beginner => "beginner",
            ComplexityLevel::Intermediate => "intermediate",
            ComplexityLevel::Advanced => "advanced",
        }
    }
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Web => "web",
            ProjectType::Mobile => "mobile",
            ProjectType::Data => "data",
            ProjectType::Hardware => "hardware",
            ProjectType::AiMl => "ai_ml",
            ProjectType::General => "general",
        }
    }
}

impl FromStr for Mode {
    type Err = ModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "socratic" => Ok(Mode::Socratic),
            "inventor" => Ok(Mode::Inventor),
            "explainer" => Ok(Mode::Explainer),
            "default" => Ok(Mode::Default),
            _ => Err(ModeError::UnknownMode(s.to_string())),
        }
    }
}

impl FromStr for ComplexityLevel {
    type Err = ModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(ComplexityLevel::Beginner),
            "intermediate" => Ok(ComplexityLevel::Intermediate),
            "advanced" => Ok(ComplexityLevel::Advanced),
            _ => Err(ModeError::UnknownComplexity(s.to_string())),
        }
    }
}

impl FromStr for ProjectType {
    type Err = ModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "web" => Ok(ProjectType::Web),
            "mobile" => Ok(ProjectType::Mobile),
            "data" => Ok(ProjectType::Data),
            "hardware" => Ok(ProjectType::Hardware),
            "ai_ml" | "ai-ml" | "aiml" => Ok(ProjectType::AiMl),
            "general" => Ok(ProjectType::General),
            _ => Err(ModeError::UnknownProjectType(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
