pub mod llm;
pub mod modes;
pub mod session;

pub use llm::{
    count_tokens_approx, ChatError, FragmentStream, GenerationRequest, GenerationResult, Message,
    ModelClient, Role, StreamFragment, Usage,
};
pub use modes::{ComplexityLevel, Mode, ModeDispatcher, ModeSelection, ProjectType};
