use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub context_window: u32,
    pub description: &'static str,
}

const MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "llama-3.3-70b-versatile",
        name: "LLaMA 3.3 70B Versatile",
        context_window: 32_768,
        description: "Fast, balanced model for general use",
    },
    ModelInfo {
        id: "llama3-70b-8192",
        name: "LLaMA 3 70B",
        context_window: 8_192,
        description: "High reasoning capability",
    },
    ModelInfo {
        id: "llama3-8b-8192",
        name: "LLaMA 3 8B",
        context_window: 8_192,
        description: "Fast responses, good for quick tasks",
    },
    ModelInfo {
        id: "gemma2-9b-it",
        name: "Gemma 2 9B",
        context_window: 8_192,
        description: "Efficient and capable",
    },
];

/// Models known to work with the default endpoint. Not fetched from the API.
pub fn available_models() -> &'static [ModelInfo] {
    MODELS
}

pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::llm::DEFAULT_MODEL;

    #[test]
    fn default_model_is_listed() {
        let m = find_model(DEFAULT_MODEL).unwrap();
        assert_eq!(m.context_window, 32_768);
        assert!(find_model("gpt-5").is_none());
        assert_eq!(available_models().len(), 4);
    }
}
