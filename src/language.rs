// Reply language requested by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Fr,
    Pt,
    De,
}

impl Language {
    // Unknown or missing codes fall back to French
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("pt") => Language::Pt,
            Some("de") => Language::De,
            _ => Language::Fr,
        }
    }

    pub fn instruction(self) -> &'static str {
        match self {
            Language::Fr => "Réponds en français.",
            Language::Pt => "Responde em português.",
            Language::De => "Antworte auf Deutsch.",
        }
    }

    // Outbound prompt: instruction, one space, raw prompt
    pub fn compose(self, prompt: &str) -> String {
        format!("{} {}", self.instruction(), prompt)
    }
}
