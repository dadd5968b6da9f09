use serde::{Deserialize, Deserializer, Serialize};

// Inbound body of POST /api/generate
#[derive(Deserialize, Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default, deserialize_with = "lenient_code")]
    pub language: Option<String>,
}

// Any non-string language value is treated as absent
fn lenient_code<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_string))
}

// Successful reply of POST /api/generate
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub content: String,
    pub remaining_requests: u32,
}

// Anthropic Messages API request format
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub role: &'static str,
    pub content: String,
}

impl CompletionRequest {
    // Single user turn carrying the composed prompt
    pub fn user(model: &str, max_tokens: u32, prompt: String) -> Self {
        Self {
            model: model.to_string(),
            max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        }
    }
}

// Anthropic Messages API response format (only what we read)
#[derive(Deserialize, Debug)]
pub struct CompletionResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Deserialize, Debug)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}
