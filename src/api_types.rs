use serde::{Deserialize, Serialize};

use crate::models::lenient_u64;

// Hot search source: { "data": { "realtime": [ ... ] } }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiHotSearch {
    #[serde(default)]
    pub data: Option<ApiHotSearchData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiHotSearchData {
    #[serde(default)]
    pub realtime: Option<Vec<ApiHotEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiHotEntry {
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub word: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub num: u64,
    #[serde(default)]
    pub label_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl ApiHotSearch {
    pub fn into_entries(self) -> Vec<ApiHotEntry> {
        self.data.and_then(|d| d.realtime).unwrap_or_default()
    }
}

// OpenAI-compatible chat completion

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}
