use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::ConfigError;

pub const GITHUB_MODELS_BASE: &str = "https://models.inference.ai.azure.com";
pub const DEEPSEEK_BASE: &str = "https://api.deepseek.com";
pub const DEEPSEEK_MODEL: &str = "deepseek-chat";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    GitHubModels,
    DeepSeek,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::GitHubModels => write!(f, "GitHub Models"),
            BackendKind::DeepSeek => write!(f, "DeepSeek"),
        }
    }
}

/// The chat-completion service used for every analysis in a run.
#[derive(Clone, PartialEq)]
pub struct InferenceBackend {
    pub kind: BackendKind,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl std::fmt::Debug for InferenceBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceBackend")
            .field("kind", &self.kind)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

impl InferenceBackend {
    /// DeepSeek wins whenever its key is present; otherwise GitHub Models
    /// with the caller's token and model.
    pub fn resolve(github_token: &str, model: &str, deepseek_key: Option<&str>) -> Self {
        match deepseek_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Self {
                kind: BackendKind::DeepSeek,
                base_url: DEEPSEEK_BASE.to_string(),
                api_key: key.to_string(),
                model: DEEPSEEK_MODEL.to_string(),
            },
            None => Self {
                kind: BackendKind::GitHubModels,
                base_url: GITHUB_MODELS_BASE.to_string(),
                api_key: github_token.to_string(),
                model: model.to_string(),
            },
        }
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Raw, unvalidated settings as collected from flags and environment.
#[derive(Debug, Clone)]
pub struct RawSettings {
    pub github_token: Option<String>,
    pub source_url: Option<String>,
    pub source_headers: Option<String>,
    pub max_hotspots: usize,
    pub model: String,
    pub deepseek_api_key: Option<String>,
    pub output_dir: PathBuf,
    pub template: Option<PathBuf>,
    pub prompt_template: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub source_url: String,
    pub source_headers: BTreeMap<String, String>,
    pub max_hotspots: usize,
    pub backend: InferenceBackend,
    pub output_dir: PathBuf,
    pub template: Option<PathBuf>,
    pub prompt_template: Option<PathBuf>,
}

fn required(value: Option<String>, name: &'static str, flag: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing { name, flag })
}

pub fn parse_headers(raw: Option<&str>) -> Result<BTreeMap<String, String>, ConfigError> {
    let raw = match raw.map(str::trim) {
        Some(r) if !r.is_empty() => r,
        _ => return Ok(BTreeMap::new()),
    };
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| ConfigError::InvalidHeaders { reason: e.to_string() })?;
    let obj = value.as_object().ok_or_else(|| ConfigError::InvalidHeaders {
        reason: "expected a JSON object".to_string(),
    })?;

    let mut headers = BTreeMap::new();
    for (name, v) in obj {
        let v = match v {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            _ => {
                return Err(ConfigError::InvalidHeaders {
                    reason: format!("header {} has a non-scalar value", name),
                })
            }
        };
        headers.insert(name.clone(), v);
    }
    Ok(headers)
}

impl Settings {
    /// Validates everything up front so a bad setup fails before any request.
    pub fn from_raw(raw: RawSettings) -> Result<Self, ConfigError> {
        let github_token = required(raw.github_token, "GITHUB_TOKEN", "github-token")?;
        let source_url = required(raw.source_url, "WEIBO_API_URL", "source-url")?;

        match url::Url::parse(&source_url) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
            _ => {
                return Err(ConfigError::InvalidUrl {
                    name: "WEIBO_API_URL",
                    value: source_url,
                })
            }
        }

        if raw.max_hotspots == 0 {
            return Err(ConfigError::InvalidMaxCount);
        }

        let source_headers = parse_headers(raw.source_headers.as_deref())?;
        let backend = InferenceBackend::resolve(&github_token, &raw.model, raw.deepseek_api_key.as_deref());

        Ok(Self {
            source_url,
            source_headers,
            max_hotspots: raw.max_hotspots,
            backend,
            output_dir: raw.output_dir,
            template: raw.template,
            prompt_template: raw.prompt_template,
        })
    }
}
