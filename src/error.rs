use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {name} (set --{flag} or the {name} environment variable)")]
    Missing { name: &'static str, flag: &'static str },

    #[error("{name} is not a valid http(s) URL: {value}")]
    InvalidUrl { name: &'static str, value: String },

    #[error("WEIBO_API_HEADERS must be a JSON object of string values: {reason}")]
    InvalidHeaders { reason: String },

    #[error("MAX_HOTSPOTS must be a positive integer")]
    InvalidMaxCount,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("hot search request to {url} failed: {source}")]
    Request {
        url: String,
        hint: Option<&'static str>,
        #[source]
        source: reqwest::Error,
    },

    #[error("hot search endpoint {url} returned HTTP {status}")]
    Status {
        url: String,
        status: u16,
        hint: Option<&'static str>,
    },

    #[error("could not decode hot search response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("hot search endpoint {url} returned no entries")]
    Empty { url: String },
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        match self {
            FetchError::Request { hint, .. } | FetchError::Status { hint, .. } => *hint,
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("inference request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("inference API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("inference API response is not a chat completion: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("inference API returned no completion")]
    EmptyCompletion,

    #[error("model output is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("model output lacks eventTimeline or productIdeas")]
    MissingSections,
}

impl AnalysisError {
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Request(_) => "request",
            AnalysisError::Api { .. } => "api",
            AnalysisError::Decode(_) => "decode",
            AnalysisError::EmptyCompletion => "empty_completion",
            AnalysisError::InvalidJson(_) => "invalid_json",
            AnalysisError::MissingSections => "missing_sections",
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("could not read report template {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
