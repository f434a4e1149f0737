use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info, warn};

use crate::api_types::{ApiHotEntry, ApiHotSearch};
use crate::error::FetchError;
use crate::models::HotTopic;

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

const HINT_UNREACHABLE: &str = "unable to reach the hot search host; check the network or WEIBO_API_URL";
const HINT_TIMEOUT: &str = "the hot search endpoint did not answer within 30s";
const HINT_BLOCKED: &str = "blocked by anti-scraping; configure a browser User-Agent or Cookie in WEIBO_API_HEADERS";
const HINT_NOT_FOUND: &str = "endpoint not found; check WEIBO_API_URL";
const HINT_UPSTREAM: &str = "hot search service is unavailable upstream";

fn build_headers(extra: &BTreeMap<String, String>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

    // Caller headers win, including User-Agent
    for (name, value) in extra {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(n), Ok(v)) => {
                headers.insert(n, v);
            }
            _ => warn!("Skipping invalid request header - name={}", name),
        }
    }
    headers
}

fn status_hint(status: StatusCode) -> Option<&'static str> {
    match status {
        StatusCode::FORBIDDEN => Some(HINT_BLOCKED),
        StatusCode::NOT_FOUND => Some(HINT_NOT_FOUND),
        s if s.is_server_error() => Some(HINT_UPSTREAM),
        _ => None,
    }
}

fn request_hint(err: &reqwest::Error) -> Option<&'static str> {
    if err.is_timeout() {
        Some(HINT_TIMEOUT)
    } else if err.is_connect() {
        Some(HINT_UNREACHABLE)
    } else {
        None
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

fn topic_from_entry(rank: u32, entry: ApiHotEntry) -> HotTopic {
    let note = non_empty(entry.note);
    let word = non_empty(entry.word);

    let title = note
        .clone()
        .or_else(|| word.clone())
        .unwrap_or_else(|| "unknown title".to_string());
    let summary = word.or(note).unwrap_or_default();

    HotTopic {
        rank,
        title,
        heat_value: entry.num,
        label: entry.label_name.unwrap_or_default(),
        summary,
        category: non_empty(entry.category).unwrap_or_else(|| "unknown".to_string()),
    }
}

/// Fetch the hot search list and turn it into at most `max_count` ranked topics.
pub async fn fetch_hotspots(
    endpoint: &str,
    headers: &BTreeMap<String, String>,
    max_count: usize,
) -> Result<Vec<HotTopic>, FetchError> {
    let start = std::time::Instant::now();
    info!("Fetching hot search list - url={}, max={}", endpoint, max_count);

    let client = Client::builder()
        .timeout(FETCH_TIMEOUT)
        .default_headers(build_headers(headers))
        .build()
        .map_err(|source| FetchError::Request {
            url: endpoint.to_string(),
            hint: None,
            source,
        })?;

    let resp = match client.get(endpoint).send().await {
        Ok(r) => r,
        Err(source) => {
            let hint = request_hint(&source);
            error!("Hot search request failed - url={}, error={}", endpoint, source);
            if let Some(h) = hint {
                warn!("Hint: {}", h);
            }
            return Err(FetchError::Request {
                url: endpoint.to_string(),
                hint,
                source,
            });
        }
    };

    let status = resp.status();
    if !status.is_success() {
        let hint = status_hint(status);
        error!("Hot search endpoint returned an error - url={}, status={}", endpoint, status.as_u16());
        if let Some(h) = hint {
            warn!("Hint: {}", h);
        }
        return Err(FetchError::Status {
            url: endpoint.to_string(),
            status: status.as_u16(),
            hint,
        });
    }

    let body: ApiHotSearch = resp.json().await.map_err(|source| {
        error!("Hot search response could not be decoded - url={}, error={}", endpoint, source);
        FetchError::Decode {
            url: endpoint.to_string(),
            source,
        }
    })?;

    let entries = body.into_entries();
    debug!("Hot search entries received - count={}", entries.len());
    if entries.is_empty() {
        error!("Hot search endpoint returned an empty list - url={}", endpoint);
        return Err(FetchError::Empty {
            url: endpoint.to_string(),
        });
    }

    let topics: Vec<HotTopic> = entries
        .into_iter()
        .take(max_count)
        .zip(1u32..)
        .map(|(entry, rank)| topic_from_entry(rank, entry))
        .collect();

    info!(
        "Hot search fetch completed - duration={:.2}s, topics={}",
        start.elapsed().as_secs_f32(),
        topics.len()
    );
    Ok(topics)
}
