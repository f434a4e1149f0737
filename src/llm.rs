use reqwest::Client;
use tracing::{debug, info};

use crate::api_types::{ChatMessage, ChatRequest, ChatResponse};
use crate::config::InferenceBackend;
use crate::error::AnalysisError;

pub const TEMPERATURE: f32 = 0.7;
pub const MAX_TOKENS: u32 = 2000;

/// One chat completion against `backend`; returns the trimmed message text.
pub async fn llm_call(backend: &InferenceBackend, system: &str, user: &str) -> Result<String, AnalysisError> {
    let start = std::time::Instant::now();
    debug!(
        "LLM call starting - backend={}, model={}, prompt_length={} chars",
        backend.kind,
        backend.model,
        user.len()
    );

    let body = ChatRequest {
        model: &backend.model,
        messages: vec![
            ChatMessage { role: "system", content: system },
            ChatMessage { role: "user", content: user },
        ],
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    };

    // No request timeout: inference latency is left to the client default
    let client = Client::builder().build()?;
    let resp = client
        .post(backend.completions_url())
        .bearer_auth(&backend.api_key)
        .json(&body)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(AnalysisError::Api {
            status: status.as_u16(),
            body,
        });
    }

    let parsed: ChatResponse = resp.json().await.map_err(AnalysisError::Decode)?;
    let answer = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(AnalysisError::EmptyCompletion)?;

    info!(
        "LLM API call completed - duration={:.2}s, response_length={} chars",
        start.elapsed().as_secs_f32(),
        answer.len()
    );
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn backend(url: String) -> InferenceBackend {
        InferenceBackend {
            kind: BackendKind::GitHubModels,
            base_url: url,
            api_key: "tok".to_string(),
            model: "gpt-4o".to_string(),
        }
    }

    #[tokio::test]
    async fn sends_chat_request_and_returns_content() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o",
                "temperature": 0.7,
                "max_tokens": 2000,
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"  hi there \n"}}]}"#)
            .create_async()
            .await;

        let out = llm_call(&backend(server.url()), "sys", "hello").await.unwrap();
        assert_eq!(out, "hi there");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn http_error_keeps_status_and_body() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let err = llm_call(&backend(server.url()), "sys", "hello").await.unwrap_err();
        match err {
            AnalysisError::Api { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("Expected Api error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_choices_is_empty_completion() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let err = llm_call(&backend(server.url()), "sys", "hello").await.unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyCompletion));
    }

    #[tokio::test]
    async fn non_json_success_body_is_a_decode_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html>proxy</html>")
            .create_async()
            .await;

        let err = llm_call(&backend(server.url()), "sys", "hello").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Decode(_)), "got: {err:?}");
        assert_eq!(err.kind(), "decode");
    }
}
