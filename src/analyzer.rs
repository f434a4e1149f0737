use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info, warn};

use crate::config::{BackendKind, InferenceBackend};
use crate::error::AnalysisError;
use crate::llm::llm_call;
use crate::models::{AnalysisResult, AnalyzedHotspot, HotTopic};
use crate::prompts::{current_date, PromptTemplate, SYSTEM_PERSONA};

static FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^```(?:json)?\s*").expect("fence pattern"));
static FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```$").expect("fence pattern"));

/// Drop a surrounding ```` ```json ```` / ```` ``` ```` fence if the model added one.
pub fn strip_code_fence(text: &str) -> String {
    let t = text.trim();
    let t = FENCE_OPEN.replace(t, "");
    let t = FENCE_CLOSE.replace(&t, "");
    t.trim().to_string()
}

/// Parse model output into an analysis; both top-level sections must be present.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let cleaned = strip_code_fence(text);
    let value: serde_json::Value = serde_json::from_str(&cleaned)?;

    let present = |key: &str| value.get(key).is_some_and(|v| !v.is_null());
    if !(present("eventTimeline") && present("productIdeas")) {
        return Err(AnalysisError::MissingSections);
    }

    Ok(serde_json::from_value(value)?)
}

pub async fn try_analyze(
    backend: &InferenceBackend,
    prompt: &PromptTemplate,
    topic: &HotTopic,
) -> Result<AnalyzedHotspot, AnalysisError> {
    let user = prompt.user_topic_analysis(topic, &current_date());
    let answer = llm_call(backend, SYSTEM_PERSONA, &user).await?;
    let analysis = parse_analysis(&answer)?;
    Ok(AnalyzedHotspot::analyzed(topic.clone(), analysis))
}

fn log_failure(backend: &InferenceBackend, topic: &HotTopic, err: &AnalysisError) {
    error!("Analysis failed - rank={}, title={}", topic.rank, topic.title);
    error!("  kind={}, message={}", err.kind(), err);
    match err {
        AnalysisError::Api { status, body } => {
            error!("  http_status={}, response={}", status, body);
        }
        AnalysisError::Request(_) => {
            error!("  no response received from the inference API");
        }
        AnalysisError::Decode(_) => {
            error!("  response received but it is not a chat completion body");
        }
        _ => {}
    }
    match backend.kind {
        BackendKind::DeepSeek => warn!("  backend={} (DEEPSEEK_API_KEY configured)", backend.kind),
        BackendKind::GitHubModels => warn!("  backend={} (DEEPSEEK_API_KEY not configured)", backend.kind),
    }
}

/// Analyze one topic. Never fails: any error becomes the placeholder analysis
/// with a composite score of 0.
pub async fn analyze(backend: &InferenceBackend, prompt: &PromptTemplate, topic: HotTopic) -> AnalyzedHotspot {
    info!("Analyzing topic - rank={}, title={}, backend={}", topic.rank, topic.title, backend.kind);

    match try_analyze(backend, prompt, &topic).await {
        Ok(hotspot) => {
            info!(
                "Analysis completed - rank={}, score={}, ideas={}",
                hotspot.topic.rank,
                hotspot.composite_score,
                hotspot.idea_count()
            );
            hotspot
        }
        Err(e) => {
            log_failure(backend, &topic, &e);
            AnalyzedHotspot::failed(topic, &e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serde_json::json;

    fn topic() -> HotTopic {
        HotTopic {
            rank: 1,
            title: "测试话题".to_string(),
            heat_value: 50_000,
            label: "热".to_string(),
            summary: "测试".to_string(),
            category: "unknown".to_string(),
        }
    }

    fn backend(url: String) -> InferenceBackend {
        InferenceBackend {
            kind: BackendKind::DeepSeek,
            base_url: url,
            api_key: "sk-test".to_string(),
            model: "deepseek-chat".to_string(),
        }
    }

    fn completion(content: &str) -> String {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string()
    }

    async fn model_replies(server: &mut Server, content: &str) -> mockito::Mock {
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion(content))
            .create_async()
            .await
    }

    fn assert_placeholder(h: &AnalyzedHotspot) {
        assert_eq!(h.composite_score, 0);
        let analysis = h.analysis.as_ref().expect("placeholder analysis");
        assert_eq!(analysis.event_timeline.len(), 1);
        assert_eq!(analysis.event_timeline[0].time, "unknown");
        assert!(analysis.event_timeline[0].event.starts_with("analysis failed"));
        assert_eq!(analysis.product_ideas.len(), 1);
        assert_eq!(analysis.product_ideas[0].name, "analysis failed");
    }

    const GOOD_ANALYSIS: &str = r#"{
        "eventTimeline": [{"time": "2026-01-14", "event": "话题发酵"}],
        "productIdeas": [
            {"name": "话题助手", "features": ["a", "b"], "targetUsers": "学生",
             "marketOpportunity": "大", "interestScore": 68, "usefulnessScore": 17},
            {"name": "第二个", "features": ["c"], "targetUsers": "x",
             "marketOpportunity": "y", "interestScore": 10, "usefulnessScore": 5}
        ]
    }"#;

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```JSON {\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```\n"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn both_sections_are_required() {
        assert!(matches!(
            parse_analysis(r#"{"productIdeas": []}"#).unwrap_err(),
            AnalysisError::MissingSections
        ));
        assert!(matches!(
            parse_analysis(r#"{"eventTimeline": [], "productIdeas": null}"#).unwrap_err(),
            AnalysisError::MissingSections
        ));
        assert!(matches!(
            parse_analysis("not json").unwrap_err(),
            AnalysisError::InvalidJson(_)
        ));
        let ok = parse_analysis(r#"{"eventTimeline": [], "productIdeas": []}"#).unwrap();
        assert!(ok.product_ideas.is_empty());
    }

    #[tokio::test]
    async fn fenced_json_is_analyzed() {
        let mut server = Server::new_async().await;
        let fenced = format!("```json\n{}\n```", GOOD_ANALYSIS);
        let _m = model_replies(&mut server, &fenced).await;

        let h = analyze(&backend(server.url()), &PromptTemplate::default(), topic()).await;
        assert_eq!(h.composite_score, 85);
        assert_eq!(h.topic, topic());
        let analysis = h.analysis.unwrap();
        assert_eq!(analysis.event_timeline[0].event, "话题发酵");
        assert_eq!(analysis.product_ideas.len(), 2);
        assert_eq!(analysis.product_ideas[0].target_users, "学生");
    }

    #[tokio::test]
    async fn malformed_reply_falls_back() {
        let mut server = Server::new_async().await;
        let _m = model_replies(&mut server, "not json").await;

        let h = analyze(&backend(server.url()), &PromptTemplate::default(), topic()).await;
        assert_placeholder(&h);
        assert_eq!(h.topic.title, "测试话题");
    }

    #[tokio::test]
    async fn missing_sections_fall_back() {
        let mut server = Server::new_async().await;
        let _m = model_replies(&mut server, r#"{"productIdeas": []}"#).await;

        let h = analyze(&backend(server.url()), &PromptTemplate::default(), topic()).await;
        assert_placeholder(&h);
    }

    #[tokio::test]
    async fn server_error_falls_back() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body("upstream exploded")
            .create_async()
            .await;

        let h = analyze(&backend(server.url()), &PromptTemplate::default(), topic()).await;
        assert_placeholder(&h);
        let event = &h.analysis.unwrap().event_timeline[0].event;
        assert!(event.contains("500"));
    }

    #[tokio::test]
    async fn unreachable_backend_falls_back() {
        let h = analyze(
            &backend("http://127.0.0.1:1".to_string()),
            &PromptTemplate::default(),
            topic(),
        )
        .await;
        assert_placeholder(&h);
    }

    #[tokio::test]
    async fn no_ideas_scores_zero_without_placeholder() {
        let mut server = Server::new_async().await;
        let _m = model_replies(
            &mut server,
            r#"{"eventTimeline": [{"time": "t", "event": "e"}], "productIdeas": []}"#,
        )
        .await;

        let h = analyze(&backend(server.url()), &PromptTemplate::default(), topic()).await;
        assert_eq!(h.composite_score, 0);
        let analysis = h.analysis.unwrap();
        assert!(analysis.product_ideas.is_empty());
        assert_eq!(analysis.event_timeline[0].event, "e");
    }

    #[tokio::test]
    async fn try_analyze_surfaces_the_error() {
        let mut server = Server::new_async().await;
        let _m = model_replies(&mut server, "still not json").await;

        let err = try_analyze(&backend(server.url()), &PromptTemplate::default(), &topic())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_json");
    }

    #[tokio::test]
    async fn proxy_page_is_a_decode_failure() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html>proxy</html>")
            .create_async()
            .await;

        let err = try_analyze(&backend(server.url()), &PromptTemplate::default(), &topic())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "decode");

        let h = analyze(&backend(server.url()), &PromptTemplate::default(), topic()).await;
        assert_placeholder(&h);
    }
}
