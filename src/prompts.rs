use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use chrono_tz::Asia::Shanghai;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::models::HotTopic;

pub const SYSTEM_PERSONA: &str = "You are an experienced product manager and market analyst who spots \
product opportunities in trending events. Reply with a single strict JSON object and nothing else.";

const DEFAULT_TOPIC_PROMPT: &str = r#"Current date: {CURRENT_DATE}

Analyze the following Weibo hot search topic and derive product ideas from it.

**Title**: {TITLE}
**Heat value**: {HEAT_VALUE}
**Label**: {LABEL}
**Summary**: {SUMMARY}

Output strictly the following JSON shape (no other text):
{
  "eventTimeline": [
    {"time": "when it happened", "event": "what happened"}
  ],
  "productIdeas": [
    {
      "name": "product name",
      "features": ["feature 1", "feature 2", "feature 3"],
      "targetUsers": "who the product is for",
      "marketOpportunity": "why there is a market for it",
      "interestScore": 68,
      "usefulnessScore": 17
    }
  ]
}

Scoring rubric:
- interestScore (0-80): topic heat, spread potential, audience attention, novelty of the idea
- usefulnessScore (0-20): commercial viability, market demand, product fit, technical feasibility

Requirements:
1. Base the timeline on the current date above; mark retrospectives of older events as such.
2. Produce 1-2 product ideas.
3. Score objectively; do not give every idea a high score.
4. Write the text fields in the language of the topic.
5. Output only the JSON object, without explanations."#;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{(CURRENT_DATE|TITLE|HEAT_VALUE|LABEL|SUMMARY)\}").expect("placeholder pattern")
});

/// User prompt sent for each topic. Placeholders: `{CURRENT_DATE}`, `{TITLE}`,
/// `{HEAT_VALUE}`, `{LABEL}`, `{SUMMARY}`.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            text: DEFAULT_TOPIC_PROMPT.to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Reading prompt template {}", path.display()))?;
        Ok(Self::new(text))
    }

    pub fn user_topic_analysis(&self, topic: &HotTopic, current_date: &str) -> String {
        let label = if topic.label.trim().is_empty() {
            "none"
        } else {
            topic.label.as_str()
        };
        let heat = topic.heat_display();

        // Single pass, so topic text is never re-scanned for placeholders
        PLACEHOLDER
            .replace_all(&self.text, |caps: &Captures| match &caps[1] {
                "CURRENT_DATE" => current_date.to_string(),
                "TITLE" => topic.title.clone(),
                "HEAT_VALUE" => heat.clone(),
                "LABEL" => label.to_string(),
                _ => topic.summary.clone(),
            })
            .into_owned()
    }
}

/// Today's date in Beijing time, e.g. `2026-01-15 (Thursday)`.
pub fn current_date() -> String {
    Utc::now()
        .with_timezone(&Shanghai)
        .format("%Y-%m-%d (%A)")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic() -> HotTopic {
        HotTopic {
            rank: 3,
            title: "测试话题".to_string(),
            heat_value: 1_234_567,
            label: "".to_string(),
            summary: "测试".to_string(),
            category: "unknown".to_string(),
        }
    }

    #[test]
    fn default_prompt_embeds_topic_fields() {
        let prompt = PromptTemplate::default().user_topic_analysis(&topic(), "2026-01-15 (Thursday)");
        assert!(prompt.contains("**Title**: 测试话题"));
        assert!(prompt.contains("**Heat value**: 1,234,567"));
        assert!(prompt.contains("**Label**: none"));
        assert!(prompt.contains("**Summary**: 测试"));
        assert!(prompt.contains("Current date: 2026-01-15 (Thursday)"));
        assert!(prompt.contains("\"eventTimeline\""));
        assert!(prompt.contains("\"productIdeas\""));
        assert!(prompt.contains("interestScore (0-80)"));
        assert!(prompt.contains("usefulnessScore (0-20)"));
    }

    #[test]
    fn custom_template_is_used_verbatim() {
        let tpl = PromptTemplate::new("{TITLE}|{HEAT_VALUE}|{LABEL}|{SUMMARY}|{CURRENT_DATE}");
        let mut t = topic();
        t.label = "沸".to_string();
        assert_eq!(tpl.user_topic_analysis(&t, "d"), "测试话题|1,234,567|沸|测试|d");
    }

    #[test]
    fn topic_text_is_not_reinterpreted() {
        let tpl = PromptTemplate::new("{TITLE} / {SUMMARY}");
        let mut t = topic();
        t.title = "{SUMMARY}".to_string();
        t.summary = "{TITLE}".to_string();
        assert_eq!(tpl.user_topic_analysis(&t, "d"), "{SUMMARY} / {TITLE}");
    }

    #[test]
    fn template_loads_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, "Topic: {TITLE}").unwrap();
        let tpl = PromptTemplate::from_file(&path).unwrap();
        assert_eq!(tpl.user_topic_analysis(&topic(), "d"), "Topic: 测试话题");
        assert!(PromptTemplate::from_file(&dir.path().join("missing.txt")).is_err());
    }
}
