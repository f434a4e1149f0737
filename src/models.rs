use serde::{Deserialize, Deserializer};

/// One entry of the hot search list, ranked by fetch order.
#[derive(Debug, Clone, PartialEq)]
pub struct HotTopic {
    pub rank: u32,
    pub title: String,
    pub heat_value: u64,
    pub label: String,
    pub summary: String,
    pub category: String, // "unknown" when the source omits it
}

impl HotTopic {
    /// Heat value with thousands separators, e.g. `1,234,567`.
    pub fn heat_display(&self) -> String {
        group_thousands(self.heat_value)
    }
}

pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimelineEntry {
    #[serde(default, deserialize_with = "lenient_text")]
    pub time: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub event: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductIdea {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_features")]
    pub features: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub target_users: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub market_opportunity: String,
    #[serde(default, deserialize_with = "lenient_score")]
    pub interest_score: u32, // 0..=80 by rubric, not enforced
    #[serde(default, deserialize_with = "lenient_score")]
    pub usefulness_score: u32, // 0..=20 by rubric, not enforced
}

impl ProductIdea {
    pub fn score(&self) -> u32 {
        self.interest_score.saturating_add(self.usefulness_score)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default)]
    pub event_timeline: Vec<TimelineEntry>,
    #[serde(default)]
    pub product_ideas: Vec<ProductIdea>,
}

impl AnalysisResult {
    /// Score of the primary (first) idea; 0 when the model produced none.
    pub fn composite_score(&self) -> u32 {
        self.product_ideas.first().map(ProductIdea::score).unwrap_or(0)
    }

    /// Stand-in analysis recorded when the model call or its output is unusable.
    pub fn placeholder(reason: &str) -> Self {
        Self {
            event_timeline: vec![TimelineEntry {
                time: "unknown".to_string(),
                event: format!("analysis failed: {}", reason),
            }],
            product_ideas: vec![ProductIdea {
                name: "analysis failed".to_string(),
                features: vec!["unable to generate".to_string()],
                target_users: "unknown".to_string(),
                market_opportunity: "analysis failed".to_string(),
                interest_score: 0,
                usefulness_score: 0,
            }],
        }
    }
}

/// A topic together with its analysis; the unit the report is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedHotspot {
    pub topic: HotTopic,
    pub analysis: Option<AnalysisResult>,
    pub composite_score: u32,
}

impl AnalyzedHotspot {
    pub fn analyzed(topic: HotTopic, analysis: AnalysisResult) -> Self {
        let composite_score = analysis.composite_score();
        Self {
            topic,
            analysis: Some(analysis),
            composite_score,
        }
    }

    pub fn failed(topic: HotTopic, reason: &str) -> Self {
        Self {
            topic,
            analysis: Some(AnalysisResult::placeholder(reason)),
            composite_score: 0,
        }
    }

    /// Record kept when no analysis could be attached at all.
    pub fn unanalyzed(topic: HotTopic) -> Self {
        Self {
            topic,
            analysis: None,
            composite_score: 0,
        }
    }

    pub fn idea_count(&self) -> usize {
        self.analysis.as_ref().map_or(0, |a| a.product_ideas.len())
    }
}

// Model output is loosely typed: numbers may arrive as floats, strings or null.
fn score_from_value(v: &serde_json::Value) -> u32 {
    match v {
        serde_json::Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u.min(u32::MAX as u64) as u32
            } else if let Some(f) = n.as_f64() {
                if f.is_finite() && f > 0.0 {
                    f.min(u32::MAX as f64) as u32
                } else {
                    0
                }
            } else {
                0
            }
        }
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f > 0.0)
            .map(|f| f.min(u32::MAX as f64) as u32)
            .unwrap_or(0),
        _ => 0,
    }
}

pub fn lenient_score<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(score_from_value(&v))
}

pub fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    let n = match &v {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    };
    Ok(n)
}

fn text_from_value(v: serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

pub fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(text_from_value(v))
}

fn lenient_features<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(match v {
        serde_json::Value::Array(items) => items.into_iter().map(text_from_value).collect(),
        serde_json::Value::Null => Vec::new(),
        single => vec![text_from_value(single)],
    })
}
