// src/render.rs
use std::path::Path;

use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::error::RenderError;
use crate::models::{AnalyzedHotspot, ProductIdea, TimelineEntry};

pub const BUILTIN_TEMPLATE: &str = include_str!("../templates/report.html");

pub const EXCELLENT_THRESHOLD: u32 = 80;
pub const GOOD_THRESHOLD: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Excellent,
    Good,
    Normal,
}

impl Tier {
    pub fn from_score(score: u32) -> Self {
        if score >= EXCELLENT_THRESHOLD {
            Tier::Excellent
        } else if score >= GOOD_THRESHOLD {
            Tier::Good
        } else {
            Tier::Normal
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Tier::Excellent => "excellent",
            Tier::Good => "good",
            Tier::Normal => "normal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportSummary {
    pub total_hotspots: usize,
    pub total_ideas: usize,
    pub excellent: usize,
    pub good: usize,
    pub normal: usize,
}

impl ReportSummary {
    pub fn from_hotspots(hotspots: &[AnalyzedHotspot]) -> Self {
        let mut s = ReportSummary {
            total_hotspots: hotspots.len(),
            ..Default::default()
        };
        for h in hotspots {
            s.total_ideas += h.idea_count();
            match Tier::from_score(h.composite_score) {
                Tier::Excellent => s.excellent += 1,
                Tier::Good => s.good += 1,
                Tier::Normal => s.normal += 1,
            }
        }
        s
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_timeline(entries: &[TimelineEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let items = entries
        .iter()
        .map(|e| {
            format!(
                r#"
            <div class="timeline-item">
                <div class="timeline-time">{}</div>
                <div class="timeline-content">{}</div>
            </div>"#,
                escape_html(&e.time),
                escape_html(&e.event)
            )
        })
        .join("");

    format!(
        r#"
        <div class="event-timeline">
            <h3>Event timeline</h3>{}
        </div>"#,
        items
    )
}

fn render_idea(idea: &ProductIdea) -> String {
    let score = idea.score();
    let features = idea
        .features
        .iter()
        .map(|f| format!("<li>{}</li>", escape_html(f)))
        .join("");

    format!(
        r#"
            <div class="product-idea">
                <div class="idea-header">
                    <div class="idea-title">{name}</div>
                    <div class="idea-rating {class}">{score} pts</div>
                </div>
                <div class="idea-section">
                    <h4>Core features</h4>
                    <ul>{features}</ul>
                </div>
                <div class="idea-section">
                    <h4>Target users</h4>
                    <p>{users}</p>
                </div>
                <div class="idea-section">
                    <h4>Market opportunity</h4>
                    <p>{market}</p>
                </div>
                <div class="criteria-breakdown">
                    Score breakdown: interest {interest}/80 + usefulness {usefulness}/20
                </div>
            </div>"#,
        name = escape_html(&idea.name),
        class = Tier::from_score(score).css_class(),
        score = score,
        features = features,
        users = escape_html(&idea.target_users),
        market = escape_html(&idea.market_opportunity),
        interest = idea.interest_score,
        usefulness = idea.usefulness_score,
    )
}

pub fn render_hotspot_card(h: &AnalyzedHotspot) -> String {
    let analysis = h.analysis.as_ref();
    let timeline = analysis.map(|a| a.event_timeline.as_slice()).unwrap_or_default();
    let ideas = analysis.map(|a| a.product_ideas.as_slice()).unwrap_or_default();

    let ideas_html = if ideas.is_empty() {
        r#"<p class="no-ideas">No product ideas</p>"#.to_string()
    } else {
        ideas.iter().map(render_idea).join("")
    };
    let label = if h.topic.label.is_empty() { "none" } else { h.topic.label.as_str() };

    format!(
        r#"
    <div class="hotspot-card {class}" data-score="{score}" data-rank="{rank}">
        <div class="card-header">
            <div>
                <span class="card-rank">Hot search #{rank}</span>
                <h2>{title}</h2>
            </div>
            <div class="card-score">{score} pts</div>
        </div>
        <div class="hotspot-meta">
            <div class="meta-item"><span class="label">Heat:</span> {heat}</div>
            <div class="meta-item"><span class="label">Label:</span> {label}</div>
            <div class="meta-item"><span class="label">Category:</span> {category}</div>
        </div>{timeline}
        <div class="product-ideas-section">
            <h3>Product ideas ({idea_count})</h3>{ideas}
        </div>
    </div>"#,
        class = Tier::from_score(h.composite_score).css_class(),
        score = h.composite_score,
        rank = h.topic.rank,
        title = escape_html(&h.topic.title),
        heat = h.topic.heat_display(),
        label = escape_html(label),
        category = escape_html(&h.topic.category),
        timeline = render_timeline(timeline),
        idea_count = ideas.len(),
        ideas = ideas_html,
    )
}

/// Render the full report. Cards are ordered by composite score, highest first;
/// the input slice is left untouched.
pub fn render_report(hotspots: &[AnalyzedHotspot], template: &str, generated_at: &str) -> String {
    let summary = ReportSummary::from_hotspots(hotspots);

    let mut sorted: Vec<&AnalyzedHotspot> = hotspots.iter().collect();
    sorted.sort_by(|a, b| b.composite_score.cmp(&a.composite_score));
    let cards = sorted.into_iter().map(render_hotspot_card).join("\n");

    debug!(
        "Rendering report - hotspots={}, ideas={}, excellent={}, good={}",
        summary.total_hotspots, summary.total_ideas, summary.excellent, summary.good
    );

    // Cards go in last so model text is never scanned for placeholders
    template
        .replace("{GENERATION_TIME}", &escape_html(generated_at))
        .replace("{TOTAL_HOTSPOTS}", &summary.total_hotspots.to_string())
        .replace("{TOTAL_IDEAS}", &summary.total_ideas.to_string())
        .replace("{EXCELLENT_COUNT}", &summary.excellent.to_string())
        .replace("{GOOD_COUNT}", &summary.good.to_string())
        .replace("{HOTSPOT_CARDS}", &cards)
}

/// External template when a path is given, the built-in one otherwise.
pub fn load_template(path: Option<&Path>) -> Result<String, RenderError> {
    match path {
        Some(p) => {
            let text = std::fs::read_to_string(p).map_err(|source| RenderError::Template {
                path: p.to_path_buf(),
                source,
            })?;
            debug!("Using report template {}", p.display());
            if !text.contains("{HOTSPOT_CARDS}") {
                warn!("Report template {} has no {{HOTSPOT_CARDS}} placeholder", p.display());
            }
            Ok(text)
        }
        None => Ok(BUILTIN_TEMPLATE.to_string()),
    }
}

/// Write (overwrite) the report, creating the parent directory if needed.
pub fn write_report(path: &Path, html: &str) -> Result<(), RenderError> {
    let write_err = |source| RenderError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, html.as_bytes()).map_err(write_err)?;
    info!("HTML report written - path={}, bytes={}", path.display(), html.len());
    Ok(())
}
