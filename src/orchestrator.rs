use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use chrono_tz::Asia::Shanghai;
use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::analyzer::analyze;
use crate::config::{InferenceBackend, Settings};
use crate::fetch::fetch_hotspots;
use crate::models::{AnalyzedHotspot, HotTopic};
use crate::prompts::PromptTemplate;
use crate::render::{load_template, render_report, write_report, ReportSummary};

/// Pause between two consecutive analyses, to stay under free-tier rate limits.
pub const ANALYSIS_DELAY: Duration = Duration::from_secs(2);

const PREVIEW_COUNT: usize = 5;

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report_path: PathBuf,
    pub succeeded: usize,
    pub report: ReportSummary,
}

pub fn report_path(output_dir: &Path, ymd: &str) -> PathBuf {
    output_dir.join(format!("weibo_hotspot_analysis_{}.html", ymd))
}

/// Analyze topics one at a time, in order, waiting `delay` between calls.
pub async fn analyze_all(
    backend: &InferenceBackend,
    prompt: &PromptTemplate,
    topics: Vec<HotTopic>,
    delay: Duration,
) -> Vec<AnalyzedHotspot> {
    analyze_all_with(topics, delay, |topic| analyze(backend, prompt, topic)).await
}

/// Sequential driver behind [`analyze_all`]. A step that panics leaves its
/// topic in the output with no analysis attached.
pub async fn analyze_all_with<F, Fut>(topics: Vec<HotTopic>, delay: Duration, mut step: F) -> Vec<AnalyzedHotspot>
where
    F: FnMut(HotTopic) -> Fut,
    Fut: Future<Output = AnalyzedHotspot>,
{
    let total = topics.len();
    let mut analyzed = Vec::with_capacity(total);

    for (i, topic) in topics.into_iter().enumerate() {
        info!("[{}/{}] Analyzing...", i + 1, total);

        let outcome = AssertUnwindSafe(step(topic.clone())).catch_unwind().await;
        let hotspot = match outcome {
            Ok(h) => h,
            Err(_) => {
                error!("Analysis aborted unexpectedly - rank={}, title={}; keeping topic without analysis", topic.rank, topic.title);
                AnalyzedHotspot::unanalyzed(topic)
            }
        };
        analyzed.push(hotspot);

        if i + 1 < total && !delay.is_zero() {
            debug!("Waiting {:.1}s before next analysis", delay.as_secs_f32());
            tokio::time::sleep(delay).await;
        }
    }
    analyzed
}

pub async fn run(settings: &Settings) -> Result<RunSummary> {
    run_with_delay(settings, ANALYSIS_DELAY).await
}

pub async fn run_with_delay(settings: &Settings, delay: Duration) -> Result<RunSummary> {
    let pipeline_start = std::time::Instant::now();
    info!(
        "Pipeline started - backend={}, model={}, max_hotspots={}, source={}",
        settings.backend.kind, settings.backend.model, settings.max_hotspots, settings.source_url
    );

    let prompt = match &settings.prompt_template {
        Some(path) => PromptTemplate::from_file(path)?,
        None => PromptTemplate::default(),
    };

    // 1) fetch
    let topics = fetch_hotspots(&settings.source_url, &settings.source_headers, settings.max_hotspots)
        .await
        .context("Fetching hot search list")?;

    if topics.is_empty() {
        bail!("No hot search topics were fetched from {}", settings.source_url);
    }

    info!("Hot search preview (first {}):", PREVIEW_COUNT.min(topics.len()));
    for t in topics.iter().take(PREVIEW_COUNT) {
        info!("  {}. {} (heat: {})", t.rank, t.title, t.heat_display());
    }

    // 2) analyze, strictly sequential
    let analysis_start = std::time::Instant::now();
    let total = topics.len();
    let analyzed = analyze_all(&settings.backend, &prompt, topics, delay).await;
    let succeeded = analyzed.iter().filter(|h| h.composite_score > 0).count();
    info!(
        "Analysis completed - duration={:.2}s, succeeded={}/{}",
        analysis_start.elapsed().as_secs_f32(),
        succeeded,
        total
    );
    if succeeded == 0 {
        warn!("No topic received a usable analysis; the report will only contain placeholders");
    }

    // 3) render + persist
    let now = Utc::now().with_timezone(&Shanghai);
    let generated_at = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let path = report_path(&settings.output_dir, &now.format("%Y%m%d").to_string());

    let template = load_template(settings.template.as_deref())?;
    let html = render_report(&analyzed, &template, &generated_at);
    write_report(&path, &html)?;

    // 4) statistics
    let report = ReportSummary::from_hotspots(&analyzed);
    info!("Run statistics:");
    info!("  excellent (80+): {}", report.excellent);
    info!("  good (60-79): {}", report.good);
    info!("  normal (<60): {}", report.normal);
    info!("  total ideas: {}", report.total_ideas);
    info!(
        "Pipeline completed successfully - total_duration={:.2}s, report={}",
        pipeline_start.elapsed().as_secs_f32(),
        path.display()
    );

    Ok(RunSummary {
        report_path: path,
        succeeded,
        report,
    })
}
