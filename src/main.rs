mod analyzer;
mod api_types;
mod config;
mod error;
mod fetch;
mod llm;
mod models;
mod orchestrator;
mod prompts;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::builder::FalseyValueParser;
use clap::Parser;
use tracing::{debug, error, info};

use config::{RawSettings, Settings};
use error::FetchError;
use orchestrator::run;

/// Hotspot Ideas - turns the Weibo hot search list into an HTML report of product ideas
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Token for GitHub Models (the default inference backend)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Hot search endpoint to fetch topics from
    #[arg(long, env = "WEIBO_API_URL")]
    source_url: Option<String>,

    /// Extra request headers for the hot search endpoint, as a JSON object
    #[arg(long, env = "WEIBO_API_HEADERS", hide_env_values = true)]
    source_headers: Option<String>,

    /// Maximum number of topics to analyze
    #[arg(short = 'n', long, env = "MAX_HOTSPOTS", default_value_t = 30)]
    max_hotspots: usize,

    /// Model used with GitHub Models
    #[arg(short, long, env = "AI_MODEL", default_value = "gpt-4o")]
    model: String,

    /// DeepSeek API key; when set, DeepSeek is used instead of GitHub Models
    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    deepseek_api_key: Option<String>,

    /// Output directory for the generated report (default: ".")
    #[arg(short, long, env = "OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// HTML template with {GENERATION_TIME}, {TOTAL_HOTSPOTS}, {TOTAL_IDEAS},
    /// {EXCELLENT_COUNT}, {GOOD_COUNT} and {HOTSPOT_CARDS} placeholders
    #[arg(short, long, env = "REPORT_TEMPLATE")]
    template: Option<PathBuf>,

    /// Prompt template with {CURRENT_DATE}, {TITLE}, {HEAT_VALUE}, {LABEL} and {SUMMARY} placeholders
    #[arg(long, env = "PROMPT_TEMPLATE")]
    prompt_template: Option<PathBuf>,

    /// Print full error details on failure
    #[arg(long, env = "DEBUG", value_parser = FalseyValueParser::new())]
    debug: bool,
}

impl From<Args> for RawSettings {
    fn from(a: Args) -> Self {
        RawSettings {
            github_token: a.github_token,
            source_url: a.source_url,
            source_headers: a.source_headers,
            max_hotspots: a.max_hotspots,
            model: a.model,
            deepseek_api_key: a.deepseek_api_key,
            output_dir: a.output_dir,
            template: a.template,
            prompt_template: a.prompt_template,
        }
    }
}

fn report_failure(err: &anyhow::Error, debug: bool) {
    error!("Run failed: {}", err);
    for cause in err.chain().skip(1) {
        error!("  caused by: {}", cause);
    }
    if let Some(fetch) = err.chain().find_map(|c| c.downcast_ref::<FetchError>()) {
        if let Some(status) = fetch.status() {
            error!("  http_status={}", status);
        }
        if let Some(hint) = fetch.hint() {
            error!("  hint: {}", hint);
        }
    }
    if debug {
        error!("Details: {:?}", err);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env must be loaded before clap reads env-backed flags
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => error!("Ignoring unreadable .env file: {}", e),
    }

    info!("Starting hotspot_ideas");

    let args = Args::parse();
    let debug = args.debug;

    let settings = match Settings::from_raw(args.into()) {
        Ok(s) => s,
        Err(e) => {
            report_failure(&anyhow::Error::new(e), debug);
            return ExitCode::FAILURE;
        }
    };
    debug!("Settings resolved - {:?}", settings.backend);

    match run(&settings).await {
        Ok(summary) => {
            info!(
                "Done - {}/{} topics analyzed, report at {}",
                summary.succeeded,
                summary.report.total_hotspots,
                summary.report_path.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_failure(&e, debug);
            ExitCode::FAILURE
        }
    }
}
