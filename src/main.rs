//! Decision assistant server and utilities.
//!
//! Usage:
//!   decision-assistant serve
//!   decision-assistant render report.md > report.html
//!   decision-assistant questions

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use decision_assistant::catalog::{GREETING, QUESTIONS};
use decision_assistant::clients::ReportResult;
use decision_assistant::config::Config;
use decision_assistant::render::MarkdownRenderer;
use decision_assistant::report::ReportPage;

const DEFAULT_LOG_FILTER: &str = "decision_assistant=info,tower_http=info";

#[derive(Parser)]
#[command(name = "decision-assistant")]
#[command(about = "AI risk-based decision assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (session API and AI proxy)
    Serve,
    /// Render a markdown report file to a standalone HTML page on stdout
    Render {
        file: PathBuf,
        /// Skip risk-tag badges
        #[arg(long)]
        plain: bool,
    },
    /// Print the greeting and the questionnaire
    Questions,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => serve().await,
        Commands::Render { file, plain } => render(file, plain),
        Commands::Questions => {
            println!("{}\n", GREETING);
            for (i, question) in QUESTIONS.iter().enumerate() {
                println!("{}. {}", i + 1, question);
            }
            Ok(())
        }
    }
}

async fn serve() -> Result<()> {
    let config = Config::load()?;
    let state = decision_assistant::app_state(&config)?;
    info!(
        grounding = config.gemini.grounding,
        ai_configured = state.gateway_configured,
        "Starting decision assistant"
    );
    decision_assistant::http::start_http_server(&config, state).await
}

fn render(file: PathBuf, plain: bool) -> Result<()> {
    let markdown = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let renderer = if plain {
        MarkdownRenderer::plain()
    } else {
        MarkdownRenderer::new()
    };
    let result = ReportResult {
        report: markdown,
        sources: Vec::new(),
    };
    let page = ReportPage::new(&result).to_html(&renderer)?;
    print!("{}", page);
    Ok(())
}
