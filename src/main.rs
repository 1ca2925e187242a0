mod cli_adapter;
mod config;
mod coordinator;
mod gateway;
mod locale;
mod prefs;
mod session;
mod types;
mod view;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use config::Config;
use coordinator::Coordinator;
use gateway::{AnswerGateway, AnswerPolicy, HttpAnswerService};
use prefs::PreferenceStore;
use session::SessionController;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tracing_subscriber::EnvFilter;
use types::Language;

#[derive(Parser)]
#[command(name = "labor-faq-chat", version, about = "Ask questions about Egyptian labor law")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Answer service base URL, overrides the config file.
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long, conflicts_with = "english")]
    arabic: bool,
    #[arg(long)]
    english: bool,
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Interactive chat (default).
    Chat {
        /// Go straight to the chat screen.
        #[arg(long)]
        skip_home: bool,
    },
    /// Ask one question and print the answer.
    Ask { question: Vec<String> },
    /// Save the preferred language.
    Lang { choice: LangChoice },
}

#[derive(Clone, Copy, ValueEnum)]
enum LangChoice {
    Ar,
    En,
    Toggle,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.service.base_url = base_url;
        config.validate()?;
    }
    let _log_guard = init_logging(&config)?;

    let prefs = PreferenceStore::new(config.prefs.path.clone());
    let language = if cli.arabic {
        Language::Arabic
    } else if cli.english {
        Language::English
    } else {
        Language::from_is_arabic(prefs.load_is_arabic().unwrap_or(config.ui.arabic))
    };

    match cli.command.unwrap_or(CliCommand::Chat { skip_home: false }) {
        CliCommand::Chat { skip_home } => run_chat(config, prefs, language, skip_home).await,
        CliCommand::Ask { question } => run_ask(&config, language, &question.join(" ")).await,
        CliCommand::Lang { choice } => run_lang(&prefs, language, choice),
    }
}

fn build_gateway(config: &Config) -> Result<AnswerGateway> {
    let service = HttpAnswerService::new(
        config.service.base_url.clone(),
        Duration::from_secs(config.service.timeout_secs),
    )
    .context("failed to build http client")?;
    Ok(AnswerGateway::new(
        Arc::new(service),
        AnswerPolicy {
            confidence_filter: config.policy.confidence_filter,
        },
    ))
}

async fn run_chat(
    config: Config,
    prefs: PreferenceStore,
    language: Language,
    skip_home: bool,
) -> Result<()> {
    let gateway = build_gateway(&config)?;
    tracing::info!(base_url = %config.service.base_url, "starting chat");
    let lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    Coordinator::new(config, gateway, prefs, language, std::io::stdout())
        .run(lines, skip_home)
        .await
}

async fn run_ask(config: &Config, language: Language, question: &str) -> Result<()> {
    if question.trim().is_empty() {
        anyhow::bail!("a question is required");
    }
    let gateway = build_gateway(config)?;
    let mut session = SessionController::new(language, false);
    session.send(question, &gateway).await?;
    if let Some(answer) = session.transcript().last() {
        println!("{}", answer.text);
        if let Some(id) = answer.answer_id {
            tracing::debug!(answer_id = %id, "answer accepted");
        }
    }
    Ok(())
}

fn run_lang(prefs: &PreferenceStore, current: Language, choice: LangChoice) -> Result<()> {
    let language = match choice {
        LangChoice::Ar => Language::Arabic,
        LangChoice::En => Language::English,
        LangChoice::Toggle => current.toggled(),
    };
    prefs
        .save_is_arabic(language.is_arabic())
        .with_context(|| format!("failed to save preference to {}", prefs.path().display()))?;
    println!("{}", language.code());
    Ok(())
}

fn init_logging(config: &Config) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("invalid logging.level")?;

    let Some(path) = &config.logging.file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let dir = dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .context("logging.file must name a file")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log dir: {}", dir.display()))?;
    let appender = tracing_appender::rolling::never(&dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}
