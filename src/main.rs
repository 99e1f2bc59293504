//! pplx - ask Perplexity from your terminal.
//!
//! Resolves an API key, sends one question to the chat-completion endpoint
//! and prints the answer as terminal-formatted Markdown.

mod api;
mod config;
mod credentials;
mod diagnostics;
mod models;
mod prompt;
mod render;

use anyhow::{bail, Context, Result};
use api::{ApiClient, Question};
use clap::{Parser, Subcommand};
use config::ConfigStore;
use credentials::ApiKey;
use indicatif::{ProgressBar, ProgressStyle};
use models::Model;
use render::OutputMode;
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Exit code after Ctrl+C, as shells report for SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser)]
#[command(name = "pplx")]
#[command(author, version, about = "Query Perplexity AI from your terminal")]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question
    #[command(after_help = "Examples:\n  pplx ask \"What is the capital of France?\"\n  pplx ask What is the capital of France?\n  pplx ask -m sonar-reasoning \"Explain quantum computing\"")]
    Ask {
        /// The question; multiple words are joined with spaces
        #[arg(value_name = "QUESTION")]
        question: Vec<String>,

        /// The model to use
        #[arg(short, long, value_enum, default_value_t = Model::default())]
        model: Model,

        /// Show the raw JSON response
        #[arg(short, long)]
        raw: bool,
    },
    /// Configure the Perplexity API key
    Configure {
        /// Set the key without prompting
        #[arg(long, value_name = "KEY")]
        key: Option<String>,
    },
    /// List available Perplexity models
    Models,
    /// Show debugging information for troubleshooting
    Debug,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli.command).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Log to stderr so answers on stdout stay clean.
fn init_logging(verbose: bool) {
    let level = if verbose { "pplx=debug" } else { "pplx=warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},reqwest=warn", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Ask {
            question,
            model,
            raw,
        } => handle_ask(&question, model, raw).await,
        Commands::Configure { key } => {
            handle_configure(&ConfigStore::default_location()?, key).map(|_| ())
        }
        Commands::Models => handle_models(),
        Commands::Debug => handle_debug(),
    }
}

/// Handle the ask command: resolve, send, render.
async fn handle_ask(words: &[String], model: Model, raw: bool) -> Result<()> {
    // Validate before touching the config or the network.
    let question = Question::from_words(words)?;

    let store = ConfigStore::default_location()?;
    let api_key = credentials::resolve_api_key(&store)?;
    let client = ApiClient::new()?;

    info!("Asking {} ({} chars)", model, question.as_str().len());

    let spinner = query_spinner(atty::is(atty::Stream::Stderr));

    // Dropping the request future on Ctrl+C cancels the call.
    let result = tokio::select! {
        result = client.ask(&question, model, &api_key) => result,
        _ = tokio::signal::ctrl_c() => {
            spinner.finish_and_clear();
            eprintln!("Interrupted");
            std::process::exit(EXIT_INTERRUPTED);
        }
    };
    spinner.finish_and_clear();
    let envelope = result?;

    let output = render::render(&envelope, raw);
    let mut stdout = std::io::stdout().lock();
    let mut stderr = std::io::stderr().lock();
    output
        .write_to(&mut stdout, &mut stderr, OutputMode::detect())
        .context("Failed to write response")?;
    stdout.flush()?;

    if let Some(reason) = output.failure_reason() {
        bail!("response did not contain an answer: {}", reason);
    }
    Ok(())
}

/// Spinner shown on stderr while a request is in flight.
fn query_spinner(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Querying Perplexity AI...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// What `configure` did to the stored key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigureOutcome {
    Saved,
    Unchanged,
}

/// Handle the configure command against `store`.
fn handle_configure(store: &ConfigStore, key: Option<String>) -> Result<ConfigureOutcome> {
    let mut config = store.load();

    let current = ApiKey::parse(&config.api_key);
    match &current {
        Some(key) => println!("Current API key: {}", key.masked()),
        None => println!("No API key configured"),
    }

    let entered = match key {
        Some(key) => key,
        None => {
            let masked = current.as_ref().map(ApiKey::masked);
            match prompt::prompt_api_key(masked.as_deref())? {
                prompt::PromptResult::Entered(key) => key,
                prompt::PromptResult::Kept => {
                    println!("Configuration unchanged.");
                    return Ok(ConfigureOutcome::Unchanged);
                }
            }
        }
    };

    let Some(new_key) = ApiKey::parse(&entered) else {
        bail!("the entered key has no usable characters; configuration unchanged");
    };

    if current.as_ref() == Some(&new_key) {
        println!("Configuration unchanged.");
        return Ok(ConfigureOutcome::Unchanged);
    }

    config.api_key = new_key.as_str().to_string();
    store.save(&config)?;
    debug!("Saved API key to {}", store.path().display());
    println!("API key saved successfully: {}", new_key.masked());
    Ok(ConfigureOutcome::Saved)
}

/// Handle the models command.
fn handle_models() -> Result<()> {
    println!("Available Perplexity Models");
    println!("===========================\n");

    for model in Model::ALL {
        let default_marker = if model == Model::default() { " (default)" } else { "" };
        println!(
            "  {}{}\n    context: {}\n    {}\n",
            model.id(),
            default_marker,
            model.context_length(),
            model.description()
        );
    }

    println!("Usage:");
    println!("  pplx ask --model sonar-reasoning \"Your question here\"");
    Ok(())
}

/// Handle the debug command.
fn handle_debug() -> Result<()> {
    let store = ConfigStore::default_location()?;
    println!("Debugging Information");
    println!("=====================\n");
    println!("{}", diagnostics::gather_current(&store));
    Ok(())
}
