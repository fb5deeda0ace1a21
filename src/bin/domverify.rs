//! CLI binary for domicile-verify.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `VerificationConfig` and prints JSON results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use domicile_verify::{
    analyze_and_verify, verify_document_response, DocumentResponse, VerificationConfig,
};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

const AFTER_HELP: &str = r#"EXAMPLES:
  # Verify one scanned letter
  domverify check mail.pdf

  # Several documents, four classifier calls at a time
  domverify check -c 4 scans/*.pdf

  # From a URL, against another domiciliation address
  domverify --reference-address "12 RUE DE LA PAIX 75002 PARIS" check https://example.org/mail.pdf

  # Re-run the matching on a saved model reply (no API key needed)
  domverify text reply.txt
  cat reply.txt | domverify text -

  # HTTP API
  domverify serve --listen 0.0.0.0:8000

OUTPUT:
  check prints one JSON object per input: the verdict (Publicity,
  Valid_recipients, unique_recipient, Recipients, First_recipient) plus a
  "Speed" block, or {"error": "..."} when the document could not be read.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium instead of the system one
"#;

/// Verify that scanned mail is addressed to the domiciliation address.
#[derive(Parser, Debug)]
#[command(
    name = "domverify",
    version,
    about = "Verify recipient addresses on scanned domiciliation mail using Vision LLMs",
    long_about = "Read the recipient block of scanned mail (PDF or image, local file or URL) \
with a Vision Language Model, then decide with fuzzy matching whether the letter is really \
addressed to the domiciliation address, whether it is advertising, and whether all recipients \
are the same entity.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOMVERIFY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, global = true, env = "DOMVERIFY_QUIET")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify one or more documents (local PDF/image path or HTTP/HTTPS URL).
    Check {
        /// Documents to verify.
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Number of documents verified at the same time.
        #[arg(short, long, env = "DOMVERIFY_CONCURRENCY", default_value_t = 4,
              value_parser = clap::value_parser!(u32).range(1..=64))]
        concurrency: u32,

        /// Disable the progress spinner.
        #[arg(long, env = "DOMVERIFY_NO_PROGRESS")]
        no_progress: bool,
    },

    /// Run the matching on a saved model reply, without any API call.
    Text {
        /// File holding the reply; `-` or nothing reads stdin.
        file: Option<PathBuf>,
    },

    /// Serve the HTTP API.
    #[cfg(feature = "server")]
    Serve {
        /// Address to listen on.
        #[arg(long, env = "DOMVERIFY_LISTEN", default_value = "0.0.0.0:8000")]
        listen: String,
    },
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Domiciliation address the mail must be addressed to.
    #[arg(long, global = true, env = "DOMVERIFY_REFERENCE_ADDRESS",
          default_value = domicile_verify::config::DEFAULT_REFERENCE_ADDRESS)]
    reference_address: String,

    /// Minimum token-set score (0–100) for an address to match.
    #[arg(long, global = true, env = "DOMVERIFY_ADDRESS_THRESHOLD",
          default_value_t = domicile_verify::config::DEFAULT_ADDRESS_THRESHOLD,
          value_parser = clap::value_parser!(u8).range(0..=100))]
    address_threshold: u8,

    /// Minimum token-set score (0–100) for two recipients to be the same entity.
    #[arg(long, global = true, env = "DOMVERIFY_IDENTITY_THRESHOLD",
          default_value_t = domicile_verify::config::DEFAULT_IDENTITY_THRESHOLD,
          value_parser = clap::value_parser!(u8).range(0..=100))]
    identity_threshold: u8,

    /// Cost per token used for the "Cost" estimate.
    #[arg(long, global = true, env = "DOMVERIFY_UNIT_COST",
          default_value_t = domicile_verify::config::DEFAULT_UNIT_COST_PER_TOKEN)]
    unit_cost: f64,

    /// LLM model ID (e.g. gpt-4.1-mini, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, global = true, env = "DOMVERIFY_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        global = true,
        env = "DOMVERIFY_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// PDF user password for encrypted documents.
    #[arg(long, global = true, env = "DOMVERIFY_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom extraction prompt.
    #[arg(long, global = true, env = "DOMVERIFY_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens.
    #[arg(long, global = true, env = "DOMVERIFY_MAX_TOKENS", default_value_t = 1000)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, global = true, env = "DOMVERIFY_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Retries on LLM failure (0–10).
    #[arg(long, global = true, env = "DOMVERIFY_MAX_RETRIES", default_value_t = 3,
          value_parser = clap::value_parser!(u32).range(0..=domicile_verify::config::MAX_RETRIES_LIMIT as i64))]
    max_retries: u32,

    /// HTTP download timeout in seconds.
    #[arg(long, global = true, env = "DOMVERIFY_DOWNLOAD_TIMEOUT", default_value_t = 10)]
    download_timeout: u64,

    /// LLM call timeout in seconds.
    #[arg(long, global = true, env = "DOMVERIFY_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO-level library logs in `check`.
    let show_progress = match &cli.command {
        Command::Check { no_progress, .. } => !cli.quiet && !no_progress,
        _ => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli.config).await?;

    match cli.command {
        Command::Check {
            ref inputs,
            concurrency,
            ..
        } => run_check(inputs, concurrency as usize, &config, show_progress).await,
        Command::Text { ref file } => run_text(file.as_deref(), &config).await,
        #[cfg(feature = "server")]
        Command::Serve { ref listen } => domicile_verify::server::run_server(listen, config)
            .await
            .context("HTTP server failed"),
    }
}

/// Verify every input and print one JSON response each, in input order.
async fn run_check(
    inputs: &[String],
    concurrency: usize,
    config: &VerificationConfig,
    show_progress: bool,
) -> Result<()> {
    let bar = show_progress.then(|| spinner(inputs.len()));

    let responses: Vec<(String, DocumentResponse)> = stream::iter(inputs.iter().cloned())
        .map(|input| {
            let bar = bar.clone();
            async move {
                let response = verify_document_response(&input, config).await;
                if let Some(bar) = bar {
                    report_line(&bar, &input, &response);
                    bar.inc(1);
                }
                (input, response)
            }
        })
        .buffered(concurrency)
        .collect()
        .await;

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let failed = responses.iter().filter(|(_, r)| r.is_error()).count();
    if let [(_, response)] = responses.as_slice() {
        println!(
            "{}",
            serde_json::to_string_pretty(response).context("Failed to serialise result")?
        );
    } else {
        for (input, response) in &responses {
            let line = serde_json::json!({ "input": input, "result": response });
            println!(
                "{}",
                serde_json::to_string(&line).context("Failed to serialise result")?
            );
        }
    }

    if failed > 0 {
        anyhow::bail!(
            "{} of {} document(s) could not be verified",
            failed,
            responses.len()
        );
    }
    Ok(())
}

/// Offline mode: matching only, on a reply read from a file or stdin.
async fn run_text(file: Option<&std::path::Path>, config: &VerificationConfig) -> Result<()> {
    let raw = match file {
        Some(path) if path != std::path::Path::new("-") => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read model reply from {:?}", path))?,
        _ => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read model reply from stdin")?;
            buf
        }
    };

    let verdict = analyze_and_verify(&raw, &config.matching).context("Verification failed")?;
    println!(
        "{}",
        serde_json::to_string_pretty(&verdict).context("Failed to serialise verdict")?
    );
    Ok(())
}

fn spinner(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  {pos}/{len} documents  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS),
    );
    bar.set_prefix("Verifying");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn report_line(bar: &ProgressBar, input: &str, response: &DocumentResponse) {
    match response {
        DocumentResponse::Report(report) => bar.println(format!(
            "  {} {}  {}  {}",
            green("✓"),
            bold(input),
            if report.verdict.valid_recipients {
                green("valid")
            } else {
                red("not addressed here")
            },
            dim(&format!(
                "{:.1}s  {} tokens",
                report.speed.total_secs, report.speed.tokens_used
            )),
        )),
        DocumentResponse::Error { error } => {
            let first_line = error.lines().next().unwrap_or_default();
            bar.println(format!("  {} {}  {}", red("✗"), bold(input), red(first_line)));
        }
    }
}

/// Map CLI args to `VerificationConfig`.
async fn build_config(args: &ConfigArgs) -> Result<VerificationConfig> {
    let mut builder = VerificationConfig::builder()
        .reference_address(args.reference_address.clone())
        .address_threshold(args.address_threshold)
        .identity_threshold(args.identity_threshold)
        .unit_cost_per_token(args.unit_cost)
        .max_tokens(args.max_tokens)
        .temperature(args.temperature)
        .max_retries(args.max_retries)
        .download_timeout_secs(args.download_timeout)
        .api_timeout_secs(args.api_timeout);

    if let Some(ref path) = args.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref password) = args.password {
        builder = builder.password(password.clone());
    }

    builder.build().context("Invalid configuration")
}
