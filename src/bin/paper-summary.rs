//! CLI binary for paper-summary.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `SummaryConfig`, runs one summary per identifier and prints the Markdown.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use paper_summary::summarize::write_markdown;
use paper_summary::{PaperSummary, Summarizer, SummaryConfig};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

/// Identifiers offered in interactive mode.
const EXAMPLE_IDS: [&str; 2] = ["2309.05463", "2306.01116"];

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarise a paper (stdout)
  paper-summary 2309.05463

  # Write to a file, with YAML front matter
  paper-summary 2306.01116 --metadata -o falcon.md

  # Smaller context budget, specific model
  paper-summary --token-budget 12000 --provider anthropic --model claude-haiku-4-20250514 2309.05463

  # Enter identifiers one per line
  paper-summary --interactive

ENV FILE (default ./.env, read without modifying the process environment):
  PAPER_SUMMARY_TOKEN_BUDGET   Token ceiling for paper text (default 30000)
  PAPER_SUMMARY_DOWNLOAD_TIMEOUT  Lookup/download timeout in seconds (default 120)
  PAPER_SUMMARY_PROVIDER       LLM provider name
  PAPER_SUMMARY_MODEL          LLM model id
  PAPER_SUMMARY_TOKENIZER      Path to a tokenizer.json for exact token counts
  PAPER_SUMMARY_ARXIV_API      arXiv query endpoint
  PDFIUM_LIB_PATH              Directory containing libpdfium
  ANTHROPIC_API_KEY            Anthropic API key
  OPENAI_API_KEY               OpenAI API key

PROCESS ENVIRONMENT (API keys here are used when the env file has none):
  ANTHROPIC_API_KEY       Anthropic API key (preferred when set)
  OPENAI_API_KEY          OpenAI API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (with EDGEQUAKE_MODEL)
  EDGEQUAKE_MODEL         Override model ID
  RUST_LOG                Log filter, e.g. paper_summary=debug
"#;

/// Summarise arXiv papers into Markdown sections using an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "paper-summary",
    version,
    about = "Summarise arXiv papers into Markdown sections using an LLM",
    long_about = "Fetch an arXiv paper by identifier, extract its text, and ask an LLM for its \
objective, implementation steps, key insights and results, rendered as Markdown.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// arXiv identifier, e.g. 2309.05463.
    #[arg(required_unless_present = "interactive")]
    paper_id: Option<String>,

    /// Write Markdown to this file instead of stdout.
    #[arg(short, long, env = "PAPER_SUMMARY_OUTPUT")]
    output: Option<PathBuf>,

    /// Env file with PAPER_SUMMARY_* settings.
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Token ceiling for the paper text sent to the model.
    #[arg(long)]
    token_budget: Option<usize>,

    /// Timeout in seconds for the arXiv lookup and the PDF download.
    #[arg(long)]
    download_timeout: Option<u64>,

    /// LLM model ID.
    #[arg(long)]
    model: Option<String>,

    /// LLM provider: anthropic, openai, gemini, ollama, ...
    #[arg(long)]
    provider: Option<String>,

    /// Path to a HuggingFace tokenizer.json for token counting.
    #[arg(long)]
    tokenizer: Option<PathBuf>,

    /// Prepend YAML front matter with paper metadata.
    #[arg(long)]
    metadata: bool,

    /// Output structured JSON instead of Markdown.
    #[arg(long)]
    json: bool,

    /// Read identifiers from stdin, one per line.
    #[arg(short, long)]
    interactive: bool,

    /// Disable the spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; keep INFO logs from
    // drawing over it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    let config = build_config(&cli)?;
    let summarizer = Summarizer::from_config(&config).context("Failed to set up pipeline")?;

    if cli.interactive {
        return run_interactive(&cli, &summarizer, show_progress).await;
    }

    let paper_id = cli
        .paper_id
        .as_deref()
        .context("A paper identifier is required")?;
    let summary = run_one(&summarizer, paper_id, show_progress).await?;
    emit(&cli, &summary).await
}

/// Map CLI args and the env file onto `SummaryConfig`.
fn build_config(cli: &Cli) -> Result<SummaryConfig> {
    let mut builder = SummaryConfig::builder()
        .env_file(&cli.env_file)
        .context("Invalid env file")?
        .include_metadata(cli.metadata);

    if let Some(n) = cli.token_budget {
        builder = builder.token_budget(n);
    }
    if let Some(secs) = cli.download_timeout {
        builder = builder.download_timeout_secs(secs);
    }
    if let Some(ref m) = cli.model {
        builder = builder.model(m);
    }
    if let Some(ref p) = cli.provider {
        builder = builder.provider_name(p);
    }
    if let Some(ref t) = cli.tokenizer {
        builder = builder.tokenizer_path(t);
    }

    builder.build().context("Invalid configuration")
}

async fn run_one(summarizer: &Summarizer, paper_id: &str, show_progress: bool) -> Result<PaperSummary> {
    let spinner = show_progress.then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix(paper_id.to_string());
        bar.set_message("fetching, extracting and summarising…");
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let result = summarizer.summarize(paper_id).await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    let summary = result.with_context(|| format!("Failed to summarise '{paper_id}'"))?;

    for w in &summary.warnings {
        eprintln!("{} {}", yellow("⚠"), w);
    }
    Ok(summary)
}

async fn emit(cli: &Cli, summary: &PaperSummary) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(summary).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    if let Some(ref path) = cli.output {
        write_markdown(path, &summary.markdown)
            .await
            .context("Failed to write output")?;
        if !cli.quiet {
            eprintln!(
                "{}  {}  →  {}",
                green("✔"),
                summary.record.title,
                bold(&path.display().to_string()),
            );
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(summary.markdown.as_bytes())
            .context("Failed to write to stdout")?;
        if !summary.markdown.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet {
        let s = &summary.stats;
        eprintln!(
            "   {} pages used{}  /  {} tokens in  /  {} tokens out  /  {}ms total",
            dim(&format!("{}/{}", s.pages_used, s.pages_total)),
            if s.truncated { " (budget reached)" } else { "" },
            dim(&s.input_tokens.to_string()),
            dim(&s.output_tokens.to_string()),
            s.total_duration_ms,
        );
    }
    Ok(())
}

/// Prompt for identifiers until EOF or an empty line.
///
/// Failures are reported and the loop continues with the next identifier.
async fn run_interactive(cli: &Cli, summarizer: &Summarizer, show_progress: bool) -> Result<()> {
    eprintln!(
        "{} Enter an arXiv paper ID (examples: {}). Empty line to quit.",
        bold("paper-summary"),
        EXAMPLE_IDS.join(", ")
    );

    let stdin = io::stdin();
    loop {
        eprint!("{} ", bold(">"));
        io::stderr().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).context("Failed to read stdin")? == 0 {
            break;
        }
        let paper_id = line.trim();
        if paper_id.is_empty() {
            break;
        }

        match run_one(summarizer, paper_id, show_progress).await {
            Ok(summary) => emit(cli, &summary).await?,
            Err(e) => eprintln!("{e:#}"),
        }
    }
    Ok(())
}
