//! CLI binary for talent-trawler.
//!
//! A thin shim over the library crate that maps CLI flags to `TrawlConfig`,
//! wires Ctrl-C to cancellation and prints the batch summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use talent_trawler::config::{DEFAULT_MODEL, DEFAULT_PROVIDER, DEFAULT_SCHEMA_FILE};
use talent_trawler::{
    create_example, trawl_folder_with_cancellation, BatchProgressCallback, Pricing,
    ProgressCallback, TrawlConfig, TrawlOutput,
};
use tokio_util::sync::CancellationToken;
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch plus a log line per
/// resume. Resumes may finish out of order when `--concurrency` > 1.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Loading schema…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} resumes  \
                 ⏱ {elapsed_precise}  ETA {eta_precise}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_length(total as u64);
        self.bar.set_prefix("Trawling");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total} resumes…"))
        ));
    }

    fn on_document_start(&self, index: usize, _total: usize, document_id: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(index, Instant::now());
        }
        self.bar.set_message(document_id.to_string());
    }

    fn on_document_complete(&self, index: usize, total: usize, document_id: &str) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            green("✓"),
            index + 1,
            total,
            document_id,
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, total: usize, document_id: &str, error: &str) {
        let secs = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['…']).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            red("✗"),
            index + 1,
            total,
            document_id,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _total: usize, _succeeded: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Create a folder with an example config.json, then drop PDFs into it
  talent-trawler --create-example resumes --subject "Data Engineer"

  # Extract every resume in the folder
  talent-trawler resumes

  # Four resumes at a time with a different model
  talent-trawler resumes -c 4 --provider openai --model gpt-4.1

FOLDER LAYOUT:
  resumes/
    config.json        question schema (subject, output_mode, questions)
    alice.pdf
    bob.PDF
    resume_trawl_2_resumes_20250314_092653.csv   ← written by the tool

ENVIRONMENT VARIABLES:
  ANTHROPIC_API_KEY      Anthropic API key (default provider)
  OPENAI_API_KEY         OpenAI API key
  GEMINI_API_KEY         Google Gemini API key
  EDGEQUAKE_PROVIDER     Override provider (anthropic, openai, gemini, ollama)
  EDGEQUAKE_MODEL        Override model ID
  TRAWLER_PDFIUM_DIR     Directory holding the pdfium shared library

  A .env file in the working directory is loaded at startup.
"#;

/// Extract structured fields from resume PDFs using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "talent-trawler",
    version,
    about = "Extract structured fields from resume PDFs using Vision LLMs",
    long_about = "Read every PDF resume in a folder with a vision language model and answer the \
questions in the folder's config.json for each one. Results are written as a single CSV or JSON \
file next to the resumes, one row or record per resume.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Folder containing the resume PDFs and config.json.
    #[arg(required_unless_present = "create_example")]
    input: Option<PathBuf>,

    /// Write an example config.json into FOLDER and exit.
    #[arg(long, value_name = "FOLDER")]
    create_example: Option<PathBuf>,

    /// Role the example schema screens for.
    #[arg(long, env = "TRAWLER_SUBJECT", default_value = "Product Manager")]
    subject: String,

    /// Overwrite an existing config.json with --create-example.
    #[arg(long)]
    force: bool,

    /// Schema file name inside the input folder.
    #[arg(long, env = "TRAWLER_SCHEMA_FILE", default_value = DEFAULT_SCHEMA_FILE)]
    schema_file: String,

    /// LLM model ID.
    #[arg(long, env = "EDGEQUAKE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// LLM provider: anthropic, openai, gemini, ollama.
    #[arg(long, env = "EDGEQUAKE_PROVIDER", default_value = DEFAULT_PROVIDER)]
    provider: String,

    /// Number of resumes processed at the same time.
    #[arg(short, long, env = "TRAWLER_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Keep rendered page images under this directory.
    #[arg(long, env = "TRAWLER_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Directory holding the pdfium shared library.
    #[arg(long, env = "TRAWLER_PDFIUM_DIR")]
    pdfium_dir: Option<PathBuf>,

    /// Longest edge of a rendered page in pixels.
    #[arg(long, env = "TRAWLER_MAX_PIXELS", default_value_t = 2000,
          value_parser = clap::value_parser!(u32).range(100..=10000))]
    max_pixels: u32,

    /// Max LLM output tokens per resume.
    #[arg(long, env = "TRAWLER_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "TRAWLER_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Input token price, USD per 1M tokens.
    #[arg(long, env = "TRAWLER_INPUT_PRICE", default_value_t = 3.0)]
    input_price: f64,

    /// Output token price, USD per 1M tokens.
    #[arg(long, env = "TRAWLER_OUTPUT_PRICE", default_value_t = 15.0)]
    output_price: f64,

    /// Per-resume LLM call timeout in seconds.
    #[arg(long, env = "TRAWLER_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Print the batch report as JSON on stdout.
    #[arg(long, env = "TRAWLER_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "TRAWLER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "TRAWLER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "TRAWLER_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Loaded first so env-backed flags see .env values.
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && cli.create_example.is_none();
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

    // ── Example mode ─────────────────────────────────────────────────────
    if let Some(ref folder) = cli.create_example {
        let path = create_example(folder, &cli.subject, &cli.schema_file, cli.force)
            .context("Failed to create example schema")?;
        if !cli.quiet {
            eprintln!(
                "{} Example schema written to {}",
                green("✔"),
                bold(&path.display().to_string())
            );
            eprintln!(
                "   Add PDF resumes to {} and run: talent-trawler {}",
                folder.display(),
                folder.display()
            );
        }
        return Ok(());
    }

    let input = cli
        .input
        .clone()
        .context("An input folder is required")?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Ctrl-C → cancel ──────────────────────────────────────────────────
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\n{} Cancelling, finished resumes will still be saved…", cyan("⚠"));
                cancel.cancel();
            }
        });
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let output = trawl_folder_with_cancellation(&input, &config, cancel)
        .await
        .context("Trawl failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output.report)
            .context("Failed to serialise report")?;
        println!("{json}");
    }
    if !cli.quiet {
        print_summary(&output);
    }

    Ok(())
}

/// Map CLI args to `TrawlConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<TrawlConfig> {
    let mut builder = TrawlConfig::builder()
        .model(&cli.model)
        .provider_name(&cli.provider)
        .concurrency(cli.concurrency)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .pricing(Pricing::new(cli.input_price, cli.output_price))
        .api_timeout_secs(cli.api_timeout)
        .schema_file(&cli.schema_file)
        .max_rendered_pixels(cli.max_pixels);

    if let Some(ref dir) = cli.scratch_dir {
        builder = builder.scratch_dir(dir);
    }
    if let Some(ref dir) = cli.pdfium_dir {
        builder = builder.pdfium_library_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(output: &TrawlOutput) {
    let s = &output.report.summary;
    let mark = if s.failed == 0 {
        green("✔")
    } else if s.succeeded == 0 {
        red("✘")
    } else {
        cyan("⚠")
    };

    eprintln!();
    eprintln!("{}", bold("PROCESSING SUMMARY"));
    eprintln!(
        "{}  {}/{} resumes extracted{}",
        mark,
        s.succeeded,
        s.total_documents,
        if s.failed > 0 {
            format!("  ({} failed)", red(&s.failed.to_string()))
        } else {
            String::new()
        }
    );
    if output.report.cancelled {
        eprintln!("   {}", cyan("batch was cancelled"));
    }
    eprintln!(
        "   cost ${:.4} total, ${:.4} per resume",
        s.total_cost, s.average_cost
    );
    eprintln!(
        "   {} tokens in  /  {} tokens out",
        dim(&s.total_input_tokens.to_string()),
        dim(&s.total_output_tokens.to_string()),
    );
    eprintln!("   →  {}", bold(&output.output_path.display().to_string()));
}
