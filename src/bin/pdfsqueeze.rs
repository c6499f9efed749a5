//! CLI binary for pdfsqueeze.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `SqueezeConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdfsqueeze::{inspect, squeeze_file, QualityProfile, SqueezeConfig};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
#[cfg(feature = "server")]
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Compress with the default (medium) profile
  pdfsqueeze compress report.pdf

  # Aggressive compression to an explicit output path
  pdfsqueeze compress --profile maximum report.pdf -o report.small.pdf

  # Machine-readable report
  pdfsqueeze compress --json report.pdf

  # Inspect structure without compressing (page count, encryption)
  pdfsqueeze inspect report.pdf

  # Run the HTTP API
  pdfsqueeze serve --bind 0.0.0.0:8080

PROFILES:
  Profile   Ghostscript tier  Image DPI
  ───────   ────────────────  ─────────
  low       /printer          300
  medium    /ebook            200   (default)
  high      /ebook            150
  maximum   /screen           150

REQUIREMENTS:
  Ghostscript (gs) and qpdf must be installed and on PATH.
    Debian/Ubuntu:  apt install ghostscript qpdf
    macOS:          brew install ghostscript qpdf

ENVIRONMENT VARIABLES:
  PDFSQUEEZE_PROFILE    Default quality profile
  PDFSQUEEZE_MIN_GAIN   Minimum % reduction before the fallback is skipped
  PDFSQUEEZE_TIMEOUT    Overall deadline in seconds (0 disables)
  PDFSQUEEZE_GS         Ghostscript binary name or path
  PDFSQUEEZE_QPDF       qpdf binary name or path
"#;

/// Shrink PDF files via Ghostscript and qpdf with a size-safe fallback.
#[derive(Parser, Debug)]
#[command(
    name = "pdfsqueeze",
    version,
    about = "Shrink PDF files via Ghostscript and qpdf with a size-safe fallback",
    long_about = "Compress PDF documents by composing Ghostscript and qpdf and always keeping \
the smallest safe result. The output is never larger than the input: when no pipeline \
beats the original, the original comes back unchanged.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFSQUEEZE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFSQUEEZE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Compress a PDF file.
    Compress(CompressArgs),
    /// Report a PDF's structure (page count, encryption) without compressing.
    Inspect(InspectArgs),
    /// Run the HTTP API.
    #[cfg(feature = "server")]
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct CompressArgs {
    /// PDF file to compress.
    input: PathBuf,

    /// Output path. Default: `<input>.squeezed.pdf` next to the input.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Quality profile: low, medium, high, maximum.
    #[arg(short, long, env = "PDFSQUEEZE_PROFILE", value_enum, default_value = "medium")]
    profile: ProfileArg,

    /// Minimum % reduction pipeline 1 must achieve before the fallback is skipped.
    #[arg(long, env = "PDFSQUEEZE_MIN_GAIN", default_value_t = 5)]
    min_gain: u8,

    /// Overall deadline in seconds; 0 disables.
    #[arg(long, env = "PDFSQUEEZE_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Ghostscript binary name or path.
    #[arg(long, env = "PDFSQUEEZE_GS", default_value = "gs")]
    gs_binary: String,

    /// qpdf binary name or path.
    #[arg(long, env = "PDFSQUEEZE_QPDF", default_value = "qpdf")]
    qpdf_binary: String,

    /// Output the run report as JSON instead of the summary line.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// PDF file to inspect.
    input: PathBuf,

    /// qpdf binary name or path.
    #[arg(long, env = "PDFSQUEEZE_QPDF", default_value = "qpdf")]
    qpdf_binary: String,

    /// Output as JSON.
    #[arg(long)]
    json: bool,
}

#[cfg(feature = "server")]
#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to bind.
    #[arg(long, env = "PDFSQUEEZE_BIND", default_value = "127.0.0.1:8080")]
    bind: std::net::SocketAddr,

    /// Request body limit in mebibytes.
    #[arg(long, env = "PDFSQUEEZE_BODY_LIMIT_MB", default_value_t = 100)]
    body_limit_mb: usize,

    /// Default quality profile for requests that do not specify one.
    #[arg(short, long, env = "PDFSQUEEZE_PROFILE", value_enum, default_value = "medium")]
    profile: ProfileArg,

    /// Overall per-request deadline in seconds; 0 disables.
    #[arg(long, env = "PDFSQUEEZE_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Ghostscript binary name or path.
    #[arg(long, env = "PDFSQUEEZE_GS", default_value = "gs")]
    gs_binary: String,

    /// qpdf binary name or path.
    #[arg(long, env = "PDFSQUEEZE_QPDF", default_value = "qpdf")]
    qpdf_binary: String,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ProfileArg {
    Low,
    Medium,
    High,
    Maximum,
}

impl From<ProfileArg> for QualityProfile {
    fn from(v: ProfileArg) -> Self {
        match v {
            ProfileArg::Low => QualityProfile::Low,
            ProfileArg::Medium => QualityProfile::Medium,
            ProfileArg::High => QualityProfile::High,
            ProfileArg::Maximum => QualityProfile::Maximum,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        CliCommand::Compress(args) => run_compress(args, cli.quiet).await,
        CliCommand::Inspect(args) => run_inspect(args).await,
        #[cfg(feature = "server")]
        CliCommand::Serve(args) => run_serve(args).await,
    }
}

async fn run_compress(args: CompressArgs, quiet: bool) -> Result<()> {
    let config = SqueezeConfig::builder()
        .profile(args.profile.into())
        .min_gain_percent(args.min_gain)
        .deadline_secs(args.timeout)
        .gs_binary(&args.gs_binary)
        .qpdf_binary(&args.qpdf_binary)
        .build()
        .context("Invalid configuration")?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("squeezed.pdf"));

    let spinner = if quiet || args.json {
        None
    } else {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Compressing");
        bar.set_message(args.input.display().to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    };

    let result = squeeze_file(&args.input, &output, &config).await;

    if let Some(bar) = &spinner {
        bar.finish_and_clear();
    }
    let report = result.context("Compression failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !quiet {
        eprintln!(
            "{}  {} → {}  {}  →  {}",
            green("✔"),
            human_size(report.original_size),
            bold(&human_size(report.final_size)),
            dim(&format!(
                "{}% smaller, {} pipeline, {}ms",
                report.reduction_percent,
                match report.source {
                    pdfsqueeze::CandidateSource::Primary => "primary",
                    pdfsqueeze::CandidateSource::Fallback => "fallback",
                    pdfsqueeze::CandidateSource::Original => "no-op",
                },
                report.duration_ms
            )),
            bold(&output.display().to_string()),
        );
        if report.reduction_percent == 0 {
            eprintln!(
                "   {}",
                dim("no pipeline beat the original; output is the input unchanged")
            );
        }
    }

    Ok(())
}

async fn run_inspect(args: InspectArgs) -> Result<()> {
    let config = SqueezeConfig::builder()
        .qpdf_binary(&args.qpdf_binary)
        .build()
        .context("Invalid configuration")?;

    let bytes = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("Failed to read '{}'", args.input.display()))?;

    let info = inspect(bytes, &config).await.context("Inspect failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&info).context("Failed to serialise info")?
        );
    } else {
        println!("File:         {}", args.input.display());
        println!("Size:         {} ({} bytes)", human_size(info.size), info.size);
        println!("Pages:        {}", info.page_count);
        println!("Encrypted:    {}", info.encrypted);
        if let Some(ref v) = info.pdf_version {
            println!("PDF Version:  {v}");
        }
    }

    Ok(())
}

#[cfg(feature = "server")]
async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = SqueezeConfig::builder()
        .profile(args.profile.into())
        .deadline_secs(args.timeout)
        .gs_binary(&args.gs_binary)
        .qpdf_binary(&args.qpdf_binary)
        .build()
        .context("Invalid configuration")?;

    eprintln!(
        "{} {}",
        cyan("◆"),
        bold(&format!("pdfsqueeze API on http://{}", args.bind))
    );

    pdfsqueeze::server::serve(args.bind, config, args.body_limit_mb * 1024 * 1024)
        .await
        .context("Server failed")
}

/// Render a byte count the way humans read file sizes.
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[0])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
