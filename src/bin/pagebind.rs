//! CLI binary for pagebind.
//!
//! A thin shim over the library crate: each subcommand wires up exactly one
//! pipeline, maps CLI flags to its settings struct, and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use pagebind::{
    export, inspect, merge_to_file, preview, AssemblySettings, CancelToken, Catalog,
    ExportSettings, ExportSource, ImageCollection, Locale, Orientation, OutputFormat,
    PageSizePreset, PreviewSettings, PreviewState, ProgressHandle, ProgressObserver, SortKey,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
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

// ── CLI progress observer using indicatif ────────────────────────────────────

const PHASE_SPINNER: u8 = 0;
const PHASE_BYTES: u8 = 1;
const PHASE_UNITS: u8 = 2;

/// Terminal progress observer: a byte-loading bar while the source streams
/// in, then a page/image counter once the unit total is known.
struct CliProgress {
    bar: ProgressBar,
    phase: AtomicU8,
    unit_label: &'static str,
}

impl CliProgress {
    fn new(prefix: &'static str, unit_label: &'static str) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(spinner_style);
        bar.set_prefix(prefix);
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            phase: AtomicU8::new(PHASE_SPINNER),
            unit_label,
        })
    }

    fn activate_bytes(&self) {
        if self.phase.swap(PHASE_BYTES, Ordering::SeqCst) == PHASE_BYTES {
            return;
        }
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {bytes}/{total_bytes}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        self.bar.set_style(style);
    }

    fn activate_units(&self, total: usize) {
        self.phase.store(PHASE_UNITS, Ordering::SeqCst);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        self.bar.set_style(style);
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_message(self.unit_label);
    }
}

impl ProgressObserver for CliProgress {
    fn on_load_progress(&self, loaded: u64, total: Option<u64>) {
        self.activate_bytes();
        if let Some(t) = total {
            if self.bar.length().unwrap_or(0) != t {
                self.bar.set_length(t);
            }
        }
        self.bar.set_position(loaded);
    }

    fn on_job_start(&self, total_units: usize) {
        self.activate_units(total_units);
    }

    fn on_unit_complete(&self, unit: usize, _total_units: usize) {
        self.bar.set_position(unit as u64);
    }

    fn on_unit_error(&self, unit: usize, total_units: usize, error: &str) {
        let msg = if error.len() > 80 {
            format!("{}\u{2026}", &error[..79])
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} {unit}/{total_units}  {}", red("✗"), red(&msg)));
    }

    fn on_job_complete(&self, _total_units: usize, _succeeded: usize) {
        self.bar.finish_and_clear();
    }

    fn on_cancelled(&self, _completed_units: usize) {
        self.bar.finish_and_clear();
    }
}

// ── CLI definition ───────────────────────────────────────────────────────────

const AFTER_HELP: &str = r#"EXAMPLES:
  # Merge images into one PDF, one page per image
  pagebind merge scan-1.jpg scan-2.jpg -o scans.pdf

  # Sort by file name first, rotate the second image a quarter turn
  pagebind merge *.jpg --sort name --rotate 2:90 --page-size a4 --margin 36

  # Rasterise a PDF into PNGs at 300 DPI (>2 pages become one ZIP)
  pagebind export report.pdf --dpi 300 --out-dir ./pages

  # Preview rendering progress; Ctrl-C pauses the decode loop
  pagebind preview report.pdf

  # Document metadata only
  pagebind inspect report.pdf --json

  # Export straight from a URL
  pagebind export https://example.com/report.pdf --format jpeg
"#;

/// Merge images into a PDF, or rasterise a PDF back into images.
#[derive(Parser, Debug)]
#[command(
    name = "pagebind",
    version,
    about = "Merge images into a single PDF and rasterise PDF pages into images",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Interface language for summary messages.
    #[arg(long, global = true, env = "PAGEBIND_LANG", value_enum, default_value = "en")]
    lang: LangArg,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PAGEBIND_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PAGEBIND_QUIET")]
    quiet: bool,

    /// Disable progress bars.
    #[arg(long, global = true, env = "PAGEBIND_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge image files into a single PDF, in the order given.
    Merge {
        /// Image files, one page each. Non-image files are skipped.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output PDF path.
        #[arg(short, long, default_value = "merged.pdf")]
        output: PathBuf,

        /// Target page size.
        #[arg(long, value_enum, default_value = "a4")]
        page_size: PageSizeArg,

        /// Page orientation for preset sizes.
        #[arg(long, value_enum, default_value = "auto")]
        orientation: OrientationArg,

        /// Margin in points on the constrained axis.
        #[arg(long, default_value_t = 0.0)]
        margin: f32,

        /// Sort the collection before merging.
        #[arg(long, value_enum)]
        sort: Option<SortArg>,

        /// Rotate an image: INDEX:DEGREES with a 1-based index into the
        /// input list and degrees in {90, 180, 270}. Repeatable.
        #[arg(long = "rotate", value_name = "INDEX:DEGREES")]
        rotations: Vec<String>,
    },

    /// Rasterise every page of a PDF into image files.
    Export {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Target resolution in dots per inch.
        #[arg(long, env = "PAGEBIND_DPI", default_value_t = 300,
              value_parser = clap::value_parser!(u32).range(72..=600))]
        dpi: u32,

        /// Output image format.
        #[arg(long, value_enum, default_value = "png")]
        format: FormatArg,

        /// Base name for output files (default: source file stem).
        #[arg(long)]
        base_name: Option<String>,

        /// Directory receiving the files or archive.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// PDF user password for encrypted documents.
        #[arg(long, env = "PAGEBIND_PASSWORD")]
        password: Option<String>,
    },

    /// Render a PDF page by page, reporting progress. Ctrl-C pauses.
    Preview {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Render scale relative to the page's point size.
        #[arg(long, default_value_t = 1.5)]
        scale: f32,

        /// PDF user password for encrypted documents.
        #[arg(long, env = "PAGEBIND_PASSWORD")]
        password: Option<String>,
    },

    /// Print PDF document metadata, no rendering.
    Inspect {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Output metadata as JSON.
        #[arg(long)]
        json: bool,

        /// PDF user password for encrypted documents.
        #[arg(long, env = "PAGEBIND_PASSWORD")]
        password: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LangArg {
    En,
    Zh,
    Ja,
}

impl From<LangArg> for Locale {
    fn from(v: LangArg) -> Self {
        match v {
            LangArg::En => Locale::En,
            LangArg::Zh => Locale::Zh,
            LangArg::Ja => Locale::Ja,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PageSizeArg {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom,
}

impl From<PageSizeArg> for PageSizePreset {
    fn from(v: PageSizeArg) -> Self {
        match v {
            PageSizeArg::A4 => PageSizePreset::A4,
            PageSizeArg::A3 => PageSizePreset::A3,
            PageSizeArg::A5 => PageSizePreset::A5,
            PageSizeArg::Letter => PageSizePreset::Letter,
            PageSizeArg::Legal => PageSizePreset::Legal,
            PageSizeArg::Custom => PageSizePreset::Custom,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OrientationArg {
    Portrait,
    Landscape,
    Auto,
}

impl From<OrientationArg> for Orientation {
    fn from(v: OrientationArg) -> Self {
        match v {
            OrientationArg::Portrait => Orientation::Portrait,
            OrientationArg::Landscape => Orientation::Landscape,
            OrientationArg::Auto => Orientation::Auto,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Png,
    Jpeg,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => OutputFormat::Png,
            FormatArg::Jpeg => OutputFormat::Jpeg,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SortArg {
    Name,
    Time,
}

impl From<SortArg> for SortKey {
    fn from(v: SortArg) -> Self {
        match v {
            SortArg::Name => SortKey::Name,
            SortArg::Time => SortKey::Time,
        }
    }
}

// ── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Suppress INFO-level library logs while a progress bar is active; the
    // bar provides the feedback that matters.
    let show_progress = !cli.quiet && !cli.no_progress;
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

    let catalog = Catalog::builtin(cli.lang.into());
    let quiet = cli.quiet;

    match cli.command {
        Command::Merge {
            inputs,
            output,
            page_size,
            orientation,
            margin,
            sort,
            rotations,
        } => {
            run_merge(
                inputs, output, page_size, orientation, margin, sort, rotations, catalog,
                show_progress, quiet,
            )
            .await
        }
        Command::Export {
            input,
            dpi,
            format,
            base_name,
            out_dir,
            password,
        } => {
            run_export(
                input, dpi, format, base_name, out_dir, password, catalog, show_progress, quiet,
            )
            .await
        }
        Command::Preview {
            input,
            scale,
            password,
        } => run_preview(input, scale, password, catalog, show_progress, quiet).await,
        Command::Inspect {
            input,
            json,
            password,
        } => run_inspect(input, json, password, catalog).await,
    }
}

fn progress_handle(
    show: bool,
    prefix: &'static str,
    unit_label: &'static str,
) -> Option<ProgressHandle> {
    if show {
        Some(CliProgress::new(prefix, unit_label) as ProgressHandle)
    } else {
        None
    }
}

/// Substitute `{name}` placeholders in a catalog message.
fn fill(template: String, subs: &[(&str, String)]) -> String {
    let mut out = template;
    for (name, value) in subs {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

#[allow(clippy::too_many_arguments)]
async fn run_merge(
    inputs: Vec<PathBuf>,
    output: PathBuf,
    page_size: PageSizeArg,
    orientation: OrientationArg,
    margin: f32,
    sort: Option<SortArg>,
    rotations: Vec<String>,
    catalog: &Catalog,
    show_progress: bool,
    quiet: bool,
) -> Result<()> {
    let mut collection = ImageCollection::new();
    let added = collection.add_images(&inputs);
    if added < inputs.len() && !quiet {
        eprintln!(
            "{} {} of {} inputs skipped (not readable images)",
            cyan("⚠"),
            inputs.len() - added,
            inputs.len()
        );
    }
    if collection.is_empty() {
        anyhow::bail!("{}", catalog.get("merge.empty"));
    }

    // Rotations refer to the input order as listed, so apply them before any
    // sort reshuffles the collection.
    for spec in &rotations {
        let (index, degrees) = parse_rotation(spec)?;
        for _ in 0..degrees / 90 {
            collection
                .rotate(index - 1)
                .with_context(|| format!("--rotate {spec}"))?;
        }
    }
    if let Some(sort) = sort {
        collection.sort(sort.into());
    }

    let output_name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "merged.pdf".to_string());
    let out_dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."))
        .to_path_buf();

    let settings = AssemblySettings::builder()
        .page_size(page_size.into())
        .orientation(orientation.into())
        .margin_pt(margin)
        .output_name(output_name)
        .build()
        .context("Invalid merge settings")?;

    let progress = progress_handle(show_progress, "Merging", "images");
    let report = merge_to_file(&collection, &settings, &out_dir, progress)
        .await
        .with_context(|| catalog.get("merge.failed"))?;

    if !quiet {
        eprintln!(
            "{} {}  {}",
            green("✔"),
            fill(
                catalog.get("merge.done"),
                &[
                    ("pages", report.page_count.to_string()),
                    ("file", report.path.display().to_string()),
                ],
            ),
            dim(&format!("{}ms", report.duration_ms)),
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_export(
    input: String,
    dpi: u32,
    format: FormatArg,
    base_name: Option<String>,
    out_dir: PathBuf,
    password: Option<String>,
    catalog: &Catalog,
    show_progress: bool,
    quiet: bool,
) -> Result<()> {
    let mut builder = ExportSettings::builder().dpi(dpi).format(format.into());
    if let Some(name) = base_name {
        builder = builder.base_name(name);
    }
    if let Some(pwd) = password {
        builder = builder.password(pwd);
    }
    let settings = builder.build().context("Invalid export settings")?;

    let progress = progress_handle(show_progress, "Exporting", "pages");
    let outcome = export(ExportSource::Input(&input), &settings, &out_dir, progress)
        .await
        .with_context(|| catalog.get("export.failed"))?;

    if !quiet {
        let message = match &outcome.archive {
            Some(archive) => fill(
                catalog.get("export.archive"),
                &[
                    ("pages", outcome.page_count.to_string()),
                    ("file", archive.display().to_string()),
                ],
            ),
            None => fill(
                catalog.get("export.done"),
                &[
                    ("pages", outcome.page_count.to_string()),
                    ("dir", out_dir.display().to_string()),
                ],
            ),
        };
        eprintln!(
            "{} {}  {}",
            green("✔"),
            message,
            dim(&format!("{}ms", outcome.duration_ms)),
        );
    }
    Ok(())
}

async fn run_preview(
    input: String,
    scale: f32,
    password: Option<String>,
    catalog: &Catalog,
    show_progress: bool,
    quiet: bool,
) -> Result<()> {
    let mut builder = PreviewSettings::builder().scale(scale);
    if let Some(pwd) = password {
        builder = builder.password(pwd);
    }
    let settings = builder.build().context("Invalid preview settings")?;

    // Ctrl-C flips the token; the decode loop observes it at the next page
    // boundary, exactly like the pause button in a UI.
    let token = CancelToken::new();
    let pause = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            pause.cancel();
        }
    });

    let progress = progress_handle(show_progress, "Previewing", "pages");
    let session = preview(&input, &settings, token, progress)
        .await
        .with_context(|| catalog.get("preview.failed"))?;

    if !quiet {
        match &session.state {
            PreviewState::Completed => eprintln!(
                "{} {}",
                green("✔"),
                fill(
                    catalog.get("preview.completed"),
                    &[("pages", session.rendered_pages().to_string())],
                ),
            ),
            PreviewState::Paused { rendered } => eprintln!(
                "{} {}",
                cyan("⏸"),
                fill(
                    catalog.get("preview.paused"),
                    &[("pages", rendered.to_string())],
                ),
            ),
            PreviewState::Failed { detail } => {
                eprintln!("{} {}: {detail}", red("✘"), catalog.get("preview.failed"));
            }
            other => eprintln!("{} {:?}", cyan("•"), other),
        }
    }
    Ok(())
}

async fn run_inspect(
    input: String,
    json: bool,
    password: Option<String>,
    catalog: &Catalog,
) -> Result<()> {
    let meta = inspect(&input, password.as_deref())
        .await
        .context("Failed to inspect PDF")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&meta).context("Failed to serialise metadata")?
        );
    } else {
        println!("{}         {}", bold("File:"), input);
        if let Some(ref t) = meta.title {
            println!("{}        {}", bold(&format!("{}:", catalog.get("inspect.title"))), t);
        }
        if let Some(ref a) = meta.author {
            println!("{}       {}", bold(&format!("{}:", catalog.get("inspect.author"))), a);
        }
        println!(
            "{}        {}",
            bold(&format!("{}:", catalog.get("inspect.pages"))),
            meta.page_count
        );
        println!("{}  {}", bold("PDF Version:"), meta.pdf_version);
        if let Some(ref p) = meta.producer {
            println!("{}     {}", bold("Producer:"), p);
        }
        if let Some(ref c) = meta.creator {
            println!("{}      {}", bold("Creator:"), c);
        }
    }
    Ok(())
}

/// Parse a `--rotate INDEX:DEGREES` argument.
fn parse_rotation(spec: &str) -> Result<(usize, u32)> {
    let (index, degrees) = spec
        .split_once(':')
        .with_context(|| format!("Invalid --rotate '{spec}': expected INDEX:DEGREES"))?;
    let index: usize = index
        .trim()
        .parse()
        .with_context(|| format!("Invalid index in --rotate '{spec}'"))?;
    if index < 1 {
        anyhow::bail!("--rotate indices are 1-based, got {index}");
    }
    let degrees: u32 = degrees
        .trim()
        .parse()
        .with_context(|| format!("Invalid degrees in --rotate '{spec}'"))?;
    if !matches!(degrees, 90 | 180 | 270) {
        anyhow::bail!("--rotate degrees must be 90, 180, or 270, got {degrees}");
    }
    Ok((index, degrees))
}
