//! CLI binary for flipflow.
//!
//! Inspect and rasterise PDFs the way the flipbook viewer does, or run the
//! payment service.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use flipflow::pipeline::layout::DisplayBox;
use flipflow::{
    inspect, render_thumbnail, CancelToken, FlipbookConfig, PageSelection, PdfSource,
    PdfiumRasterizer, Rasterizer, RenderProgressCallback, RenderRequest, ServiceConfig,
};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per rendered page.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl RenderProgressCallback for CliProgressCallback {
    fn on_render_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Rendering");
    }

    fn on_page_rendered(&self, page_num: usize, total_pages: usize, bytes: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{:>7} KB", bytes / 1024)),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total_pages,
            red(error),
        ));
    }

    fn on_render_complete(&self, total_pages: usize, rendered: usize) {
        self.bar.finish_and_clear();
        if rendered == total_pages && self.errors.load(Ordering::SeqCst) == 0 {
            eprintln!("{} {} pages rendered", green("✔"), bold(&rendered.to_string()));
        } else {
            eprintln!("{} {}/{} pages rendered", red("✘"), rendered, total_pages);
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Page count and display box
  flipflow inspect brochure.pdf

  # Render every page as it would appear in the viewer
  flipflow render brochure.pdf -o pages/

  # Pages 2-4 at higher quality
  flipflow render --pages 2-4 --quality 95 https://example.com/deck.pdf -o pages/

  # The dashboard thumbnail
  flipflow thumbnail brochure.pdf -o thumb.jpg

  # Run the order / verify / preflight service
  flipflow serve --listen 127.0.0.1:8080

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH             Path to an existing libpdfium
  FLIPFLOW_CACHE_DIR          Directory searched for a cached pdfium
  SUPABASE_URL                Supabase project URL (serve)
  SUPABASE_SERVICE_ROLE_KEY   Service-role key (serve)
  RAZORPAY_KEY_ID             Razorpay key id (serve)
  RAZORPAY_KEY_SECRET         Razorpay key secret (serve)
  DEBUG_TOKEN                 Token guarding the preflight probe (serve)
"#;

/// Turn PDFs into flipbook pages.
#[derive(Parser, Debug)]
#[command(
    name = "flipflow",
    version,
    about = "Rasterise PDFs for the flipbook viewer and run the payment service",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "FLIPFLOW_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "FLIPFLOW_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print page count, first page size and the viewer display box.
    Inspect {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Output JSON instead of text.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Render pages to JPEG files.
    Render {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Directory for `page-NNN.jpg` files.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Page selection: all, 5, 3-15, or 1,3,5,7.
        #[arg(long, env = "FLIPFLOW_PAGES", default_value = "all")]
        pages: String,

        /// Disable progress bar.
        #[arg(long)]
        no_progress: bool,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Render page 1 at thumbnail scale.
    Thumbnail {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Output JPEG path.
        #[arg(short, long, default_value = "thumbnail.jpg")]
        output: PathBuf,

        /// Thumbnail scale (0.1–2.0).
        #[arg(long, default_value_t = 0.5)]
        scale: f32,

        /// Thumbnail JPEG quality (1–100).
        #[arg(long, default_value_t = 80,
              value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: u8,

        /// HTTP download timeout in seconds.
        #[arg(long, env = "FLIPFLOW_DOWNLOAD_TIMEOUT", default_value_t = 120)]
        download_timeout: u64,
    },

    /// Serve the payment functions over HTTP.
    Serve {
        /// Address to bind (overrides LISTEN_ADDR).
        #[arg(long)]
        listen: Option<String>,
    },
}

#[derive(Args, Debug, Clone)]
struct RenderArgs {
    /// Oversampling scale (0.25–4.0).
    #[arg(long, env = "FLIPFLOW_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// JPEG quality (1–100).
    #[arg(long, env = "FLIPFLOW_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "FLIPFLOW_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.quiet {
        "flipflow=error"
    } else if cli.verbose {
        "flipflow=debug,tower_http=debug"
    } else {
        "flipflow=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Inspect {
            input,
            json,
            render,
        } => run_inspect(&input, json, &render).await,
        Command::Render {
            input,
            output,
            pages,
            no_progress,
            render,
        } => {
            let show_progress = !cli.quiet && !no_progress;
            run_render(&input, &output, &pages, show_progress, &render).await
        }
        Command::Thumbnail {
            input,
            output,
            scale,
            quality,
            download_timeout,
        } => {
            let config = FlipbookConfig::builder()
                .thumbnail_scale(scale)
                .thumbnail_quality(quality)
                .download_timeout_secs(download_timeout)
                .build()
                .context("Invalid configuration")?;
            run_thumbnail(&input, &output, &config, cli.quiet).await
        }
        Command::Serve { listen } => {
            let mut config = ServiceConfig::from_env();
            if let Some(addr) = listen {
                config.listen_addr = addr;
            }
            flipflow::server::serve(config)
                .await
                .context("Server failed")
        }
    }
}

async fn run_inspect(input: &str, json: bool, args: &RenderArgs) -> Result<()> {
    let config = build_config(args, None)?;
    let rasterizer = PdfiumRasterizer::from_config(&config).context("PDF engine unavailable")?;
    let info = inspect(&rasterizer, &PdfSource::parse(input))
        .await
        .context("Failed to inspect PDF")?;
    let display = info
        .first_page
        .map(|p| DisplayBox::for_page(p, config.landscape_width, config.portrait_height));

    if json {
        let value = serde_json::json!({
            "input": input,
            "page_count": info.page_count,
            "first_page": info.first_page,
            "display": display,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("Failed to serialize document info")?
        );
        return Ok(());
    }

    println!("File:         {input}");
    println!("Pages:        {}", info.page_count);
    if let Some(p) = info.first_page {
        println!("First page:   {:.0} x {:.0} pt", p.width, p.height);
    }
    if let Some(d) = display {
        let mode = if d.is_portrait() { "single page" } else { "spread" };
        println!("Display box:  {} x {} px ({mode})", d.width, d.height);
    }
    Ok(())
}

async fn run_render(
    input: &str,
    output: &Path,
    pages: &str,
    show_progress: bool,
    args: &RenderArgs,
) -> Result<()> {
    let progress = show_progress
        .then(|| CliProgressCallback::new() as Arc<dyn RenderProgressCallback>);
    let config = build_config(args, progress)?;
    let rasterizer = PdfiumRasterizer::from_config(&config).context("PDF engine unavailable")?;

    tokio::fs::create_dir_all(output)
        .await
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let cancel = CancelToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let start = Instant::now();
    let source = rasterizer
        .load(PdfSource::parse(input))
        .await
        .context("Failed to load PDF")?;
    let request = RenderRequest {
        pages: parse_pages(pages)?,
        scale: config.render_scale,
        quality: config.page_quality,
    };
    let mut stream = rasterizer
        .render(&source, request, cancel)
        .await
        .context("Failed to start render")?;

    let mut written = 0usize;
    while let Some(page) = stream.next().await {
        let page = page.context("Render failed")?;
        let path = output.join(format!("page-{:03}.jpg", page.page_number));
        tokio::fs::write(&path, &page.data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written += 1;
    }

    if !show_progress {
        tracing::info!(
            pages = written,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Wrote pages to {}",
            output.display()
        );
    }
    Ok(())
}

async fn run_thumbnail(
    input: &str,
    output: &Path,
    config: &FlipbookConfig,
    quiet: bool,
) -> Result<()> {
    let rasterizer = PdfiumRasterizer::from_config(config).context("PDF engine unavailable")?;
    let thumb = render_thumbnail(&rasterizer, &PdfSource::parse(input), config)
        .await
        .context("Failed to render thumbnail")?;
    tokio::fs::write(output, &thumb.data)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    if !quiet {
        eprintln!(
            "{} {}x{} thumbnail → {}",
            green("✔"),
            thumb.width,
            thumb.height,
            bold(&output.display().to_string())
        );
    }
    Ok(())
}

/// Map CLI args to `FlipbookConfig`.
fn build_config(
    args: &RenderArgs,
    progress: Option<Arc<dyn RenderProgressCallback>>,
) -> Result<FlipbookConfig> {
    let mut builder = FlipbookConfig::builder()
        .render_scale(args.scale)
        .page_quality(args.quality)
        .download_timeout_secs(args.download_timeout);
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;
        if start < 1 || start > end {
            anyhow::bail!("Invalid page range '{start}-{end}'");
        }
        return Ok(PageSelection::Range(start, end));
    }

    if s.contains(',') {
        let pages = s
            .split(',')
            .map(|p| {
                let page: usize = p
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))?;
                if page < 1 {
                    anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {page})");
                }
                Ok(page)
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(PageSelection::Set(pages));
    }

    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {page})");
    }
    Ok(PageSelection::Single(page))
}
