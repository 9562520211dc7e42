use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use sitegraph_core::config::{AuditConfig, CRAWL_MAX_PAGES, MAP_MAX_PAGES};
use sitegraph_core::crawl::{CrawlOptions, CrawlProgressCallback, execute_crawl, execute_link_check};
use sitegraph_core::report::{
    ReportFormat, generate_audit_report, generate_check_report, generate_crawl_report,
    save_report, to_json,
};
use sitegraph_core::run_audit;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};
use url::Url;

// Helper functions for the check handler

/// Load URLs from either a file or a single URL argument
pub fn load_urls_from_source(url: Option<&Url>, urls_file: Option<&PathBuf>) -> Result<Vec<String>> {
    if let Some(path) = urls_file {
        load_urls_from_file(path)
    } else if let Some(url) = url {
        Ok(vec![url.as_str().to_string()])
    } else {
        bail!("Either --url or --urls-file must be provided")
    }
}

/// Load and parse URLs from a file, skipping blanks and `#` comments
pub fn load_urls_from_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL file {}", path.display()))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_url_line)
        .collect();

    if urls.is_empty() {
        bail!("No valid URLs found in {}", path.display());
    }

    Ok(urls)
}

/// Parse a single line as an http(s) URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    if let Ok(url) = Url::parse(line)
        && matches!(url.scheme(), "http" | "https")
    {
        return Some(line.to_string());
    }

    let with_scheme = format!("http://{}", line);
    if let Ok(url) = Url::parse(&with_scheme)
        && url.host_str().is_some()
        && !line.contains("://")
        && !line.contains(char::is_whitespace)
    {
        return Some(with_scheme);
    }

    warn!("Skipping invalid URL '{}'", line);
    None
}

/// Start from the optional config file, then apply any flags given on the command line.
pub fn build_config(args: &ArgMatches) -> Result<AuditConfig> {
    let mut config = match args.get_one::<String>("config") {
        Some(path) => {
            let expanded = shellexpand::tilde(path);
            let path = Path::new(expanded.as_ref());
            debug!("Loading config from {}", path.display());
            AuditConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?
        }
        None => AuditConfig::default(),
    };

    if let Some(depth) = args.get_one::<usize>("max-depth") {
        config.max_depth = *depth;
    }
    if let Some(pages) = args.get_one::<usize>("max-pages") {
        config.max_pages = Some(*pages);
    }
    if args.get_flag("check-external") {
        config.check_external = true;
    }
    if let Some(delay) = args.get_one::<u64>("delay-ms") {
        config.delay_ms = *delay;
    }
    if let Some(concurrency) = args.get_one::<usize>("concurrency") {
        config.link_check_concurrency = *concurrency;
    }

    Ok(config)
}

pub fn report_format(args: &ArgMatches) -> ReportFormat {
    args.get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text)
}

/// Print to stdout, or save to the tilde-expanded `--output` path.
pub fn write_output(content: &str, output: Option<&String>) -> Result<()> {
    match output {
        Some(path) => {
            let expanded = shellexpand::tilde(path);
            let path = Path::new(expanded.as_ref());
            save_report(content, path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            eprintln!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
        None => print!("{}", content),
    }
    Ok(())
}

pub fn print_banner() {
    print_divider();
    eprintln!(
        "{}",
        format!("  SITEGRAPH v{}", env!("CARGO_PKG_VERSION"))
            .bright_white()
            .bold()
    );
    print_divider();
}

fn print_divider() {
    eprintln!("{}", "═".repeat(60).bright_blue().bold());
}

/// Flag flipped by Ctrl-C so a running crawl stops after the current page.
fn install_cancel_handler() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handle = flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n{} Stopping after the current page...", "→".yellow().bold());
            handle.store(true, Ordering::Relaxed);
        }
    });
    flag
}

fn crawl_options(
    args: &ArgMatches,
    config: &AuditConfig,
    default_max_pages: usize,
    quiet: bool,
) -> Result<CrawlOptions> {
    let url = args.get_one::<Url>("url").context("--url is required")?;

    let mut options = CrawlOptions::from_config(url.as_str(), config, default_max_pages);
    options.show_progress_bars = !quiet;
    options.cancel_flag = Some(install_cancel_handler());

    if !quiet {
        eprintln!(
            "{} {} (max depth {}, max pages {})",
            "→".blue(),
            options.url.bright_white(),
            options.max_depth,
            options.max_pages
        );
    }
    Ok(options)
}

fn progress_logger() -> CrawlProgressCallback {
    Arc::new(|msg: String| debug!("Fetching {}", msg))
}

pub async fn handle_crawl(args: &ArgMatches, quiet: bool) -> Result<()> {
    let config = build_config(args)?;
    let options = crawl_options(args, &config, CRAWL_MAX_PAGES, quiet)?;

    let result = execute_crawl(options, Some(progress_logger()))
        .await
        .context("Crawl failed")?;

    let content = match report_format(args) {
        ReportFormat::Json => to_json(&result)?,
        ReportFormat::Text => generate_crawl_report(&result),
    };
    write_output(&content, args.get_one::<String>("output"))
}

pub async fn handle_map(args: &ArgMatches, quiet: bool) -> Result<()> {
    let config = build_config(args)?;
    let options = crawl_options(args, &config, MAP_MAX_PAGES, quiet)?;

    let audit = run_audit(options, &config.page_rank, Some(progress_logger()))
        .await
        .context("Link audit failed")?;

    if !quiet {
        eprintln!(
            "{} {} nodes, {} edges, {} orphans, {} suggestions",
            "✓".green().bold(),
            audit.links.graph.stats.total_pages,
            audit.links.graph.stats.total_links,
            audit.links.graph.orphan_pages.len(),
            audit.links.suggestions.len()
        );
    }

    let content = match report_format(args) {
        ReportFormat::Json => to_json(&audit)?,
        ReportFormat::Text => generate_audit_report(&audit),
    };
    write_output(&content, args.get_one::<String>("output"))
}

pub async fn handle_check(args: &ArgMatches, quiet: bool) -> Result<()> {
    let config = build_config(args)?;
    let urls = load_urls_from_source(
        args.get_one::<Url>("url"),
        args.get_one::<PathBuf>("urls-file"),
    )?;

    let results = execute_link_check(&urls, &config, !quiet)
        .await
        .context("Link check failed")?;

    let broken = results.iter().filter(|r| r.broken).count();
    if !quiet {
        let marker = if broken == 0 {
            "✓".green().bold()
        } else {
            "✗".red().bold()
        };
        eprintln!("{} {} of {} links broken", marker, broken, results.len());
    }

    let content = match report_format(args) {
        ReportFormat::Json => to_json(&results)?,
        ReportFormat::Text => generate_check_report(&results),
    };
    write_output(&content, args.get_one::<String>("output"))
}
