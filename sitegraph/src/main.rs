use colored::Colorize;
use sitegraph::command_argument_builder;
use sitegraph::handlers::{handle_check, handle_crawl, handle_map, print_banner};
use tracing::Level;

#[tokio::main]
async fn main() {
    let matches = command_argument_builder().get_matches();
    let quiet = matches.get_flag("quiet");
    let verbose = matches.get_flag("verbose");

    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if !quiet {
        print_banner();
    }

    let outcome = match matches.subcommand() {
        Some(("crawl", sub_matches)) => handle_crawl(sub_matches, quiet).await,
        Some(("map", sub_matches)) => handle_map(sub_matches, quiet).await,
        Some(("check", sub_matches)) => handle_check(sub_matches, quiet).await,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = outcome {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
