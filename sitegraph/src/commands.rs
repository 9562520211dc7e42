use crate::CLAP_STYLING;
use clap::{Arg, arg, command};
use std::path::PathBuf;
use url::Url;

fn url_arg() -> Arg {
    arg!(-u --"url" <URL>)
        .required(true)
        .help("The site to start from")
        .value_parser(clap::value_parser!(Url))
}

/// Flags shared by every subcommand that talks to a site.
fn shared_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(--"max-depth" <DEPTH>)
            .required(false)
            .help("Maximum link depth from the start URL (default: 3)")
            .value_parser(clap::value_parser!(usize)),
    )
    .arg(
        arg!(--"max-pages" <PAGES>)
            .required(false)
            .help("Maximum number of pages to fetch (default: 50 for crawl, 20 for map)")
            .value_parser(clap::value_parser!(usize)),
    )
    .arg(
        arg!(--"check-external")
            .required(false)
            .help("Also probe links that leave the site")
            .action(clap::ArgAction::SetTrue),
    )
    .arg(
        arg!(--"delay-ms" <MILLIS>)
            .required(false)
            .help("Pause between page fetches in milliseconds (default: 100)")
            .value_parser(clap::value_parser!(u64)),
    )
    .arg(
        arg!(--"concurrency" <NUM>)
            .required(false)
            .help("Number of link probes per batch (default: 5)")
            .value_parser(clap::value_parser!(usize)),
    )
    .arg(
        arg!(--"config" <PATH>)
            .required(false)
            .help("JSON file with audit settings; flags override its values")
            .value_parser(clap::value_parser!(String)),
    )
    .arg(
        arg!(-o --"output" <PATH>)
            .required(false)
            .help("Save report to file (default: display to screen)")
            .value_parser(clap::value_parser!(String)),
    )
    .arg(
        arg!(-f --"format" <FORMAT>)
            .required(false)
            .help("Report format: text, json")
            .value_parser(["text", "json"])
            .default_value("text"),
    )
}

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitegraph")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitegraph")
        .about("Crawl a site, check its links and analyze its internal link graph")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true)
                .conflicts_with("verbose"),
        )
        .arg(
            arg!(-v --"verbose" "Show debug logging")
                .required(false)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(shared_args(
            command!("crawl")
                .about("Crawl a site breadth-first and report pages and broken links")
                .arg(url_arg()),
        ))
        .subcommand(shared_args(
            command!("map")
                .about(
                    "Crawl a site, then build its internal link graph with PageRank, click \
                depth, link distribution and linking suggestions",
                )
                .arg(url_arg()),
        ))
        .subcommand(shared_args(
            command!("check")
                .about("Probe a single URL or a list of URLs for broken links")
                .arg(url_arg().required(false).conflicts_with("urls-file"))
                .arg(
                    arg!(--"urls-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of URLs to check")
                        .value_parser(clap::value_parser!(PathBuf))
                        .conflicts_with("url"),
                ),
        ))
}
