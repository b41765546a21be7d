use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use wikimirror_core::{MirrorConfig, MirrorReport, PageStatus, mirror_wiki};

#[derive(Debug, Parser)]
#[command(
    name = "wikimirror",
    version,
    about = "Mirror a subreddit wiki into a local tree of markdown files"
)]
struct Cli {
    /// Community (subreddit) whose wiki is mirrored
    #[arg(value_name = "COMMUNITY_NAME")]
    community: String,
    /// Directory that receives the page tree
    #[arg(value_name = "OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,
    #[arg(long, help = "Print the run report as JSON")]
    json: bool,
    #[arg(short, long, help = "Enable debug logging")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_logging(cli.verbose);

    let config = MirrorConfig::from_env();
    log::info!(
        "Mirroring r/{} into {}",
        cli.community,
        normalize_path(&cli.output_dir)
    );
    let report = mirror_wiki(config, &cli.community, &cli.output_dir)
        .with_context(|| format!("failed to mirror the wiki of r/{}", cli.community))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn print_summary(report: &MirrorReport) {
    println!("community: r/{}", report.community);
    println!("output_dir: {}", normalize_path(&report.output_dir));
    println!("requested_pages: {}", report.requested_pages);
    println!("succeeded: {}", report.succeeded);
    println!("failed: {}", report.failed);
    println!("request_count: {}", report.request_count);
    for page in report
        .pages
        .iter()
        .filter(|page| page.status == PageStatus::GaveUp)
    {
        println!(
            "  failed {} after {} attempt(s): {}",
            page.page,
            page.attempts,
            page.detail.as_deref().unwrap_or("unknown error")
        );
    }
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
