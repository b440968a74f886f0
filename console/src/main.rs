mod ui;
mod utils;

use std::path::PathBuf;
use std::process::exit;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::ProgressBar;
use log::{debug, error, info, warn};
use methfetch::config::{RunConfig, Selection, DEFAULT_PERCENTILE, DEFAULT_SERVER};
use methfetch::io::bed::{count_regions, RegionReader};
use methfetch::io::http::ApiClient;
use methfetch::io::output::OutputLayout;
use methfetch::tools::process_region;
use wild::ArgsOs;

use crate::ui::{prompter, Prompter};
use crate::utils::init_pbar;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None,
)]
struct Cli {
    #[arg(short, long, help = "Region list: tab-separated chrom/start/end (BED)")]
    input: PathBuf,

    #[arg(short, long, help = "Output directory")]
    output: PathBuf,

    #[arg(
        short,
        long,
        help = "Configuration file with a saved assembly/sample selection"
    )]
    config: Option<PathBuf>,

    #[arg(short = 'r', long, default_value = DEFAULT_SERVER, help = "NGSmethDB API server")]
    server: String,

    #[arg(
        short,
        long,
        default_value = DEFAULT_PERCENTILE,
        help = "Methylation segments percentile threshold"
    )]
    percentile: String,

    #[arg(long, help = "Plain prompts without colors or cursor movement")]
    plain: bool,

    #[arg(long, help = "Hide the progress bar")]
    no_progress: bool,

    #[arg(short, long, help = "Verbose logging")]
    verbose: bool,
}

fn main() {
    let args: ArgsOs = wild::args_os();
    let cli = Cli::parse_from(args);
    init_logger(cli.verbose);

    if let Err(e) = run(cli) {
        error!("{e:#}");
        error!("leaving the program");
        exit(1);
    }
}

fn init_logger(verbose: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    else {
        builder.filter_level(if verbose {
            log::LevelFilter::Debug
        }
        else {
            log::LevelFilter::Info
        });
    }
    let _ = builder.try_init();
}

fn run(cli: Cli) -> Result<()> {
    let config = RunConfig::new(cli.server, &cli.output).with_percentile(cli.percentile);
    let client = ApiClient::new(&config);
    notify_update(&client);

    let selection = match &cli.config {
        Some(path) => Selection::load(path)?,
        None => {
            warn!("no configuration file given, asking for options");
            let ui = prompter(cli.plain);
            select_interactively(&client, ui.as_ref())?
        },
    };

    let total = count_regions(&cli.input)?;
    info!("number of regions in the input file: {total}");

    let layout = OutputLayout::new(&config.output)?;
    let pbar = if cli.no_progress {
        ProgressBar::hidden()
    }
    else {
        init_pbar(total)?
    };

    for region in RegionReader::from_path(&cli.input)? {
        let region = region?;
        pbar.set_message(region.to_string());
        process_region(&client, &config, &layout, &region, &selection)
            .with_context(|| format!("region {region}"))?;
        pbar.inc(1);
    }
    pbar.finish_with_message("Done");
    info!("work done, leaving the program");
    Ok(())
}

fn select_interactively(client: &ApiClient, ui: &dyn Prompter) -> Result<Selection> {
    ui.welcome()?;

    let assemblies = client.assemblies()?;
    let assembly = ui.choose_assembly(&assemblies)?;

    let tree = client.sample_tree(&assembly)?;
    let samples = ui.choose_samples(&tree)?;

    let selection = Selection { assembly, samples };
    if let Some(path) = ui.config_save_path()? {
        selection.save(&path)?;
        info!("configuration saved to {}", path.display());
    }
    Ok(selection)
}

/// Best-effort startup check against the version the server publishes for
/// this client. Never aborts the run.
fn notify_update(client: &ApiClient) {
    let local: Vec<u32> = env!("CARGO_PKG_VERSION")
        .split('.')
        .filter_map(|part| part.parse().ok())
        .collect();
    match client.remote_client_version() {
        Ok(Some(remote)) if remote.iter().cmp(local.iter()).is_gt() => {
            let remote = remote
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(".");
            info!("a newer client version {remote} is available");
        },
        Ok(_) => {},
        Err(e) => debug!("version check failed: {e:#}"),
    }
}
