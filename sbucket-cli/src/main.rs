mod config;
mod constants;
mod report;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sbucket_core::{select, BucketParams, CellRounding, FilterOptions, ProbeRecord};
use sbucket_directory::{load_dump, DirectoryConfig, ListingQuery, RemoteDirectory};
use std::env;
use std::path::PathBuf;

use config::Config;
use constants::*;
use report::{measurement_request, print_text, SelectionReport};

#[derive(Parser, Debug)]
#[command(
    name = "sbucket",
    about = "Spatial bucketing of probes: pick a geographically even subset"
)]
struct Args {
    /// Probe dump (JSON Lines, JSON array or saved listing page), `remote`,
    /// or a listing URL
    source: String,

    /// Number of probes to return
    #[arg(allow_negative_numbers = true)]
    count: i64,

    /// Map projection used for bucketing (merc, eqc, mill, cea, sinu, moll, latlong)
    #[arg(short, long)]
    projection: Option<String>,

    /// Maximum number of grid refinements
    #[arg(short, long)]
    maxiter: Option<usize>,

    /// Allowed country codes; world-wide if not set
    #[arg(short, long, num_args = 1.., value_delimiter = ',')]
    country: Vec<String>,

    /// Include probes that are not connected
    #[arg(long)]
    all: bool,

    /// Floor cell coordinates instead of truncating toward zero
    #[arg(long)]
    floor_cells: bool,

    /// Seed for the probe draw
    #[arg(long)]
    seed: Option<u64>,

    /// JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print a machine-readable report
    #[arg(long)]
    json: bool,

    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, PartialEq)]
enum Source {
    Dump(PathBuf),
    Remote(Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
struct Settings {
    projection: String,
    max_iterations: usize,
    countries: Vec<String>,
    online_only: bool,
    rounding: CellRounding,
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    run(args)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(args: Args) -> Result<()> {
    let cfg = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    let settings = resolve_settings(&args, &cfg);
    validate_settings(&settings)?;

    let params = BucketParams::new(args.count, &settings.projection, settings.max_iterations)?
        .rounding(settings.rounding);

    let source = parse_source(&args.source);
    let records = load_records(&source, &settings, &cfg.directory)?;
    log::info!("{} probe records loaded", records.len());

    let filter = FilterOptions::new(settings.online_only).with_countries(&settings.countries);
    let mut rng = match settings.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let selection = select(&records, &filter, &params, &mut rng);

    let mut report = SelectionReport::new(&selection, params.target(), params.projection().name());
    if args.json {
        if args.verbose >= 2 {
            report.measurement = Some(measurement_request(&cfg.measurement, &report.ids));
        }
        let text = serde_json::to_string_pretty(&report).context("serializing report")?;
        println!("{text}");
        return Ok(());
    }

    print_text(&report, &cfg.measurement, args.verbose);
    Ok(())
}

fn resolve_settings(args: &Args, cfg: &Config) -> Settings {
    let countries = if args.country.is_empty() {
        cfg.countries.clone()
    } else {
        args.country.clone()
    };
    Settings {
        projection: args
            .projection
            .clone()
            .or_else(|| cfg.projection.clone())
            .unwrap_or_else(|| DEFAULT_PROJECTION.to_string()),
        max_iterations: args
            .maxiter
            .or(cfg.max_iterations)
            .unwrap_or(DEFAULT_MAX_ITERATIONS),
        countries,
        online_only: !args.all && cfg.online_only.unwrap_or(true),
        rounding: if args.floor_cells || cfg.floor_cells {
            CellRounding::Floor
        } else {
            CellRounding::Truncate
        },
        seed: args.seed.or(cfg.seed),
    }
}

fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.max_iterations == 0 {
        bail!("maxiter must be > 0");
    }
    for code in &settings.countries {
        let code = code.trim();
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            bail!("country codes must be two letters (got {code:?})");
        }
    }
    Ok(())
}

fn parse_source(arg: &str) -> Source {
    if arg == REMOTE_SOURCE {
        return Source::Remote(None);
    }
    if arg.starts_with("http://") || arg.starts_with("https://") {
        return Source::Remote(Some(arg.to_string()));
    }
    Source::Dump(expand_tilde(arg))
}

fn load_records(source: &Source, settings: &Settings, directory: &DirectoryConfig) -> Result<Vec<ProbeRecord>> {
    match source {
        Source::Dump(path) => {
            let dump = load_dump(path)?;
            if dump.malformed > 0 {
                log::warn!("{} malformed lines ignored", dump.malformed);
            }
            Ok(dump.records)
        }
        Source::Remote(url) => {
            let mut directory = directory.clone();
            if let Some(url) = url {
                directory.base_url = url.clone();
            }
            if directory.page_size == 0 || directory.max_pages == 0 {
                bail!("directory pageSize and maxPages must be > 0");
            }
            let query = ListingQuery {
                connected_only: settings.online_only,
                country: match settings.countries.as_slice() {
                    [only] => Some(only.trim().to_ascii_uppercase()),
                    _ => None,
                },
            };
            let records = RemoteDirectory::new(directory)
                .fetch_records(&query)
                .context("fetching probe listing")?;
            Ok(records)
        }
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
