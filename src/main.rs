use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{debug, error, info};

use es_bulk_indexer::conf::Config;
use es_bulk_indexer::runner::{self, RunOptions};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "es-bulk-indexer", version, about = "Bulk index generated articles into Elasticsearch")]
struct Args {
    /// Config file (TOML, or JSON with a .json extension)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Debug logging and payload dumps
    #[arg(short, long)]
    debug: bool,
    /// Build and log batches without touching the cluster
    #[arg(short = 'n', long)]
    dry_run: bool,
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    index: Option<String>,
    #[arg(long)]
    count: Option<u64>,
    #[arg(long)]
    batch_size: Option<usize>,
}

fn init_tracing(debug: bool, format: LogFormat) {
    let default_level = if debug { "debug" } else { "info" };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_file(true)
        .with_line_number(true);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.debug, args.log_format);

    info!("Application started!");
    debug!("Args {:?}", args);

    let mut config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    if let Some(url) = args.url.clone() {
        config.set_url(url);
    }
    if let Some(index) = args.index.clone() {
        config.set_index_name(index);
    }
    if let Some(count) = args.count {
        config.set_count(count);
    }
    if let Some(batch_size) = args.batch_size {
        config.set_batch_size(batch_size);
    }
    debug!("Config loaded ... {:#?}", config);

    let options = RunOptions {
        dry_run: args.dry_run,
        debug: args.debug,
    };
    let report = match runner::run(&config, &options).await {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("{}", "=".repeat(80));
    if options.dry_run {
        info!("Dry run finished, nothing was sent");
        ExitCode::SUCCESS
    } else if report.is_failure() {
        error!("{}", report);
        ExitCode::FAILURE
    } else {
        info!("{}", report);
        ExitCode::SUCCESS
    }
}
