use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use purl_meta::config::{ResolverConfig, log_path};
use purl_meta::download::DownloadOptions;
use purl_meta::{Coordinate, create_default_resolver};

#[derive(Parser)]
#[command(name = "purl-meta")]
#[command(version, about = "Resolve package URLs to versions, metadata and artifacts")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Always refetch registry documents
    #[arg(long, global = true)]
    no_cache: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Write logs to the log file instead of stderr
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List known versions, newest first
    Versions { purl: String },
    /// Print normalized metadata
    Resolve { purl: String },
    /// Print artifact download locations
    Artifacts { purl: String },
    /// Download the primary artifact
    Download {
        purl: String,
        #[arg(long)]
        dest: PathBuf,
        /// Unpack the artifact into a directory
        #[arg(long)]
        extract: bool,
    },
}

fn init_logging(cli: &Cli) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let (writer, guard) = if cli.log_file {
        let path = log_path();
        let dir = path.parent().context("log path has no parent directory")?;
        std::fs::create_dir_all(dir)?;
        let file_name = path.file_name().context("log path has no file name")?;
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        (BoxMakeWriter::new(non_blocking), Some(guard))
    } else {
        (BoxMakeWriter::new(std::io::stderr), None)
    };

    let layer = if cli.log_json {
        fmt::layer().json().with_writer(writer).boxed()
    } else {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(!cli.log_file)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()?;

    Ok(guard)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => ResolverConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ResolverConfig::default(),
    };
    let resolver = create_default_resolver(&config)?.with_use_cache(!cli.no_cache);

    match cli.command {
        Command::Versions { purl } => {
            let coordinate: Coordinate = purl.parse()?;
            let versions = resolver.versions(&coordinate).await?;
            println!("{}", serde_json::to_string_pretty(&versions)?);
        }
        Command::Resolve { purl } => {
            let coordinate: Coordinate = purl.parse()?;
            let metadata = resolver.resolve(&coordinate).await?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        Command::Artifacts { purl } => {
            let coordinate: Coordinate = purl.parse()?;
            let locations = resolver.artifacts(&coordinate)?;
            println!("{}", serde_json::to_string_pretty(&locations)?);
        }
        Command::Download {
            purl,
            dest,
            extract,
        } => {
            let coordinate: Coordinate = purl.parse()?;
            let options = DownloadOptions::new(dest)
                .with_extract(extract)
                .with_use_cache(!cli.no_cache);
            let downloaded = resolver.download(&coordinate, &options).await?;
            for path in downloaded.paths {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(&cli)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}
