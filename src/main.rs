use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, ValueEnum};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use ctxmix::{helpers::check, runner, Config};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Action {
    /// Compress into <name>.bin
    C,
    /// Decompress into <name>.orig
    D,
    /// Compress, decompress and compare
    T,
}

#[derive(Parser, Debug)]
#[command(name = "ctxmix", version, about = "Context mixing compressor", long_about = None)]
struct Args {
    #[arg(value_enum)]
    action: Action,

    /// File, or directory to traverse shallowly
    path: PathBuf,

    /// Memory level 0..=9, each level doubles the tables
    #[arg(short, long, default_value_t = 4)]
    level: u8,

    #[arg(long)]
    no_dmc: bool,

    #[arg(long)]
    no_sparse: bool,

    #[arg(long)]
    no_run_stats: bool,

    #[arg(long)]
    no_byte_history: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ctxmix::Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).with_target(false).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("tracing subscriber was already set");
    }

    let config = Config {
        level: args.level,
        run_stats: !args.no_run_stats,
        byte_history: !args.no_byte_history,
        dmc: !args.no_dmc,
        sparse: !args.no_sparse,
    };
    config.validate()?;

    if args.path.is_dir() {
        for entry in fs::read_dir(&args.path)? {
            let file_path = entry?.path();
            if file_path.is_file() {
                run(&file_path, args.action, &config)?;
            }
        }
    } else {
        run(&args.path, args.action, &config)?;
    }

    Ok(())
}

fn run(file_path: &Path, action: Action, config: &Config) -> ctxmix::Result<()> {
    let mut out_path = std::env::current_dir()?;
    out_path.push(file_path.file_name().unwrap_or(file_path.as_os_str()));
    let compress_path = out_path.with_extension("bin");
    let decompress_path = out_path.with_extension("orig");

    let timer = Instant::now();
    match action {
        Action::C => {
            let size = compress(file_path, &compress_path, config)?;
            info!(file = %file_path.display(), size, elapsed = ?timer.elapsed(), "compressed");
        }
        Action::D => {
            let size = decompress(file_path, &decompress_path)?;
            info!(file = %file_path.display(), size, elapsed = ?timer.elapsed(), "decompressed");
        }
        Action::T => {
            let size = compress(file_path, &compress_path, config)?;
            info!(file = %file_path.display(), size, elapsed = ?timer.elapsed(), "compressed");
            let timer = Instant::now();
            decompress(&compress_path, &decompress_path)?;
            info!(elapsed = ?timer.elapsed(), "decompressed");
            if let Err(err) = check(&fs::read(file_path)?, &fs::read(&decompress_path)?) {
                error!(file = %file_path.display(), "{err}");
                return Err(err);
            }
            info!("compare: OK");
        }
    }
    Ok(())
}

/// Returns the archive size
fn compress(input: &Path, output: &Path, config: &Config) -> ctxmix::Result<u64> {
    let len = input.metadata()?.len();
    let reader = BufReader::new(File::open(input)?);
    let writer = BufWriter::new(File::create(output)?);
    runner::encode(reader, len, writer, config)?;
    Ok(output.metadata()?.len())
}

fn decompress(input: &Path, output: &Path) -> ctxmix::Result<u64> {
    let reader = BufReader::new(File::open(input)?);
    let writer = BufWriter::new(File::create(output)?);
    runner::decode(reader, writer)
}
