use std::time::{Duration, Instant};

use rayon::prelude::*;

use ctxmix::{
    config::MAX_LEVEL,
    helpers::ACStats,
    runner::{encode_with, HEADER_SIZE},
    Config, Result,
};

fn main() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: level-sweep <file>");
        std::process::exit(1);
    });
    let buf = std::fs::read(&path)?;

    let results: Vec<_> = (0..=MAX_LEVEL)
        .into_par_iter()
        .map(|level| exec(&buf, level).map(|res| (level, res)))
        .collect::<Result<_>>()?;

    for (level, (size, time)) in results {
        println!(
            "[level {}] csize: {} (ratio: {:.3}), ctime: {:?} ({:?} per bit)",
            level,
            size,
            size as f64 / buf.len().max(1) as f64,
            time,
            time.div_f64(buf.len().max(1) as f64 * 8.0)
        );
    }

    Ok(())
}

fn exec(buf: &[u8], level: u8) -> Result<(u64, Duration)> {
    let timer = Instant::now();
    let config = Config::with_level(level)?;
    let stats = encode_with(buf.iter().map(|&byte| Ok(byte)), ACStats::new(), &config)?;
    Ok((stats.result() + HEADER_SIZE as u64, timer.elapsed()))
}
