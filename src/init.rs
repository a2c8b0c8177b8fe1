use anyhow::Result;
use chrono::Local;
use env_logger::{Builder, Env};
use log::debug;
use std::io::Write;

/// Only this crate logs at `info` by default, dependencies stay quiet.
const DEFAULT_FILTER: &str = "layermix=info,warn";

/// App wide initialization, run once before any subcommand.
pub fn init() -> Result<()> {
    logger_builder(Env::default().default_filter_or(DEFAULT_FILTER)).try_init()?;
    debug!("layermix {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}

/// `RUST_LOG` overrides the default filter. At `layermix=debug`, skopeo runs
/// with `--debug` as well.
fn logger_builder(env: Env) -> Builder {
    let mut builder = Builder::from_env(env);
    builder.format(|fmt, record| {
        writeln!(
            fmt,
            "[{} {}] {}",
            Local::now().format("%H:%M:%S%.3f"),
            record.level(),
            &record.args()
        )
    });
    builder
}
