/// Log setup.
///
/// The terminal runs in raw mode on the alternate screen, so log lines go
/// to a file instead of stderr. No file configured → no subscriber.
/// `RUST_LOG` overrides the configured level.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::filter::EnvFilter;

use crate::config::LogConfig;

pub fn init(cfg: &LogConfig) {
    let Some(path) = &cfg.file else {
        return;
    };

    let file = match OpenOptions::new().create(true).append(true).open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: could not open log file {}: {e}", path.display());
            return;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();

    if let Err(e) = installed {
        eprintln!("Warning: logging disabled: {e}");
    }
}
