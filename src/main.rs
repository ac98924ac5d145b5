#[macro_use]
extern crate tracing;

use conduit_core::config::Config;
use conduit_core::db;
use conduit_core::Result;
use std::process;
use tracing_subscriber::EnvFilter;

fn run(config: &Config) -> Result<()> {
    let pool = db::init_pool(config)?;
    db::create_schema(&mut *pool.get()?)?;
    info!(database_url = %config.database_url, "schema ready");
    Ok(())
}

fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .init();

    if let Err(e) = run(&config) {
        error!(error = %e, "setup failed");
        for cause in e.iter().skip(1) {
            error!(caused_by = %cause);
        }
        process::exit(1);
    }
}
