use anyhow::Result;
use clap::Parser;
use par_remote::cli::{self, Cli};
use tokio::runtime::Runtime;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_path) = cli.load_config()?;
    // CLI --log-level takes precedence, then RUST_LOG, then config
    par_remote::debug::init_log_bridge(cli.log_level.map(Into::into), config.log_level);

    log::info!("Starting par-remote {}", par_remote::VERSION);

    let runtime = Runtime::new()?;
    let code = runtime.block_on(cli::run(cli, config, config_path));
    runtime.shutdown_timeout(std::time::Duration::from_secs(2));

    match code {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("par-remote: error: {e:#}");
            log::error!("{e:#}");
            std::process::exit(1);
        }
    }
}
