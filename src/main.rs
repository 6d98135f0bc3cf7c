use std::io::Result;

use clap::Parser;
use env_logger::Builder;
use log::{debug, info};
use tokio::runtime::Runtime;

use zbgp::cli::{self, Args, Invocation};
use zbgp::config::{self, Config};
use zbgp::handler::serve;

fn main() -> Result<()> {
    let args = Args::parse();

    let ((zbgp_level, other_level), invocation) = args.into_parts();
    let Invocation {
        role,
        config_path,
        api,
    } = match invocation {
        Some(invocation) => invocation,
        None => {
            println!("{}", cli::version());
            return Ok(());
        }
    };

    Builder::new()
        .filter(Some("zbgp"), zbgp_level)
        .filter(None, other_level)
        .init();
    info!("Logging at levels {}/{}", zbgp_level, other_level);

    let mut config = match &config_path {
        Some(path) => {
            let config = config::from_file(path)?;
            debug!("Loaded config from {}", path);
            config
        }
        None => Config::default(),
    };
    if let Some(api) = api {
        config.api = api;
    }

    let runtime = Runtime::new()?;
    runtime.block_on(serve(role, config_path, config))?;
    info!("zbgp stopped");
    Ok(())
}
