mod transport;

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context};
use log::{info, LevelFilter};
use serde::{Deserialize, Serialize};
use simplelog::{ColorChoice, Config as LogConfig, TermLogger, TerminalMode};

use rip::concepts::route::RouteTable;
use rip::framework::ProtocolParams;
use rip::router::Router;
use rip::server::Server;

use crate::transport::UdpTransport;

/// Daemon configuration: protocol parameters plus local options.
#[derive(Serialize, Deserialize)]
#[serde(default)]
struct Config {
    params: ProtocolParams,
    /// write the final table to this file on shutdown
    table_dump: Option<PathBuf>,
    log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            params: ProtocolParams::default(),
            table_dump: None,
            log_level: "info".to_string(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 3 {
        bail!("usage: {} [route-file] [config-file]", args[0]);
    }

    let config: Config = match args.get(2) {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config file {path}"))?;
            serde_json::from_str(&text).with_context(|| format!("parsing config file {path}"))?
        }
        None => Config::default(),
    };

    let level = config.log_level.parse().unwrap_or(LevelFilter::Info);
    TermLogger::init(
        level,
        LogConfig::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("initializing the logger")?;

    let table = match args.get(1) {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading route file {path}"))?;
            let table = RouteTable::parse(&text, config.params.route_timeout)
                .with_context(|| format!("loading static routes from {path}"))?;
            info!("{} static routes imported", table.len());
            info!("{table}");
            table
        }
        None => RouteTable::new(),
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
        .context("installing the shutdown handler")?;

    let transport = UdpTransport::open(&config.params)
        .with_context(|| format!("binding UDP port {}", config.params.port))?;
    info!(
        "listening on port {}, group {}",
        config.params.port, config.params.multicast_group
    );

    let router = Router::with_table(config.params.clone(), table);
    let mut server = Server::with_shutdown(router, transport, shutdown);
    server.run()?;

    info!("closing transport and releasing the route table");
    info!("{}", server.router.table);
    if let Some(path) = &config.table_dump {
        fs::write(path, server.router.table.to_config())
            .with_context(|| format!("writing table dump {}", path.display()))?;
        info!("table written to {}", path.display());
    }
    Ok(())
}
