use anyhow::Result;
use colored::Colorize;
use reqlog::{config, server};
use std::net::SocketAddr;
use std::path::Path;

/// Execute the serve command
pub async fn execute(config_path: &Path, addr: SocketAddr) -> Result<()> {
    println!("{}", "Starting reqlog demo server...".green());

    let cfg = config::load_config(Some(config_path))?;
    println!(
        "  Delivery: {}",
        server::describe_target(&cfg.ingest_target()).cyan()
    );
    println!("  Try: curl http://{}/hello/world", addr);

    server::start_server(cfg, addr).await
}
