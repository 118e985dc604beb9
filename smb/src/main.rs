use std::env;
use std::net::SocketAddr;

use anyhow::{anyhow, Context};
use tracing::info;
use tracing_subscriber::EnvFilter;

use smb_server::protocol::dialect::{DialectTable, ProtocolRange, SMBProtocol};
use smb_server::server::{SMBServer, SMBServerConfigBuilder};
use smb_server::socket::listener::SMB_PORT;

fn protocol_from_env(table: &DialectTable, key: &str, default: SMBProtocol) -> anyhow::Result<SMBProtocol> {
    match env::var(key) {
        Ok(name) => table.lookup_protocol_index(&name)
            .ok_or_else(|| anyhow!("{key}: unknown protocol {name:?}")),
        Err(_) => Ok(default),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = match env::var("SMB_PORT") {
        Ok(port) => port.parse::<u16>().context("SMB_PORT")?,
        Err(_) => SMB_PORT,
    };
    let table = DialectTable::default();
    let defaults = ProtocolRange::default();
    let range = ProtocolRange::new(
        protocol_from_env(&table, "SMB_MIN_PROTOCOL", defaults.min())?,
        protocol_from_env(&table, "SMB_MAX_PROTOCOL", defaults.max())?,
    );

    let config = SMBServerConfigBuilder::default()
        .listen_address(SocketAddr::from(([0, 0, 0, 0], port)))
        .dialect_table(table)
        .protocol_range(range)
        .build()?;
    info!(min = ?range.min(), max = ?range.max(), port, "starting SMB server");

    let server = SMBServer::with_config(config);
    let shutdown = server.shutdown_token();
    tokio::select! {
        result = server.start() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("received interrupt, shutting down");
            shutdown.cancel();
        }
    }
    Ok(())
}
