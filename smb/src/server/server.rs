use std::fmt::Debug;
use std::net::SocketAddr;
use std::sync::Arc;

use derive_builder::Builder;
use tokio::io::AsyncWrite;
use tokio::net::TcpListener;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use smb_core::error::{SMBError, TransportError};
use smb_core::logging::{debug, info, info_span, warn, Instrument};
use smb_core::SMBResult;

use crate::protocol::body::FileTime;
use crate::protocol::dialect::{DialectTable, ProtocolRange};
use crate::server::connection::SMBConnection;
use crate::server::family::{DEFAULT_IO_SIZE, MAX_MESSAGE_SIZE};
use crate::server::handler::{CommandHandler, UnsupportedCommandHandler};
use crate::socket::listener::{ACCEPT_RETRY_INTERVAL, SMB_PORT, SMBListener, SMBSocket, SMBSocketConnection};
use crate::socket::transport::SMBSocketRead;

/// Bytes a PDU may carry on top of its read/write payload: headers and fixed request fields.
pub const PDU_HEADER_ROOM: usize = 4096;
/// Largest PDU accepted after the session header: the largest advertised
/// read/write payload plus header room.
pub const DEFAULT_MAX_PDU_SIZE: usize = DEFAULT_IO_SIZE as usize + PDU_HEADER_ROOM;
pub const DEFAULT_MAX_CONNECTIONS: usize = 1024;

/// Process-wide settings shared read-only by every connection worker.
#[derive(Debug, Clone, Builder)]
#[builder(pattern = "owned", build_fn(validate = "Self::validate"))]
pub struct SMBServerConfig {
    #[builder(default = "SocketAddr::from(([0, 0, 0, 0], SMB_PORT))")]
    listen_address: SocketAddr,
    #[builder(default)]
    dialect_table: DialectTable,
    #[builder(default)]
    protocol_range: ProtocolRange,
    #[builder(default = "DEFAULT_MAX_CONNECTIONS")]
    max_connections: usize,
    #[builder(default = "DEFAULT_MAX_PDU_SIZE")]
    max_message_size: usize,
    #[builder(default = "Uuid::new_v4()")]
    server_guid: Uuid,
    #[builder(default = "FileTime::now()")]
    start_time: FileTime,
}

impl SMBServerConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(range) = &self.protocol_range {
            if range.is_empty() {
                return Err(format!("min protocol {:?} is newer than max protocol {:?}", range.min(), range.max()));
            }
        }
        if self.max_connections == Some(0) {
            return Err("max_connections must be at least 1".into());
        }
        if self.max_message_size.is_some_and(|size| size < MAX_MESSAGE_SIZE as usize) {
            return Err(format!("max_message_size must be at least {}", MAX_MESSAGE_SIZE));
        }
        Ok(())
    }
}

impl Default for SMBServerConfig {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::from(([0, 0, 0, 0], SMB_PORT)),
            dialect_table: DialectTable::default(),
            protocol_range: ProtocolRange::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_message_size: DEFAULT_MAX_PDU_SIZE,
            server_guid: Uuid::new_v4(),
            start_time: FileTime::now(),
        }
    }
}

impl SMBServerConfig {
    pub fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    pub fn dialect_table(&self) -> &DialectTable {
        &self.dialect_table
    }

    pub fn protocol_range(&self) -> ProtocolRange {
        self.protocol_range
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Largest read/write/transact payload a negotiate response may
    /// advertise without a request of that size exceeding `max_message_size`.
    pub fn max_io_size(&self) -> u32 {
        u32::try_from(self.max_message_size.saturating_sub(PDU_HEADER_ROOM)).unwrap_or(u32::MAX)
    }

    pub fn server_guid(&self) -> Uuid {
        self.server_guid
    }

    pub fn start_time(&self) -> FileTime {
        self.start_time
    }
}

/// Accepts connections and runs one worker task per connection.
#[derive(Debug)]
pub struct SMBServer<H: CommandHandler = UnsupportedCommandHandler> {
    config: Arc<SMBServerConfig>,
    handler: Arc<H>,
    shutdown: CancellationToken,
    connection_permits: Arc<Semaphore>,
}

impl<H: CommandHandler> SMBServer<H> {
    pub fn new(config: SMBServerConfig, handler: H) -> Self {
        let connection_permits = Arc::new(Semaphore::new(config.max_connections()));
        Self {
            config: Arc::new(config),
            handler: Arc::new(handler),
            shutdown: CancellationToken::new(),
            connection_permits,
        }
    }

    pub fn config(&self) -> &SMBServerConfig {
        &self.config
    }

    /// Cancelling the returned token stops the acceptor and every worker.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn active_connections(&self) -> usize {
        self.config.max_connections() - self.connection_permits.available_permits()
    }

    pub async fn bind<Socket: SMBSocket>(&self) -> SMBResult<SMBListener<Socket>> {
        SMBListener::new(self.config.listen_address()).await
    }

    /// Binds the configured TCP address and serves until shut down.
    pub async fn start(&self) -> SMBResult<()> {
        let listener = self.bind::<TcpListener>().await?;
        self.serve(listener).await
    }

    pub async fn serve<Socket: SMBSocket>(&self, listener: SMBListener<Socket>) -> SMBResult<()> {
        info!(address = %self.config.listen_address(), "accepting inbound connections");
        let mut connections = listener.connections();
        loop {
            let permit = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                permit = self.connection_permits.clone().acquire_owned() => permit.map_err(SMBError::server_error)?,
            };
            let accepted = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = connections.next() => accepted,
            };
            match accepted {
                Some(Ok(connection)) => self.spawn_worker(connection, permit),
                Some(Err(e)) => {
                    warn!(%e, "accept failed");
                    sleep(ACCEPT_RETRY_INTERVAL).await;
                }
                None => break,
            }
        }
        info!("listener stopped");
        Ok(())
    }

    fn spawn_worker<R, W>(&self, connection: SMBSocketConnection<R, W>, permit: OwnedSemaphorePermit)
    where
        R: SMBSocketRead + Debug + 'static,
        W: AsyncWrite + Unpin + Send + Debug + 'static,
    {
        let (name, read, write) = connection.into_parts();
        let span = info_span!("connection", peer = %name);
        let mut connection = SMBConnection::new(name, read, write, self.config.clone(), self.shutdown.child_token());
        let handler = self.handler.clone();
        tokio::spawn(async move {
            info!("connection opened");
            match connection.run(handler.as_ref()).await {
                Ok(()) => info!("connection closed"),
                Err(SMBError::TransportError(TransportError::Retryable)) => debug!("peer disconnected"),
                Err(e) => warn!(%e, "connection terminated"),
            }
            drop(permit);
        }.instrument(span));
    }
}

impl SMBServer<UnsupportedCommandHandler> {
    pub fn with_config(config: SMBServerConfig) -> Self {
        Self::new(config, UnsupportedCommandHandler)
    }
}

#[cfg(test)]
mod tests {
    use crate::protocol::dialect::SMBProtocol;

    use super::*;

    #[test]
    fn builder_defaults() {
        let config = SMBServerConfigBuilder::default().build().unwrap();
        assert_eq!(config.listen_address().port(), 445);
        assert_eq!(config.max_connections(), DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.max_message_size(), 1024 * 1024 + 4096);
        assert_eq!(config.max_io_size(), 1024 * 1024);
        assert_eq!(config.protocol_range().max(), SMBProtocol::Smb3_1_1);
        assert!(config.dialect_table().is_ordered());
    }

    #[test]
    fn builder_rejects_inverted_range() {
        let result = SMBServerConfigBuilder::default()
            .protocol_range(ProtocolRange::new(SMBProtocol::Smb3_1_1, SMBProtocol::Smb2_0_2))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_rejects_message_size_below_protocol_minimum() {
        assert!(SMBServerConfigBuilder::default().max_message_size(4096).build().is_err());
        let config = SMBServerConfigBuilder::default().max_message_size(65536 + 4096).build().unwrap();
        assert_eq!(config.max_io_size(), 65536);
    }

    #[test]
    fn builder_rejects_zero_connections() {
        assert!(SMBServerConfigBuilder::default().max_connections(0).build().is_err());
    }

    #[tokio::test]
    async fn shutdown_stops_acceptor() {
        let config = SMBServerConfigBuilder::default()
            .listen_address(SocketAddr::from(([127, 0, 0, 1], 0)))
            .build()
            .unwrap();
        let server = SMBServer::with_config(config);
        let listener = server.bind::<TcpListener>().await.unwrap();
        server.shutdown();
        server.serve(listener).await.unwrap();
        assert_eq!(server.active_connections(), 0);
    }
}
