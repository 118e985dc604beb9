use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use smb_core::error::{SMBError, TransportError};
use smb_core::logging::{debug, trace, warn};
use smb_core::nt_status::NTStatus;
use smb_core::SMBResult;

use crate::protocol::dialect::SMBDialect;
use crate::protocol::header::{SMB1_HEADER_SIZE, SMB2_HEADER_SIZE, SMBFamily};
use crate::protocol::message::{frame, SESSION_HEADER_SIZE, SessionHeader, SessionPacketType};
use crate::protocol::negotiate::NegotiationOutcome;
use crate::server::family::{family_ops, LegacyFamily, ModernFamily, FamilyOps, ServerValues, SMALL_BUFFER_SIZE};
use crate::server::handler::{CommandHandler, SMBRequest};
use crate::server::server::SMBServerConfig;
use crate::socket::transport::{ConnectionStatus, SEND_TIMEOUT, SMBSocketRead, SMBTransport};

/// Smallest PDU that can carry a header of any compiled-in family.
pub const MIN_SUPPORTED_HEADER_SIZE: usize = if cfg!(feature = "smb1") {
    SMB1_HEADER_SIZE
} else {
    SMB2_HEADER_SIZE
};

/// One accepted client. Owned by a single worker task for its whole life.
#[derive(Debug)]
pub struct SMBConnection<R: SMBSocketRead, W> {
    name: String,
    transport: SMBTransport<R>,
    writer: W,
    config: Arc<SMBServerConfig>,
    pub(crate) family: Option<SMBFamily>,
    pub(crate) values: Option<&'static ServerValues>,
    pub(crate) negotiated: Option<NegotiationOutcome>,
    pub(crate) needs_negotiation: bool,
    negotiation_failure: Option<SMBError>,
    request_buf: Vec<u8>,
}

impl<R: SMBSocketRead, W: AsyncWrite + Unpin + Send> SMBConnection<R, W> {
    pub fn new(name: String, read: R, writer: W, config: Arc<SMBServerConfig>, shutdown: CancellationToken) -> Self {
        Self {
            name,
            transport: SMBTransport::new(read, shutdown),
            writer,
            config,
            family: None,
            values: None,
            negotiated: None,
            needs_negotiation: true,
            negotiation_failure: None,
            request_buf: Vec::with_capacity(SMALL_BUFFER_SIZE),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn family(&self) -> Option<SMBFamily> {
        self.family
    }

    /// Dialect picked by the last negotiate, if any was acceptable.
    pub fn dialect(&self) -> Option<SMBDialect> {
        self.negotiated.and_then(|outcome| outcome.dialect())
    }

    pub fn needs_negotiation(&self) -> bool {
        self.needs_negotiation
    }

    /// Why the last negotiate was rejected, if it was.
    pub fn negotiation_failure(&self) -> Option<&SMBError> {
        self.negotiation_failure.as_ref()
    }

    pub fn server_values(&self) -> Option<&'static ServerValues> {
        self.values
    }

    pub fn status(&self) -> ConnectionStatus {
        self.transport.status()
    }

    pub(crate) fn config(&self) -> &SMBServerConfig {
        &self.config
    }

    /// Serves requests until the peer leaves, the transport fails, or the
    /// server shuts down. A shutdown ends the loop with `Ok`.
    pub async fn run<H: CommandHandler>(&mut self, handler: &H) -> SMBResult<()> {
        loop {
            match self.read_request().await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(SMBError::TransportError(TransportError::Shutdown)) => {
                    debug!("connection shutting down");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }

            let message = std::mem::take(&mut self.request_buf);
            let result = self.process(&message, handler).await;
            self.request_buf = message;
            self.transport.touch();

            match result {
                Ok(response) if response.is_empty() => {}
                Ok(response) => self.send(&response).await?,
                Err(e) if e.is_connection_fatal() => return Err(e),
                Err(e) => warn!(%e, "request failed"),
            }
        }
    }

    /// Reads one session packet. `Ok(false)` means it carried no SMB message.
    async fn read_request(&mut self) -> SMBResult<bool> {
        let mut header = [0u8; SESSION_HEADER_SIZE];
        self.transport.read_into(&mut header).await?;
        let header = SessionHeader::from_bytes(header);

        let too_short = header.packet_type == SessionPacketType::Message && header.length < MIN_SUPPORTED_HEADER_SIZE;
        if too_short || header.length > self.config.max_message_size() {
            warn!(length = header.length, "invalid message length");
            self.transport.set_status(ConnectionStatus::NeedReconnect);
            return Err(TransportError::Retryable.into());
        }

        self.request_buf.clear();
        self.request_buf.try_reserve(header.length).map_err(|_| SMBError::from(TransportError::OutOfMemory))?;
        self.request_buf.resize(header.length, 0);
        self.transport.read_into(&mut self.request_buf).await?;

        match header.packet_type {
            SessionPacketType::Message => {
                trace!(length = header.length, "received message");
                Ok(true)
            }
            SessionPacketType::KeepAlive => {
                debug!("session keep alive");
                self.transport.touch();
                Ok(false)
            }
            SessionPacketType::Other(packet_type) => {
                debug!(packet_type, "unknown session packet type");
                Ok(false)
            }
        }
    }

    pub(crate) async fn process<H: CommandHandler>(&mut self, message: &[u8], handler: &H) -> SMBResult<Vec<u8>> {
        let marker = SMBFamily::classify(message);
        if self.family.is_none() {
            self.init_family(marker.unwrap_or(SMBFamily::Modern));
        }
        let family = self.family.unwrap_or(SMBFamily::Modern);
        let ops = family_ops(family);

        let Some(marker) = marker else {
            if self.needs_negotiation {
                debug!("unknown protocol marker during negotiation");
                return Ok(ops.rejection(message, NTStatus::InvalidLogonType));
            }
            warn!("dropping message with unknown protocol marker");
            return Ok(Vec::new());
        };

        let command = ops.command_code(message)
            .ok_or_else(|| SMBError::payload_too_small(family.header_size(), message.len()))?;
        if ops.is_negotiate(command) {
            let (response, result) = self.negotiate(message, family, marker);
            self.negotiation_failure = result.err();
            return Ok(response);
        }

        self.needs_negotiation = false;
        let request = SMBRequest {
            family,
            command,
            dialect: self.dialect(),
            message,
        };
        handler.handle_command(request).await
    }

    /// Picks the family a connection starts out in from the first message's
    /// marker, falling back to the modern family.
    pub(crate) fn init_family(&mut self, marker: SMBFamily) {
        let range = self.config.protocol_range();
        let values = match marker {
            SMBFamily::Legacy => LegacyFamily.init(range).or_else(|_| {
                debug!("SMB1 unavailable, initializing SMB2");
                ModernFamily.init(range)
            }),
            SMBFamily::Modern => ModernFamily.init(range),
        };
        if let Ok(values) = values {
            self.family = Some(values.family);
            self.values = Some(values);
        }
    }

    async fn send(&mut self, response: &[u8]) -> SMBResult<()> {
        let bytes = frame(response);
        match timeout(SEND_TIMEOUT, self.writer.write_all(&bytes)).await {
            Ok(result) => result.map_err(SMBError::io_error)?,
            Err(_) => {
                self.transport.set_status(ConnectionStatus::NeedReconnect);
                return Err(TransportError::Timeout.into());
            }
        }
        self.writer.flush().await.map_err(SMBError::io_error)?;
        trace!(sent = bytes.len(), "response sent");
        Ok(())
    }
}
