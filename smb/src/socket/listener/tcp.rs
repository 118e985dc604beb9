use std::io;
use std::io::ErrorKind;

use tokio::net::{TcpListener, TcpSocket, ToSocketAddrs, lookup_host};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use smb_core::SMBResult;
use smb_core::error::SMBError;
use smb_core::logging::{debug, warn};

use crate::socket::listener::{LISTEN_BACKLOG, SMBSocket, SMBSocketConnection};

impl SMBSocket for TcpListener {
    type ReadStream = OwnedReadHalf;
    type WriteStream = OwnedWriteHalf;

    async fn new_socket<A: ToSocketAddrs + Send>(addr: A) -> SMBResult<Self> {
        let addr = lookup_host(addr).await
            .map_err(SMBError::io_error)?
            .next()
            .ok_or_else(|| SMBError::io_error(io::Error::new(ErrorKind::AddrNotAvailable, "listen address did not resolve")))?;
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }.map_err(SMBError::io_error)?;
        socket.set_reuseaddr(true).map_err(SMBError::io_error)?;
        socket.bind(addr).map_err(|e| {
            warn!(%addr, ?e, "failed to bind socket");
            SMBError::io_error(e)
        })?;
        debug!(%addr, backlog = LISTEN_BACKLOG, "socket bound");
        socket.listen(LISTEN_BACKLOG).map_err(SMBError::io_error)
    }

    async fn new_connection(&self) -> SMBResult<SMBSocketConnection<Self::ReadStream, Self::WriteStream>> {
        let (stream, addr) = self.accept().await.map_err(SMBError::io_error)?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!(?e, "set TCP_NODELAY failed");
        }
        debug!(peer = %addr, "accepted new connection");
        let (read, write) = stream.into_split();
        Ok(SMBSocketConnection::new(addr.to_string(), read, write))
    }
}
