use std::fmt::Debug;
use std::future::Future;
use std::ops::Deref;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::net::ToSocketAddrs;
use tokio_stream::Stream;
use tokio_util::sync::ReusableBoxFuture;

use smb_core::SMBResult;
use smb_core::logging::info;

use crate::socket::transport::SMBSocketRead;

mod tcp;

/// Conventional SMB service port.
pub const SMB_PORT: u16 = 445;
/// Pending-connection queue length requested from the OS.
pub const LISTEN_BACKLOG: u32 = 64;
/// How long the acceptor backs off after a failed accept.
pub const ACCEPT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// A listening endpoint that hands out split read/write connection halves.
pub trait SMBSocket: Send + Sync + Sized {
    type ReadStream: SMBSocketRead + Debug + 'static;
    type WriteStream: AsyncWrite + Unpin + Send + Debug + 'static;

    fn new_socket<A: ToSocketAddrs + Send>(addr: A) -> impl Future<Output=SMBResult<Self>> + Send;

    fn new_connection(&self) -> impl Future<Output=SMBResult<SMBSocketConnection<Self::ReadStream, Self::WriteStream>>> + Send;
}

#[derive(Debug)]
pub struct SMBSocketConnection<R, W> {
    name: String,
    read_stream: R,
    write_stream: W,
}

impl<R, W> SMBSocketConnection<R, W> {
    pub fn new(name: String, read_stream: R, write_stream: W) -> Self {
        Self {
            name,
            read_stream,
            write_stream,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn into_parts(self) -> (String, R, W) {
        (self.name, self.read_stream, self.write_stream)
    }
}

#[derive(Debug)]
pub struct SMBListener<Socket: SMBSocket> {
    socket: Socket,
}

impl<Socket: SMBSocket> SMBListener<Socket> {
    pub async fn new<A: ToSocketAddrs + Send>(addr: A) -> SMBResult<Self> {
        let socket = Socket::new_socket(addr).await?;
        info!("listener bound");
        Ok(Self { socket })
    }

    pub fn from_socket(socket: Socket) -> Self {
        Self { socket }
    }

    pub fn connections(&self) -> SMBConnectionStream<'_, Socket> {
        SMBConnectionStream::new(self)
    }
}

impl<Socket: SMBSocket> Deref for SMBListener<Socket> {
    type Target = Socket;

    fn deref(&self) -> &Self::Target {
        &self.socket
    }
}

type SMBConnectionResult<Socket> = SMBResult<SMBSocketConnection<<Socket as SMBSocket>::ReadStream, <Socket as SMBSocket>::WriteStream>>;

/// Endless stream of accept results. Accept failures are yielded as items so
/// the caller decides how to back off.
pub struct SMBConnectionStream<'a, Socket: SMBSocket> {
    inner: ReusableBoxFuture<'a, (SMBConnectionResult<Socket>, &'a SMBListener<Socket>)>,
}

async fn make_future<Socket: SMBSocket>(listener: &SMBListener<Socket>) -> (SMBConnectionResult<Socket>, &SMBListener<Socket>) {
    let res = listener.new_connection().await;
    (res, listener)
}

impl<'a, Socket: SMBSocket> SMBConnectionStream<'a, Socket> {
    pub fn new(listener: &'a SMBListener<Socket>) -> Self {
        Self {
            inner: ReusableBoxFuture::new(make_future(listener)),
        }
    }
}

impl<Socket: SMBSocket> Stream for SMBConnectionStream<'_, Socket> {
    type Item = SMBConnectionResult<Socket>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let (res, listener) = ready!(self.inner.poll(cx));
        self.inner.set(make_future(listener));
        Poll::Ready(Some(res))
    }
}
