use std::future::Future;
use std::io;
use std::io::ErrorKind;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{Instant, sleep, timeout};
use tokio_util::sync::CancellationToken;

use smb_core::error::TransportError;
use smb_core::logging::{error, trace};

/// Interval between keep-alive echoes a client is expected to honour.
pub const ECHO_INTERVAL: Duration = Duration::from_secs(60);
/// A connection with no recorded activity for this long is unresponsive.
pub const LIVENESS_TIMEOUT: Duration = Duration::from_secs(2 * ECHO_INTERVAL.as_secs());
/// An idle receive gives up after this long so the liveness check can run.
pub const RECV_WAKEUP_INTERVAL: Duration = Duration::from_secs(7);
/// Upper bound on writing one response.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(5);

const TRANSIENT_BACKOFF: Duration = Duration::from_millis(1);
const FAILURE_BACKOFF: Duration = Duration::from_millis(2);

/// Raw receive side of a connection.
///
/// A receive may return fewer bytes than asked for. `WouldBlock` and
/// `Interrupted` are transient, `Ok(0)` means the peer went away.
pub trait SMBSocketRead: Send {
    fn recv(&mut self, buf: &mut [u8]) -> impl Future<Output=io::Result<usize>> + Send;
}

impl<R> SMBSocketRead for R where R: AsyncRead + Unpin + Send {
    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match timeout(RECV_WAKEUP_INTERVAL, self.read(buf)).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::from(ErrorKind::WouldBlock)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Active,
    NeedReconnect,
    Exiting,
}

/// Per-connection reader that assembles exact byte counts out of partial receives.
#[derive(Debug)]
pub struct SMBTransport<R: SMBSocketRead> {
    reader: R,
    scratch: Vec<u8>,
    last_active: Instant,
    status: ConnectionStatus,
    shutdown: CancellationToken,
}

impl<R: SMBSocketRead> SMBTransport<R> {
    pub fn new(reader: R, shutdown: CancellationToken) -> Self {
        Self {
            reader,
            scratch: Vec::new(),
            last_active: Instant::now(),
            status: ConnectionStatus::Active,
            shutdown,
        }
    }

    /// Records protocol activity on the connection.
    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    pub fn is_unresponsive(&self) -> bool {
        self.last_active.elapsed() > LIVENESS_TIMEOUT
    }

    pub fn status(&self) -> ConnectionStatus {
        if self.shutdown.is_cancelled() {
            ConnectionStatus::Exiting
        } else {
            self.status
        }
    }

    pub fn set_status(&mut self, status: ConnectionStatus) {
        self.status = status;
    }

    pub fn scratch_capacity(&self) -> usize {
        self.scratch.capacity()
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Fills a single contiguous buffer.
    pub async fn read_into(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        let len = buf.len();
        self.read_exact(&mut [buf], len).await
    }

    /// Reads exactly `byte_count` bytes into the segments of `destination`,
    /// in order. `byte_count` is capped at the combined segment length.
    ///
    /// There is no cap on transient retries; the liveness window bounds how
    /// long a silent peer can hold the call.
    pub async fn read_exact(&mut self, destination: &mut [&mut [u8]], byte_count: usize) -> Result<(), TransportError> {
        let capacity: usize = destination.iter().map(|segment| segment.len()).sum();
        let byte_count = byte_count.min(capacity);
        self.reserve_scratch(byte_count)?;

        let mut consumed = 0;
        while consumed < byte_count {
            if self.is_unresponsive() {
                error!("no response from client in {} secs", LIVENESS_TIMEOUT.as_secs());
                return Err(TransportError::Timeout);
            }
            self.check_status()?;

            let want = byte_count - consumed;
            let received = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => None,
                result = self.reader.recv(&mut self.scratch[..want]) => Some(result),
            };
            let Some(received) = received else {
                self.status = ConnectionStatus::Exiting;
                return Err(TransportError::Shutdown);
            };
            self.check_status()?;

            match received {
                Ok(0) => {
                    trace!(consumed, byte_count, "peer closed the connection");
                    return Err(self.fail().await);
                }
                Ok(read) => {
                    let read = read.min(want);
                    scatter(destination, consumed, &self.scratch[..read]);
                    consumed += read;
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                    trace!(kind = ?e.kind(), consumed, byte_count, "transient receive failure, retrying");
                    sleep(TRANSIENT_BACKOFF).await;
                }
                Err(e) => {
                    trace!(?e, "receive failed");
                    return Err(self.fail().await);
                }
            }
        }
        Ok(())
    }

    fn check_status(&self) -> Result<(), TransportError> {
        match self.status() {
            ConnectionStatus::Active => Ok(()),
            ConnectionStatus::Exiting => Err(TransportError::Shutdown),
            ConnectionStatus::NeedReconnect => Err(TransportError::Retryable),
        }
    }

    async fn fail(&mut self) -> TransportError {
        sleep(FAILURE_BACKOFF).await;
        self.status = ConnectionStatus::NeedReconnect;
        TransportError::Retryable
    }

    /// Grows the scratch area to `len` bytes. It never shrinks.
    fn reserve_scratch(&mut self, len: usize) -> Result<(), TransportError> {
        if self.scratch.len() >= len {
            return Ok(());
        }
        let additional = len - self.scratch.len();
        self.scratch.try_reserve_exact(additional).map_err(|_| TransportError::OutOfMemory)?;
        self.scratch.resize(len, 0);
        Ok(())
    }
}

/// Segment index and offset inside it where byte `consumed` of the
/// concatenated destination lives.
fn segment_cursor(destination: &[&mut [u8]], consumed: usize) -> (usize, usize) {
    let mut skipped = 0;
    for (index, segment) in destination.iter().enumerate() {
        if consumed < skipped + segment.len() {
            return (index, consumed - skipped);
        }
        skipped += segment.len();
    }
    (destination.len(), 0)
}

fn scatter(destination: &mut [&mut [u8]], consumed: usize, mut data: &[u8]) {
    let (first, mut offset) = segment_cursor(destination, consumed);
    for segment in destination.iter_mut().skip(first) {
        if data.is_empty() {
            break;
        }
        let take = (segment.len() - offset).min(data.len());
        segment[offset..offset + take].copy_from_slice(&data[..take]);
        data = &data[take..];
        offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::ReadBuf;

    use super::*;

    enum Step {
        Data(&'static [u8]),
        WouldBlock,
        Interrupted,
        Fail,
        Eof,
        Stall,
    }

    /// In-memory source replaying a fixed script of receive outcomes.
    struct ScriptedReader {
        steps: VecDeque<Step>,
    }

    impl ScriptedReader {
        fn new(steps: Vec<Step>) -> Self {
            Self { steps: steps.into() }
        }
    }

    impl AsyncRead for ScriptedReader {
        fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
            match self.steps.pop_front() {
                Some(Step::Data(bytes)) => {
                    let take = bytes.len().min(buf.remaining());
                    buf.put_slice(&bytes[..take]);
                    if take < bytes.len() {
                        self.steps.push_front(Step::Data(&bytes[take..]));
                    }
                    Poll::Ready(Ok(()))
                }
                Some(Step::WouldBlock) => Poll::Ready(Err(ErrorKind::WouldBlock.into())),
                Some(Step::Interrupted) => Poll::Ready(Err(ErrorKind::Interrupted.into())),
                Some(Step::Fail) => Poll::Ready(Err(ErrorKind::ConnectionReset.into())),
                Some(Step::Eof) | None => Poll::Ready(Ok(())),
                Some(Step::Stall) => Poll::Pending,
            }
        }
    }

    fn transport(steps: Vec<Step>) -> SMBTransport<ScriptedReader> {
        SMBTransport::new(ScriptedReader::new(steps), CancellationToken::new())
    }

    #[tokio::test]
    async fn assembles_chunks_with_transient_failures() {
        let mut transport = transport(vec![
            Step::WouldBlock,
            Step::Data(b"SM"),
            Step::Interrupted,
            Step::WouldBlock,
            Step::Data(b"B2"),
        ]);
        let mut buf = [0u8; 4];
        transport.read_into(&mut buf).await.unwrap();
        assert_eq!(&buf, b"SMB2");
        assert_eq!(transport.status(), ConnectionStatus::Active);
    }

    #[tokio::test]
    async fn fills_segments_across_partial_reads() {
        let mut transport = transport(vec![
            Step::Data(&[1, 2, 3]),
            Step::Data(&[4]),
            Step::WouldBlock,
            Step::Data(&[5, 6, 7, 8, 9]),
        ]);
        let mut first = [0u8; 2];
        let mut empty = [0u8; 0];
        let mut second = [0u8; 4];
        let mut third = [0u8; 3];
        let mut segments: [&mut [u8]; 4] = [&mut first, &mut empty, &mut second, &mut third];
        transport.read_exact(&mut segments, 9).await.unwrap();
        assert_eq!(first, [1, 2]);
        assert_eq!(second, [3, 4, 5, 6]);
        assert_eq!(third, [7, 8, 9]);
    }

    static PAYLOAD: [u8; 32] = [
        0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15,
        16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31,
    ];

    #[tokio::test(start_paused = true)]
    async fn every_chunk_size_fills_every_segment() {
        let payload: &'static [u8] = &PAYLOAD;
        for chunk in 1..=payload.len() {
            let mut steps = Vec::new();
            for (index, piece) in payload.chunks(chunk).enumerate() {
                steps.push(Step::Data(piece));
                steps.push(if index % 2 == 0 { Step::WouldBlock } else { Step::Interrupted });
            }
            let mut transport = transport(steps);
            let mut buffers: Vec<Vec<u8>> = [3, 0, 7, 1, 13, 8].iter().map(|len| vec![0xAA; *len]).collect();
            let mut segments: Vec<&mut [u8]> = buffers.iter_mut().map(|buffer| buffer.as_mut_slice()).collect();
            transport.read_exact(&mut segments, payload.len()).await.unwrap();
            assert_eq!(buffers.concat(), payload, "chunk size {}", chunk);
            assert_eq!(transport.status(), ConnectionStatus::Active);
        }
    }

    /// A peer that goes quiet mid-message is dropped once the liveness window closes.
    #[tokio::test(start_paused = true)]
    async fn stall_between_chunks_times_out() {
        let mut steps = vec![Step::Data(b"ab")];
        steps.extend((0..20).map(|_| Step::Stall));
        steps.push(Step::Data(b"cd"));
        let mut transport = transport(steps);
        let mut buf = [0u8; 4];
        let started = Instant::now();
        assert_eq!(transport.read_into(&mut buf).await, Err(TransportError::Timeout));
        assert!(started.elapsed() > LIVENESS_TIMEOUT);
        assert_eq!(&buf[..2], b"ab");
        assert!(matches!(transport.reader.steps.back(), Some(Step::Data(rest)) if *rest == b"cd"));
    }

    #[tokio::test]
    async fn short_byte_count_leaves_tail_untouched() {
        let mut transport = transport(vec![Step::Data(&[7, 7, 7])]);
        let mut buf = [0u8; 5];
        let mut segments: [&mut [u8]; 1] = [&mut buf];
        transport.read_exact(&mut segments, 3).await.unwrap();
        assert_eq!(buf, [7, 7, 7, 0, 0]);
    }

    #[tokio::test]
    async fn end_of_stream_requests_reconnect() {
        let mut transport = transport(vec![Step::Data(b"ab"), Step::Eof]);
        let mut buf = [0u8; 4];
        assert_eq!(transport.read_into(&mut buf).await, Err(TransportError::Retryable));
        assert_eq!(transport.status(), ConnectionStatus::NeedReconnect);
    }

    #[tokio::test]
    async fn hard_failure_is_retryable() {
        let mut transport = transport(vec![Step::Fail]);
        let mut buf = [0u8; 1];
        assert_eq!(transport.read_into(&mut buf).await, Err(TransportError::Retryable));
    }

    #[tokio::test]
    async fn reconnect_status_aborts_before_reading() {
        let mut transport = transport(vec![Step::Data(b"x")]);
        transport.set_status(ConnectionStatus::NeedReconnect);
        let mut buf = [0u8; 1];
        assert_eq!(transport.read_into(&mut buf).await, Err(TransportError::Retryable));
        assert_eq!(transport.reader.steps.len(), 1);
    }

    #[tokio::test]
    async fn exiting_status_is_shutdown() {
        let mut transport = transport(vec![Step::Data(b"x")]);
        transport.set_status(ConnectionStatus::Exiting);
        let mut buf = [0u8; 1];
        assert_eq!(transport.read_into(&mut buf).await, Err(TransportError::Shutdown));
    }

    #[tokio::test]
    async fn cancelled_token_is_shutdown() {
        let token = CancellationToken::new();
        let mut transport = SMBTransport::new(ScriptedReader::new(vec![Step::Data(b"x")]), token.clone());
        token.cancel();
        let mut buf = [0u8; 1];
        assert_eq!(transport.read_into(&mut buf).await, Err(TransportError::Shutdown));
        assert_eq!(transport.status(), ConnectionStatus::Exiting);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_connection_times_out_without_reading() {
        let mut transport = transport(vec![Step::Data(b"abcd")]);
        tokio::time::advance(LIVENESS_TIMEOUT + Duration::from_secs(1)).await;
        assert!(transport.is_unresponsive());
        let mut buf = [0u8; 4];
        assert_eq!(transport.read_into(&mut buf).await, Err(TransportError::Timeout));
        assert_eq!(transport.reader.steps.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn touch_resets_liveness() {
        let mut transport = transport(vec![Step::Data(b"ok")]);
        tokio::time::advance(Duration::from_secs(119)).await;
        transport.touch();
        tokio::time::advance(Duration::from_secs(119)).await;
        let mut buf = [0u8; 2];
        transport.read_into(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ok");
    }

    #[tokio::test]
    async fn scratch_grows_to_high_water_mark() {
        let mut transport = transport(vec![Step::Data(&[0; 64]), Step::Data(&[0; 8])]);
        let mut large = [0u8; 64];
        transport.read_into(&mut large).await.unwrap();
        let capacity = transport.scratch_capacity();
        assert!(capacity >= 64);
        let mut small = [0u8; 8];
        transport.read_into(&mut small).await.unwrap();
        assert_eq!(transport.scratch_capacity(), capacity);
    }

    #[test]
    fn cursor_skips_whole_and_empty_segments() {
        let mut a = [0u8; 3];
        let mut b = [0u8; 0];
        let mut c = [0u8; 2];
        let segments: [&mut [u8]; 3] = [&mut a, &mut b, &mut c];
        assert_eq!(segment_cursor(&segments, 0), (0, 0));
        assert_eq!(segment_cursor(&segments, 2), (0, 2));
        assert_eq!(segment_cursor(&segments, 3), (2, 0));
        assert_eq!(segment_cursor(&segments, 4), (2, 1));
        assert_eq!(segment_cursor(&segments, 5), (3, 0));
    }
}
