use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;

use crate::nt_status::NTStatus;

#[derive(Debug)]
pub enum SMBError {
    ParseError(SMBParseError),
    PreconditionFailed(SMBPreconditionFailedError),
    IOError(SMBIOError),
    ResponseError(SMBResponseError),
    PayloadTooSmall(SMBPayloadTooSmallError),
    ServerError(SMBServerError),
    TransportError(TransportError),
    NegotiationFailed(SMBNegotiationError),
    BufferFull(SMBBufferFullError),
}

impl SMBError {
    pub fn parse_error<T: Into<SMBParseError>>(error: T) -> Self {
        Self::ParseError(error.into())
    }

    pub fn precondition_failed<T: Into<SMBPreconditionFailedError>>(error: T) -> Self {
        Self::PreconditionFailed(error.into())
    }

    pub fn io_error<T: Into<SMBIOError>>(error: T) -> Self {
        Self::IOError(error.into())
    }

    pub fn response_error<T: Into<SMBResponseError>>(error: T) -> Self {
        Self::ResponseError(error.into())
    }

    pub fn payload_too_small<T: Into<usize>, U: Into<usize>>(expected: T, actual: U) -> Self {
        Self::PayloadTooSmall((expected, actual).into())
    }

    pub fn server_error<T: Into<SMBServerError>>(error: T) -> Self {
        Self::ServerError(error.into())
    }

    pub fn negotiation_failed<T: Into<SMBNegotiationError>>(error: T) -> Self {
        Self::NegotiationFailed(error.into())
    }

    pub fn buffer_full<T: Into<usize>, U: Into<usize>>(needed: T, available: U) -> Self {
        Self::BufferFull((needed, available).into())
    }

    /// Whether the connection that produced this error can keep serving requests.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(self, Self::TransportError(_) | Self::IOError(_))
    }
}

/// Terminal conditions of a transport read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    OutOfMemory,
    Timeout,
    Shutdown,
    Retryable,
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "Transport read buffer allocation failed"),
            Self::Timeout => write!(f, "No response from client within the liveness window"),
            Self::Shutdown => write!(f, "Connection is shutting down"),
            Self::Retryable => write!(f, "Connection needs to be re-established"),
        }
    }
}

impl Error for TransportError {}

impl From<TransportError> for SMBError {
    fn from(value: TransportError) -> Self {
        Self::TransportError(value)
    }
}

#[derive(Debug)]
pub struct SMBParseError {
    error: Box<dyn Error + Send + Sync>,
}

impl<T: Into<Box<dyn Error + Send + Sync>>> From<T> for SMBParseError {
    fn from(value: T) -> Self {
        Self {
            error: value.into()
        }
    }
}

impl Display for SMBParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse failed with error: {}", self.error)
    }
}

#[derive(Debug)]
pub struct SMBPreconditionFailedError {
    message: String,
}

impl<T: Into<String>> From<T> for SMBPreconditionFailedError {
    fn from(value: T) -> Self {
        Self {
            message: value.into()
        }
    }
}

impl Display for SMBPreconditionFailedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Operation failed with unmet precondition: {}", self.message)
    }
}

#[derive(Debug)]
pub struct SMBIOError {
    error: io::Error,
}

impl SMBIOError {
    pub fn kind(&self) -> io::ErrorKind {
        self.error.kind()
    }
}

impl<T: Into<io::Error>> From<T> for SMBIOError {
    fn from(value: T) -> Self {
        Self {
            error: value.into()
        }
    }
}

impl Display for SMBIOError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SMB I/O operation failed with error: {}", self.error)
    }
}

#[derive(Debug)]
pub struct SMBResponseError {
    message: String,
}

impl<T: Into<String>> From<T> for SMBResponseError {
    fn from(value: T) -> Self {
        Self {
            message: value.into()
        }
    }
}

impl Display for SMBResponseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SMB response generation failed with: {}", self.message)
    }
}

#[derive(Debug)]
pub struct SMBPayloadTooSmallError {
    expected: usize,
    actual: usize,
}

impl<T: Into<usize>, U: Into<usize>> From<(T, U)> for SMBPayloadTooSmallError {
    fn from(value: (T, U)) -> Self {
        Self {
            expected: value.0.into(),
            actual: value.1.into(),
        }
    }
}

impl Display for SMBPayloadTooSmallError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Expected {} bytes, was actually {} bytes", self.expected, self.actual)
    }
}

#[derive(Debug)]
pub struct SMBServerError {
    error: Box<dyn Error + Send + Sync>,
}

impl<T: Into<Box<dyn Error + Send + Sync>>> From<T> for SMBServerError {
    fn from(value: T) -> Self {
        Self {
            error: value.into()
        }
    }
}

impl Display for SMBServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Server failed with error: {}", self.error)
    }
}

#[derive(Debug)]
pub struct SMBNegotiationError {
    status: NTStatus,
}

impl SMBNegotiationError {
    pub fn status(&self) -> NTStatus {
        self.status
    }
}

impl From<NTStatus> for SMBNegotiationError {
    fn from(status: NTStatus) -> Self {
        Self { status }
    }
}

impl Display for SMBNegotiationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Dialect negotiation failed with status {:?} ({:#010x})", self.status, self.status as u32)
    }
}

#[derive(Debug)]
pub struct SMBBufferFullError {
    needed: usize,
    available: usize,
}

impl<T: Into<usize>, U: Into<usize>> From<(T, U)> for SMBBufferFullError {
    fn from(value: (T, U)) -> Self {
        Self {
            needed: value.0.into(),
            available: value.1.into(),
        }
    }
}

impl Display for SMBBufferFullError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Output buffer full: record needs {} bytes, {} available", self.needed, self.available)
    }
}

impl Display for SMBError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseError(x) => write!(f, "{}", x),
            Self::PreconditionFailed(x) => write!(f, "{}", x),
            Self::IOError(x) => write!(f, "{}", x),
            Self::ResponseError(x) => write!(f, "{}", x),
            Self::PayloadTooSmall(x) => write!(f, "{}", x),
            Self::ServerError(x) => write!(f, "{}", x),
            Self::TransportError(x) => write!(f, "{}", x),
            Self::NegotiationFailed(x) => write!(f, "{}", x),
            Self::BufferFull(x) => write!(f, "{}", x),
        }
    }
}

impl std::error::Error for SMBError {}
