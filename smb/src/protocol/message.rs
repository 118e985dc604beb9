use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBToBytes};

use crate::protocol::body::Body;
use crate::protocol::header::Header;

/// RFC 1002 session service header preceding every SMB message on TCP.
pub const SESSION_HEADER_SIZE: usize = 4;
/// Largest payload a 24-bit session length can describe.
pub const MAX_SESSION_LENGTH: usize = 0x00FF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPacketType {
    Message,
    KeepAlive,
    Other(u8),
}

impl From<u8> for SessionPacketType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::Message,
            0x85 => Self::KeepAlive,
            other => Self::Other(other),
        }
    }
}

impl From<SessionPacketType> for u8 {
    fn from(value: SessionPacketType) -> Self {
        match value {
            SessionPacketType::Message => 0x00,
            SessionPacketType::KeepAlive => 0x85,
            SessionPacketType::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHeader {
    pub packet_type: SessionPacketType,
    pub length: usize,
}

impl SessionHeader {
    pub fn message(length: usize) -> Self {
        Self { packet_type: SessionPacketType::Message, length }
    }

    pub fn from_bytes(bytes: [u8; SESSION_HEADER_SIZE]) -> Self {
        let length = u32::from_be_bytes([0, bytes[1], bytes[2], bytes[3]]) as usize;
        Self { packet_type: bytes[0].into(), length }
    }

    pub fn as_bytes(&self) -> [u8; SESSION_HEADER_SIZE] {
        let length = (self.length.min(MAX_SESSION_LENGTH) as u32).to_be_bytes();
        [self.packet_type.into(), length[1], length[2], length[3]]
    }
}

/// Wraps an already serialized SMB message in a session message header.
pub fn frame(message: &[u8]) -> Vec<u8> {
    [&SessionHeader::message(message.len()).as_bytes()[..], message].concat()
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug)]
pub struct SMBMessage<S: Header, T: Body<S>> {
    pub header: S,
    pub body: T,
}

impl<S: Header, T: Body<S>> SMBMessage<S, T> {
    pub fn new(header: S, body: T) -> Self {
        SMBMessage {
            header,
            body,
        }
    }
}

pub trait Message {
    /// Header followed by body, without the session header.
    fn smb_bytes(&self) -> Vec<u8>;

    fn as_bytes(&self) -> Vec<u8> {
        frame(&self.smb_bytes())
    }
}

impl<S: Header, T: Body<S>> Message for SMBMessage<S, T> {
    fn smb_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.header.smb_byte_size() + self.body.smb_byte_size());
        bytes.extend_from_slice(&self.header.smb_to_bytes());
        bytes.extend_from_slice(&self.body.smb_to_bytes());
        bytes
    }
}

#[cfg(test)]
mod tests {
    use smb_core::nt_status::NTStatus;

    use crate::protocol::body::SMBErrorResponse;
    use crate::protocol::header::{SMBCommandCode, SMBFlags, SMBSyncHeader};

    use super::*;

    #[test]
    fn session_header_is_big_endian() {
        let header = SessionHeader::from_bytes([0x00, 0x01, 0x02, 0x03]);
        assert_eq!(header.packet_type, SessionPacketType::Message);
        assert_eq!(header.length, 0x010203);
        assert_eq!(header.as_bytes(), [0x00, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn keepalive_and_other_types() {
        assert_eq!(SessionHeader::from_bytes([0x85, 0, 0, 0]).packet_type, SessionPacketType::KeepAlive);
        assert_eq!(SessionHeader::from_bytes([0x81, 0, 0, 4]).packet_type, SessionPacketType::Other(0x81));
    }

    #[test]
    fn framed_message_has_length_prefix() {
        let header = SMBSyncHeader::new(SMBCommandCode::Echo, SMBFlags::empty(), 1, 0, 0)
            .create_response_header(NTStatus::StatusNotSupported);
        let message = SMBMessage::new(header, SMBErrorResponse);
        let bytes = message.as_bytes();
        assert_eq!(bytes.len(), 4 + 64 + 9);
        assert_eq!(&bytes[0..4], &[0, 0, 0, 73]);
        assert_eq!(&bytes[4..8], &[0xFE, b'S', b'M', b'B']);
    }
}
