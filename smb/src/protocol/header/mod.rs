use serde::{Deserialize, Serialize};

use smb_core::{SMBFromBytes, SMBParseResult, SMBToBytes};

mod command_code;
mod flags;
mod flags2;
mod header;

pub type SMBCommandCode = command_code::SMBCommandCode;
pub type SMBSyncHeader = header::SMBSyncHeader;
pub type SMBFlags = flags::SMBFlags;

pub type LegacySMBCommandCode = command_code::LegacySMBCommandCode;
pub type LegacySMBHeader = header::LegacySMBHeader;
pub type LegacySMBFlags = flags::LegacySMBFlags;
pub type LegacySMBFlags2 = flags2::LegacySMBFlags2;

pub const SMB2_PROTOCOL_ID: [u8; 4] = [0xFE, b'S', b'M', b'B'];
pub const SMB1_PROTOCOL_ID: [u8; 4] = [0xFF, b'S', b'M', b'B'];

pub const SMB2_HEADER_SIZE: usize = 64;
pub const SMB1_HEADER_SIZE: usize = 32;

/// Protocol family of a message, decided by its four byte marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SMBFamily {
    /// SMB1 / CIFS, 0xFF 'SMB'
    Legacy,
    /// SMB2 and SMB3, 0xFE 'SMB'
    Modern,
}

impl SMBFamily {
    pub fn classify(message: &[u8]) -> Option<Self> {
        match message.get(0..4)? {
            marker if marker == SMB2_PROTOCOL_ID => Some(Self::Modern),
            marker if marker == SMB1_PROTOCOL_ID => Some(Self::Legacy),
            _ => None,
        }
    }

    pub fn protocol_id(&self) -> [u8; 4] {
        match self {
            Self::Legacy => SMB1_PROTOCOL_ID,
            Self::Modern => SMB2_PROTOCOL_ID,
        }
    }

    pub fn header_size(&self) -> usize {
        match self {
            Self::Legacy => SMB1_HEADER_SIZE,
            Self::Modern => SMB2_HEADER_SIZE,
        }
    }
}

pub trait Header: SMBFromBytes + SMBToBytes {
    type CommandCode: Into<u64> + Copy;

    fn command_code(&self) -> Self::CommandCode;

    fn family() -> SMBFamily;

    fn parse(bytes: &[u8]) -> SMBParseResult<&[u8], (Self, Self::CommandCode)> where Self: Sized {
        let (remaining, header) = Self::smb_from_bytes(bytes)?;
        let command = header.command_code();
        Ok((remaining, (header, command)))
    }
}
