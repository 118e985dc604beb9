use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use crate::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};
use crate::error::SMBError;

#[repr(u32)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TryFromPrimitive, Copy)]
pub enum NTStatus {
    StatusSuccess = 0x0,
    BufferOverflow = 0x80000005,
    NoMoreFiles = 0x80000006,
    InvalidParameter = 0xC000000D,
    StatusNotSupported = 0xC00000BB,
    InvalidLogonType = 0xC000010B,
}

impl NTStatus {
    pub fn is_success(&self) -> bool {
        *self == NTStatus::StatusSuccess
    }
}

impl SMBByteSize for NTStatus {
    fn smb_byte_size(&self) -> usize {
        std::mem::size_of_val(&(*self as u32))
    }
}

impl SMBFromBytes for NTStatus {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> where Self: Sized {
        let (remaining, underlying) = u32::smb_from_bytes(input)?;
        let res = Self::try_from_primitive(underlying)
            .map_err(|_e| SMBError::parse_error("Unknown NT status code"))?;
        Ok((remaining, res))
    }
}

impl SMBToBytes for NTStatus {
    fn smb_to_bytes(&self) -> Vec<u8> {
        (*self as u32).smb_to_bytes()
    }
}
