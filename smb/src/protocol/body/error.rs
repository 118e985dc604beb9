use bytes::BufMut;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBToBytes};

use crate::protocol::body::Body;
use crate::protocol::header::{LegacySMBHeader, SMBSyncHeader};

/// SMB2 ERROR Response ([MS-SMB2] 2.2.2)
///
/// The NT status travels in the header, the body only pads out the
/// nine byte structure.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy, Default)]
pub struct SMBErrorResponse;

impl SMBByteSize for SMBErrorResponse {
    fn smb_byte_size(&self) -> usize {
        9
    }
}

impl SMBToBytes for SMBErrorResponse {
    fn smb_to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.smb_byte_size());
        bytes.put_u16_le(9);
        // error context count, reserved
        bytes.put_u8(0);
        bytes.put_u8(0);
        // byte count
        bytes.put_u32_le(0);
        bytes.put_u8(0);
        bytes
    }
}

impl Body<SMBSyncHeader> for SMBErrorResponse {}

/// Empty SMB1 response: no parameter words, no data bytes.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy, Default)]
pub struct LegacySMBErrorResponse;

impl SMBByteSize for LegacySMBErrorResponse {
    fn smb_byte_size(&self) -> usize {
        3
    }
}

impl SMBToBytes for LegacySMBErrorResponse {
    fn smb_to_bytes(&self) -> Vec<u8> {
        vec![0; 3]
    }
}

impl Body<LegacySMBHeader> for LegacySMBErrorResponse {}
