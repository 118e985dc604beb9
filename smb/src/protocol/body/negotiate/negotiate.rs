use bytes::BufMut;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use smb_core::{SMBByteSize, SMBToBytes};

use crate::protocol::body::{Body, Capabilities, FileTime, LegacyCapabilities};
use crate::protocol::body::negotiate::{LegacySecurityMode, NegotiateSecurityMode};
use crate::protocol::dialect::{BAD_PROTOCOL_ID, SMBDialect};
use crate::protocol::header::{LegacySMBHeader, SMB2_HEADER_SIZE, SMBSyncHeader};

const NEGOTIATE_RESPONSE_STRUCTURE_SIZE: u16 = 65;
const NEGOTIATE_RESPONSE_FIXED_SIZE: usize = 64;
const LEGACY_NEGOTIATE_WORD_COUNT: u8 = 17;

/// [MS-SMB2] 2.2.4 SMB2 NEGOTIATE Response
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Builder)]
#[builder(pattern = "owned")]
pub struct SMBNegotiateResponse {
    #[builder(default = "NegotiateSecurityMode::NEGOTIATE_SIGNING_ENABLED")]
    security_mode: NegotiateSecurityMode,
    dialect: SMBDialect,
    guid: Uuid,
    #[builder(default = "Capabilities::empty()")]
    capabilities: Capabilities,
    max_transact_size: u32,
    max_read_size: u32,
    max_write_size: u32,
    #[builder(default = "FileTime::now()")]
    system_time: FileTime,
    #[builder(default)]
    server_start_time: FileTime,
    #[builder(default)]
    buffer: Vec<u8>,
}

impl SMBNegotiateResponse {
    pub fn dialect(&self) -> SMBDialect {
        self.dialect
    }

    pub fn max_read_size(&self) -> u32 {
        self.max_read_size
    }
}

impl SMBByteSize for SMBNegotiateResponse {
    fn smb_byte_size(&self) -> usize {
        NEGOTIATE_RESPONSE_FIXED_SIZE + self.buffer.len().max(1)
    }
}

impl SMBToBytes for SMBNegotiateResponse {
    fn smb_to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.smb_byte_size());
        bytes.put_u16_le(NEGOTIATE_RESPONSE_STRUCTURE_SIZE);
        bytes.put_u16_le(self.security_mode.bits());
        bytes.put_u16_le(self.dialect as u16);
        // negotiate context count
        bytes.put_u16_le(0);
        bytes.put_slice(&self.guid.smb_to_bytes());
        bytes.put_u32_le(self.capabilities.bits());
        bytes.put_u32_le(self.max_transact_size);
        bytes.put_u32_le(self.max_read_size);
        bytes.put_u32_le(self.max_write_size);
        bytes.put_slice(&self.system_time.smb_to_bytes());
        bytes.put_slice(&self.server_start_time.smb_to_bytes());
        bytes.put_u16_le((SMB2_HEADER_SIZE + NEGOTIATE_RESPONSE_FIXED_SIZE) as u16);
        bytes.put_u16_le(self.buffer.len() as u16);
        // negotiate context offset
        bytes.put_u32_le(0);
        if self.buffer.is_empty() {
            bytes.put_u8(0);
        } else {
            bytes.put_slice(&self.buffer);
        }
        bytes
    }
}

impl Body<SMBSyncHeader> for SMBNegotiateResponse {}

/// [MS-SMB] 2.2.4.5.2.1 SMB_COM_NEGOTIATE extended security response for "NT LM 0.12"
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Builder)]
#[builder(pattern = "owned")]
pub struct SMBLegacyNegotiateResponse {
    dialect_index: u16,
    #[builder(default = "LegacySecurityMode::USER_SECURITY | LegacySecurityMode::ENCRYPT_PASSWORDS")]
    security_mode: LegacySecurityMode,
    #[builder(default = "10")]
    max_mpx_count: u16,
    #[builder(default = "1")]
    max_number_vcs: u16,
    max_buffer_size: u32,
    #[builder(default = "65536")]
    max_raw_size: u32,
    #[builder(default)]
    session_key: u32,
    capabilities: LegacyCapabilities,
    #[builder(default = "FileTime::now()")]
    system_time: FileTime,
    #[builder(default)]
    server_time_zone: i16,
    server_guid: Uuid,
    #[builder(default)]
    security_blob: Vec<u8>,
}

impl SMBByteSize for SMBLegacyNegotiateResponse {
    fn smb_byte_size(&self) -> usize {
        1 + LEGACY_NEGOTIATE_WORD_COUNT as usize * 2 + 2 + 16 + self.security_blob.len()
    }
}

impl SMBToBytes for SMBLegacyNegotiateResponse {
    fn smb_to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.smb_byte_size());
        bytes.put_u8(LEGACY_NEGOTIATE_WORD_COUNT);
        bytes.put_u16_le(self.dialect_index);
        bytes.put_u8(self.security_mode.bits());
        bytes.put_u16_le(self.max_mpx_count);
        bytes.put_u16_le(self.max_number_vcs);
        bytes.put_u32_le(self.max_buffer_size);
        bytes.put_u32_le(self.max_raw_size);
        bytes.put_u32_le(self.session_key);
        bytes.put_u32_le(self.capabilities.bits());
        bytes.put_slice(&self.system_time.smb_to_bytes());
        bytes.put_i16_le(self.server_time_zone);
        // challenge length, always zero with extended security
        bytes.put_u8(0);
        bytes.put_u16_le((16 + self.security_blob.len()) as u16);
        bytes.put_slice(&self.server_guid.smb_to_bytes());
        bytes.put_slice(&self.security_blob);
        bytes
    }
}

impl Body<LegacySMBHeader> for SMBLegacyNegotiateResponse {}

/// Legacy negotiate response refusing every offered dialect.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy, Default)]
pub struct SMBLegacyNegotiateRejection;

impl SMBByteSize for SMBLegacyNegotiateRejection {
    fn smb_byte_size(&self) -> usize {
        5
    }
}

impl SMBToBytes for SMBLegacyNegotiateRejection {
    fn smb_to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.smb_byte_size());
        bytes.put_u8(1);
        bytes.put_u16_le(BAD_PROTOCOL_ID);
        bytes.put_u16_le(0);
        bytes
    }
}

impl Body<LegacySMBHeader> for SMBLegacyNegotiateRejection {}

#[cfg(test)]
mod tests {
    use super::*;

    /// MS-SMB2 2.2.4: StructureSize 65, SecurityBufferOffset 0x80
    #[test]
    fn negotiate_response_layout() {
        let guid = Uuid::from_u128(0x0102_0304_0506_0708_090A_0B0C_0D0E_0F10);
        let response = SMBNegotiateResponseBuilder::default()
            .dialect(SMBDialect::V2_1_0)
            .guid(guid)
            .capabilities(Capabilities::LEASING | Capabilities::LARGE_MTU)
            .max_transact_size(1 << 20)
            .max_read_size(1 << 20)
            .max_write_size(1 << 20)
            .system_time(FileTime::from_unix(0))
            .build()
            .unwrap();
        let bytes = response.smb_to_bytes();
        assert_eq!(bytes.len(), 65);
        assert_eq!(bytes.len(), response.smb_byte_size());
        assert_eq!(&bytes[0..2], &[65, 0]);
        assert_eq!(&bytes[2..4], &[0x01, 0x00]);
        assert_eq!(&bytes[4..6], &[0x10, 0x02]);
        assert_eq!(&bytes[8..12], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[24..28], &[0x06, 0, 0, 0]);
        assert_eq!(&bytes[32..36], &[0, 0, 0x10, 0]);
        assert_eq!(&bytes[56..58], &[0x80, 0]);
        assert_eq!(&bytes[58..60], &[0, 0]);
    }

    #[test]
    fn wildcard_dialect_response() {
        let response = SMBNegotiateResponseBuilder::default()
            .dialect(SMBDialect::V2_X_X)
            .guid(Uuid::nil())
            .max_transact_size(65536)
            .max_read_size(65536)
            .max_write_size(65536)
            .build()
            .unwrap();
        assert_eq!(&response.smb_to_bytes()[4..6], &[0xFF, 0x02]);
    }

    #[test]
    fn missing_required_field_fails_to_build() {
        let result = SMBNegotiateResponseBuilder::default()
            .guid(Uuid::nil())
            .build();
        assert!(result.is_err());
    }

    /// MS-CIFS 2.2.4.52.2: WordCount 17 for the NT LAN Manager response
    #[test]
    fn legacy_response_layout() {
        let response = SMBLegacyNegotiateResponseBuilder::default()
            .dialect_index(2)
            .max_buffer_size(65536)
            .capabilities(LegacyCapabilities::NT_SMBS | LegacyCapabilities::EXTENDED_SECURITY)
            .system_time(FileTime::from_unix(0))
            .server_guid(Uuid::nil())
            .build()
            .unwrap();
        let bytes = response.smb_to_bytes();
        assert_eq!(bytes.len(), response.smb_byte_size());
        assert_eq!(bytes[0], 17);
        assert_eq!(&bytes[1..3], &[2, 0]);
        assert_eq!(bytes[3], 0x03);
        assert_eq!(&bytes[20..24], &[0x10, 0, 0, 0x80]);
        assert_eq!(bytes[34], 0);
        assert_eq!(&bytes[35..37], &[16, 0]);
    }

    #[test]
    fn rejection_layout() {
        assert_eq!(SMBLegacyNegotiateRejection.smb_to_bytes(), vec![1, 0xFF, 0xFF, 0, 0]);
    }
}
