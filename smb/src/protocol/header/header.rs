use bytes::BufMut;
use nom::bytes::complete::{tag, take};
use nom::number::complete::{le_u16, le_u32, le_u64, le_u8};
use nom::sequence::tuple;
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};
use smb_core::error::SMBError;
use smb_core::nt_status::NTStatus;

use crate::protocol::header::{
    Header, LegacySMBCommandCode, LegacySMBFlags, LegacySMBFlags2, SMB1_HEADER_SIZE, SMB1_PROTOCOL_ID,
    SMB2_HEADER_SIZE, SMB2_PROTOCOL_ID, SMBCommandCode, SMBFamily, SMBFlags,
};

type NomError<'a> = nom::error::Error<&'a [u8]>;

/// [MS-SMB2] 2.2.1.2 SMB2 Packet Header - SYNC
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBSyncHeader {
    credit_charge: u16,
    status: u32,
    command: SMBCommandCode,
    credits: u16,
    flags: SMBFlags,
    next_command: u32,
    message_id: u64,
    process_id: u32,
    tree_id: u32,
    session_id: u64,
    signature: [u8; 16],
}

/// [MS-CIFS] 2.2.3.1 SMB Header
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct LegacySMBHeader {
    pub(crate) command: LegacySMBCommandCode,
    status: u32,
    flags: LegacySMBFlags,
    flags2: LegacySMBFlags2,
    pid_high: u16,
    security_features: [u8; 8],
    tid: u16,
    pid_low: u16,
    uid: u16,
    mid: u16,
}

impl Header for SMBSyncHeader {
    type CommandCode = SMBCommandCode;

    fn command_code(&self) -> Self::CommandCode {
        self.command
    }

    fn family() -> SMBFamily {
        SMBFamily::Modern
    }
}

impl Header for LegacySMBHeader {
    type CommandCode = LegacySMBCommandCode;

    fn command_code(&self) -> Self::CommandCode {
        self.command
    }

    fn family() -> SMBFamily {
        SMBFamily::Legacy
    }
}

impl SMBByteSize for SMBSyncHeader {
    fn smb_byte_size(&self) -> usize {
        SMB2_HEADER_SIZE
    }
}

impl SMBFromBytes for SMBSyncHeader {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> where Self: Sized {
        let (remaining, (_, _structure_size, credit_charge, status, command, credits, flags, next_command, message_id, process_id, tree_id, session_id, signature)) = tuple((
            tag::<_, _, NomError>(&SMB2_PROTOCOL_ID[..]),
            le_u16,
            le_u16,
            le_u32,
            le_u16,
            le_u16,
            le_u32,
            le_u32,
            le_u64,
            le_u32,
            le_u32,
            le_u64,
            take(16_usize),
        ))(input).map_err(|_e| SMBError::parse_error("Invalid SMB2 header"))?;
        let command = SMBCommandCode::try_from_primitive(command)
            .map_err(|_e| SMBError::parse_error(format!("Unknown SMB2 command {:#06x}", command)))?;
        let signature = <[u8; 16]>::try_from(signature)
            .map_err(|_e| SMBError::parse_error("Invalid signature length"))?;
        Ok((remaining, Self {
            credit_charge,
            status,
            command,
            credits,
            flags: SMBFlags::from_bits_truncate(flags),
            next_command,
            message_id,
            process_id,
            tree_id,
            session_id,
            signature,
        }))
    }
}

impl SMBToBytes for SMBSyncHeader {
    fn smb_to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SMB2_HEADER_SIZE);
        bytes.put_slice(&SMB2_PROTOCOL_ID);
        bytes.put_u16_le(SMB2_HEADER_SIZE as u16);
        bytes.put_u16_le(self.credit_charge);
        bytes.put_u32_le(self.status);
        bytes.put_u16_le(self.command as u16);
        bytes.put_u16_le(self.credits);
        bytes.put_u32_le(self.flags.bits());
        bytes.put_u32_le(self.next_command);
        bytes.put_u64_le(self.message_id);
        bytes.put_u32_le(self.process_id);
        bytes.put_u32_le(self.tree_id);
        bytes.put_u64_le(self.session_id);
        bytes.put_slice(&self.signature);
        bytes
    }
}

impl SMBSyncHeader {
    pub fn new(command: SMBCommandCode, flags: SMBFlags, message_id: u64, tree_id: u32, session_id: u64) -> Self {
        Self {
            credit_charge: 0,
            status: NTStatus::StatusSuccess as u32,
            command,
            credits: 1,
            flags,
            next_command: 0,
            message_id,
            process_id: 0,
            tree_id,
            session_id,
            signature: [0; 16],
        }
    }

    pub fn create_response_header(&self, status: NTStatus) -> Self {
        Self {
            credit_charge: self.credit_charge,
            status: status as u32,
            command: self.command,
            credits: self.credits.max(1),
            flags: SMBFlags::SERVER_TO_REDIR,
            next_command: 0,
            message_id: self.message_id,
            process_id: self.process_id,
            tree_id: self.tree_id,
            session_id: self.session_id,
            signature: [0; 16],
        }
    }

    pub fn command(&self) -> SMBCommandCode {
        self.command
    }

    pub fn status(&self) -> u32 {
        self.status
    }

    pub fn flags(&self) -> SMBFlags {
        self.flags
    }

    pub fn message_id(&self) -> u64 {
        self.message_id
    }

    pub fn credits(&self) -> u16 {
        self.credits
    }
}

impl SMBByteSize for LegacySMBHeader {
    fn smb_byte_size(&self) -> usize {
        SMB1_HEADER_SIZE
    }
}

impl SMBFromBytes for LegacySMBHeader {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> where Self: Sized {
        let (remaining, (_, command, status, flags, flags2, pid_high, security_features, _reserved, tid, pid_low, uid, mid)) = tuple((
            tag::<_, _, NomError>(&SMB1_PROTOCOL_ID[..]),
            le_u8,
            le_u32,
            le_u8,
            le_u16,
            le_u16,
            take(8_usize),
            le_u16,
            le_u16,
            le_u16,
            le_u16,
            le_u16,
        ))(input).map_err(|_e| SMBError::parse_error("Invalid SMB1 header"))?;
        let command = LegacySMBCommandCode::try_from_primitive(command)
            .map_err(|_e| SMBError::parse_error(format!("Unknown SMB1 command {:#04x}", command)))?;
        let security_features = <[u8; 8]>::try_from(security_features)
            .map_err(|_e| SMBError::parse_error("Invalid security features length"))?;
        Ok((remaining, Self {
            command,
            status,
            flags: LegacySMBFlags::from_bits_retain(flags),
            flags2: LegacySMBFlags2::from_bits_retain(flags2),
            pid_high,
            security_features,
            tid,
            pid_low,
            uid,
            mid,
        }))
    }
}

impl SMBToBytes for LegacySMBHeader {
    fn smb_to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SMB1_HEADER_SIZE);
        bytes.put_slice(&SMB1_PROTOCOL_ID);
        bytes.put_u8(self.command as u8);
        bytes.put_u32_le(self.status);
        bytes.put_u8(self.flags.bits());
        bytes.put_u16_le(self.flags2.bits());
        bytes.put_u16_le(self.pid_high);
        bytes.put_slice(&self.security_features);
        bytes.put_u16_le(0);
        bytes.put_u16_le(self.tid);
        bytes.put_u16_le(self.pid_low);
        bytes.put_u16_le(self.uid);
        bytes.put_u16_le(self.mid);
        bytes
    }
}

impl LegacySMBHeader {
    pub fn new(command: LegacySMBCommandCode) -> Self {
        Self {
            command,
            status: NTStatus::StatusSuccess as u32,
            flags: LegacySMBFlags::default(),
            flags2: LegacySMBFlags2::empty(),
            pid_high: 0,
            security_features: [0; 8],
            tid: 0,
            pid_low: 0,
            uid: 0,
            mid: 0,
        }
    }

    pub fn create_response_header(&self, status: NTStatus) -> Self {
        Self {
            command: self.command,
            status: status as u32,
            flags: LegacySMBFlags::SERVER_TO_REDIR | LegacySMBFlags::CASELESS_PATHNAMES,
            flags2: LegacySMBFlags2::reply_to(self.flags2),
            pid_high: self.pid_high,
            security_features: [0; 8],
            tid: self.tid,
            pid_low: self.pid_low,
            uid: self.uid,
            mid: self.mid,
        }
    }

    pub fn status(&self) -> u32 {
        self.status
    }

    pub fn flags2(&self) -> LegacySMBFlags2 {
        self.flags2
    }

    pub fn mid(&self) -> u16 {
        self.mid
    }
}
