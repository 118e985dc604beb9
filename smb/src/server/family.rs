use smb_core::{SMBFromBytes, SMBResult, SMBToBytes};
use smb_core::error::SMBError;
use smb_core::logging::debug;
use smb_core::nt_status::NTStatus;

use crate::protocol::body::{Capabilities, LegacyCapabilities, LegacySMBErrorResponse, SMBErrorResponse};
use crate::protocol::body::negotiate::{SMBLegacyNegotiateRejection, SMBLegacyNegotiateResponseBuilder, SMBNegotiateResponseBuilder};
use crate::protocol::dialect::{DialectDescriptor, ProtocolRange, SMBDialect, SMBProtocol};
use crate::protocol::header::{LegacySMBCommandCode, LegacySMBHeader, SMBCommandCode, SMBFamily, SMBFlags, SMBSyncHeader};
use crate::protocol::message::{Message, SMBMessage};
use crate::protocol::negotiate::DialectOffer;
use crate::server::server::SMBServerConfig;

/// Largest SMB1 message the server accepts.
pub const MAX_MESSAGE_SIZE: u32 = 65536;
/// Read/write size advertised from SMB 2.1 on.
pub const DEFAULT_IO_SIZE: u32 = 1024 * 1024;
/// Initial capacity of a connection's request buffer.
pub const SMALL_BUFFER_SIZE: usize = 448;

const SMB2_0_IO_SIZE: u32 = 65536;
const SMB2_COMMAND_OFFSET: usize = 12;
const SMB1_COMMAND_OFFSET: usize = 4;

/// Limits and capabilities a family revision advertises.
#[derive(Debug, PartialEq, Eq)]
pub struct ServerValues {
    pub family: SMBFamily,
    pub header_size: usize,
    pub max_read_size: u32,
    pub max_write_size: u32,
    pub max_transact_size: u32,
    pub max_buffer_size: u32,
    capabilities: u32,
}

impl ServerValues {
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::from_bits_truncate(self.capabilities)
    }

    pub fn legacy_capabilities(&self) -> LegacyCapabilities {
        LegacyCapabilities::from_bits_truncate(self.capabilities)
    }

    pub fn for_dialect(dialect: SMBDialect) -> &'static ServerValues {
        match dialect {
            SMBDialect::V1_0 => &SMB1_VALUES,
            SMBDialect::V2_0_2 => &SMB2_0_VALUES,
            SMBDialect::V2_1_0 | SMBDialect::V2_X_X => &SMB2_1_VALUES,
            SMBDialect::V3_0_0 | SMBDialect::V3_0_2 | SMBDialect::V3_1_1 => &SMB3_VALUES,
        }
    }
}

static SMB1_VALUES: ServerValues = ServerValues {
    family: SMBFamily::Legacy,
    header_size: 32,
    max_read_size: MAX_MESSAGE_SIZE,
    max_write_size: MAX_MESSAGE_SIZE,
    max_transact_size: MAX_MESSAGE_SIZE,
    max_buffer_size: MAX_MESSAGE_SIZE,
    capabilities: LegacyCapabilities::UNICODE.bits()
        | LegacyCapabilities::LARGE_FILES.bits()
        | LegacyCapabilities::NT_SMBS.bits()
        | LegacyCapabilities::RPC_REMOTE_APIS.bits()
        | LegacyCapabilities::STATUS32.bits()
        | LegacyCapabilities::LEVEL_II_OPLOCKS.bits()
        | LegacyCapabilities::NT_FIND.bits()
        | LegacyCapabilities::LARGE_READX.bits()
        | LegacyCapabilities::LARGE_WRITEX.bits()
        | LegacyCapabilities::EXTENDED_SECURITY.bits(),
};

static SMB2_0_VALUES: ServerValues = ServerValues {
    family: SMBFamily::Modern,
    header_size: 64,
    max_read_size: SMB2_0_IO_SIZE,
    max_write_size: SMB2_0_IO_SIZE,
    max_transact_size: SMB2_0_IO_SIZE,
    max_buffer_size: SMB2_0_IO_SIZE,
    capabilities: 0,
};

static SMB2_1_VALUES: ServerValues = ServerValues {
    family: SMBFamily::Modern,
    header_size: 64,
    max_read_size: DEFAULT_IO_SIZE,
    max_write_size: DEFAULT_IO_SIZE,
    max_transact_size: DEFAULT_IO_SIZE,
    max_buffer_size: DEFAULT_IO_SIZE,
    capabilities: Capabilities::LARGE_MTU.bits(),
};

static SMB3_VALUES: ServerValues = ServerValues {
    family: SMBFamily::Modern,
    header_size: 64,
    max_read_size: DEFAULT_IO_SIZE,
    max_write_size: DEFAULT_IO_SIZE,
    max_transact_size: DEFAULT_IO_SIZE,
    max_buffer_size: DEFAULT_IO_SIZE,
    capabilities: Capabilities::LARGE_MTU.bits() | Capabilities::LEASING.bits(),
};

/// Operations whose wire layout differs between the two header families.
pub trait FamilyOps: Send + Sync {
    fn family(&self) -> SMBFamily;

    /// Baseline values for a connection that starts out in this family.
    fn init(&self, range: ProtocolRange) -> SMBResult<&'static ServerValues>;

    /// Command code read at this family's header offset. Applied to a
    /// message of the other family this reads whatever sits there.
    fn command_code(&self, message: &[u8]) -> Option<u16>;

    fn is_negotiate(&self, command: u16) -> bool;

    /// Serialized negotiate response, without the session header.
    fn negotiate_response(&self, request: &[u8], selected: &DialectDescriptor, offer: &DialectOffer<'_>, config: &SMBServerConfig) -> SMBResult<Vec<u8>>;

    /// Response refusing a negotiate request.
    fn rejection(&self, request: &[u8], status: NTStatus) -> Vec<u8>;

    /// Status-only response to any other command.
    fn error_response(&self, request: &[u8], status: NTStatus) -> SMBResult<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyFamily;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModernFamily;

pub fn family_ops(family: SMBFamily) -> &'static dyn FamilyOps {
    match family {
        SMBFamily::Legacy => &LegacyFamily,
        SMBFamily::Modern => &ModernFamily,
    }
}

fn legacy_response_header(request: &[u8], status: NTStatus) -> LegacySMBHeader {
    match LegacySMBHeader::smb_from_bytes(request) {
        Ok((_, header)) => header.create_response_header(status),
        Err(_) => LegacySMBHeader::new(LegacySMBCommandCode::Negotiate).create_response_header(status),
    }
}

impl FamilyOps for LegacyFamily {
    fn family(&self) -> SMBFamily {
        SMBFamily::Legacy
    }

    fn init(&self, range: ProtocolRange) -> SMBResult<&'static ServerValues> {
        if cfg!(feature = "smb1") && range.contains(SMBProtocol::Smb1) {
            Ok(&SMB1_VALUES)
        } else {
            Err(SMBError::precondition_failed("SMB1 is not enabled"))
        }
    }

    fn command_code(&self, message: &[u8]) -> Option<u16> {
        message.get(SMB1_COMMAND_OFFSET).map(|command| *command as u16)
    }

    fn is_negotiate(&self, command: u16) -> bool {
        command == LegacySMBCommandCode::Negotiate as u16
    }

    fn negotiate_response(&self, request: &[u8], selected: &DialectDescriptor, offer: &DialectOffer<'_>, config: &SMBServerConfig) -> SMBResult<Vec<u8>> {
        let dialect_index = offer.position(selected)
            .ok_or_else(|| SMBError::response_error(format!("{} was selected but not offered", selected)))?;
        let values = ServerValues::for_dialect(selected.dialect);
        let body = SMBLegacyNegotiateResponseBuilder::default()
            .dialect_index(dialect_index as u16)
            .max_buffer_size(values.max_buffer_size.min(config.max_io_size()))
            .capabilities(values.legacy_capabilities())
            .server_guid(config.server_guid())
            .build()
            .map_err(|e| SMBError::response_error(e.to_string()))?;
        let header = legacy_response_header(request, NTStatus::StatusSuccess);
        Ok(SMBMessage::new(header, body).smb_bytes())
    }

    fn rejection(&self, request: &[u8], status: NTStatus) -> Vec<u8> {
        let header = legacy_response_header(request, status);
        SMBMessage::new(header, SMBLegacyNegotiateRejection).smb_bytes()
    }

    fn error_response(&self, request: &[u8], status: NTStatus) -> SMBResult<Vec<u8>> {
        let (_, header) = LegacySMBHeader::smb_from_bytes(request)?;
        Ok(SMBMessage::new(header.create_response_header(status), LegacySMBErrorResponse).smb_bytes())
    }
}

impl FamilyOps for ModernFamily {
    fn family(&self) -> SMBFamily {
        SMBFamily::Modern
    }

    fn init(&self, range: ProtocolRange) -> SMBResult<&'static ServerValues> {
        if range.contains(SMBProtocol::Smb2_0_2) {
            Ok(&SMB2_0_VALUES)
        } else {
            debug!("SMB 2.0.2 baseline unavailable, initializing SMB 2.1");
            Ok(&SMB2_1_VALUES)
        }
    }

    fn command_code(&self, message: &[u8]) -> Option<u16> {
        message.get(SMB2_COMMAND_OFFSET..SMB2_COMMAND_OFFSET + 2)
            .map(|bytes| u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn is_negotiate(&self, command: u16) -> bool {
        command == SMBCommandCode::Negotiate as u16
    }

    /// A request in the legacy layout gets a fresh header; its dialect
    /// revision is 0x0202 for SMB 2.0.2 and the 0x02FF wildcard otherwise,
    /// which makes the client follow up with a modern negotiate.
    fn negotiate_response(&self, request: &[u8], selected: &DialectDescriptor, _offer: &DialectOffer<'_>, config: &SMBServerConfig) -> SMBResult<Vec<u8>> {
        let (header, dialect) = match SMBFamily::classify(request) {
            Some(SMBFamily::Modern) => {
                let (_, header) = SMBSyncHeader::smb_from_bytes(request)?;
                (header.create_response_header(NTStatus::StatusSuccess), selected.dialect)
            }
            _ => {
                let header = SMBSyncHeader::new(SMBCommandCode::Negotiate, SMBFlags::SERVER_TO_REDIR, 0, 0, 0);
                let dialect = if selected.dialect == SMBDialect::V2_0_2 {
                    SMBDialect::V2_0_2
                } else {
                    SMBDialect::V2_X_X
                };
                (header, dialect)
            }
        };
        let values = ServerValues::for_dialect(dialect);
        let body = SMBNegotiateResponseBuilder::default()
            .dialect(dialect)
            .guid(config.server_guid())
            .capabilities(values.capabilities())
            .max_transact_size(values.max_transact_size.min(config.max_io_size()))
            .max_read_size(values.max_read_size.min(config.max_io_size()))
            .max_write_size(values.max_write_size.min(config.max_io_size()))
            .server_start_time(config.start_time())
            .build()
            .map_err(|e| SMBError::response_error(e.to_string()))?;
        Ok(SMBMessage::new(header, body).smb_bytes())
    }

    fn rejection(&self, request: &[u8], status: NTStatus) -> Vec<u8> {
        let header = match SMBSyncHeader::smb_from_bytes(request) {
            Ok((_, header)) => header.create_response_header(status),
            Err(_) => SMBSyncHeader::new(SMBCommandCode::Negotiate, SMBFlags::empty(), 0, 0, 0).create_response_header(status),
        };
        SMBMessage::new(header, SMBErrorResponse).smb_bytes()
    }

    fn error_response(&self, request: &[u8], status: NTStatus) -> SMBResult<Vec<u8>> {
        let (_, header) = SMBSyncHeader::smb_from_bytes(request)?;
        Ok(SMBMessage::new(header.create_response_header(status), SMBErrorResponse).smb_bytes())
    }
}
