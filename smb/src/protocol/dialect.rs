use std::fmt::{Display, Formatter};

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};
use smb_core::error::SMBError;

/// Wire identifier of a dialect revision ([MS-SMB2] 2.2.3).
#[repr(u16)]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, Serialize, Deserialize, Copy, Clone, Hash)]
#[allow(non_camel_case_types)]
pub enum SMBDialect {
    V1_0 = 0x0000,
    V2_0_2 = 0x0202,
    V2_1_0 = 0x0210,
    V3_0_0 = 0x0300,
    V3_0_2 = 0x0302,
    V3_1_1 = 0x0311,
    V2_X_X = 0x02FF,
}

/// Sentinel dialect id reported when no offered dialect could be agreed on.
pub const BAD_PROTOCOL_ID: u16 = 0xFFFF;

/// Dialect strings in a legacy negotiate request are prefixed by this buffer format byte.
pub const DIALECT_BUFFER_FORMAT: u8 = 0x02;

impl SMBDialect {
    pub fn is_smb3(&self) -> bool {
        *self as u16 >= 0x300
    }

    /// Whether the dialect belongs to the family spoken with the 0xFE 'SMB' header.
    pub fn is_smb2_family(&self) -> bool {
        (SMBDialect::V2_0_2 as u16..=SMBDialect::V3_1_1 as u16).contains(&(*self as u16))
    }
}

impl SMBByteSize for SMBDialect {
    fn smb_byte_size(&self) -> usize {
        2
    }
}

impl SMBFromBytes for SMBDialect {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> where Self: Sized {
        let (remaining, raw) = u16::smb_from_bytes(input)?;
        let dialect = Self::try_from_primitive(raw)
            .map_err(|_e| SMBError::parse_error("Unknown dialect revision"))?;
        Ok((remaining, dialect))
    }
}

impl SMBToBytes for SMBDialect {
    fn smb_to_bytes(&self) -> Vec<u8> {
        (*self as u16).smb_to_bytes()
    }
}

/// Position of a dialect in the supported-protocol ordering. Later is newer.
#[repr(u8)]
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, TryFromPrimitive, Serialize, Deserialize, Copy, Clone, Hash)]
#[allow(non_camel_case_types)]
pub enum SMBProtocol {
    Smb1 = 0,
    Smb2_0_2,
    Smb2_1_0,
    Smb3_0_0,
    Smb3_0_2,
    Smb3_1_1,
}

impl SMBProtocol {
    pub fn index(&self) -> u8 {
        *self as u8
    }
}

/// Inclusive window of protocol indices the server is willing to speak.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct ProtocolRange {
    min: SMBProtocol,
    max: SMBProtocol,
}

impl ProtocolRange {
    pub fn new(min: SMBProtocol, max: SMBProtocol) -> Self {
        Self { min, max }
    }

    pub fn min(&self) -> SMBProtocol {
        self.min
    }

    pub fn max(&self) -> SMBProtocol {
        self.max
    }

    pub fn contains(&self, protocol: SMBProtocol) -> bool {
        self.min <= protocol && protocol <= self.max
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }
}

impl Default for ProtocolRange {
    fn default() -> Self {
        let min = if cfg!(feature = "smb1") {
            SMBProtocol::Smb1
        } else {
            SMBProtocol::Smb2_0_2
        };
        Self::new(min, SMBProtocol::Smb3_1_1)
    }
}

/// One supported dialect: how clients name it on the wire and in configuration.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct DialectDescriptor {
    pub protocol: SMBProtocol,
    /// Dialect string as offered by legacy negotiate requests, without the buffer format byte.
    pub name: &'static str,
    pub config_name: &'static str,
    pub dialect: SMBDialect,
}

impl Display for DialectDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:#06x})", self.name, self.dialect as u16)
    }
}

static SUPPORTED_DIALECTS: &[DialectDescriptor] = &[
    #[cfg(feature = "smb1")]
    DialectDescriptor {
        protocol: SMBProtocol::Smb1,
        name: "NT LM 0.12",
        config_name: "NT1",
        dialect: SMBDialect::V1_0,
    },
    DialectDescriptor {
        protocol: SMBProtocol::Smb2_0_2,
        name: "SMB 2.002",
        config_name: "SMB2_02",
        dialect: SMBDialect::V2_0_2,
    },
    DialectDescriptor {
        protocol: SMBProtocol::Smb2_1_0,
        name: "SMB 2.1",
        config_name: "SMB2_10",
        dialect: SMBDialect::V2_1_0,
    },
    DialectDescriptor {
        protocol: SMBProtocol::Smb3_0_0,
        name: "SMB 3.0",
        config_name: "SMB3_00",
        dialect: SMBDialect::V3_0_0,
    },
    DialectDescriptor {
        protocol: SMBProtocol::Smb3_0_2,
        name: "SMB 3.02",
        config_name: "SMB3_02",
        dialect: SMBDialect::V3_0_2,
    },
    DialectDescriptor {
        protocol: SMBProtocol::Smb3_1_1,
        name: "SMB 3.1.1",
        config_name: "SMB3_11",
        dialect: SMBDialect::V3_1_1,
    },
];

/// Supported dialects ordered from oldest to newest protocol index.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DialectTable {
    entries: &'static [DialectDescriptor],
}

impl DialectTable {
    pub const fn new(entries: &'static [DialectDescriptor]) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &'static [DialectDescriptor] {
        self.entries
    }

    pub fn newest_first(&self) -> impl Iterator<Item = &'static DialectDescriptor> {
        self.entries.iter().rev()
    }

    pub fn by_protocol(&self, protocol: SMBProtocol) -> Option<&'static DialectDescriptor> {
        self.entries.iter().find(|entry| entry.protocol == protocol)
    }

    pub fn by_dialect(&self, dialect: SMBDialect) -> Option<&'static DialectDescriptor> {
        self.entries.iter().find(|entry| entry.dialect == dialect)
    }

    /// Entries must be strictly increasing by protocol index.
    pub fn is_ordered(&self) -> bool {
        self.entries.windows(2).all(|pair| pair[0].protocol < pair[1].protocol)
    }

    /// Maps a configuration name (or a prefix of one) to its protocol index.
    /// Newer dialects win when a prefix matches several names.
    pub fn lookup_protocol_index(&self, config_name: &str) -> Option<SMBProtocol> {
        if config_name.is_empty() {
            return None;
        }
        self.newest_first()
            .find(|entry| entry.config_name.starts_with(config_name))
            .map(|entry| entry.protocol)
    }
}

impl Default for DialectTable {
    fn default() -> Self {
        Self::new(SUPPORTED_DIALECTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_values_match_wire_ids() {
        assert_eq!(SMBDialect::V2_0_2 as u16, 0x0202);
        assert_eq!(SMBDialect::V2_1_0 as u16, 0x0210);
        assert_eq!(SMBDialect::V3_0_0 as u16, 0x0300);
        assert_eq!(SMBDialect::V3_0_2 as u16, 0x0302);
        assert_eq!(SMBDialect::V3_1_1 as u16, 0x0311);
        assert_eq!(SMBDialect::V2_X_X as u16, 0x02FF);
    }

    #[test]
    fn smb2_family_bounds() {
        assert!(!SMBDialect::V1_0.is_smb2_family());
        assert!(SMBDialect::V2_0_2.is_smb2_family());
        assert!(SMBDialect::V3_1_1.is_smb2_family());
        assert!(!SMBDialect::V2_1_0.is_smb3());
        assert!(SMBDialect::V3_0_2.is_smb3());
    }

    #[test]
    fn default_table_is_ordered() {
        let table = DialectTable::default();
        assert!(table.is_ordered());
        assert_eq!(table.newest_first().next().map(|e| e.dialect), Some(SMBDialect::V3_1_1));
    }

    #[cfg(feature = "smb1")]
    #[test]
    fn legacy_entry_present_with_smb1() {
        let table = DialectTable::default();
        assert_eq!(table.entries().len(), 6);
        assert_eq!(table.by_protocol(SMBProtocol::Smb1).map(|e| e.name), Some("NT LM 0.12"));
    }

    #[test]
    fn config_names_resolve_by_prefix() {
        let table = DialectTable::default();
        assert_eq!(table.lookup_protocol_index("SMB2_10"), Some(SMBProtocol::Smb2_1_0));
        assert_eq!(table.lookup_protocol_index("SMB3"), Some(SMBProtocol::Smb3_1_1));
        assert_eq!(table.lookup_protocol_index("SMB2"), Some(SMBProtocol::Smb2_1_0));
        assert_eq!(table.lookup_protocol_index("SMB4"), None);
        assert_eq!(table.lookup_protocol_index(""), None);
    }

    #[test]
    fn range_membership() {
        let range = ProtocolRange::new(SMBProtocol::Smb2_1_0, SMBProtocol::Smb3_0_2);
        assert!(!range.contains(SMBProtocol::Smb2_0_2));
        assert!(range.contains(SMBProtocol::Smb2_1_0));
        assert!(range.contains(SMBProtocol::Smb3_0_2));
        assert!(!range.contains(SMBProtocol::Smb3_1_1));
        assert!(!range.is_empty());
        assert!(ProtocolRange::new(SMBProtocol::Smb3_1_1, SMBProtocol::Smb2_0_2).is_empty());
    }

    #[test]
    fn dialect_round_trip() {
        let bytes = SMBDialect::V3_1_1.smb_to_bytes();
        assert_eq!(bytes, [0x11, 0x03]);
        let (_, parsed) = SMBDialect::smb_from_bytes(&bytes).unwrap();
        assert_eq!(parsed, SMBDialect::V3_1_1);
    }
}
