use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::util::flags_helper::{impl_smb_byte_size_for_bitflag, impl_smb_from_bytes_for_bitflag, impl_smb_to_bytes_for_bitflag};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
    pub struct LegacySMBFlags2: u16 {
        const UNICODE_STRINGS    = 0b1000000000000000;
        const ERROR_CODE_STATUS  = 0b100000000000000; // 32_BIT_STATUS
        const READ_IF_EXECUTE    = 0b10000000000000;
        const DFS_PATHNAME       = 0b1000000000000;
        const EXTENDED_SECURITY  = 0b100000000000;
        const RESERVED_01        = 0b10000000000;
        const RESERVED_02        = 0b1000000000;
        const RESERVED_03        = 0b100000000;
        const RESERVED_04        = 0b10000000;
        const IS_LONG_NAME       = 0b1000000;
        const RESERVED_05        = 0b100000;
        const SECURITY_SIGNATURE_REQUIRED = 0b10000;
        const RESERVED_06        = 0b1000;
        const SECURITY_SIGNATURE = 0b100;
        const EAS                = 0b10;
        const KNOWS_LONG_NAMES   = 0b1;
    }
}

impl LegacySMBFlags2 {
    /// Flags2 of a server reply: NT status codes and long names, echoing the
    /// string encoding the client asked for.
    pub fn reply_to(request: LegacySMBFlags2) -> Self {
        (request & Self::UNICODE_STRINGS)
            | Self::ERROR_CODE_STATUS
            | Self::IS_LONG_NAME
            | Self::KNOWS_LONG_NAMES
    }
}

impl_smb_byte_size_for_bitflag! { LegacySMBFlags2 }
impl_smb_from_bytes_for_bitflag! { LegacySMBFlags2 }
impl_smb_to_bytes_for_bitflag! { LegacySMBFlags2 }

#[cfg(test)]
mod tests {
    use smb_core::SMBToBytes;

    use super::*;

    /// MS-CIFS 2.2.3.1: SMB_FLAGS2_NT_STATUS = 0x4000, SMB_FLAGS2_UNICODE = 0x8000
    #[test]
    fn flag_values() {
        assert_eq!(LegacySMBFlags2::ERROR_CODE_STATUS.bits(), 0x4000);
        assert_eq!(LegacySMBFlags2::UNICODE_STRINGS.bits(), 0x8000);
        assert_eq!(LegacySMBFlags2::EXTENDED_SECURITY.bits(), 0x0800);
        assert_eq!(LegacySMBFlags2::SECURITY_SIGNATURE_REQUIRED.bits(), 0x0010);
    }

    #[test]
    fn every_bit_is_named() {
        assert_eq!(LegacySMBFlags2::all().bits(), 0xFFFF);
    }

    #[test]
    fn reply_keeps_only_client_encoding() {
        let request = LegacySMBFlags2::UNICODE_STRINGS | LegacySMBFlags2::SECURITY_SIGNATURE;
        let reply = LegacySMBFlags2::reply_to(request);
        assert!(reply.contains(LegacySMBFlags2::UNICODE_STRINGS));
        assert!(!reply.contains(LegacySMBFlags2::SECURITY_SIGNATURE));
        assert_eq!(reply.smb_to_bytes(), vec![0x41, 0xC0]);
    }
}
