use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::util::flags_helper::{impl_smb_byte_size_for_bitflag, impl_smb_from_bytes_for_bitflag, impl_smb_to_bytes_for_bitflag};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
    pub struct NegotiateSecurityMode: u16 {
        const NEGOTIATE_SIGNING_ENABLED = 0x01;
        const NEGOTIATE_SIGNING_REQUIRED = 0x02;
    }
}

bitflags! {
    /// [MS-CIFS] 2.2.4.52.2 SecurityMode
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
    pub struct LegacySecurityMode: u8 {
        const USER_SECURITY = 0x01;
        const ENCRYPT_PASSWORDS = 0x02;
        const SECURITY_SIGNATURES_ENABLED = 0x04;
        const SECURITY_SIGNATURES_REQUIRED = 0x08;
    }
}

impl_smb_byte_size_for_bitflag! { NegotiateSecurityMode LegacySecurityMode }
impl_smb_from_bytes_for_bitflag! { NegotiateSecurityMode LegacySecurityMode }
impl_smb_to_bytes_for_bitflag! { NegotiateSecurityMode LegacySecurityMode }

#[cfg(test)]
mod tests {
    use smb_core::{SMBFromBytes, SMBToBytes};

    use super::*;

    #[test]
    fn security_mode_values() {
        assert_eq!(NegotiateSecurityMode::NEGOTIATE_SIGNING_ENABLED.bits(), 0x0001);
        assert_eq!(NegotiateSecurityMode::NEGOTIATE_SIGNING_REQUIRED.bits(), 0x0002);
    }

    #[test]
    fn security_mode_round_trip() {
        let mode = NegotiateSecurityMode::NEGOTIATE_SIGNING_ENABLED;
        let bytes = mode.smb_to_bytes();
        assert_eq!(bytes, [0x01, 0x00]);
        let (_, parsed) = NegotiateSecurityMode::smb_from_bytes(&bytes).unwrap();
        assert_eq!(parsed, mode);
    }

    #[test]
    fn legacy_mode_is_one_byte() {
        let mode = LegacySecurityMode::USER_SECURITY | LegacySecurityMode::ENCRYPT_PASSWORDS;
        assert_eq!(mode.smb_to_bytes(), vec![0x03]);
    }
}
