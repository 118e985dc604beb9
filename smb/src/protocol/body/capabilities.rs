use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::util::flags_helper::{impl_smb_byte_size_for_bitflag, impl_smb_from_bytes_for_bitflag, impl_smb_to_bytes_for_bitflag};

bitflags! {
    /// [MS-SMB2] 2.2.4 NEGOTIATE Response Capabilities
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
   pub struct Capabilities: u32 {
      const DFS                = 0x01;
      const LEASING            = 0x02;
      const LARGE_MTU          = 0x04;
      const MULTI_CHANNEL      = 0x08;
      const PERSISTENT_HANDLES = 0x10;
      const DIRECTORY_LISTING  = 0x20;
      const ENCRYPTION         = 0x40;
   }
}

bitflags! {
    /// [MS-CIFS] 2.2.4.52.2 / [MS-SMB] 2.2.4.5.2 SMB_COM_NEGOTIATE Response Capabilities
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
    pub struct LegacyCapabilities: u32 {
        const RAW_MODE           = 0x00000001;
        const MPX_MODE           = 0x00000002;
        const UNICODE            = 0x00000004;
        const LARGE_FILES        = 0x00000008;
        const NT_SMBS            = 0x00000010;
        const RPC_REMOTE_APIS    = 0x00000020;
        const STATUS32           = 0x00000040;
        const LEVEL_II_OPLOCKS   = 0x00000080;
        const LOCK_AND_READ      = 0x00000100;
        const NT_FIND            = 0x00000200;
        const DFS                = 0x00001000;
        const INFOLEVEL_PASSTHRU = 0x00002000;
        const LARGE_READX        = 0x00004000;
        const LARGE_WRITEX       = 0x00008000;
        const EXTENDED_SECURITY  = 0x80000000;
    }
}

impl_smb_byte_size_for_bitflag! { Capabilities LegacyCapabilities }
impl_smb_from_bytes_for_bitflag! { Capabilities LegacyCapabilities }
impl_smb_to_bytes_for_bitflag! { Capabilities LegacyCapabilities }
