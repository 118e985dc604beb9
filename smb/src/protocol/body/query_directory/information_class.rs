use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

/// [MS-SMB2] 2.2.33 FileInformationClass of a QUERY_DIRECTORY request
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, TryFromPrimitive, Serialize, Deserialize)]
pub enum SMBInformationClass {
    FileDirectoryInformation = 0x1,
    FileFullDirectoryInformation = 0x2,
    FileIdFullDirectoryInformation = 0x26,
    FileBothDirectoryInformation = 0x03,
    FileIdBothDirectoryInformation = 0x25,
    FileNamesInformation = 0x0C,
    FileIdExtdDirectoryInformation = 0x3C,
    // Must never be used and ignored on receipt
    FileInformationClassReserved = 0x64,
}

/// [MS-CIFS] 2.2.2.3.1 FIND information levels of TRANS2_FIND_FIRST2
#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, TryFromPrimitive, Serialize, Deserialize)]
pub enum LegacyInformationLevel {
    InfoStandard = 0x0001,
    InfoQueryEaSize = 0x0002,
    InfoQueryEasFromList = 0x0003,
    FindFileDirectoryInfo = 0x0101,
    FindFileFullDirectoryInfo = 0x0102,
    FindFileNamesInfo = 0x0103,
    FindFileBothDirectoryInfo = 0x0104,
    FindFileIdFullDirectoryInfo = 0x0105,
    FindFileIdBothDirectoryInfo = 0x0106,
}

/// Record layout requested by a directory listing, in the requesting family's numbering.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InfoLevel {
    Modern(SMBInformationClass),
    Legacy(LegacyInformationLevel),
}

impl InfoLevel {
    /// Whether records at this level carry an 8.3 alias next to the long name.
    pub fn includes_short_name(&self) -> bool {
        matches!(
            self,
            Self::Modern(SMBInformationClass::FileBothDirectoryInformation)
                | Self::Modern(SMBInformationClass::FileIdBothDirectoryInformation)
                | Self::Legacy(LegacyInformationLevel::FindFileBothDirectoryInfo)
                | Self::Legacy(LegacyInformationLevel::FindFileIdBothDirectoryInfo)
        )
    }
}

impl From<SMBInformationClass> for InfoLevel {
    fn from(value: SMBInformationClass) -> Self {
        Self::Modern(value)
    }
}

impl From<LegacyInformationLevel> for InfoLevel {
    fn from(value: LegacyInformationLevel) -> Self {
        Self::Legacy(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn information_class_values() {
        assert_eq!(SMBInformationClass::FileIdBothDirectoryInformation as u8, 0x25);
        assert_eq!(SMBInformationClass::try_from_primitive(0x03).unwrap(), SMBInformationClass::FileBothDirectoryInformation);
        assert_eq!(LegacyInformationLevel::try_from_primitive(0x0104).unwrap(), LegacyInformationLevel::FindFileBothDirectoryInfo);
    }

    #[test]
    fn both_directory_levels_carry_short_names() {
        assert!(InfoLevel::from(SMBInformationClass::FileBothDirectoryInformation).includes_short_name());
        assert!(InfoLevel::from(LegacyInformationLevel::FindFileIdBothDirectoryInfo).includes_short_name());
        assert!(!InfoLevel::from(SMBInformationClass::FileNamesInformation).includes_short_name());
    }
}
