use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};

/// 100ns intervals since 1601-01-01 ([MS-DTYP] 2.3.3).
#[derive(Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Default, Hash)]
pub struct FileTime {
    ticks: u64,
}

const SECONDS_BETWEEN_1601_AND_EPOCH: u64 = 11_644_473_600;
const TICKS_PER_SECOND: u64 = 10_000_000;

impl FileTime {
    pub fn from_ticks(ticks: u64) -> Self {
        Self { ticks }
    }

    pub fn from_unix(unix_timestamp: u64) -> Self {
        Self::from_ticks((unix_timestamp + SECONDS_BETWEEN_1601_AND_EPOCH) * TICKS_PER_SECOND)
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        let ticks = (since_epoch.as_secs() + SECONDS_BETWEEN_1601_AND_EPOCH) * TICKS_PER_SECOND
            + since_epoch.subsec_nanos() as u64 / 100;
        Self::from_ticks(ticks)
    }

    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn to_unix(&self) -> u64 {
        (self.ticks / TICKS_PER_SECOND).saturating_sub(SECONDS_BETWEEN_1601_AND_EPOCH)
    }
}

impl SMBByteSize for FileTime {
    fn smb_byte_size(&self) -> usize {
        8
    }
}

impl SMBFromBytes for FileTime {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> where Self: Sized {
        let (remaining, ticks) = u64::smb_from_bytes(input)?;
        Ok((remaining, Self { ticks }))
    }
}

impl SMBToBytes for FileTime {
    fn smb_to_bytes(&self) -> Vec<u8> {
        self.ticks.smb_to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_epoch_in_filetime() {
        let epoch = FileTime::from_unix(0);
        assert_eq!(epoch.ticks(), 116_444_736_000_000_000);
        assert_eq!(epoch.to_unix(), 0);
        assert_eq!(FileTime::from_system_time(UNIX_EPOCH), epoch);
    }

    #[test]
    fn sub_second_precision() {
        let time = UNIX_EPOCH + Duration::from_millis(1_500);
        assert_eq!(FileTime::from_system_time(time).ticks() - FileTime::from_unix(1).ticks(), 5_000_000);
    }
}
