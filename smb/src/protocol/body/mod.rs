use smb_core::SMBToBytes;

use crate::protocol::header::Header;

mod capabilities;
mod error;
mod filetime;
pub mod negotiate;
pub mod query_directory;

pub type Capabilities = capabilities::Capabilities;
pub type LegacyCapabilities = capabilities::LegacyCapabilities;
pub type FileTime = filetime::FileTime;

pub use error::{LegacySMBErrorResponse, SMBErrorResponse};

/// A message body that travels behind headers of type `S`.
pub trait Body<S: Header>: SMBToBytes {}
