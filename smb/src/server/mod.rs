mod connection;
pub mod enumeration;
pub mod family;
mod handler;
mod negotiate;
mod server;

pub type SMBConnection<R, W> = connection::SMBConnection<R, W>;
pub type SMBServer<H = UnsupportedCommandHandler> = server::SMBServer<H>;
pub type SMBServerConfig = server::SMBServerConfig;
pub type SMBServerConfigBuilder = server::SMBServerConfigBuilder;
pub type SMBRequest<'a> = handler::SMBRequest<'a>;
pub type NegotiationState = negotiate::NegotiationState;
pub type ServerValues = family::ServerValues;
pub type DirEnumerationState = enumeration::DirEnumerationState;
pub type DirectoryRecordBuffer = enumeration::DirectoryRecordBuffer;

pub use handler::{CommandHandler, UnsupportedCommandHandler};
pub use family::{FamilyOps, LegacyFamily, ModernFamily};
pub use server::{DEFAULT_MAX_CONNECTIONS, DEFAULT_MAX_PDU_SIZE};
