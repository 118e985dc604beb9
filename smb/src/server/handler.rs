use std::future::Future;

use smb_core::SMBResult;
use smb_core::logging::debug;
use smb_core::nt_status::NTStatus;

use crate::protocol::dialect::SMBDialect;
use crate::protocol::header::SMBFamily;
use crate::server::family::family_ops;

/// A non-negotiate message ready for a per-command handler.
#[derive(Debug, Clone, Copy)]
pub struct SMBRequest<'a> {
    pub family: SMBFamily,
    pub command: u16,
    pub dialect: Option<SMBDialect>,
    /// Full message, header included, without the session header.
    pub message: &'a [u8],
}

/// Per-command request processing behind negotiation.
///
/// Returns the serialized response without the session header. An empty
/// response sends nothing.
pub trait CommandHandler: Send + Sync + 'static {
    fn handle_command(&self, request: SMBRequest<'_>) -> impl Future<Output=SMBResult<Vec<u8>>> + Send;
}

/// Answers every command with STATUS_NOT_SUPPORTED.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedCommandHandler;

impl CommandHandler for UnsupportedCommandHandler {
    async fn handle_command(&self, request: SMBRequest<'_>) -> SMBResult<Vec<u8>> {
        debug!(command = request.command, family = ?request.family, "command not supported");
        family_ops(request.family).error_response(request.message, NTStatus::StatusNotSupported)
    }
}
