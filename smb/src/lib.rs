//! # SMB Server
//!
//! The network core of an SMB file server: everything between an accepted
//! TCP socket and a per-command handler.
//!
//! - **Protocol layer** ([`protocol`]): SMB1 and SMB2 headers, the dialect
//!   table, negotiate offer parsing and the negotiate/error bodies the server
//!   writes itself, per [\[MS-SMB2\]](https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-smb2/5606ad47-5ee0-437a-817e-70c366052962)
//!   and [\[MS-CIFS\]](https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-cifs/d416ff7c-c536-406e-a951-4f04b2fd1d2b).
//! - **Socket layer** ([`socket`]): the listener, accepted connection halves
//!   and the liveness-checked `read_exact` transport.
//! - **Server layer** ([`server`]): the acceptor loop, per-connection workers,
//!   dialect negotiation with SMB1/SMB2 family switching, and directory
//!   enumeration helpers shared by the query-directory handlers.
//! - **Utilities** ([`util`]): 8.3 short name mangling.
//!
//! ## Quick Start
//!
//! ```no_run
//! use smb_server::server::{SMBServer, SMBServerConfigBuilder};
//!
//! #[tokio::main]
//! async fn main() -> smb_core::SMBResult<()> {
//!     let config = SMBServerConfigBuilder::default()
//!         .listen_address("127.0.0.1:445".parse().unwrap())
//!         .build()
//!         .unwrap();
//!     SMBServer::with_config(config).start().await
//! }
//! ```

/// SMB1/SMB2 wire-format types, dialects and negotiate parsing.
pub mod protocol;
/// Acceptor, connection workers and dialect negotiation.
pub mod server;
/// Listener and transport abstractions.
pub mod socket;
pub mod util;
