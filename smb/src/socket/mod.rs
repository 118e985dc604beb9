pub mod listener;
pub mod transport;

pub type SMBListener<Socket> = listener::SMBListener<Socket>;
pub type SMBSocketConnection<R, W> = listener::SMBSocketConnection<R, W>;
pub type SMBTransport<R> = transport::SMBTransport<R>;
pub type ConnectionStatus = transport::ConnectionStatus;

pub use listener::SMBSocket;
pub use transport::SMBSocketRead;
