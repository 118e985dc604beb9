mod negotiate;
mod negotiate_security_mode;

pub type SMBNegotiateResponse = negotiate::SMBNegotiateResponse;
pub type SMBNegotiateResponseBuilder = negotiate::SMBNegotiateResponseBuilder;
pub type SMBLegacyNegotiateResponse = negotiate::SMBLegacyNegotiateResponse;
pub type SMBLegacyNegotiateResponseBuilder = negotiate::SMBLegacyNegotiateResponseBuilder;
pub use negotiate::SMBLegacyNegotiateRejection;

pub type NegotiateSecurityMode = negotiate_security_mode::NegotiateSecurityMode;
pub type LegacySecurityMode = negotiate_security_mode::LegacySecurityMode;
