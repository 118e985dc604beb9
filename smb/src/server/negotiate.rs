use tokio::io::AsyncWrite;

use smb_core::error::SMBError;
use smb_core::logging::{debug, error};
use smb_core::nt_status::NTStatus;
use smb_core::SMBResult;

use crate::protocol::dialect::SMBProtocol;
use crate::protocol::header::SMBFamily;
use crate::protocol::negotiate::{negotiate_smb_dialect, DialectOffer, NegotiationOutcome};
use crate::server::connection::SMBConnection;
use crate::server::family::{family_ops, FamilyOps, LegacyFamily, ModernFamily, ServerValues};
use crate::socket::transport::SMBSocketRead;

/// Where a connection stands in dialect negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    /// No message processed yet.
    Undetermined,
    /// Negotiate requests are still accepted.
    Negotiating,
    /// Negotiation closed on the SMB1 layout.
    Legacy,
    /// Negotiation closed on the SMB2/SMB3 layout.
    Modern,
}

impl<R: SMBSocketRead, W: AsyncWrite + Unpin + Send> SMBConnection<R, W> {
    pub fn negotiation_state(&self) -> NegotiationState {
        match (self.family, self.needs_negotiation) {
            (None, _) => NegotiationState::Undetermined,
            (Some(_), true) => NegotiationState::Negotiating,
            (Some(SMBFamily::Legacy), false) => NegotiationState::Legacy,
            (Some(SMBFamily::Modern), false) => NegotiationState::Modern,
        }
    }

    /// Answers a negotiate request. `family` is the layout the command code
    /// was read with, `marker` the layout the message actually carries.
    /// A failure still yields a rejection framed like the request, returned
    /// next to the error that caused it.
    pub(crate) fn negotiate(&mut self, message: &[u8], family: SMBFamily, marker: SMBFamily) -> (Vec<u8>, SMBResult<()>) {
        match self.negotiate_common(message, family, marker) {
            Ok(response) => (response, Ok(())),
            Err(SMBError::NegotiationFailed(failure)) => {
                error!(status = ?failure.status(), "unsupported SMB protocol");
                let rejection = family_ops(marker).rejection(message, failure.status());
                (rejection, Err(SMBError::NegotiationFailed(failure)))
            }
            Err(e) => {
                error!(%e, "negotiate response failed");
                (family_ops(marker).rejection(message, NTStatus::InvalidLogonType), Err(e))
            }
        }
    }

    fn negotiate_common(&mut self, message: &[u8], family: SMBFamily, marker: SMBFamily) -> SMBResult<Vec<u8>> {
        if !self.needs_negotiation {
            debug!("negotiate after negotiation completed");
            return Err(SMBError::negotiation_failed(NTStatus::InvalidLogonType));
        }

        let outcome = negotiate_smb_dialect(message, self.config().dialect_table(), self.config().protocol_range());
        self.negotiated = Some(outcome);
        debug!(dialect = ?outcome.dialect(), wire_id = outcome.wire_id(), "negotiated dialect");

        let family = if family == SMBFamily::Modern && marker != SMBFamily::Modern {
            debug!("downgrade to SMB1 negotiation");
            SMBFamily::Legacy
        } else {
            family
        };

        let NegotiationOutcome::Selected(selected) = outcome else {
            return Err(SMBError::negotiation_failed(NTStatus::InvalidLogonType));
        };
        let offer = DialectOffer::from_message(message)?;

        match family {
            SMBFamily::Modern => {
                let response = ModernFamily.negotiate_response(message, &selected, &offer, self.config())?;
                self.family = Some(SMBFamily::Modern);
                self.values = Some(ServerValues::for_dialect(selected.dialect));
                Ok(response)
            }
            SMBFamily::Legacy if selected.dialect.is_smb2_family() => {
                debug!(dialect = %selected, "upgrade to SMB2 negotiation");
                self.needs_negotiation = true;
                self.init_family(SMBFamily::Modern);
                ModernFamily.negotiate_response(message, &selected, &offer, self.config())
            }
            SMBFamily::Legacy if cfg!(feature = "smb1") && selected.protocol == SMBProtocol::Smb1 => {
                let response = LegacyFamily.negotiate_response(message, &selected, &offer, self.config())?;
                self.family = Some(SMBFamily::Legacy);
                self.values = Some(ServerValues::for_dialect(selected.dialect));
                Ok(response)
            }
            SMBFamily::Legacy => Err(SMBError::negotiation_failed(NTStatus::InvalidLogonType)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio_util::sync::CancellationToken;

    use smb_core::SMBToBytes;

    use crate::protocol::dialect::{DIALECT_BUFFER_FORMAT, ProtocolRange, SMBDialect};
    use crate::protocol::header::{LegacySMBCommandCode, LegacySMBHeader, SMBCommandCode, SMBFlags, SMBSyncHeader};
    use crate::server::handler::UnsupportedCommandHandler;
    use crate::server::server::SMBServerConfigBuilder;

    use super::*;

    fn connection(range: ProtocolRange) -> SMBConnection<tokio::io::Empty, tokio::io::Sink> {
        let config = SMBServerConfigBuilder::default()
            .protocol_range(range)
            .build()
            .unwrap();
        SMBConnection::new("test".into(), tokio::io::empty(), tokio::io::sink(), Arc::new(config), CancellationToken::new())
    }

    fn legacy_negotiate(names: &[&str]) -> Vec<u8> {
        let mut block = Vec::new();
        for name in names {
            block.push(DIALECT_BUFFER_FORMAT);
            block.extend_from_slice(name.as_bytes());
            block.push(0);
        }
        let mut message = LegacySMBHeader::new(LegacySMBCommandCode::Negotiate).smb_to_bytes();
        message.push(0);
        message.extend_from_slice(&(block.len() as u16).to_le_bytes());
        message.extend_from_slice(&block);
        message
    }

    fn modern_negotiate(ids: &[u16]) -> Vec<u8> {
        let mut message = SMBSyncHeader::new(SMBCommandCode::Negotiate, SMBFlags::empty(), 1, 0, 0).smb_to_bytes();
        message.extend_from_slice(&36u16.to_le_bytes());
        message.extend_from_slice(&(ids.len() as u16).to_le_bytes());
        message.extend_from_slice(&[0; 32]);
        for id in ids {
            message.extend_from_slice(&id.to_le_bytes());
        }
        message
    }

    fn response_dialect(response: &[u8]) -> u16 {
        u16::from_le_bytes([response[64 + 4], response[64 + 5]])
    }

    fn response_status(response: &[u8]) -> u32 {
        u32::from_le_bytes([response[8], response[9], response[10], response[11]])
    }

    const OFFER: [&str; 4] = ["NT LM 0.12", "SMB 2.002", "SMB 2.1", "SMB 3.0"];

    #[tokio::test]
    async fn legacy_negotiate_upgrades_to_modern_family() {
        let mut connection = connection(ProtocolRange::new(SMBProtocol::Smb2_0_2, SMBProtocol::Smb3_0_2));
        let response = connection.process(&legacy_negotiate(&OFFER), &UnsupportedCommandHandler).await.unwrap();
        assert_eq!(&response[0..4], &[0xFE, b'S', b'M', b'B']);
        assert_eq!(response_dialect(&response), SMBDialect::V2_X_X as u16);
        assert_eq!(connection.dialect(), Some(SMBDialect::V3_0_0));
        assert_eq!(connection.family(), Some(SMBFamily::Modern));
        assert_eq!(connection.negotiation_state(), NegotiationState::Negotiating);
    }

    #[tokio::test]
    async fn upgrade_is_followed_by_modern_negotiate() {
        let mut connection = connection(ProtocolRange::new(SMBProtocol::Smb2_0_2, SMBProtocol::Smb3_1_1));
        connection.process(&legacy_negotiate(&OFFER), &UnsupportedCommandHandler).await.unwrap();
        let response = connection.process(&modern_negotiate(&[0x0202, 0x0210, 0x0300, 0x0311]), &UnsupportedCommandHandler).await.unwrap();
        assert_eq!(response_status(&response), 0);
        assert_eq!(response_dialect(&response), 0x0311);
        assert_eq!(connection.server_values().unwrap().max_read_size, 1024 * 1024);
    }

    #[tokio::test]
    async fn only_smb2_0_2_keeps_its_revision_on_upgrade() {
        let mut connection = connection(ProtocolRange::new(SMBProtocol::Smb2_0_2, SMBProtocol::Smb2_0_2));
        let response = connection.process(&legacy_negotiate(&OFFER), &UnsupportedCommandHandler).await.unwrap();
        assert_eq!(response_dialect(&response), 0x0202);
    }

    #[cfg(feature = "smb1")]
    #[tokio::test]
    async fn smb1_only_range_selects_nt_lm() {
        let mut connection = connection(ProtocolRange::new(SMBProtocol::Smb1, SMBProtocol::Smb1));
        let response = connection.process(&legacy_negotiate(&OFFER), &UnsupportedCommandHandler).await.unwrap();
        assert_eq!(&response[0..5], &[0xFF, b'S', b'M', b'B', 0x72]);
        assert_eq!(&response[5..9], &[0, 0, 0, 0]);
        // WordCount 17, DialectIndex 0
        assert_eq!(&response[32..35], &[17, 0, 0]);
        assert_eq!(connection.dialect(), Some(SMBDialect::V1_0));
        assert_eq!(connection.family(), Some(SMBFamily::Legacy));
    }

    #[tokio::test]
    async fn modern_ids_respect_range() {
        let mut connection = connection(ProtocolRange::new(SMBProtocol::Smb2_0_2, SMBProtocol::Smb2_1_0));
        let response = connection.process(&modern_negotiate(&[0x0202, 0x0210, 0x0300]), &UnsupportedCommandHandler).await.unwrap();
        assert_eq!(response_dialect(&response), 0x0210);
        assert_eq!(connection.dialect(), Some(SMBDialect::V2_1_0));
    }

    /// MS-SMB2 3.3.5.4: no common dialect fails the negotiate
    #[tokio::test]
    async fn unsupported_modern_offer_is_rejected() {
        let mut connection = connection(ProtocolRange::new(SMBProtocol::Smb3_0_0, SMBProtocol::Smb3_1_1));
        let response = connection.process(&modern_negotiate(&[0x0202]), &UnsupportedCommandHandler).await.unwrap();
        assert_eq!(response.len(), 64 + 9);
        assert_eq!(response_status(&response), NTStatus::InvalidLogonType as u32);
        assert_eq!(connection.dialect(), None);
        assert!(connection.needs_negotiation());
    }

    #[test]
    fn rejection_comes_with_its_failure() {
        let mut connection = connection(ProtocolRange::new(SMBProtocol::Smb3_0_0, SMBProtocol::Smb3_1_1));
        let (response, result) = connection.negotiate(&modern_negotiate(&[0x0210]), SMBFamily::Modern, SMBFamily::Modern);
        assert_eq!(response_status(&response), NTStatus::InvalidLogonType as u32);
        let Err(SMBError::NegotiationFailed(failure)) = result else {
            panic!("expected a negotiation failure");
        };
        assert_eq!(failure.status(), NTStatus::InvalidLogonType);

        let (response, result) = connection.negotiate(&modern_negotiate(&[0x0300]), SMBFamily::Modern, SMBFamily::Modern);
        assert!(result.is_ok());
        assert_eq!(response_dialect(&response), 0x0300);
    }

    #[tokio::test]
    async fn processed_rejection_records_its_failure() {
        let mut connection = connection(ProtocolRange::new(SMBProtocol::Smb3_0_0, SMBProtocol::Smb3_1_1));
        connection.process(&modern_negotiate(&[0x0202]), &UnsupportedCommandHandler).await.unwrap();
        assert!(matches!(connection.negotiation_failure(), Some(SMBError::NegotiationFailed(_))));

        connection.process(&modern_negotiate(&[0x0311]), &UnsupportedCommandHandler).await.unwrap();
        assert!(connection.negotiation_failure().is_none());
    }

    #[tokio::test]
    async fn unsupported_legacy_offer_is_rejected() {
        let mut connection = connection(ProtocolRange::new(SMBProtocol::Smb2_0_2, SMBProtocol::Smb3_1_1));
        let response = connection.process(&legacy_negotiate(&["NT LM 0.12"]), &UnsupportedCommandHandler).await.unwrap();
        assert_eq!(&response[0..5], &[0xFF, b'S', b'M', b'B', 0x72]);
        assert_eq!(&response[5..9], &[0x0B, 0x01, 0x00, 0xC0]);
        assert_eq!(&response[32..], &[1, 0xFF, 0xFF, 0, 0]);
    }

    #[tokio::test]
    async fn malformed_offer_is_rejected() {
        let mut connection = connection(ProtocolRange::default());
        let mut message = modern_negotiate(&[0x0311]);
        message.truncate(64 + 2);
        let response = connection.process(&message, &UnsupportedCommandHandler).await.unwrap();
        assert_eq!(response_status(&response), NTStatus::InvalidLogonType as u32);
    }

    #[tokio::test]
    async fn negotiate_after_other_command_is_rejected() {
        let mut connection = connection(ProtocolRange::default());
        connection.process(&modern_negotiate(&[0x0311]), &UnsupportedCommandHandler).await.unwrap();
        let mut echo = SMBSyncHeader::new(SMBCommandCode::Echo, SMBFlags::empty(), 2, 0, 0).smb_to_bytes();
        echo.extend_from_slice(&[4, 0, 0, 0]);
        connection.process(&echo, &UnsupportedCommandHandler).await.unwrap();
        assert_eq!(connection.negotiation_state(), NegotiationState::Modern);

        let response = connection.process(&modern_negotiate(&[0x0311]), &UnsupportedCommandHandler).await.unwrap();
        assert_eq!(response_status(&response), NTStatus::InvalidLogonType as u32);
        assert_eq!(connection.dialect(), Some(SMBDialect::V3_1_1));
    }

    #[test]
    fn fresh_connection_is_undetermined() {
        let connection = connection(ProtocolRange::default());
        assert_eq!(connection.negotiation_state(), NegotiationState::Undetermined);
    }
}
