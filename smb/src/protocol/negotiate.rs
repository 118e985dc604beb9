//! Dialect selection for incoming negotiate requests.
//!
//! A legacy (0xFF 'SMB') negotiate offers dialects by name, a modern (0xFE 'SMB')
//! negotiate offers them by 16-bit revision. Either way the newest table entry that
//! the client offered and the server range allows wins, regardless of the order the
//! client listed its dialects in.

use nom::bytes::complete::take;
use nom::multi::count;
use nom::number::complete::{le_u16, le_u8};
use nom::sequence::tuple;

use smb_core::{SMBParseResult, SMBResult};
use smb_core::error::SMBError;
use smb_core::logging::{debug, trace};

use crate::protocol::dialect::{BAD_PROTOCOL_ID, DIALECT_BUFFER_FORMAT, DialectDescriptor, DialectTable, ProtocolRange, SMBDialect};
use crate::protocol::header::SMBFamily;

/// Bytes between the modern negotiate StructureSize field and the dialect array.
const MODERN_NEGOTIATE_FIXED_SIZE: usize = 36;

/// The dialects a client listed in its negotiate request, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialectOffer<'a> {
    Names(Vec<&'a [u8]>),
    Ids(Vec<u16>),
}

impl<'a> DialectOffer<'a> {
    /// Parses the body of a legacy negotiate request (everything after the 32 byte header).
    pub fn parse_legacy(body: &'a [u8]) -> SMBParseResult<&'a [u8], Self> {
        let (remaining, (_word_count, byte_count)) = tuple((le_u8, le_u16))(body)
            .map_err(|_e: nom::Err<nom::error::Error<&[u8]>>| SMBError::parse_error("Truncated negotiate parameter block"))?;
        let (remaining, block) = take::<_, _, nom::error::Error<&[u8]>>(byte_count)(remaining)
            .map_err(|_e| SMBError::payload_too_small(byte_count as usize, remaining.len()))?;
        let names = block.split(|byte| *byte == 0)
            .filter_map(|name| name.strip_prefix(&[DIALECT_BUFFER_FORMAT]))
            .collect::<Vec<&[u8]>>();
        trace!(offered = names.len(), "parsed legacy dialect names");
        Ok((remaining, Self::Names(names)))
    }

    /// Parses the body of a modern negotiate request (everything after the 64 byte header).
    pub fn parse_modern(body: &'a [u8]) -> SMBParseResult<&'a [u8], Self> {
        let (remaining, (_structure_size, dialect_count)) = tuple((le_u16, le_u16))(body)
            .map_err(|_e: nom::Err<nom::error::Error<&[u8]>>| SMBError::parse_error("Truncated negotiate request"))?;
        let (remaining, _) = take::<_, _, nom::error::Error<&[u8]>>(MODERN_NEGOTIATE_FIXED_SIZE - 4)(remaining)
            .map_err(|_e| SMBError::payload_too_small(MODERN_NEGOTIATE_FIXED_SIZE, body.len()))?;
        let (remaining, ids) = count(le_u16::<_, nom::error::Error<&[u8]>>, dialect_count as usize)(remaining)
            .map_err(|_e| SMBError::parse_error("Dialect count exceeds request length"))?;
        trace!(offered = ids.len(), "parsed modern dialect ids");
        Ok((remaining, Self::Ids(ids)))
    }

    /// Parses the offer out of a full SMB message, choosing the layout from its marker.
    pub fn from_message(message: &'a [u8]) -> SMBResult<Self> {
        let family = SMBFamily::classify(message)
            .ok_or_else(|| SMBError::parse_error("Unknown protocol marker"))?;
        let body = &message[family.header_size().min(message.len())..];
        let (_, offer) = match family {
            SMBFamily::Legacy => Self::parse_legacy(body)?,
            SMBFamily::Modern => Self::parse_modern(body)?,
        };
        Ok(offer)
    }

    pub fn offers(&self, entry: &DialectDescriptor) -> bool {
        match self {
            Self::Names(names) => names.iter().any(|name| *name == entry.name.as_bytes()),
            // legacy entries have no numeric identifier on the wire
            Self::Ids(ids) => entry.dialect.is_smb2_family()
                && ids.iter().any(|id| *id == entry.dialect as u16),
        }
    }

    /// Index of `entry` in the client's list, as echoed back by a legacy negotiate response.
    pub fn position(&self, entry: &DialectDescriptor) -> Option<usize> {
        match self {
            Self::Names(names) => names.iter().position(|name| *name == entry.name.as_bytes()),
            Self::Ids(ids) => ids.iter().position(|id| *id == entry.dialect as u16),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Names(names) => names.is_empty(),
            Self::Ids(ids) => ids.is_empty(),
        }
    }
}

/// Result of matching an offer against the dialect table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationOutcome {
    Selected(DialectDescriptor),
    Unsupported,
}

impl NegotiationOutcome {
    pub fn descriptor(&self) -> Option<&DialectDescriptor> {
        match self {
            Self::Selected(descriptor) => Some(descriptor),
            Self::Unsupported => None,
        }
    }

    pub fn dialect(&self) -> Option<SMBDialect> {
        self.descriptor().map(|descriptor| descriptor.dialect)
    }

    /// Wire identifier of the selected dialect, or [`BAD_PROTOCOL_ID`].
    pub fn wire_id(&self) -> u16 {
        self.dialect().map_or(BAD_PROTOCOL_ID, |dialect| dialect as u16)
    }

    pub fn is_smb2_family(&self) -> bool {
        self.dialect().is_some_and(|dialect| dialect.is_smb2_family())
    }
}

impl DialectTable {
    /// Picks the newest entry that the client offered and `range` allows.
    pub fn select(&self, offer: &DialectOffer<'_>, range: ProtocolRange) -> NegotiationOutcome {
        self.newest_first()
            .filter(|entry| range.contains(entry.protocol))
            .find(|entry| offer.offers(entry))
            .map_or(NegotiationOutcome::Unsupported, |entry| NegotiationOutcome::Selected(*entry))
    }
}

/// Negotiates a dialect for a raw negotiate message of either family.
/// Malformed requests and unknown markers negotiate nothing.
pub fn negotiate_smb_dialect(message: &[u8], table: &DialectTable, range: ProtocolRange) -> NegotiationOutcome {
    match DialectOffer::from_message(message) {
        Ok(offer) => {
            let outcome = table.select(&offer, range);
            debug!(?outcome, "selected dialect");
            outcome
        }
        Err(error) => {
            debug!(%error, "malformed negotiate request");
            NegotiationOutcome::Unsupported
        }
    }
}
