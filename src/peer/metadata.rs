//! Metadata exchange extension (ut_metadata, BEP-9).
//!
//! This module implements the extension for exchanging torrent metadata
//! between peers. The crawler uses it to turn a harvested info-hash into
//! the torrent's info dictionary without ever holding the torrent itself.

use bytes::Bytes;

use super::error::PeerError;
use crate::bencode::{decode_prefix, encode, Dict, Value};

/// The size of a metadata piece (16 KB).
pub const METADATA_PIECE_SIZE: usize = 16384;

/// Message types for the ut_metadata extension (BEP-9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataMessageType {
    /// Request a piece of metadata.
    Request = 0,
    /// Provide a piece of metadata.
    Data = 1,
    /// Reject a metadata request.
    Reject = 2,
}

impl MetadataMessageType {
    /// Converts a byte value to a message type.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(MetadataMessageType::Request),
            1 => Some(MetadataMessageType::Data),
            2 => Some(MetadataMessageType::Reject),
            _ => None,
        }
    }

    /// Converts the message type to a byte value.
    pub fn as_byte(&self) -> u8 {
        *self as u8
    }
}

/// A metadata exchange message (ut_metadata, BEP-9).
///
/// Used to request, send, or reject metadata pieces between peers. On the
/// wire this is a bencoded dictionary; data messages append the raw piece
/// bytes directly after it.
#[derive(Debug, Clone)]
pub struct MetadataMessage {
    /// The message type (request, data, or reject).
    pub msg_type: MetadataMessageType,
    /// The piece index being requested/sent/rejected.
    pub piece: u32,
    /// The total size of the metadata (only present in data messages).
    pub total_size: Option<u32>,
    /// The actual metadata piece data (only present in data messages).
    pub data: Option<Bytes>,
}

impl MetadataMessage {
    /// Creates a new request message for a metadata piece.
    pub fn request(piece: u32) -> Self {
        Self {
            msg_type: MetadataMessageType::Request,
            piece,
            total_size: None,
            data: None,
        }
    }

    /// Creates a new data message with metadata piece content.
    pub fn data(piece: u32, total_size: u32, data: Bytes) -> Self {
        Self {
            msg_type: MetadataMessageType::Data,
            piece,
            total_size: Some(total_size),
            data: Some(data),
        }
    }

    /// Creates a new reject message for a metadata piece.
    pub fn reject(piece: u32) -> Self {
        Self {
            msg_type: MetadataMessageType::Reject,
            piece,
            total_size: None,
            data: None,
        }
    }

    /// Encodes the message to bytes for transmission.
    pub fn encode(&self) -> Result<Bytes, PeerError> {
        let mut dict = Dict::new();

        dict.put(
            Bytes::from_static(b"msg_type"),
            Value::Integer(self.msg_type.as_byte() as i64),
        );
        dict.put(
            Bytes::from_static(b"piece"),
            Value::Integer(self.piece as i64),
        );

        if let Some(total_size) = self.total_size {
            dict.put(
                Bytes::from_static(b"total_size"),
                Value::Integer(total_size as i64),
            );
        }

        let encoded_dict = encode(&Value::Dict(dict))?;

        if let Some(ref data) = self.data {
            let mut result = Vec::with_capacity(encoded_dict.len() + data.len());
            result.extend_from_slice(&encoded_dict);
            result.extend_from_slice(data);
            Ok(Bytes::from(result))
        } else {
            Ok(Bytes::from(encoded_dict))
        }
    }

    /// Decodes a metadata message from bytes.
    ///
    /// For data messages, the raw piece bytes follow the bencoded
    /// dictionary.
    pub fn decode(payload: &[u8]) -> Result<Self, PeerError> {
        let (value, dict_end) = decode_prefix(payload)?;
        let dict = value
            .as_dict()
            .ok_or_else(|| PeerError::Extension("expected dict".into()))?;

        let msg_type_byte = dict
            .get(b"msg_type")
            .and_then(|v| v.as_integer())
            .ok_or_else(|| PeerError::Extension("missing msg_type".into()))?
            as u8;

        let msg_type = MetadataMessageType::from_byte(msg_type_byte)
            .ok_or_else(|| PeerError::Extension("invalid msg_type".into()))?;

        let piece = dict
            .get(b"piece")
            .and_then(|v| v.as_integer())
            .ok_or_else(|| PeerError::Extension("missing piece".into()))? as u32;

        let total_size = dict
            .get(b"total_size")
            .and_then(|v| v.as_integer())
            .map(|v| v as u32);

        let data = if msg_type == MetadataMessageType::Data && dict_end < payload.len() {
            Some(Bytes::copy_from_slice(&payload[dict_end..]))
        } else {
            None
        };

        Ok(Self {
            msg_type,
            piece,
            total_size,
            data,
        })
    }
}

/// Calculates the number of metadata pieces for a given metadata size.
pub fn metadata_piece_count(metadata_size: usize) -> usize {
    metadata_size.div_ceil(METADATA_PIECE_SIZE)
}

/// Calculates the size of a specific metadata piece.
pub fn metadata_piece_size(piece: u32, total_size: usize) -> usize {
    let offset = piece as usize * METADATA_PIECE_SIZE;
    if offset >= total_size {
        0
    } else {
        (total_size - offset).min(METADATA_PIECE_SIZE)
    }
}
