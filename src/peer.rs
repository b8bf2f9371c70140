//! Peer wire protocol (BEP-3) and extension protocol (BEP-10).
//!
//! The crawler only ever dials out: after a peer announces an info-hash
//! over the DHT, a connect-back session completes the 68-byte handshake,
//! negotiates the extension protocol, and pulls the torrent metadata via
//! `ut_metadata` (BEP-9). This module provides the framing for all of it:
//!
//! - [`Handshake`] - the fixed-format preamble with reserved-bit flags
//! - [`Message`] - the length-prefixed protocol messages
//! - [`PeerTransport`] - buffered framing over a TCP stream
//! - [`ExtensionHandshake`] / [`MetadataMessage`] - BEP-10/BEP-9 payloads

mod error;
mod extension;
mod message;
mod metadata;
mod peer_id;
mod transport;

pub use error::PeerError;
pub use extension::{ExtensionHandshake, EXTENSION_HANDSHAKE_ID, UT_METADATA};
pub use message::{Handshake, Message, MessageId, HANDSHAKE_LEN, PROTOCOL};
pub use metadata::{
    metadata_piece_count, metadata_piece_size, MetadataMessage, MetadataMessageType,
    METADATA_PIECE_SIZE,
};
pub use peer_id::PeerId;
pub use transport::{PeerTransport, DEFAULT_MAX_FRAME};
