use super::error::PeerError;
use crate::bencode::{decode, encode, Dict, Value};
use bytes::Bytes;
use std::collections::BTreeMap;

/// Sub-id of the extension protocol handshake message.
pub const EXTENSION_HANDSHAKE_ID: u8 = 0;

/// Name of the metadata exchange extension (BEP-9).
pub const UT_METADATA: &str = "ut_metadata";

/// The extension protocol handshake payload (BEP-10).
///
/// Carried in an extended message with sub-id 0, immediately after the
/// base handshake. The `m` dictionary maps extension names to the sub-ids
/// the sender will accept them under; the crawler advertises
/// `{"m": {"ut_metadata": 1}}`.
#[derive(Debug, Clone, Default)]
pub struct ExtensionHandshake {
    /// Supported extensions and their negotiated sub-ids.
    pub extensions: BTreeMap<String, u8>,
    /// Client name and version, if the peer sent one.
    pub client: Option<String>,
    /// Total metadata size in bytes, sent by ut_metadata-capable peers.
    pub metadata_size: Option<i64>,
}

impl ExtensionHandshake {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a handshake advertising the given extensions.
    pub fn with_extensions(extensions: &[(&str, u8)]) -> Self {
        let mut hs = Self::new();
        for (name, id) in extensions {
            hs.extensions.insert((*name).to_string(), *id);
        }
        hs
    }

    /// Returns the peer's sub-id for an extension, if it supports it.
    pub fn extension_id(&self, name: &str) -> Option<u8> {
        self.extensions.get(name).copied()
    }

    /// Encodes the handshake to its bencoded payload.
    pub fn encode(&self) -> Result<Bytes, PeerError> {
        let m = Dict::from_pairs(self.extensions.iter().map(|(name, id)| {
            (
                Bytes::copy_from_slice(name.as_bytes()),
                Value::Integer(*id as i64),
            )
        }));

        let mut dict = Dict::new();
        dict.put(Bytes::from_static(b"m"), Value::Dict(m));

        if let Some(ref client) = self.client {
            dict.put(Bytes::from_static(b"v"), Value::string(client));
        }

        if let Some(size) = self.metadata_size {
            dict.put(Bytes::from_static(b"metadata_size"), Value::Integer(size));
        }

        let encoded = encode(&Value::Dict(dict))?;
        Ok(Bytes::from(encoded))
    }

    /// Decodes a handshake from its bencoded payload.
    pub fn decode(data: &[u8]) -> Result<Self, PeerError> {
        let value = decode(data)?;
        let dict = value
            .as_dict()
            .ok_or_else(|| PeerError::Extension("expected dict".into()))?;

        let mut hs = Self::new();

        if let Some(m) = dict.get(b"m").and_then(|v| v.as_dict()) {
            for (key, val) in m {
                if let (Ok(name), Some(id)) = (std::str::from_utf8(key), val.as_integer()) {
                    if id > 0 {
                        hs.extensions.insert(name.to_string(), id as u8);
                    }
                }
            }
        }

        hs.client = dict.get(b"v").and_then(|v| v.as_str()).map(String::from);

        hs.metadata_size = dict.get(b"metadata_size").and_then(|v| v.as_integer());

        Ok(hs)
    }
}
