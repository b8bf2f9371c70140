use super::error::CrawlerError;
use super::store::InfoHash;
use crate::peer::{
    metadata_piece_count, ExtensionHandshake, Handshake, Message, MetadataMessage,
    MetadataMessageType, PeerError, PeerId, PeerTransport, EXTENSION_HANDSHAKE_ID, UT_METADATA,
};
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// The sub-id under which we accept ut_metadata messages.
const LOCAL_UT_METADATA_ID: u8 = 1;

/// Upper bound on a plausible metadata dictionary.
const MAX_METADATA_SIZE: i64 = 10 * 1024 * 1024;

/// Fetches torrent metadata from an announcing peer over `ut_metadata`.
///
/// One fetch is one TCP session: dial, exchange base handshakes,
/// negotiate the extension protocol, request every metadata piece,
/// reassemble, and verify the SHA-1 against the announced info-hash. The
/// whole session runs under an overall deadline; a peer that stalls
/// costs at most `fetch_timeout`.
#[derive(Debug, Clone)]
pub struct MetadataFetcher {
    dial_timeout: Duration,
    fetch_timeout: Duration,
    max_frame: usize,
}

impl MetadataFetcher {
    pub fn new(dial_timeout: Duration, fetch_timeout: Duration, max_frame: usize) -> Self {
        Self {
            dial_timeout,
            fetch_timeout,
            max_frame,
        }
    }

    /// Fetches and verifies the metadata for `info_hash` from `peer`.
    pub async fn fetch(&self, info_hash: InfoHash, peer: SocketAddr) -> Result<Bytes, CrawlerError> {
        timeout(self.fetch_timeout, self.fetch_session(info_hash, peer))
            .await
            .map_err(|_| PeerError::Timeout)?
    }

    async fn fetch_session(
        &self,
        info_hash: InfoHash,
        peer: SocketAddr,
    ) -> Result<Bytes, CrawlerError> {
        let stream = timeout(self.dial_timeout, TcpStream::connect(peer))
            .await
            .map_err(|_| PeerError::Timeout)??;
        let mut transport = PeerTransport::with_max_frame(stream, self.max_frame);

        let peer_id = PeerId::generate();
        transport
            .send_handshake(&Handshake::new(info_hash.0, *peer_id.as_bytes()))
            .await?;

        let theirs = transport.receive_handshake().await?;
        if theirs.info_hash != info_hash.0 {
            return Err(PeerError::InfoHashMismatch.into());
        }
        if !theirs.supports_extension_protocol() {
            return Err(CrawlerError::ExtensionUnsupported);
        }

        let ours = ExtensionHandshake::with_extensions(&[(UT_METADATA, LOCAL_UT_METADATA_ID)]);
        transport
            .send_message(&Message::Extended {
                id: EXTENSION_HANDSHAKE_ID,
                payload: ours.encode()?,
            })
            .await?;

        let remote = transport.receive_extended_handshake().await?;
        let remote_id = remote
            .extension_id(UT_METADATA)
            .ok_or(CrawlerError::ExtensionUnsupported)?;
        let size = remote.metadata_size.ok_or(CrawlerError::UnknownMetadataSize)?;
        if size <= 0 || size > MAX_METADATA_SIZE {
            return Err(CrawlerError::MetadataSizeOutOfRange(size));
        }
        let size = size as usize;

        let piece_count = metadata_piece_count(size);
        for piece in 0..piece_count {
            transport
                .send_message(&Message::Extended {
                    id: remote_id,
                    payload: MetadataMessage::request(piece as u32).encode()?,
                })
                .await?;
        }

        let mut pieces: BTreeMap<u32, Bytes> = BTreeMap::new();
        let mut received = 0usize;
        while received < size {
            match transport.receive_message().await? {
                Message::Extended { id, payload } if id == LOCAL_UT_METADATA_ID => {
                    let msg = MetadataMessage::decode(&payload)?;
                    match msg.msg_type {
                        MetadataMessageType::Data => {
                            if let Some(data) = msg.data {
                                received += data.len();
                                pieces.insert(msg.piece, data);
                            }
                        }
                        MetadataMessageType::Reject => {
                            return Err(CrawlerError::MetadataRejected(msg.piece));
                        }
                        // we serve no metadata; ignore requests
                        MetadataMessageType::Request => {}
                    }
                }
                // bitfield/have/choke chatter is irrelevant here
                _ => {}
            }
        }

        let mut metadata = Vec::with_capacity(size);
        for piece in 0..piece_count as u32 {
            let data = pieces
                .get(&piece)
                .ok_or(CrawlerError::MetadataIncomplete(piece))?;
            metadata.extend_from_slice(data);
        }

        let digest: [u8; 20] = Sha1::digest(&metadata).into();
        if digest != info_hash.0 {
            return Err(CrawlerError::MetadataMismatch);
        }

        Ok(Bytes::from(metadata))
    }
}
