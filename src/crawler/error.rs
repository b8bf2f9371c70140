use thiserror::Error;

/// Errors from crawl handlers and metadata connect-backs.
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("dht error: {0}")]
    Dht(#[from] crate::dht::DhtError),

    #[error("peer error: {0}")]
    Peer(#[from] crate::peer::PeerError),

    #[error("bencode error: {0}")]
    Bencode(#[from] crate::bencode::BencodeError),

    /// A message is missing a required key.
    #[error("missing key: {0}")]
    MissingKey(&'static str),

    /// A fixed-width field has the wrong length.
    #[error("wrong length for {0}")]
    WrongLength(&'static str),

    /// An `announce_peer` token does not match the one we issued.
    #[error("invalid token in announce request")]
    InvalidToken,

    /// An announced port is outside (0, 65536).
    #[error("invalid port: {0}")]
    InvalidPort(i64),

    /// A query type we have no answer for.
    #[error("cannot handle query type: {0}")]
    UnknownQuery(String),

    /// The peer does not speak the extension protocol.
    #[error("peer does not support the extension protocol")]
    ExtensionUnsupported,

    /// The peer's extension handshake did not state a metadata size.
    #[error("peer did not announce a metadata size")]
    UnknownMetadataSize,

    /// The announced metadata size is implausible.
    #[error("metadata size {0} is out of range")]
    MetadataSizeOutOfRange(i64),

    /// The peer rejected a metadata piece request.
    #[error("peer rejected metadata piece {0}")]
    MetadataRejected(u32),

    /// The transfer finished without delivering every piece.
    #[error("metadata piece {0} missing after transfer")]
    MetadataIncomplete(u32),

    /// The assembled metadata does not hash to the announced info-hash.
    #[error("metadata does not match info-hash")]
    MetadataMismatch,
}
