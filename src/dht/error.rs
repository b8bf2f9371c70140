use thiserror::Error;

#[derive(Debug, Error)]
pub enum DhtError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bencode error: {0}")]
    Bencode(#[from] crate::bencode::BencodeError),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("invalid node id length")]
    InvalidNodeId,

    #[error("compact nodes length {0} is not a multiple of 26")]
    InvalidCompactNodes(usize),

    #[error("handler tag must be a single byte")]
    InvalidTag,

    #[error("no handler for message type {0:#04x}")]
    NoHandler(u8),

    #[error("could not resolve {0} to an IPv4 address")]
    ResolveFailed(String),
}
